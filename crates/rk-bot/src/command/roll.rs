//! The standard roll: `r[hqv] [N#][expression] [description][temp]`.

use rand::rngs::StdRng;
use rk_core::{Card, CardKind, Entry, EntryCategory};
use rk_expr::{PredicateContext, split_expression};
use rk_mechanics::Decision;

use super::{Ctx, log_abandoned, lookup, roll_text, split_temp};
use crate::effect::{Effect, PendingRoll};
use crate::state::{CachedRoll, Contest};

/// Most repetitions one command may ask for.
pub(crate) const MAX_REPEAT: u32 = 10;

/// Flags glued to `r`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RollFlags {
    /// `h`: show the result to the sender only.
    pub hidden: bool,
    /// `q`: omit the dice detail.
    pub quiet: bool,
    /// `v`: offer the roll for opposing.
    pub vs: bool,
}

/// Read `[hqv]*` from the front of `text`.
pub(crate) fn parse_flags(text: &str) -> (RollFlags, &str) {
    let mut flags = RollFlags::default();
    let mut consumed = 0;
    for c in text.chars() {
        match c {
            'h' => flags.hidden = true,
            'q' => flags.quiet = true,
            'v' => flags.vs = true,
            _ => break,
        }
        consumed += 1;
    }
    (flags, &text[consumed..])
}

/// Read an `N#` repeat count. Counts are clamped to `1..=MAX_REPEAT`.
fn parse_repeat(text: &str) -> (u32, &str) {
    let text = text.trim_start();
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0
        && let Some(rest) = text[digits..].strip_prefix('#')
    {
        let n: u32 = text[..digits].parse().unwrap_or(MAX_REPEAT);
        return (n.clamp(1, MAX_REPEAT), rest);
    }
    (1, text)
}

/// The entry a description tests, if any.
fn tested_entry(card: Option<&Card>, kind: CardKind, desc: &str, temp: Option<i64>) -> Option<Entry> {
    if let Some(value) = temp {
        let (difficulty, name) = kind.strip_difficulty(desc);
        let name = name.trim();
        let key = match card {
            Some(c) if !name.is_empty() => c.aliases().canonical(name),
            _ => name.to_string(),
        };
        return Some(Entry::temp(desc, key, value, difficulty));
    }
    if desc.is_empty() {
        return None;
    }
    card?.get_entry(desc)
}

pub(crate) fn run(ctx: &Ctx<'_>, flags: RollFlags, args: &str, rng: &mut StdRng) -> Option<PendingRoll> {
    let (repeat, args) = parse_repeat(args);
    let args = ctx
        .dispatcher
        .rewriter()
        .rewrite_expression(args.trim())
        .inspect_err(|e| log_abandoned(ctx.text, e))
        .ok()?;
    let (expr, rest) = split_expression(&args);
    let (desc, temp) = split_temp(rest);

    let card = ctx.target();
    let kind = ctx.kind(card);
    let who = ctx.who(card);
    let entry = tested_entry(card, kind, desc, temp);
    let expression = match (&entry, kind) {
        _ if !expr.is_empty() => expr.to_string(),
        (Some(e), CardKind::Dnd) => format!("d20{}", super::signed(e.value)),
        _ => ctx.dispatcher.config().default_roll.clone(),
    };

    let mut lines = Vec::new();
    let mut checked: Option<(Entry, Decision, i64)> = None;
    for _ in 0..repeat {
        let (resolved, roll) = ctx.roll(&expression, lookup(card), rng)?;
        let shown = roll_text(&resolved, &roll, flags.quiet);
        let line = match &entry {
            Some(e) => {
                let pctx = PredicateContext {
                    base_value: e.base_value,
                    target_value: e.value,
                    roll: roll.total,
                };
                let decision = ctx.dispatcher.decider().decide(
                    ctx.tiers(kind),
                    &pctx,
                    &[("name", who.clone()), ("skill", e.key.clone())],
                );
                let line = match &decision {
                    Some(d) => format!("{who}进行{}{}检定: {shown}/{} {}", e.difficulty, e.key, e.value, d.text),
                    None => format!("{who}进行{}{}检定: {shown}", e.difficulty, e.key),
                };
                if let Some(d) = decision {
                    checked = Some((e.clone(), d, roll.total));
                }
                line
            }
            None if desc.is_empty() => format!("{who}掷骰: {shown}"),
            None => format!("{who}掷骰 {desc}: {shown}"),
        };
        lines.push(line);
    }

    let mut pending = PendingRoll::default();

    // Only a single check with a decision can take part in a contest.
    let mine = match &checked {
        Some((e, d, total)) if repeat == 1 => Some(CachedRoll {
            user_id: ctx.request.user.id.clone(),
            who: who.clone(),
            entry: format!("{}{}", e.difficulty, e.key),
            tier: d.tier.clone(),
            kind: d.kind,
            tier_index: d.index,
            base_value: e.base_value,
            roll: *total,
            rolled_at: ctx.now,
        }),
        _ => None,
    };
    let earlier = ctx
        .request
        .reply_to
        .as_deref()
        .and_then(|id| ctx.channel.opposed.peek(id, ctx.now));
    let mut contested = false;
    if let (Some(mine), Some(earlier)) = (&mine, earlier)
        && !flags.hidden
    {
        let verdict = match mine.contest(earlier) {
            Contest::Win => format!("{}胜出", mine.who),
            Contest::Lose => format!("{}胜出", earlier.who),
            Contest::Draw => "平局".to_string(),
        };
        lines.push(format!(
            "对抗: {}的{} {} vs {}的{} {}, {verdict}",
            earlier.who, earlier.entry, earlier.tier, mine.who, mine.entry, mine.tier
        ));
        contested = true;
    }
    if flags.vs && !flags.hidden {
        pending.opposed = mine;
    }

    if let (Some(card), Some((e, d, _))) = (card, &checked)
        && d.success
        && kind == CardKind::Coc
        && !e.is_temp
        && e.category == EntryCategory::Skills
        && !flags.vs
        && !contested
    {
        pending.effects.push(Effect::MarkGrowth {
            card: card.name().to_string(),
            skill: e.key.clone(),
            on: true,
        });
    }

    let text = lines.join("\n");
    if flags.hidden {
        pending.output = format!("{who}进行了一次暗骰");
        pending.private_output = Some(text);
    } else {
        pending.output = text;
    }
    Some(pending)
}

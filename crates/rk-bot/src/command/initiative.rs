//! Initiative: `ri [expr|±mod] [name]` adds, `init` lists, `init clr`
//! clears and `init del <name>` removes.

use rand::rngs::StdRng;
use rk_core::CardKind;
use rk_expr::split_expression;

use super::{Ctx, lookup, roll_text};
use crate::effect::{Effect, PendingRoll};

/// D&D cards add this entry to the default initiative roll.
const DND_BONUS: &str = "$先攻";

/// The expression `ri` rolls for `args`, and the rest of `args`.
fn initiative_expression<'t>(default: &str, kind: Option<CardKind>, args: &'t str) -> (String, &'t str) {
    let (expr, rest) = split_expression(args.trim());
    let mut base = default.to_string();
    if kind == Some(CardKind::Dnd) {
        base.push('+');
        base.push_str(DND_BONUS);
    }
    match expr.chars().next() {
        None => (base, rest),
        Some('+' | '-') => (format!("{base}{expr}"), rest),
        Some(_) => (expr.to_string(), rest),
    }
}

pub(crate) fn add(ctx: &Ctx<'_>, args: &str, rng: &mut StdRng) -> Option<PendingRoll> {
    let card = ctx.target();
    let default = &ctx.dispatcher.config().initiative_default;
    let (expression, rest) = initiative_expression(default, card.map(|c| c.kind()), args);
    let name = if rest.is_empty() { ctx.who(card) } else { ctx.verbatim(rest) };
    let (resolved, roll) = ctx.roll(&expression, lookup(card), rng)?;
    Some(
        PendingRoll::reply(format!(
            "{name}的先攻: {}",
            roll_text(&resolved, &roll, false)
        ))
        .with_effect(Effect::InitiativeAdd {
            name,
            value: roll.total,
        }),
    )
}

pub(crate) fn list(ctx: &Ctx<'_>, args: &str) -> PendingRoll {
    let args = args.trim();
    if args == "clr" || args == "clear" {
        return PendingRoll::reply("先攻列表已清空").with_effect(Effect::InitiativeClear);
    }
    if let Some(name) = args.strip_prefix("del").map(str::trim) {
        let name = &ctx.verbatim(name);
        if name.is_empty() {
            return PendingRoll::reply("用法: init del <名字>");
        }
        let known = ctx.channel.initiative.entries().iter().any(|e| &e.name == name);
        if !known {
            return PendingRoll::reply(format!("先攻列表中没有{name}"));
        }
        return PendingRoll::reply(format!("已将{name}移出先攻列表")).with_effect(
            Effect::InitiativeRemove {
                name: name.to_string(),
            },
        );
    }

    let entries = ctx.channel.initiative.entries();
    if entries.is_empty() {
        return PendingRoll::reply("先攻列表为空");
    }
    let mut lines = vec!["先攻列表:".to_string()];
    lines.extend(
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}. {} {}", i + 1, e.name, e.value)),
    );
    PendingRoll::reply(lines.join("\n"))
}

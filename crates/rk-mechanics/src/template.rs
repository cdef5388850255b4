//! Template resolution: expand card references and inline rolls into one
//! flat, rollable expression.
//!
//! Each recursion level runs three passes over its text:
//!
//! 1. `$name` / `${name}` references are replaced. An ability is resolved
//!    one level deeper and rolled; an entry contributes its value; anything
//!    else vanishes.
//! 2. Innermost `[[...]]` spans are rolled one at a time. Inside a span,
//!    `$N` is the total of the Nth inline roll already made at this level.
//! 3. Any `$N` left outside a span is replaced the same way.
//!
//! A `?` in front of an inline roll or an ability expression hides it: the
//! roll stays in the history but contributes nothing to the text.

use std::fmt;

use rand::rngs::StdRng;
use rk_core::{Ability, Card, Entry};
use rk_expr::DiceRoll;
use rk_expr::dice;
use rk_expr::scan::{self, Reference};

use crate::error::{MechError, MechResult};

/// Deepest nesting of ability references before resolution gives up.
pub const MAX_DEPTH: usize = 99;

/// Where `$name` references are looked up.
pub trait ReferenceLookup {
    /// A numeric entry by name.
    fn entry(&self, name: &str) -> Option<Entry>;
    /// A dice-expression ability by name.
    fn ability(&self, name: &str) -> Option<Ability>;
}

impl ReferenceLookup for Card {
    fn entry(&self, name: &str) -> Option<Entry> {
        self.get_entry(name)
    }

    fn ability(&self, name: &str) -> Option<Ability> {
        self.get_ability(name)
    }
}

/// Lookup for commands run without a card: every reference is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCard;

impl ReferenceLookup for NoCard {
    fn entry(&self, _name: &str) -> Option<Entry> {
        None
    }

    fn ability(&self, _name: &str) -> Option<Ability> {
        None
    }
}

/// A roll made while resolving a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRoll {
    /// The ability key for ability rolls, `None` for inline rolls.
    pub label: Option<String>,
    /// The roll itself.
    pub roll: DiceRoll,
    /// Hidden rolls are kept out of the resolved text.
    pub hidden: bool,
}

impl fmt::Display for SubRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        if self.hidden {
            write!(f, "{}=?", self.roll.expression)
        } else {
            write!(f, "{}", self.roll)
        }
    }
}

/// A fully expanded expression and the rolls made to build it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The flat expression, ready to roll.
    pub expression: String,
    /// Every sub-roll, innermost first.
    pub history: Vec<SubRoll>,
}

/// Expand `expression` at recursion level `depth`.
///
/// Fails with [`MechError::ResolutionTooDeep`] when abilities nest past
/// [`MAX_DEPTH`], and with [`MechError::UnparseableExpression`] when a
/// nested roll cannot be made.
pub fn resolve(
    expression: &str,
    lookup: &dyn ReferenceLookup,
    rng: &mut StdRng,
    depth: usize,
) -> MechResult<Resolved> {
    if depth > MAX_DEPTH {
        return Err(MechError::ResolutionTooDeep { depth });
    }
    let mut history = Vec::new();

    let mut text = String::with_capacity(expression.len());
    let mut rest = expression;
    while let Some(pos) = rest.find('$') {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match scan::reference_at(tail) {
            Some((len, Reference::Named(name))) => {
                let value = named(name, lookup, rng, depth, &mut history)?;
                text.push_str(&value);
                rest = &tail[len..];
            }
            Some((len, Reference::Back(_))) => {
                text.push_str(&tail[..len]);
                rest = &tail[len..];
            }
            None => {
                text.push('$');
                rest = &tail[1..];
            }
        }
    }
    text.push_str(rest);

    let mut local = Vec::new();
    while let Some(span) = scan::innermost_inline(&text) {
        let (hidden, body) = strip_hidden(&text[span.start + 2..span.end - 2]);
        let body = back_references(body, &local);
        let roll = dice::roll(&body, rng)?;
        local.push(roll.total);
        let replacement = if hidden { String::new() } else { format_total(roll.total) };
        history.push(SubRoll {
            label: None,
            roll,
            hidden,
        });
        text.replace_range(span, &replacement);
    }

    Ok(Resolved {
        expression: back_references(&text, &local).trim().to_string(),
        history,
    })
}

/// Resolve and roll in one step, returning the final roll as well.
pub fn resolve_and_roll(
    expression: &str,
    lookup: &dyn ReferenceLookup,
    rng: &mut StdRng,
) -> MechResult<(Resolved, DiceRoll)> {
    let resolved = resolve(expression, lookup, rng, 0)?;
    let roll = dice::roll(&resolved.expression, rng)?;
    Ok((resolved, roll))
}

fn named(
    name: &str,
    lookup: &dyn ReferenceLookup,
    rng: &mut StdRng,
    depth: usize,
    history: &mut Vec<SubRoll>,
) -> MechResult<String> {
    if let Some(ability) = lookup.ability(name) {
        let (hidden, body) = strip_hidden(&ability.expression);
        let inner = resolve(body, lookup, rng, depth + 1)?;
        let roll = dice::roll(&inner.expression, rng)?;
        let total = roll.total;
        history.extend(inner.history);
        history.push(SubRoll {
            label: Some(ability.key),
            roll,
            hidden,
        });
        return Ok(if hidden { String::new() } else { format_total(total) });
    }
    Ok(lookup
        .entry(name)
        .map(|e| format_total(e.value))
        .unwrap_or_default())
}

fn strip_hidden(text: &str) -> (bool, &str) {
    let text = text.trim();
    match text.strip_prefix('?') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    }
}

/// Replace `$N` with the Nth local inline total, or nothing when out of
/// range.
fn back_references(text: &str, local: &[i64]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match scan::reference_at(tail) {
            Some((len, Reference::Back(n))) => {
                if let Some(total) = n.checked_sub(1).and_then(|i| local.get(i)) {
                    out.push_str(&format_total(*total));
                }
                rest = &tail[len..];
            }
            _ => {
                out.push('$');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn format_total(n: i64) -> String {
    if n < 0 { format!("({n})") } else { n.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rk_core::{AliasRegistry, CardData, CocCard, DndCard, GeneralCard};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn general() -> Card {
        let mut card = Card::new(CardData::General(GeneralCard::new("tester")), &AliasRegistry::builtin());
        card.set_entry("力量", 60);
        card.set_entry("debt", -3);
        card.set_ability("sword", "1d8+2");
        card.set_ability("strike", "$sword+1");
        card.set_ability("loop", "$loop+1");
        card.set_ability("secret", "?1d4");
        card
    }

    #[test]
    fn plain_expression_passes_through() {
        let r = resolve("3d6+2", &NoCard, &mut rng(), 0).unwrap();
        assert_eq!(r.expression, "3d6+2");
        assert!(r.history.is_empty());
    }

    #[test]
    fn entries_substitute_values() {
        let r = resolve("d100+$力量", &general(), &mut rng(), 0).unwrap();
        assert_eq!(r.expression, "d100+60");
        let r = resolve("10+${debt}", &general(), &mut rng(), 0).unwrap();
        assert_eq!(r.expression, "10+(-3)");
    }

    #[test]
    fn unknown_reference_is_empty() {
        let r = resolve("1d6+$nothing", &general(), &mut rng(), 0).unwrap();
        assert_eq!(r.expression, "1d6+");
    }

    #[test]
    fn abilities_roll_and_record_history() {
        let r = resolve("$strike*2", &general(), &mut rng(), 0).unwrap();
        assert_eq!(r.history.len(), 2);
        assert_eq!(r.history[0].label.as_deref(), Some("sword"));
        assert_eq!(r.history[1].label.as_deref(), Some("strike"));
        let sword = r.history[0].roll.total;
        assert!((3..=10).contains(&sword));
        assert_eq!(r.history[1].roll.total, sword + 1);
        assert_eq!(r.expression, format!("{}*2", sword + 1));
    }

    #[test]
    fn self_reference_is_too_deep() {
        let err = resolve("$loop", &general(), &mut rng(), 0).unwrap_err();
        assert!(matches!(err, MechError::ResolutionTooDeep { depth } if depth == MAX_DEPTH + 1));
    }

    #[test]
    fn hidden_ability_contributes_nothing() {
        let r = resolve("1+$secret", &general(), &mut rng(), 0).unwrap();
        assert_eq!(r.expression, "1+");
        assert!(r.history[0].hidden);
        let shown = r.history[0].to_string();
        assert!(shown.starts_with("secret: "));
        assert!(shown.ends_with("=?"));
    }

    #[test]
    fn inline_back_references_are_per_level() {
        let r = resolve("[[d10]]d10+[[$1+1]]d6", &NoCard, &mut rng(), 0).unwrap();
        assert_eq!(r.history.len(), 2);
        let first = r.history[0].roll.total;
        assert_eq!(r.history[1].roll.total, first + 1);
        assert_eq!(r.expression, format!("{first}d10+{}d6", first + 1));
    }

    #[test]
    fn nested_inline_rolls_resolve_inside_out() {
        let r = resolve("[[ [[1d4]]d6 ]]", &NoCard, &mut rng(), 0).unwrap();
        assert_eq!(r.history.len(), 2);
        let count = r.history[0].roll.total;
        assert_eq!(r.history[1].roll.dice_count(), count as usize);
        assert_eq!(r.expression, r.history[1].roll.total.to_string());
    }

    #[test]
    fn hidden_inline_roll_keeps_back_reference() {
        let r = resolve("[[?d6]]$1", &NoCard, &mut rng(), 0).unwrap();
        assert!(r.history[0].hidden);
        assert_eq!(r.expression, r.history[0].roll.total.to_string());
    }

    #[test]
    fn out_of_range_back_reference_is_empty() {
        let r = resolve("[[2]]+$3", &NoCard, &mut rng(), 0).unwrap();
        assert_eq!(r.expression, "2+");
    }

    #[test]
    fn bad_inline_roll_is_unparseable() {
        let err = resolve("[[d]]", &NoCard, &mut rng(), 0).unwrap_err();
        assert!(matches!(err, MechError::UnparseableExpression(_)));
    }

    #[test]
    fn coc_difficulty_through_reference() {
        let mut card = Card::new(CardData::Coc(CocCard::new("inv")), &AliasRegistry::builtin());
        card.set_entry("侦察", 40);
        let r = resolve("$困难侦察", &card, &mut rng(), 0).unwrap();
        assert_eq!(r.expression, "20");
    }

    #[test]
    fn dnd_computed_modifier() {
        let mut card = Card::new(CardData::Dnd(DndCard::new("hero")), &AliasRegistry::builtin());
        card.set_entry("力量", 16);
        let (resolved, roll) = resolve_and_roll("d20+$strmod", &card, &mut rng()).unwrap();
        assert_eq!(resolved.expression, "d20+3");
        assert!((4..=23).contains(&roll.total));
    }

    #[test]
    fn same_seed_same_result() {
        let a = resolve_and_roll("$strike+[[d20]]", &general(), &mut rng()).unwrap();
        let b = resolve_and_roll("$strike+[[d20]]", &general(), &mut rng()).unwrap();
        assert_eq!(a, b);
    }
}

//! Card values: `st show [names]`, `st <name><value>...`,
//! `st <name>±<expr>`, `st &<name>=<expr>` and `st del <name>...`.

use rand::rngs::StdRng;
use rk_core::Card;
use rk_expr::split_expression;

use super::{Ctx, roll_text};
use crate::effect::{Effect, PendingRoll};

const USAGE: &str = "用法: st 力量60敏捷50 / st 生命-1d6 / st &武器=1d8+$力量调整 / st show / st del 名字";

/// One parsed `st` write.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Write<'t> {
    /// `name value`
    Set(&'t str, i64),
    /// `name±expr`, added to the current value.
    Adjust(&'t str, &'t str),
}

/// Read a name: optional leading digits (`1环`), then anything up to a
/// digit, sign or whitespace.
fn take_name(text: &str) -> (&str, &str) {
    let lead = text.bytes().take_while(u8::is_ascii_digit).count();
    let body: usize = text[lead..]
        .chars()
        .take_while(|c| !c.is_ascii_digit() && !matches!(c, '+' | '-') && !c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    if body == 0 {
        return ("", text);
    }
    text.split_at(lead + body)
}

/// Parse `name value` and `name±expr` pairs. None if anything is left over.
fn parse_writes(text: &str) -> Option<Vec<Write<'_>>> {
    let mut writes = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let (name, after) = take_name(rest);
        if name.is_empty() {
            return None;
        }
        let after = after.trim_start();
        if after.starts_with(['+', '-']) {
            let (expr, tail) = split_expression(after);
            if expr.len() < 2 {
                return None;
            }
            writes.push(Write::Adjust(name, expr));
            rest = tail;
        } else {
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let value = after[..digits].parse().ok()?;
            writes.push(Write::Set(name, value));
            rest = after[digits..].trim_start();
        }
    }
    (!writes.is_empty()).then_some(writes)
}

pub(crate) fn run(ctx: &Ctx<'_>, args: &str, rng: &mut StdRng) -> Option<PendingRoll> {
    let args = args.trim();
    let card = ctx.target();
    let who = ctx.who(card);
    let Some(card) = card else {
        return Some(PendingRoll::reply(format!("{who}没有角色卡")));
    };

    if args.is_empty() {
        return Some(show(card, ""));
    }
    if let Some(names) = args.strip_prefix("show") {
        return Some(show(card, names));
    }

    if !ctx.dispatcher.config().stat_write.allows(ctx.request.user.is_manager) {
        return Some(PendingRoll::reply("当前频道不允许你修改角色卡"));
    }

    if let Some(names) = args.strip_prefix("del") {
        return Some(delete(card, names));
    }
    if let Some(ability) = args.strip_prefix('&') {
        let Some((name, expression)) = ability.split_once('=') else {
            return Some(PendingRoll::reply(USAGE));
        };
        let (name, expression) = (name.trim(), expression.trim());
        if name.is_empty() || expression.is_empty() {
            return Some(PendingRoll::reply(USAGE));
        }
        if card.get_ability(name).is_some_and(|a| a.readonly) {
            return Some(PendingRoll::reply(format!("{name}是计算值, 不能修改")));
        }
        return Some(
            PendingRoll::reply(format!("{}的{name}设置为{expression}", card.name())).with_effect(
                Effect::SetAbility {
                    card: card.name().to_string(),
                    name: name.to_string(),
                    expression: expression.to_string(),
                },
            ),
        );
    }

    let Some(writes) = parse_writes(args) else {
        return Some(PendingRoll::reply(USAGE));
    };
    write(ctx, card, &writes, rng)
}

fn show(card: &Card, names: &str) -> PendingRoll {
    let names: Vec<&str> = names.split_whitespace().collect();
    let mut parts = Vec::new();
    if names.is_empty() {
        parts.extend(card.entries().iter().map(|e| format!("{}:{}", e.key, e.value)));
        parts.extend(card.abilities().iter().map(|a| format!("&{}={}", a.key, a.expression)));
    } else {
        for name in names {
            let part = match (card.get_entry(name), card.get_ability(name)) {
                (Some(e), _) => format!("{}:{}", e.key, e.value),
                (None, Some(a)) => format!("&{}={}", a.key, a.expression),
                (None, None) => format!("{name}:无"),
            };
            parts.push(part);
        }
    }
    if parts.is_empty() {
        return PendingRoll::reply(format!("{}的角色卡是空的", card.name()));
    }
    PendingRoll::reply(format!("{}的属性: {}", card.name(), parts.join(" ")))
}

fn delete(card: &Card, names: &str) -> PendingRoll {
    let names: Vec<&str> = names.split_whitespace().collect();
    if names.is_empty() {
        return PendingRoll::reply(USAGE);
    }
    let mut pending = PendingRoll::default();
    let mut removed = Vec::new();
    let mut kept = Vec::new();
    for name in names {
        let target = card.name().to_string();
        if let Some(a) = card.get_ability(name).filter(|a| !a.readonly) {
            pending.effects.push(Effect::RemoveAbility {
                card: target,
                name: a.key.clone(),
            });
            removed.push(a.key);
        } else if let Some(e) = card.get_entry(name).filter(|e| e.category.is_open()) {
            pending.effects.push(Effect::RemoveEntry {
                card: target,
                name: e.key.clone(),
            });
            removed.push(e.key);
        } else {
            kept.push(name.to_string());
        }
    }
    let mut lines = Vec::new();
    if !removed.is_empty() {
        lines.push(format!("已从{}删除: {}", card.name(), removed.join(" ")));
    }
    if !kept.is_empty() {
        lines.push(format!("无法删除: {}", kept.join(" ")));
    }
    pending.output = lines.join("\n");
    pending
}

fn write(ctx: &Ctx<'_>, card: &Card, writes: &[Write<'_>], rng: &mut StdRng) -> Option<PendingRoll> {
    // Later pairs see earlier ones, so writes are previewed on a copy.
    let mut scratch = card.clone();
    let mut pending = PendingRoll::default();
    let mut changes = Vec::new();
    let mut readonly = Vec::new();

    for w in writes {
        let name = match w {
            Write::Set(name, _) | Write::Adjust(name, _) => *name,
        };
        let current = scratch.get_entry(name);
        if current.as_ref().is_some_and(|e| e.readonly) {
            readonly.push(name.to_string());
            continue;
        }
        let key = current
            .as_ref()
            .map_or_else(|| scratch.aliases().canonical(name), |e| e.key.clone());
        let old = current.as_ref().map(|e| e.base_value);
        let (value, detail) = match w {
            Write::Set(_, value) => (*value, None),
            Write::Adjust(_, expr) => {
                let expression = match old {
                    Some(_) => format!("${{{key}}}{expr}"),
                    None => format!("0{expr}"),
                };
                let (resolved, roll) = ctx.roll(&expression, &scratch, rng)?;
                (roll.total, Some(roll_text(&resolved, &roll, false)))
            }
        };
        scratch.set_entry(&key, value);
        // Special entries may clamp the write.
        let stored = scratch.get_entry(&key).map_or(value, |e| e.base_value);
        pending.effects.push(Effect::SetEntry {
            card: card.name().to_string(),
            name: key.clone(),
            value: stored,
        });
        let change = match (old, detail) {
            (Some(old), Some(detail)) => format!("{key}: {old}→{stored} ({detail})"),
            (Some(old), None) => format!("{key}: {old}→{stored}"),
            (None, Some(detail)) => format!("{key}: {stored} ({detail})"),
            (None, None) => format!("{key}: {stored}"),
        };
        changes.push(change);
    }

    let mut lines = Vec::new();
    if !changes.is_empty() {
        lines.push(format!("{}的属性已修改: {}", card.name(), changes.join(", ")));
    }
    if !readonly.is_empty() {
        lines.push(format!("计算值不能修改: {}", readonly.join(" ")));
    }
    pending.output = lines.join("\n");
    Some(pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_leading_digits() {
        assert_eq!(take_name("1环3"), ("1环", "3"));
        assert_eq!(take_name("力量+1d6"), ("力量", "+1d6"));
        assert_eq!(take_name("60"), ("", "60"));
    }

    #[test]
    fn pairs_and_adjustments() {
        assert_eq!(
            parse_writes("力量60敏捷 50 hp-1d6"),
            Some(vec![
                Write::Set("力量", 60),
                Write::Set("敏捷", 50),
                Write::Adjust("hp", "-1d6"),
            ])
        );
        assert_eq!(parse_writes("力量"), None);
        assert_eq!(parse_writes("力量+"), None);
        assert_eq!(parse_writes(""), None);
    }
}

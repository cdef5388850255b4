//! Skill growth: `en [skill[value]]`.

use rand::rngs::StdRng;
use rk_core::Card;

use super::{Ctx, lookup, roll_text, split_temp};
use crate::effect::{Effect, PendingRoll};

/// A roll above this always grows the skill.
const ALWAYS_GROWS: i64 = 95;

struct Growth<'s> {
    key: String,
    value: i64,
    /// Card the result is written to. None for temp values.
    card: Option<&'s Card>,
}

pub(crate) fn run(ctx: &Ctx<'_>, args: &str, rng: &mut StdRng) -> Option<PendingRoll> {
    let card = ctx.target();
    let who = ctx.who(card);
    let (desc, temp) = split_temp(args);

    let checks: Vec<Growth<'_>> = match (desc, temp, card) {
        ("", None, None) => {
            return Some(PendingRoll::reply(format!("{who}没有角色卡, 无法进行成长检定")));
        }
        ("", None, Some(card)) => {
            let marked = card.growth_marked_skills();
            if marked.is_empty() {
                return Some(PendingRoll::reply(format!("{who}没有标记为可成长的技能")));
            }
            marked
                .iter()
                .filter_map(|skill| card.get_entry(skill))
                .map(|e| Growth {
                    key: e.key,
                    value: e.base_value,
                    card: Some(card),
                })
                .collect()
        }
        (desc, Some(value), _) => vec![Growth {
            key: card.map_or_else(|| desc.to_string(), |c| c.aliases().canonical(desc)),
            value,
            card: None,
        }],
        (desc, None, card) => match card.and_then(|c| c.get_entry(desc).map(|e| (c, e))) {
            Some((c, e)) => vec![Growth {
                key: e.key,
                value: e.base_value,
                card: Some(c),
            }],
            None => {
                return Some(PendingRoll::reply(format!(
                    "{who}没有技能{desc}, 请在命令末尾写上技能值"
                )));
            }
        },
    };

    let mut pending = PendingRoll::default();
    let mut lines = Vec::new();
    for check in checks {
        let (resolved, roll) = ctx.roll("d100", lookup(card), rng)?;
        let shown = roll_text(&resolved, &roll, false);
        let grows = roll.total > check.value || roll.total > ALWAYS_GROWS;
        if !grows {
            lines.push(format!("{who}的{}成长检定: {shown}/{} 失败", check.key, check.value));
        } else {
            let (gain_resolved, gain) = ctx.roll("1d10", lookup(card), rng)?;
            let value = check.value + gain.total;
            lines.push(format!(
                "{who}的{}成长检定: {shown}/{} 成功, 增加{}点, 当前{value}",
                check.key,
                check.value,
                roll_text(&gain_resolved, &gain, false)
            ));
            if let Some(c) = check.card {
                pending.effects.push(Effect::SetEntry {
                    card: c.name().to_string(),
                    name: check.key.clone(),
                    value,
                });
            }
        }
        if let Some(c) = check.card {
            pending.effects.push(Effect::MarkGrowth {
                card: c.name().to_string(),
                skill: check.key,
                on: false,
            });
        }
    }
    pending.output = lines.join("\n");
    Some(pending)
}

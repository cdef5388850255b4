//! D&D death saving throws: `ds` rolls, `ds s` and `ds f` record a result
//! without rolling.

use rand::rngs::StdRng;
use rk_core::DeathSaving;

use super::{Ctx, lookup, roll_text};
use crate::effect::{Effect, PendingRoll};

/// Successes or failures that end the sequence.
const LIMIT: u8 = 3;
/// Lowest roll that counts as a success.
const SUCCESS_AT: i64 = 10;

/// The outcome of one save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Save {
    Success,
    Failure,
    /// Natural 1: two failures.
    Fumble,
    /// Natural 20: back on one hit point.
    Revive,
}

impl Save {
    fn from_roll(roll: i64) -> Self {
        match roll {
            20 => Self::Revive,
            1 => Self::Fumble,
            r if r >= SUCCESS_AT => Self::Success,
            _ => Self::Failure,
        }
    }
}

/// New counters after `save`, and the verdict if the sequence ended.
fn advance(saving: DeathSaving, save: Save) -> (DeathSaving, Option<&'static str>) {
    let mut next = saving;
    match save {
        Save::Revive => return (DeathSaving::default(), Some("恢复1点生命, 重新站了起来")),
        Save::Success => next.success = next.success.saturating_add(1),
        Save::Failure => next.failure = next.failure.saturating_add(1),
        Save::Fumble => next.failure = next.failure.saturating_add(2),
    }
    if next.failure >= LIMIT {
        (DeathSaving::default(), Some("死亡"))
    } else if next.success >= LIMIT {
        (DeathSaving::default(), Some("伤势稳定"))
    } else {
        (next, None)
    }
}

pub(crate) fn run(ctx: &Ctx<'_>, args: &str, rng: &mut StdRng) -> Option<PendingRoll> {
    let card = ctx.target();
    let who = ctx.who(card);
    let Some((card, saving)) = card.and_then(|c| c.death_saving().map(|s| (c, s))) else {
        return Some(PendingRoll::reply(format!("{who}没有D&D角色卡, 无法进行死亡豁免")));
    };

    let (save, shown) = match args.trim() {
        "" => {
            let (resolved, roll) = ctx.roll("d20", lookup(Some(card)), rng)?;
            (Save::from_roll(roll.total), roll_text(&resolved, &roll, false))
        }
        "s" => (Save::Success, "记录成功".to_string()),
        "f" => (Save::Failure, "记录失败".to_string()),
        _ => return Some(PendingRoll::reply("用法: ds / ds s / ds f")),
    };

    let (next, verdict) = advance(saving, save);
    let result = match save {
        Save::Success => "成功",
        Save::Failure => "失败",
        Save::Fumble => "大失败, 计两次失败",
        Save::Revive => "大成功",
    };
    let mut text = format!("{who}的死亡豁免: {shown} {result}");
    match verdict {
        Some(v) => text.push_str(&format!("\n{who}{v}")),
        None => text.push_str(&format!("\n成功{}/失败{}", next.success, next.failure)),
    }

    let mut pending = PendingRoll::reply(text).with_effect(Effect::SetDeathSaving {
        card: card.name().to_string(),
        saving: next,
    });
    if save == Save::Revive {
        pending.effects.push(Effect::SetEntry {
            card: card.name().to_string(),
            name: "生命".to_string(),
            value: 1,
        });
    }
    Some(pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(success: u8, failure: u8) -> DeathSaving {
        DeathSaving { success, failure }
    }

    #[test]
    fn rolls_map_to_saves() {
        assert_eq!(Save::from_roll(20), Save::Revive);
        assert_eq!(Save::from_roll(1), Save::Fumble);
        assert_eq!(Save::from_roll(10), Save::Success);
        assert_eq!(Save::from_roll(9), Save::Failure);
    }

    #[test]
    fn three_of_a_kind_resets() {
        assert_eq!(advance(counters(2, 1), Save::Success), (counters(0, 0), Some("伤势稳定")));
        assert_eq!(advance(counters(0, 1), Save::Fumble), (counters(0, 0), Some("死亡")));
        assert_eq!(advance(counters(1, 1), Save::Failure), (counters(1, 2), None));
    }

    #[test]
    fn natural_twenty_revives() {
        let (next, verdict) = advance(counters(1, 2), Save::Revive);
        assert_eq!(next, DeathSaving::default());
        assert!(verdict.is_some());
    }
}

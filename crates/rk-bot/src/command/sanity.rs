//! Sanity check: `sc<success loss>/<failure loss> [current sanity]`.

use rand::rngs::StdRng;
use rk_expr::{PredicateContext, dice, split_expression};
use rk_mechanics::TierKind;

use super::{Ctx, log_abandoned, lookup, roll_text, split_temp};
use crate::effect::{Effect, PendingRoll};

const SANITY: &str = "理智";
const USAGE: &str = "用法: sc<成功损失>/<失败损失> [当前理智], 例如 sc1/1d6";

/// Losing this much at once may trigger temporary insanity.
const TEMPORARY_INSANITY: i64 = 5;

pub(crate) fn run(ctx: &Ctx<'_>, args: &str, rng: &mut StdRng) -> Option<PendingRoll> {
    let Some((on_success, after)) = args.split_once('/') else {
        return Some(PendingRoll::reply(USAGE));
    };
    let on_success = on_success.trim();
    let (on_failure, rest) = split_expression(after.trim());
    let (_, temp) = split_temp(rest);
    if on_success.is_empty() || on_failure.is_empty() {
        return Some(PendingRoll::reply(USAGE));
    }

    let card = ctx.target();
    let who = ctx.who(card);
    let sanity = match (temp, card.and_then(|c| c.get_entry(SANITY))) {
        (Some(v), _) => v,
        (None, Some(e)) => e.value,
        (None, None) => {
            return Some(PendingRoll::reply(format!(
                "{who}没有理智值, 请先用st设置或在命令末尾写上当前理智"
            )));
        }
    };

    let kind = ctx.kind(card);
    let (resolved, check) = ctx.roll("d100", lookup(card), rng)?;
    let pctx = PredicateContext {
        base_value: sanity,
        target_value: sanity,
        roll: check.total,
    };
    let decision = ctx
        .dispatcher
        .decider()
        .decide(ctx.tiers(kind), &pctx, &[("name", who.clone())]);
    let (tier, tier_text) = match &decision {
        Some(d) => (d.kind, d.text.clone()),
        None if check.total <= sanity => (TierKind::Success, "成功".to_string()),
        None => (TierKind::Fail, "失败".to_string()),
    };

    let (loss, loss_text) = if tier == TierKind::Worst {
        let max = rk_mechanics::resolve(on_failure, lookup(card), rng, 0)
            .and_then(|r| dice::maximum(&r.expression).map_err(Into::into))
            .inspect_err(|e| log_abandoned(ctx.text, e))
            .ok()?;
        (max, format!("{on_failure}最大值{max}"))
    } else {
        let expr = if tier.is_success() { on_success } else { on_failure };
        let (resolved, roll) = ctx.roll(expr, lookup(card), rng)?;
        (roll.total, roll_text(&resolved, &roll, false))
    };
    let loss = loss.max(0);
    let remaining = (sanity - loss).max(0);

    let mut lines = vec![
        format!(
            "{who}的理智检定: {}/{sanity} {tier_text}",
            roll_text(&resolved, &check, false)
        ),
        format!("理智减少{loss_text}点, 当前{remaining}"),
    ];
    if remaining == 0 {
        lines.push("理智归零, 陷入永久性疯狂".to_string());
    } else if loss >= TEMPORARY_INSANITY {
        lines.push("单次损失理智达到5点, 请进行智力检定判断是否陷入临时性疯狂".to_string());
    }

    let mut pending = PendingRoll::reply(lines.join("\n"));
    if temp.is_none()
        && let Some(card) = card
    {
        pending.effects.push(Effect::SetEntry {
            card: card.name().to_string(),
            name: SANITY.to_string(),
            value: remaining,
        });
    }
    Some(pending)
}

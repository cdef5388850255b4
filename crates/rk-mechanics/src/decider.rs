//! Success tiers and the rule decider.
//!
//! A tier pairs a predicate over `baseValue`, `targetValue` and `roll` with a
//! reply template. The [`Decider`] walks an ordered tier list and returns the
//! first tier whose predicate holds. Compiled predicates are kept in a
//! bounded LRU keyed by their source text.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rk_expr::{ExprResult, Predicate, PredicateContext};
use serde::{Deserialize, Serialize};

use crate::error::MechError;
use crate::lru::LruCache;

/// Default number of compiled predicates kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// How a tier counts towards success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    /// A critical failure.
    Worst,
    /// An ordinary failure.
    Fail,
    /// An ordinary success.
    Success,
    /// A critical success.
    Best,
}

impl TierKind {
    /// Ordering used to compare two outcomes: worst < fail < success < best.
    pub fn rank(self) -> u8 {
        match self {
            Self::Worst => 0,
            Self::Fail => 1,
            Self::Success => 2,
            Self::Best => 3,
        }
    }

    /// Returns true for `success` and `best`.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Best)
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worst => write!(f, "worst"),
            Self::Fail => write!(f, "fail"),
            Self::Success => write!(f, "success"),
            Self::Best => write!(f, "best"),
        }
    }
}

/// One success tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeciderTier {
    /// Display name, e.g. `困难成功`.
    pub name: String,
    /// Outcome class.
    pub kind: TierKind,
    /// Predicate source.
    pub expression: String,
    /// Reply template with `{{...}}` placeholders.
    #[serde(default)]
    pub reply: String,
}

impl DeciderTier {
    /// A tier whose reply is its own name.
    pub fn new(name: impl Into<String>, kind: TierKind, expression: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            reply: name.clone(),
            name,
            kind,
            expression: expression.into(),
        }
    }

    /// Replace the reply template.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }
}

/// The tier a roll landed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Name of the matching tier.
    pub tier: String,
    /// Its outcome class.
    pub kind: TierKind,
    /// Position of the tier in the ladder it was decided from.
    pub index: usize,
    /// Shorthand for `kind.is_success()`.
    pub success: bool,
    /// The rendered reply.
    pub text: String,
}

/// The Call of Cthulhu 7th edition rulebook tiers.
pub fn coc_tiers() -> Vec<DeciderTier> {
    vec![
        DeciderTier::new("大成功", TierKind::Best, "roll == 1"),
        DeciderTier::new(
            "大失败",
            TierKind::Worst,
            "roll == 100 || (baseValue < 50 && roll > 95)",
        ),
        DeciderTier::new(
            "极难成功",
            TierKind::Success,
            "roll <= baseValue / 5 && roll <= targetValue",
        ),
        DeciderTier::new(
            "困难成功",
            TierKind::Success,
            "roll <= baseValue / 2 && roll <= targetValue",
        ),
        DeciderTier::new("成功", TierKind::Success, "roll <= targetValue"),
        DeciderTier::new("失败", TierKind::Fail, "true"),
    ]
}

/// Compiles, caches and evaluates tier predicates.
#[derive(Debug)]
pub struct Decider {
    cache: Mutex<LruCache<String, Arc<Predicate>>>,
}

impl Default for Decider {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl Decider {
    /// A decider caching up to `capacity` compiled predicates.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of compiled predicates currently cached.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    /// The compiled form of `source`, compiling on a cache miss.
    pub fn predicate(&self, source: &str) -> ExprResult<Arc<Predicate>> {
        if let Some(hit) = self.cache.lock().get(source) {
            return Ok(Arc::clone(hit));
        }
        let compiled = Arc::new(Predicate::compile(source)?);
        tracing::debug!(source, "compiled tier predicate");
        self.cache.lock().insert(source.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Run `tiers` in order against `ctx` and return the first match.
    ///
    /// A tier whose predicate fails to compile or evaluate is skipped with a
    /// warning. `extras` are additional placeholders for the reply.
    pub fn decide(
        &self,
        tiers: &[DeciderTier],
        ctx: &PredicateContext,
        extras: &[(&str, String)],
    ) -> Option<Decision> {
        for (index, tier) in tiers.iter().enumerate() {
            let outcome = self.predicate(&tier.expression).and_then(|p| p.test(ctx));
            match outcome {
                Ok(true) => {
                    return Some(Decision {
                        tier: tier.name.clone(),
                        kind: tier.kind,
                        index,
                        success: tier.kind.is_success(),
                        text: render_reply(&tier.reply, ctx, extras),
                    });
                }
                Ok(false) => {}
                Err(cause) => {
                    let err = MechError::PredicateEvaluationFailed {
                        tier: tier.name.clone(),
                        cause,
                    };
                    tracing::warn!(error = %err, "tier skipped");
                }
            }
        }
        None
    }
}

/// Substitute `{{name}}` placeholders in a reply template.
///
/// The context variables are always available; `extras` add more. Unknown
/// names render empty. An unclosed `{{` makes the whole reply empty.
pub fn render_reply(template: &str, ctx: &PredicateContext, extras: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return String::new();
        };
        let name = after[..close].trim();
        match name {
            "baseValue" => out.push_str(&ctx.base_value.to_string()),
            "targetValue" => out.push_str(&ctx.target_value.to_string()),
            "roll" => out.push_str(&ctx.roll.to_string()),
            _ => {
                if let Some((_, value)) = extras.iter().find(|(k, _)| *k == name) {
                    out.push_str(value);
                }
            }
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(base: i64, target: i64, roll: i64) -> PredicateContext {
        PredicateContext {
            base_value: base,
            target_value: target,
            roll,
        }
    }

    fn tier_of(decider: &Decider, base: i64, target: i64, roll: i64) -> String {
        decider
            .decide(&coc_tiers(), &ctx(base, target, roll), &[])
            .map(|d| d.tier)
            .unwrap_or_default()
    }

    #[test]
    fn coc_tier_boundaries() {
        let d = Decider::default();
        assert_eq!(tier_of(&d, 60, 60, 1), "大成功");
        assert_eq!(tier_of(&d, 60, 60, 12), "极难成功");
        assert_eq!(tier_of(&d, 60, 60, 13), "困难成功");
        assert_eq!(tier_of(&d, 60, 60, 30), "困难成功");
        assert_eq!(tier_of(&d, 60, 60, 31), "成功");
        assert_eq!(tier_of(&d, 60, 60, 61), "失败");
        assert_eq!(tier_of(&d, 60, 60, 99), "失败");
        assert_eq!(tier_of(&d, 60, 60, 100), "大失败");
        assert_eq!(tier_of(&d, 40, 40, 96), "大失败");
    }

    #[test]
    fn hard_difficulty_uses_target() {
        // 困难侦察 with 侦察 40: target 20, base 40.
        let d = Decider::default();
        assert_eq!(tier_of(&d, 40, 20, 21), "失败");
        assert_eq!(tier_of(&d, 40, 20, 20), "困难成功");
    }

    #[test]
    fn extreme_difficulty_uses_target() {
        // 极难侦察 with 侦察 40: target 8, base 40.
        let d = Decider::default();
        for (roll, tier) in [
            (8, "极难成功"),
            (9, "失败"),
            (15, "失败"),
            (20, "失败"),
            (21, "失败"),
        ] {
            assert_eq!(tier_of(&d, 40, 8, roll), tier, "roll {roll}");
        }
        let decision = d.decide(&coc_tiers(), &ctx(40, 8, 15), &[]).unwrap();
        assert!(!decision.success);
    }

    #[test]
    fn hard_difficulty_caps_every_success_tier() {
        // A hard target still allows an extreme success below base / 5.
        let d = Decider::default();
        assert_eq!(tier_of(&d, 60, 30, 12), "极难成功");
        assert_eq!(tier_of(&d, 60, 30, 30), "困难成功");
        assert_eq!(tier_of(&d, 60, 30, 31), "失败");
    }

    #[test]
    fn decision_records_ladder_position() {
        let d = Decider::default();
        let extreme = d.decide(&coc_tiers(), &ctx(60, 60, 5), &[]).unwrap();
        let regular = d.decide(&coc_tiers(), &ctx(60, 60, 50), &[]).unwrap();
        assert_eq!(extreme.index, 2);
        assert_eq!(regular.index, 4);
    }

    #[test]
    fn no_tier_is_no_decision() {
        let d = Decider::default();
        let tiers = vec![DeciderTier::new("only", TierKind::Success, "roll < 0")];
        assert_eq!(d.decide(&tiers, &ctx(50, 50, 10), &[]), None);
        assert_eq!(d.decide(&[], &ctx(50, 50, 10), &[]), None);
    }

    #[test]
    fn failing_predicate_is_skipped() {
        let d = Decider::default();
        let tiers = vec![
            DeciderTier::new("broken", TierKind::Best, "roll / 0 == 1"),
            DeciderTier::new("syntax", TierKind::Best, "roll <="),
            DeciderTier::new("unknown", TierKind::Best, "luck > 1"),
            DeciderTier::new("fallback", TierKind::Fail, "true"),
        ];
        let decision = d.decide(&tiers, &ctx(50, 50, 10), &[]).unwrap();
        assert_eq!(decision.tier, "fallback");
        assert!(!decision.success);
    }

    #[test]
    fn predicates_are_cached_by_source() {
        let d = Decider::new(2);
        let a = d.predicate("roll > 1").unwrap();
        let b = d.predicate("roll > 1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        d.predicate("roll > 2").unwrap();
        d.predicate("roll > 3").unwrap();
        assert_eq!(d.cached(), 2);
        let c = d.predicate("roll > 1").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn reply_placeholders() {
        let c = ctx(60, 30, 25);
        let extras = [("name", "调查员".to_string())];
        assert_eq!(
            render_reply("{{name}}: {{roll}}/{{targetValue}} ({{ baseValue }})", &c, &extras),
            "调查员: 25/30 (60)"
        );
        assert_eq!(render_reply("a{{missing}}b", &c, &[]), "ab");
        assert_eq!(render_reply("oops {{roll", &c, &[]), "");
    }

    #[test]
    fn rank_orders_outcomes() {
        assert!(TierKind::Worst.rank() < TierKind::Fail.rank());
        assert!(TierKind::Fail.rank() < TierKind::Success.rank());
        assert!(TierKind::Success.rank() < TierKind::Best.rank());
    }
}

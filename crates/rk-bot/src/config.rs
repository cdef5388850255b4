//! Channel configuration.
//!
//! A [`ChannelConfig`] is plain data, usually read from a TOML file.
//! [`ChannelConfig::compile`] turns it into a [`Dispatcher`], dropping any
//! alias rule that does not compile. [`ChannelConfig::problems`] reports
//! everything that would be dropped or ignored.

use serde::{Deserialize, Serialize};

use rk_core::{AliasRegistry, CardKind};
use rk_expr::{DiceExpr, Predicate};
use rk_mechanics::{AliasRule, DeciderTier, MechError, RuleSpec, coc_tiers, decider};

use crate::dispatch::Dispatcher;
use crate::error::BotError;
use crate::state::opposed;

/// Who may change card values with `st`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatWritePolicy {
    /// Nobody.
    None,
    /// Channel managers only.
    Managers,
    /// Everyone.
    #[default]
    Anyone,
}

impl StatWritePolicy {
    /// Whether a user with the given manager flag may write.
    pub fn allows(self, is_manager: bool) -> bool {
        match self {
            Self::None => false,
            Self::Managers => is_manager,
            Self::Anyone => true,
        }
    }
}

/// Settings for one card system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Extra synonym groups, added after the built-in ones.
    pub alias_groups: Vec<Vec<String>>,
    /// Success tiers. `None` uses the system's built-in tiers.
    pub tiers: Option<Vec<DeciderTier>>,
}

/// Which special commands are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandToggles {
    /// `sc`
    pub sanity: bool,
    /// `en`
    pub growth: bool,
    /// `ri` and `init`
    pub initiative: bool,
    /// `st`
    pub stat: bool,
    /// `ds`
    pub death_save: bool,
    /// `pc`
    pub card_link: bool,
}

impl Default for CommandToggles {
    fn default() -> Self {
        Self {
            sanity: true,
            growth: true,
            initiative: true,
            stat: true,
            death_save: true,
            card_link: true,
        }
    }
}

/// Configuration of one chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// The system used when no card is involved.
    pub system: CardKind,
    /// Expression rolled by a bare `r`.
    pub default_roll: String,
    /// User-defined alias rules, highest priority first.
    pub alias_rules: Vec<RuleSpec>,
    /// Include the built-in rules of the channel's system (CoC bonus and
    /// penalty dice).
    pub builtin_rules: bool,
    /// Call of Cthulhu settings.
    pub coc: SystemConfig,
    /// D&D settings.
    pub dnd: SystemConfig,
    /// Settings for free-form cards.
    pub general: SystemConfig,
    /// Enabled special commands.
    pub commands: CommandToggles,
    /// Expression rolled by a bare `ri`.
    pub initiative_default: String,
    /// Who may change values with `st`.
    pub stat_write: StatWritePolicy,
    /// Seconds an opposable roll stays available.
    pub opposed_ttl_secs: u64,
    /// Opposable rolls kept per channel.
    pub opposed_capacity: usize,
    /// Compiled tier predicates kept in memory.
    pub predicate_cache: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            system: CardKind::Coc,
            default_roll: "d100".to_string(),
            alias_rules: Vec::new(),
            builtin_rules: true,
            coc: SystemConfig::default(),
            dnd: SystemConfig::default(),
            general: SystemConfig::default(),
            commands: CommandToggles::default(),
            initiative_default: "d20".to_string(),
            stat_write: StatWritePolicy::default(),
            opposed_ttl_secs: opposed::DEFAULT_TTL_SECS,
            opposed_capacity: opposed::DEFAULT_CAPACITY,
            predicate_cache: decider::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Something in a configuration that will be dropped or ignored.
#[derive(Debug)]
pub struct ConfigProblem {
    /// Where it is, e.g. `coc.tiers[2]`.
    pub location: String,
    /// The offending text.
    pub text: String,
    /// What is wrong with it.
    pub error: BotError,
}

impl ChannelConfig {
    /// Set the channel's system.
    pub fn with_system(mut self, system: CardKind) -> Self {
        self.system = system;
        self
    }

    /// Set the expression rolled by a bare `r`.
    pub fn with_default_roll(mut self, expression: impl Into<String>) -> Self {
        self.default_roll = expression.into();
        self
    }

    /// Append an alias rule.
    pub fn with_rule(mut self, rule: RuleSpec) -> Self {
        self.alias_rules.push(rule);
        self
    }

    /// Replace the tiers of one system.
    pub fn with_tiers(mut self, kind: CardKind, tiers: Vec<DeciderTier>) -> Self {
        self.system_mut(kind).tiers = Some(tiers);
        self
    }

    /// Add a synonym group to one system.
    pub fn with_alias_group<S: Into<String>>(
        mut self,
        kind: CardKind,
        group: impl IntoIterator<Item = S>,
    ) -> Self {
        self.system_mut(kind)
            .alias_groups
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    /// Set the `st` write policy.
    pub fn with_stat_write(mut self, policy: StatWritePolicy) -> Self {
        self.stat_write = policy;
        self
    }

    /// Set the opposed-roll lifetime.
    pub fn with_opposed_ttl(mut self, secs: u64) -> Self {
        self.opposed_ttl_secs = secs;
        self
    }

    /// Enable or disable special commands.
    pub fn with_commands(mut self, commands: CommandToggles) -> Self {
        self.commands = commands;
        self
    }

    /// Settings of one system.
    pub fn system_config(&self, kind: CardKind) -> &SystemConfig {
        match kind {
            CardKind::Coc => &self.coc,
            CardKind::Dnd => &self.dnd,
            CardKind::General => &self.general,
        }
    }

    fn system_mut(&mut self, kind: CardKind) -> &mut SystemConfig {
        match kind {
            CardKind::Coc => &mut self.coc,
            CardKind::Dnd => &mut self.dnd,
            CardKind::General => &mut self.general,
        }
    }

    /// The tiers used for checks against a card of `kind`.
    ///
    /// Call of Cthulhu and free-form cards default to the CoC rulebook
    /// tiers. D&D has none, since its checks have no fixed target.
    pub fn tiers(&self, kind: CardKind) -> Vec<DeciderTier> {
        match (&self.system_config(kind).tiers, kind) {
            (Some(tiers), _) => tiers.clone(),
            (None, CardKind::Dnd) => Vec::new(),
            (None, CardKind::Coc | CardKind::General) => coc_tiers(),
        }
    }

    /// Alias tables for every system, built-ins plus configured groups.
    pub fn alias_registry(&self) -> AliasRegistry {
        [CardKind::General, CardKind::Coc, CardKind::Dnd]
            .into_iter()
            .fold(AliasRegistry::builtin(), |registry, kind| {
                registry.with_groups(kind, self.system_config(kind).alias_groups.clone())
            })
    }

    /// Compiled alias rules, in priority order. Rules that fail to compile
    /// are dropped with a warning.
    pub fn rules(&self) -> Vec<AliasRule> {
        let mut rules: Vec<AliasRule> = self
            .alias_rules
            .iter()
            .filter_map(|spec| match AliasRule::compile(spec) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(rule = %spec.id, error = %e, "alias rule dropped");
                    None
                }
            })
            .collect();
        if self.builtin_rules && self.system == CardKind::Coc {
            match rk_mechanics::rewrite::coc_rules() {
                Ok(builtin) => rules.extend(builtin),
                Err(e) => tracing::warn!(error = %e, "built-in alias rules unavailable"),
            }
        }
        rules
    }

    /// Build the dispatcher for this channel.
    pub fn compile(&self) -> Dispatcher {
        Dispatcher::new(self.clone())
    }

    /// Every rule, tier and expression that fails to compile.
    pub fn problems(&self) -> Vec<ConfigProblem> {
        let mut problems = Vec::new();

        for (i, spec) in self.alias_rules.iter().enumerate() {
            if let Err(e) = AliasRule::compile(spec) {
                problems.push(ConfigProblem {
                    location: format!("alias_rules[{i}] ({})", spec.id),
                    text: format!("{:?}", spec.trigger),
                    error: e.into(),
                });
            }
        }

        for kind in [CardKind::Coc, CardKind::Dnd, CardKind::General] {
            let Some(tiers) = &self.system_config(kind).tiers else {
                continue;
            };
            for (i, tier) in tiers.iter().enumerate() {
                if let Err(cause) = Predicate::compile(&tier.expression) {
                    problems.push(ConfigProblem {
                        location: format!("{kind}.tiers[{i}] ({})", tier.name),
                        text: tier.expression.clone(),
                        error: MechError::PredicateEvaluationFailed {
                            tier: tier.name.clone(),
                            cause,
                        }
                        .into(),
                    });
                }
            }
        }

        for (location, text) in [
            ("default_roll", &self.default_roll),
            ("initiative_default", &self.initiative_default),
        ] {
            if let Err(e) = DiceExpr::parse(text) {
                problems.push(ConfigProblem {
                    location: location.to_string(),
                    text: text.clone(),
                    error: MechError::UnparseableExpression(e).into(),
                });
            }
        }

        if self.opposed_capacity == 0 || self.predicate_cache == 0 {
            problems.push(ConfigProblem {
                location: "opposed_capacity / predicate_cache".to_string(),
                text: format!("{} / {}", self.opposed_capacity, self.predicate_cache),
                error: BotError::Config("cache capacities must be positive; 1 is used instead".to_string()),
            });
        }

        problems
    }
}

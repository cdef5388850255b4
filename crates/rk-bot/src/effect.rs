//! Deferred side effects of a command.
//!
//! Commands never touch cards or channel state while they run. They return a
//! [`PendingRoll`] listing what should change, and the host decides whether
//! to [`apply`](PendingRoll::apply) it. Previewing and committing a roll go
//! through the same code.

use std::collections::BTreeSet;

use rk_core::{CardData, DeathSaving};

use crate::provider::CardProvider;
use crate::state::{CachedRoll, ChannelState};

/// One deferred change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write a numeric entry.
    SetEntry {
        /// Card name.
        card: String,
        /// Entry name, any synonym.
        name: String,
        /// New value.
        value: i64,
    },
    /// Remove an open-category entry.
    RemoveEntry {
        /// Card name.
        card: String,
        /// Entry name.
        name: String,
    },
    /// Write an ability expression.
    SetAbility {
        /// Card name.
        card: String,
        /// Ability name.
        name: String,
        /// Dice expression.
        expression: String,
    },
    /// Remove an ability.
    RemoveAbility {
        /// Card name.
        card: String,
        /// Ability name.
        name: String,
    },
    /// Set or clear a CoC skill-growth flag.
    MarkGrowth {
        /// Card name.
        card: String,
        /// Skill name.
        skill: String,
        /// Flag value.
        on: bool,
    },
    /// Overwrite D&D death saving counters.
    SetDeathSaving {
        /// Card name.
        card: String,
        /// New counters.
        saving: DeathSaving,
    },
    /// Add or replace an initiative entry.
    InitiativeAdd {
        /// Combatant name.
        name: String,
        /// Rolled value.
        value: i64,
    },
    /// Remove an initiative entry.
    InitiativeRemove {
        /// Combatant name.
        name: String,
    },
    /// Empty the initiative list.
    InitiativeClear,
    /// Link a user to a card.
    Link {
        /// User id.
        user: String,
        /// Card name.
        card: String,
    },
    /// Unlink a user.
    Unlink {
        /// User id.
        user: String,
    },
}

impl Effect {
    /// The card this effect writes, if any.
    pub fn card(&self) -> Option<&str> {
        match self {
            Self::SetEntry { card, .. }
            | Self::RemoveEntry { card, .. }
            | Self::SetAbility { card, .. }
            | Self::RemoveAbility { card, .. }
            | Self::MarkGrowth { card, .. }
            | Self::SetDeathSaving { card, .. } => Some(card),
            _ => None,
        }
    }
}

/// A command that has run but whose effects are not yet applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRoll {
    /// Text for the channel.
    pub output: String,
    /// Text for the sender only (hidden rolls).
    pub private_output: Option<String>,
    /// Changes to make on apply.
    pub effects: Vec<Effect>,
    /// A roll the host may cache for opposing.
    pub opposed: Option<CachedRoll>,
}

/// The applied outcome of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct RollResult {
    /// Text for the channel.
    pub output: String,
    /// Text for the sender only.
    pub private_output: Option<String>,
    /// Snapshots of every card that changed, for persistence.
    pub applied_cards: Vec<CardData>,
    /// A roll the host may cache under the id of the message it sends.
    pub opposed: Option<CachedRoll>,
}

impl PendingRoll {
    /// A command result with output only.
    pub fn reply(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// Add an effect.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Make every effect happen and snapshot the cards that changed.
    pub fn apply(self, cards: &mut dyn CardProvider, channel: &mut ChannelState) -> RollResult {
        let mut changed = BTreeSet::new();
        for effect in &self.effects {
            if apply_one(effect, cards, channel)
                && let Some(card) = effect.card()
            {
                changed.insert(card.to_string());
            }
        }
        let applied_cards: Vec<CardData> = changed
            .iter()
            .filter_map(|name| cards.card_by_name(name))
            .map(|c| c.data().clone())
            .collect();
        if !self.effects.is_empty() {
            tracing::info!(
                effects = self.effects.len(),
                cards = applied_cards.len(),
                "applied command effects"
            );
        }
        RollResult {
            output: self.output,
            private_output: self.private_output,
            applied_cards,
            opposed: self.opposed,
        }
    }
}

/// Apply one effect. Returns true if anything changed.
fn apply_one(effect: &Effect, cards: &mut dyn CardProvider, channel: &mut ChannelState) -> bool {
    match effect {
        Effect::InitiativeAdd { name, value } => {
            channel.initiative.add(name.clone(), *value);
            true
        }
        Effect::InitiativeRemove { name } => channel.initiative.remove(name),
        Effect::InitiativeClear => {
            let had = !channel.initiative.is_empty();
            channel.initiative.clear();
            had
        }
        Effect::Link { user, card } => cards.link(user, card),
        Effect::Unlink { user } => cards.unlink(user),
        card_effect => {
            let Some(name) = card_effect.card() else {
                return false;
            };
            let Some(card) = cards.card_by_name_mut(name) else {
                tracing::warn!(card = name, "effect targets a missing card");
                return false;
            };
            match card_effect {
                Effect::SetEntry { name, value, .. } => card.set_entry(name, *value),
                Effect::RemoveEntry { name, .. } => card.remove_entry(name),
                Effect::SetAbility { name, expression, .. } => card.set_ability(name, expression),
                Effect::RemoveAbility { name, .. } => card.remove_ability(name),
                Effect::MarkGrowth { skill, on, .. } => card.mark_growth(skill, *on),
                Effect::SetDeathSaving { saving, .. } => card.set_death_saving(*saving),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryCards;
    use rk_core::{AliasRegistry, CocCard, DndCard};

    fn cards() -> MemoryCards {
        MemoryCards::from_data(
            [
                CardData::Coc(CocCard::new("Alice")),
                CardData::Dnd(DndCard::new("Bren")),
            ],
            &AliasRegistry::builtin(),
        )
        .unwrap()
    }

    #[test]
    fn card_effects_snapshot_changed_cards() {
        let mut cards = cards();
        let mut channel = ChannelState::default();
        let pending = PendingRoll::reply("ok")
            .with_effect(Effect::SetEntry {
                card: "Alice".into(),
                name: "侦察".into(),
                value: 60,
            })
            .with_effect(Effect::MarkGrowth {
                card: "Alice".into(),
                skill: "侦察".into(),
                on: true,
            });
        let result = pending.apply(&mut cards, &mut channel);
        assert_eq!(result.output, "ok");
        assert_eq!(result.applied_cards.len(), 1);
        assert_eq!(result.applied_cards[0].header().name, "Alice");
        let alice = cards.card_by_name("Alice").unwrap();
        assert_eq!(alice.get_entry("侦察").unwrap().value, 60);
        assert!(alice.is_growth_marked("spot hidden"));
    }

    #[test]
    fn no_op_effects_do_not_snapshot() {
        let mut cards = cards();
        let mut channel = ChannelState::default();
        let result = PendingRoll::reply("x")
            .with_effect(Effect::RemoveEntry {
                card: "Alice".into(),
                name: "不存在".into(),
            })
            .with_effect(Effect::SetEntry {
                card: "Ghost".into(),
                name: "hp".into(),
                value: 1,
            })
            .apply(&mut cards, &mut channel);
        assert!(result.applied_cards.is_empty());
    }

    #[test]
    fn channel_effects() {
        let mut cards = cards();
        let mut channel = ChannelState::default();
        PendingRoll::default()
            .with_effect(Effect::InitiativeAdd {
                name: "goblin".into(),
                value: 12,
            })
            .with_effect(Effect::Link {
                user: "u1".into(),
                card: "Bren".into(),
            })
            .with_effect(Effect::SetDeathSaving {
                card: "Bren".into(),
                saving: DeathSaving { success: 1, failure: 0 },
            })
            .apply(&mut cards, &mut channel);
        assert_eq!(channel.initiative.len(), 1);
        assert_eq!(cards.linked("u1"), Some("Bren"));
        assert_eq!(cards.card("u1").unwrap().death_saving().unwrap().success, 1);
    }
}

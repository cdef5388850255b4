//! The special-command state machines.
//!
//! Every command reads the same [`Ctx`] and returns a [`PendingRoll`]. None
//! of them writes anything: card and channel changes go into the pending
//! roll's effect list.

pub(crate) mod card_link;
pub(crate) mod death_save;
pub(crate) mod growth;
pub(crate) mod initiative;
pub(crate) mod roll;
pub(crate) mod sanity;
pub(crate) mod stat;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rk_core::{Card, CardKind};
use rk_expr::DiceRoll;
use rk_mechanics::{DeciderTier, MechError, NoCard, ReferenceLookup, Resolved};

use crate::dispatch::Dispatcher;
use crate::provider::CardProvider;
use crate::request::RollRequest;
use crate::state::ChannelState;

/// Everything a command may read.
pub(crate) struct Ctx<'a> {
    pub dispatcher: &'a Dispatcher,
    pub request: &'a RollRequest,
    pub cards: &'a dyn CardProvider,
    pub channel: &'a ChannelState,
    /// Mentioned user ids: the request's first, then any typed `@id`.
    pub mentions: Vec<String>,
    /// The normalized command, for logs.
    pub text: &'a str,
    /// The command before ASCII lowercasing.
    pub cased: &'a str,
    pub now: DateTime<Utc>,
}

impl<'a> Ctx<'a> {
    /// The first mentioned user's card, else the sender's.
    pub fn target(&self) -> Option<&'a Card> {
        let cards = self.cards;
        self.mentions
            .iter()
            .find_map(|id| cards.card(id))
            .or_else(|| cards.card(&self.request.user.id))
    }

    /// The sender's own card, ignoring mentions.
    pub fn own_card(&self) -> Option<&'a Card> {
        self.cards.card(&self.request.user.id)
    }

    /// How to address the roller: the card name, else the sender's name.
    pub fn who(&self, card: Option<&Card>) -> String {
        card.map_or_else(|| self.request.user.name.clone(), |c| c.name().to_string())
    }

    /// The system rules apply under.
    pub fn kind(&self, card: Option<&Card>) -> CardKind {
        card.map_or(self.dispatcher.config().system, Card::kind)
    }

    /// `part` of the lowercased command with its original letter case.
    /// Falls back to `part` when a rewrite changed the text.
    pub fn verbatim(&self, part: &str) -> String {
        let lower = self.cased.to_ascii_lowercase();
        match lower.rfind(part) {
            Some(at) => self.cased[at..at + part.len()].to_string(),
            None => part.to_string(),
        }
    }

    pub fn tiers(&self, kind: CardKind) -> &'a [DeciderTier] {
        self.dispatcher.tiers(kind)
    }

    /// Resolve and roll, logging and swallowing failures.
    pub fn roll(
        &self,
        expression: &str,
        lookup: &dyn ReferenceLookup,
        rng: &mut StdRng,
    ) -> Option<(Resolved, DiceRoll)> {
        rk_mechanics::resolve_and_roll(expression, lookup, rng)
            .inspect_err(|e| log_abandoned(self.text, e))
            .ok()
    }
}

/// What `$name` references resolve against.
pub(crate) fn lookup(card: Option<&Card>) -> &dyn ReferenceLookup {
    match card {
        Some(c) => c,
        None => &NoCard,
    }
}

pub(crate) fn log_abandoned(command: &str, err: &MechError) {
    match err {
        MechError::ResolutionTooDeep { depth } => tracing::warn!(
            command,
            depth,
            "resolution too deep; an ability or alias rule probably refers to itself"
        ),
        _ => tracing::debug!(command, error = %err, "command abandoned"),
    }
}

/// The roll as shown to users. Quiet rolls show only the total. Visible
/// sub-rolls follow in parentheses.
pub(crate) fn roll_text(resolved: &Resolved, roll: &DiceRoll, quiet: bool) -> String {
    if quiet {
        return roll.total.to_string();
    }
    let subs: Vec<String> = resolved
        .history
        .iter()
        .filter(|s| !s.hidden)
        .map(ToString::to_string)
        .collect();
    if subs.is_empty() {
        roll.to_string()
    } else {
        format!("{roll} ({})", subs.join(", "))
    }
}

/// Split a trailing number off a description: `侦察50` is `("侦察", 50)`.
pub(crate) fn split_temp(text: &str) -> (&str, Option<i64>) {
    let text = text.trim();
    let digits = text.bytes().rev().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (text, None);
    }
    let (head, tail) = text.split_at(text.len() - digits);
    match tail.parse() {
        Ok(n) => (head.trim_end(), Some(n)),
        Err(_) => (text, None),
    }
}

/// A value with its sign kept readable inside an expression.
pub(crate) fn signed(n: i64) -> String {
    if n < 0 { n.to_string() } else { format!("+{n}") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_values() {
        assert_eq!(split_temp("侦察50"), ("侦察", Some(50)));
        assert_eq!(split_temp("侦察 50 "), ("侦察", Some(50)));
        assert_eq!(split_temp("侦察"), ("侦察", None));
        assert_eq!(split_temp("60"), ("", Some(60)));
        assert_eq!(split_temp("x99999999999999999999"), ("x99999999999999999999", None));
    }

    #[test]
    fn signs() {
        assert_eq!(signed(3), "+3");
        assert_eq!(signed(0), "+0");
        assert_eq!(signed(-2), "-2");
    }
}

//! Command detection and dispatch.
//!
//! A raw chat message goes through:
//!
//! 1. normalization (trim, strip the leading command mark, lowercase ASCII),
//! 2. command-scope alias rewriting,
//! 3. detection of the command keyword,
//! 4. the command's own parser and state machine.
//!
//! [`Dispatcher::dispatch`] stops there and returns a [`PendingRoll`].
//! [`Dispatcher::resolve_and_roll`] also applies it.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rk_core::{AliasRegistry, CardKind};
use rk_mechanics::{Decider, DeciderTier, Rewriter};

use crate::command::{self, Ctx, roll::RollFlags};
use crate::config::ChannelConfig;
use crate::effect::{PendingRoll, RollResult};
use crate::provider::CardProvider;
use crate::request::RollRequest;
use crate::state::ChannelState;

/// Marks a message may start with.
const COMMAND_MARKS: [char; 3] = ['.', '。', '/'];

/// A detected command and the text after its keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'t> {
    Sanity(&'t str),
    Growth(&'t str),
    InitiativeAdd(&'t str),
    InitiativeList(&'t str),
    Stat(&'t str),
    DeathSave(&'t str),
    CardLink(&'t str),
    Roll(RollFlags, &'t str),
}

impl<'t> Command<'t> {
    fn detect(text: &'t str) -> Self {
        // Checked before the bare `r` roll.
        let keywords: [(&str, fn(&'t str) -> Self); 7] = [
            ("sc", Self::Sanity),
            ("en", Self::Growth),
            ("init", Self::InitiativeList),
            ("ri", Self::InitiativeAdd),
            ("st", Self::Stat),
            ("ds", Self::DeathSave),
            ("pc", Self::CardLink),
        ];
        for (keyword, make) in keywords {
            if let Some(rest) = text.strip_prefix(keyword)
                && !rest.starts_with(|c: char| c.is_ascii_alphabetic())
            {
                return make(rest);
            }
        }
        match text.strip_prefix('r') {
            Some(rest) => {
                let (flags, rest) = command::roll::parse_flags(rest);
                Self::Roll(flags, rest)
            }
            None => Self::Roll(RollFlags::default(), text),
        }
    }

    fn enabled(self, config: &ChannelConfig) -> bool {
        let on = &config.commands;
        match self {
            Self::Sanity(_) => on.sanity,
            Self::Growth(_) => on.growth,
            Self::InitiativeAdd(_) | Self::InitiativeList(_) => on.initiative,
            Self::Stat(_) => on.stat,
            Self::DeathSave(_) => on.death_save,
            Self::CardLink(_) => on.card_link,
            Self::Roll(..) => true,
        }
    }
}

/// Strip surrounding whitespace and one leading command mark.
fn strip_mark(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix(COMMAND_MARKS).unwrap_or(text).trim_start()
}

/// Lowercase ASCII letters, except an `F` right after `d` (fudge dice).
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_d = false;
    for c in strip_mark(text).chars() {
        let lower = if c == 'F' && after_d { c } else { c.to_ascii_lowercase() };
        after_d = lower == 'd';
        out.push(lower);
    }
    out
}

/// Pull `@id` tokens out of `text`. Returns the ids in order and the text
/// without them.
fn split_mentions(text: &str) -> (Vec<String>, String) {
    if !text.contains('@') {
        return (Vec::new(), text.to_string());
    }
    let mut ids = Vec::new();
    let mut words = Vec::new();
    for word in text.split_whitespace() {
        match word.strip_prefix('@') {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => words.push(word),
        }
    }
    (ids, words.join(" "))
}

/// A compiled channel configuration, ready to run commands.
///
/// Holds no per-channel state, so one dispatcher may serve many channels
/// and threads.
#[derive(Debug)]
pub struct Dispatcher {
    config: ChannelConfig,
    registry: AliasRegistry,
    rewriter: Rewriter,
    decider: Decider,
    coc_tiers: Vec<DeciderTier>,
    dnd_tiers: Vec<DeciderTier>,
    general_tiers: Vec<DeciderTier>,
}

impl Dispatcher {
    /// Compile `config`. Invalid alias rules are dropped with a warning.
    pub fn new(config: ChannelConfig) -> Self {
        let dispatcher = Self {
            registry: config.alias_registry(),
            rewriter: Rewriter::new(config.rules()),
            decider: Decider::new(config.predicate_cache),
            coc_tiers: config.tiers(CardKind::Coc),
            dnd_tiers: config.tiers(CardKind::Dnd),
            general_tiers: config.tiers(CardKind::General),
            config,
        };
        tracing::debug!(
            system = %dispatcher.config.system,
            rules = dispatcher.rewriter.len(),
            "dispatcher compiled"
        );
        dispatcher
    }

    /// The configuration this dispatcher was built from.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Alias tables for building cards that match this channel.
    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    /// Compiled alias rules.
    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    /// The shared predicate cache.
    pub fn decider(&self) -> &Decider {
        &self.decider
    }

    /// Decider tiers for checks against a card of `kind`.
    pub fn tiers(&self, kind: CardKind) -> &[DeciderTier] {
        match kind {
            CardKind::Coc => &self.coc_tiers,
            CardKind::Dnd => &self.dnd_tiers,
            CardKind::General => &self.general_tiers,
        }
    }

    /// Fresh channel state sized by the configuration.
    pub fn channel_state(&self) -> ChannelState {
        ChannelState::new(self.config.opposed_capacity, self.config.opposed_ttl_secs)
    }

    /// Run a command without applying anything.
    ///
    /// Returns `None` when the command is abandoned: a disabled command, an
    /// unparseable expression, or a resolution that recursed too deep.
    pub fn dispatch(
        &self,
        raw: &str,
        request: &RollRequest,
        cards: &dyn CardProvider,
        channel: &ChannelState,
        rng: &mut StdRng,
    ) -> Option<PendingRoll> {
        self.dispatch_at(raw, request, cards, channel, rng, Utc::now())
    }

    /// [`dispatch`](Self::dispatch) at a fixed time.
    pub fn dispatch_at(
        &self,
        raw: &str,
        request: &RollRequest,
        cards: &dyn CardProvider,
        channel: &ChannelState,
        rng: &mut StdRng,
        now: DateTime<Utc>,
    ) -> Option<PendingRoll> {
        let (typed, cased) = split_mentions(strip_mark(raw));
        let normalized = normalize(&cased);
        let text = self
            .rewriter
            .rewrite_command(&normalized)
            .inspect_err(|e| command::log_abandoned(&normalized, e))
            .ok()?;

        let detected = Command::detect(&text);
        if !detected.enabled(&self.config) {
            tracing::debug!(command = %text, "command disabled in this channel");
            return None;
        }

        let mut mentions = request.mentions.clone();
        mentions.extend(typed);
        let ctx = Ctx {
            dispatcher: self,
            request,
            cards,
            channel,
            mentions,
            text: &text,
            cased: &cased,
            now,
        };
        let pending = match detected {
            Command::Sanity(args) => command::sanity::run(&ctx, args, rng),
            Command::Growth(args) => command::growth::run(&ctx, args, rng),
            Command::InitiativeAdd(args) => command::initiative::add(&ctx, args, rng),
            Command::InitiativeList(args) => Some(command::initiative::list(&ctx, args)),
            Command::Stat(args) => command::stat::run(&ctx, args, rng),
            Command::DeathSave(args) => command::death_save::run(&ctx, args, rng),
            Command::CardLink(args) => Some(command::card_link::run(&ctx, args)),
            Command::Roll(flags, args) => command::roll::run(&ctx, flags, args, rng),
        };
        if pending.is_none() {
            tracing::debug!(command = %text, "command produced no result");
        }
        pending
    }

    /// Run a command and apply its effects.
    pub fn resolve_and_roll(
        &self,
        raw: &str,
        request: &RollRequest,
        cards: &mut dyn CardProvider,
        channel: &mut ChannelState,
        rng: &mut StdRng,
    ) -> Option<RollResult> {
        let now = Utc::now();
        channel.opposed.purge_expired(now);
        let pending = self.dispatch_at(raw, request, &*cards, &*channel, rng, now)?;
        Some(pending.apply(cards, channel))
    }
}

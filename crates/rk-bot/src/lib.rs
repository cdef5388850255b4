//! Chat-channel command handling for Rollkeeper.
//!
//! A host (chat bot, CLI) builds a [`Dispatcher`] from a [`ChannelConfig`],
//! keeps a [`ChannelState`] per channel and a [`CardProvider`] for cards,
//! and passes every message through [`Dispatcher::resolve_and_roll`].
//!
//! Supported commands: standard rolls with hidden, quiet, opposed and
//! repeated variants, CoC sanity checks and skill growth, initiative, card
//! values (`st`), D&D death saving throws and card links.

mod command;
pub mod config;
pub mod dispatch;
pub mod effect;
pub mod error;
pub mod provider;
pub mod request;
pub mod state;

pub use config::{ChannelConfig, CommandToggles, ConfigProblem, StatWritePolicy};
pub use dispatch::{Dispatcher, normalize};
pub use effect::{Effect, PendingRoll, RollResult};
pub use error::{BotError, BotResult};
pub use provider::{CardFile, CardProvider, MemoryCards};
pub use request::{RollRequest, UserInfo};
pub use state::{CachedRoll, ChannelState, Contest, InitiativeList};

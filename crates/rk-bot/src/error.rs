//! Error types for the dice bot.

use thiserror::Error;

use rk_core::CoreError;
use rk_mechanics::MechError;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// Errors raised while loading configuration or cards.
///
/// Command handling never returns these: a command that cannot be run is
/// abandoned and logged instead.
#[derive(Debug, Error)]
pub enum BotError {
    /// The channel configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A rule, tier or expression in the configuration failed to compile.
    #[error("{0}")]
    Mechanics(#[from] MechError),

    /// Card data could not be loaded.
    #[error("{0}")]
    Card(#[from] CoreError),
}

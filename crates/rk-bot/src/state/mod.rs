//! Per-channel state that outlives a single command.

pub mod initiative;
pub mod opposed;

pub use initiative::{InitiativeEntry, InitiativeList};
pub use opposed::{CachedRoll, Contest, OpposedCache};

/// State shared by every command in one channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    /// Initiative order.
    pub initiative: InitiativeList,
    /// Rolls awaiting an opposing roll, keyed by message id.
    pub opposed: OpposedCache,
}

impl ChannelState {
    /// State with an opposed-roll cache of the given size and lifetime.
    pub fn new(opposed_capacity: usize, opposed_ttl_secs: u64) -> Self {
        Self {
            initiative: InitiativeList::new(),
            opposed: OpposedCache::new(opposed_capacity, opposed_ttl_secs),
        }
    }
}

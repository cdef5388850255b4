//! Core types for Rollkeeper: alias tables and the character-card model.
//!
//! This crate is independent of dice evaluation. A [`Card`] can be built from
//! persisted [`CardData`] and queried for entries and abilities by any of
//! their synonyms.

/// Synonym groups and the per-system alias registry.
pub mod alias;
/// The card model: card data, entries, abilities, and per-system lookup.
pub mod card;
/// Error types used throughout the crate.
pub mod error;

/// Re-export alias types.
pub use alias::{AliasGroup, AliasRegistry, AliasTable};
/// Re-export card types.
pub use card::{
    Ability, Card, CardData, CardHeader, CardKind, CocCard, DeathSaving, Difficulty, DndCard, Entry,
    EntryCategory, GeneralCard,
};
/// Re-export error types.
pub use error::{CoreError, CoreResult};

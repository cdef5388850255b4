//! Roll mechanics for Rollkeeper.
//!
//! Three engines sit between raw command text and a rolled result:
//! the [`rewrite`] alias rules that normalize what users type, the
//! [`template`] resolver that expands card references and inline rolls, and
//! the [`decider`] that maps a roll onto a success tier.

pub mod decider;
pub mod error;
pub mod lru;
pub mod rewrite;
pub mod template;

pub use decider::{Decider, DeciderTier, Decision, TierKind, coc_tiers};
pub use error::{MechError, MechResult};
pub use lru::LruCache;
pub use rewrite::{AliasRule, Replacement, Rewriter, RuleScope, RuleSpec, Trigger};
pub use template::{MAX_DEPTH, NoCard, ReferenceLookup, Resolved, SubRoll, resolve, resolve_and_roll};

//! Resolved entries and abilities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a resolved entry lives on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    /// Derived from other fields; never stored.
    Computed,
    /// A stored field whose writes are clamped or routed by the card system.
    Special,
    /// Fixed vitals such as level or luck.
    Basic,
    /// Fixed characteristics or ability scores.
    Props,
    /// Open skill map.
    Skills,
    /// Open item map.
    Items,
    /// A value supplied in the command rather than read from a card.
    Temp,
}

impl EntryCategory {
    /// Returns true for categories whose entries may be created and removed
    /// freely.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Skills | Self::Items)
    }
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Computed => write!(f, "computed"),
            Self::Special => write!(f, "special"),
            Self::Basic => write!(f, "basic"),
            Self::Props => write!(f, "props"),
            Self::Skills => write!(f, "skills"),
            Self::Items => write!(f, "items"),
            Self::Temp => write!(f, "temp"),
        }
    }
}

/// A difficulty tier that divides the tested value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Full value.
    #[default]
    Normal,
    /// Half value, floored.
    Hard,
    /// One fifth of the value, floored.
    Extreme,
}

impl Difficulty {
    /// The divisor applied to the base value.
    pub fn divisor(self) -> i64 {
        match self {
            Self::Normal => 1,
            Self::Hard => 2,
            Self::Extreme => 5,
        }
    }

    /// Apply the tier to a base value.
    pub fn apply(self, base: i64) -> i64 {
        base.div_euclid(self.divisor())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => Ok(()),
            Self::Hard => write!(f, "困难"),
            Self::Extreme => write!(f, "极难"),
        }
    }
}

/// The result of looking a name up against a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The text the caller asked for, difficulty keyword included.
    pub input: String,
    /// The key the value is stored under (or the computed field's name).
    pub key: String,
    /// The tested value, with the difficulty tier applied.
    pub value: i64,
    /// The value before the difficulty tier.
    pub base_value: i64,
    /// The difficulty tier stripped from the input.
    pub difficulty: Difficulty,
    /// Where the entry lives.
    pub category: EntryCategory,
    /// True when the entry cannot be written.
    pub readonly: bool,
    /// True when the value came from the command instead of a card.
    pub is_temp: bool,
}

impl Entry {
    /// Build an entry for a value typed directly into a command.
    pub fn temp(input: impl Into<String>, key: impl Into<String>, base: i64, difficulty: Difficulty) -> Self {
        Self {
            input: input.into(),
            key: key.into(),
            value: difficulty.apply(base),
            base_value: base,
            difficulty,
            category: EntryCategory::Temp,
            readonly: true,
            is_temp: true,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}: {}", self.difficulty, self.key, self.value)
    }
}

/// A named dice-expression macro resolved from a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ability {
    /// The text the caller asked for.
    pub input: String,
    /// The key the expression is stored under.
    pub key: String,
    /// The dice expression, possibly containing further references.
    pub expression: String,
    /// True for computed abilities.
    pub readonly: bool,
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.expression)
    }
}

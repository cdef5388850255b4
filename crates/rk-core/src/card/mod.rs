//! Character cards.
//!
//! [`CardData`] is the persisted shape: a closed union over card systems,
//! each with a fixed set of category maps. [`Card`] pairs the data with the
//! system's alias table and exposes lookup and mutation by any synonym.
//!
//! Lookup order for entries is: difficulty strip, alias expansion, computed
//! fields, special setters, then stored categories in a fixed order. The
//! per-system modules implement the steps behind the [`Sheet`] seam.

pub mod coc;
pub mod dnd;
mod entry;
pub mod general;

pub use coc::CocCard;
pub use dnd::{DeathSaving, DndCard};
pub use entry::{Ability, Difficulty, Entry, EntryCategory};
pub use general::GeneralCard;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::alias::{AliasRegistry, AliasTable};
use crate::error::CoreResult;

/// The card system a card belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    /// Free-form card with open maps only.
    #[default]
    General,
    /// Call of Cthulhu 7th edition.
    Coc,
    /// Dungeons & Dragons 5th edition.
    Dnd,
}

impl CardKind {
    /// Split this system's difficulty keyword off the front of `text`.
    /// Only Call of Cthulhu has difficulty keywords.
    pub fn strip_difficulty(self, text: &str) -> (Difficulty, &str) {
        match self {
            Self::Coc => coc::strip_difficulty(text),
            Self::General | Self::Dnd => (Difficulty::Normal, text),
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Coc => write!(f, "coc"),
            Self::Dnd => write!(f, "dnd"),
        }
    }
}

/// Fields shared by every card kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardHeader {
    /// Unique card name.
    pub name: String,
    /// Unix milliseconds of the last successful mutation.
    #[serde(default)]
    pub last_modified: i64,
    /// Free-form extension text.
    #[serde(default)]
    pub ext: String,
}

impl CardHeader {
    /// A header with the given name and a zero timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_modified: 0,
            ext: String::new(),
        }
    }

    /// Record a mutation. The timestamp is strictly increasing.
    pub fn touch(&mut self) {
        let now = Utc::now().timestamp_millis();
        self.last_modified = now.max(self.last_modified + 1);
    }
}

/// Persisted card data, tagged by system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CardData {
    /// A free-form card.
    General(GeneralCard),
    /// A Call of Cthulhu card.
    Coc(CocCard),
    /// A D&D card.
    Dnd(DndCard),
}

impl CardData {
    /// The card's system.
    pub fn kind(&self) -> CardKind {
        match self {
            Self::General(_) => CardKind::General,
            Self::Coc(_) => CardKind::Coc,
            Self::Dnd(_) => CardKind::Dnd,
        }
    }

    /// Shared header fields.
    pub fn header(&self) -> &CardHeader {
        self.sheet().header()
    }

    /// Decode card data from JSON.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn sheet(&self) -> &dyn Sheet {
        match self {
            Self::General(c) => c,
            Self::Coc(c) => c,
            Self::Dnd(c) => c,
        }
    }

    fn sheet_mut(&mut self) -> &mut dyn Sheet {
        match self {
            Self::General(c) => c,
            Self::Coc(c) => c,
            Self::Dnd(c) => c,
        }
    }
}

/// A stored or computed value found on a sheet, before difficulty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Found {
    pub key: String,
    pub value: i64,
    pub category: EntryCategory,
}

impl Found {
    pub fn new(key: impl Into<String>, value: i64, category: EntryCategory) -> Self {
        Self {
            key: key.into(),
            value,
            category,
        }
    }
}

/// A stored or computed ability found on a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FoundAbility {
    pub key: String,
    pub expression: String,
    pub readonly: bool,
}

/// Per-system lookup and mutation. Names passed in are already trimmed and
/// free of difficulty keywords.
pub(crate) trait Sheet {
    fn header(&self) -> &CardHeader;
    fn header_mut(&mut self) -> &mut CardHeader;

    /// Split a difficulty keyword off the front of `text`.
    fn strip_difficulty<'a>(&self, text: &'a str) -> (Difficulty, &'a str) {
        (Difficulty::Normal, text)
    }

    fn lookup(&self, aliases: &AliasTable, name: &str) -> Option<Found>;
    fn write(&mut self, aliases: &AliasTable, name: &str, value: i64) -> bool;
    fn remove(&mut self, aliases: &AliasTable, name: &str) -> bool;
    fn entries(&self, aliases: &AliasTable) -> Vec<Found>;

    fn lookup_ability(&self, aliases: &AliasTable, name: &str) -> Option<FoundAbility>;
    fn write_ability(&mut self, aliases: &AliasTable, name: &str, expression: &str) -> bool;
    fn remove_ability(&mut self, aliases: &AliasTable, name: &str) -> bool;
    fn abilities(&self, aliases: &AliasTable) -> Vec<FoundAbility>;
}

/// A live card: persisted data plus the alias table of its system.
#[derive(Debug, Clone)]
pub struct Card {
    data: CardData,
    aliases: Arc<AliasTable>,
}

impl Card {
    /// Wrap card data, picking the alias table for its system.
    pub fn new(data: CardData, registry: &AliasRegistry) -> Self {
        let aliases = registry.for_kind(data.kind());
        Self { data, aliases }
    }

    /// Wrap card data with an explicit alias table.
    pub fn with_aliases(data: CardData, aliases: Arc<AliasTable>) -> Self {
        Self { data, aliases }
    }

    /// Decode a card from JSON.
    pub fn from_json(json: &str, registry: &AliasRegistry) -> CoreResult<Self> {
        Ok(Self::new(CardData::from_json(json)?, registry))
    }

    /// The card's unique name.
    pub fn name(&self) -> &str {
        &self.data.header().name
    }

    /// The card's system.
    pub fn kind(&self) -> CardKind {
        self.data.kind()
    }

    /// Unix milliseconds of the last successful mutation.
    pub fn last_modified(&self) -> i64 {
        self.data.header().last_modified
    }

    /// The persisted data.
    pub fn data(&self) -> &CardData {
        &self.data
    }

    /// Consume the card, returning its data.
    pub fn into_data(self) -> CardData {
        self.data
    }

    /// The alias table used for lookups.
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Look up a numeric entry by any synonym, with an optional difficulty
    /// keyword in front.
    pub fn get_entry(&self, text: &str) -> Option<Entry> {
        let sheet = self.data.sheet();
        let (difficulty, name) = sheet.strip_difficulty(text.trim());
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let found = sheet.lookup(&self.aliases, name)?;
        Some(Entry {
            input: text.to_string(),
            readonly: found.category == EntryCategory::Computed,
            value: difficulty.apply(found.value),
            base_value: found.value,
            key: found.key,
            difficulty,
            category: found.category,
            is_temp: false,
        })
    }

    /// Write an entry. Returns true if the stored value changed.
    ///
    /// Computed entries are read-only and always return false. Unknown names
    /// create a new entry in the system's open category.
    pub fn set_entry(&mut self, name: &str, value: i64) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let changed = self.data.sheet_mut().write(&self.aliases, name, value);
        if changed {
            self.touch();
        }
        changed
    }

    /// Remove an open-category entry. Returns true if one was removed.
    pub fn remove_entry(&mut self, name: &str) -> bool {
        let changed = self.data.sheet_mut().remove(&self.aliases, name.trim());
        if changed {
            self.touch();
        }
        changed
    }

    /// Every stored and computed entry, computed first.
    pub fn entries(&self) -> Vec<Entry> {
        self.data
            .sheet()
            .entries(&self.aliases)
            .into_iter()
            .map(|f| Entry {
                input: f.key.clone(),
                readonly: f.category == EntryCategory::Computed,
                value: f.value,
                base_value: f.value,
                key: f.key,
                difficulty: Difficulty::Normal,
                category: f.category,
                is_temp: false,
            })
            .collect()
    }

    /// Look up an ability by any synonym.
    pub fn get_ability(&self, text: &str) -> Option<Ability> {
        let name = text.trim();
        if name.is_empty() {
            return None;
        }
        let found = self.data.sheet().lookup_ability(&self.aliases, name)?;
        Some(Ability {
            input: text.to_string(),
            key: found.key,
            expression: found.expression,
            readonly: found.readonly,
        })
    }

    /// Write an ability expression. Returns true if it changed.
    pub fn set_ability(&mut self, name: &str, expression: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let changed = self
            .data
            .sheet_mut()
            .write_ability(&self.aliases, name, expression.trim());
        if changed {
            self.touch();
        }
        changed
    }

    /// Remove a stored ability. Returns true if one was removed.
    pub fn remove_ability(&mut self, name: &str) -> bool {
        let changed = self
            .data
            .sheet_mut()
            .remove_ability(&self.aliases, name.trim());
        if changed {
            self.touch();
        }
        changed
    }

    /// Every stored and computed ability.
    pub fn abilities(&self) -> Vec<Ability> {
        self.data
            .sheet()
            .abilities(&self.aliases)
            .into_iter()
            .map(|f| Ability {
                input: f.key.clone(),
                key: f.key,
                expression: f.expression,
                readonly: f.readonly,
            })
            .collect()
    }

    /// Set or clear the growth mark on a CoC skill. Returns true if the
    /// mark changed; always false for other systems.
    pub fn mark_growth(&mut self, name: &str, on: bool) -> bool {
        let changed = match &mut self.data {
            CardData::Coc(c) => set_flag(&mut c.meta.skill_growth, &self.aliases, name, on),
            _ => false,
        };
        if changed {
            self.touch();
        }
        changed
    }

    /// Returns true if the CoC skill is marked for growth under any synonym.
    pub fn is_growth_marked(&self, name: &str) -> bool {
        match &self.data {
            CardData::Coc(c) => flag_set(&c.meta.skill_growth, &self.aliases, name),
            _ => false,
        }
    }

    /// The CoC skills currently marked for growth.
    pub fn growth_marked_skills(&self) -> Vec<String> {
        match &self.data {
            CardData::Coc(c) => c
                .meta
                .skill_growth
                .iter()
                .filter(|&(_, &on)| on)
                .map(|(k, _)| k.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Set or clear D&D proficiency on a skill or saving throw. Returns true
    /// if it changed; always false for other systems.
    pub fn mark_experienced(&mut self, name: &str, on: bool) -> bool {
        let changed = match &mut self.data {
            CardData::Dnd(c) => set_flag(&mut c.meta.experienced, &self.aliases, name, on),
            _ => false,
        };
        if changed {
            self.touch();
        }
        changed
    }

    /// Returns true if the D&D skill or save is proficient under any synonym.
    pub fn is_experienced(&self, name: &str) -> bool {
        match &self.data {
            CardData::Dnd(c) => flag_set(&c.meta.experienced, &self.aliases, name),
            _ => false,
        }
    }

    /// Current D&D death saving counters.
    pub fn death_saving(&self) -> Option<DeathSaving> {
        match &self.data {
            CardData::Dnd(c) => Some(c.meta.death_saving),
            _ => None,
        }
    }

    /// Overwrite the D&D death saving counters. Returns true if they changed.
    pub fn set_death_saving(&mut self, saving: DeathSaving) -> bool {
        let changed = match &mut self.data {
            CardData::Dnd(c) if c.meta.death_saving != saving => {
                c.meta.death_saving = saving;
                true
            }
            _ => false,
        };
        if changed {
            self.touch();
        }
        changed
    }

    fn touch(&mut self) {
        self.data.sheet_mut().header_mut().touch();
    }
}

/// The stored key in `map` that shares an alias group with `name`.
pub(crate) fn find_key<V>(map: &BTreeMap<String, V>, aliases: &AliasTable, name: &str) -> Option<String> {
    map.keys().find(|k| aliases.same_group(k, name)).cloned()
}

/// The stored value in `map` under any synonym of `name`.
pub(crate) fn stored(map: &BTreeMap<String, i64>, aliases: &AliasTable, name: &str) -> Option<i64> {
    map.iter()
        .find(|(k, _)| aliases.same_group(k, name))
        .map(|(_, &v)| v)
}

/// Insert `value` under `key`. Returns false when the value was already there.
pub(crate) fn write_value(map: &mut BTreeMap<String, i64>, key: String, value: i64) -> bool {
    if map.get(&key) == Some(&value) {
        return false;
    }
    map.insert(key, value);
    true
}

/// Scan `maps` in order for a synonym of `name`.
pub(crate) fn scan(
    maps: &[(&BTreeMap<String, i64>, EntryCategory)],
    aliases: &AliasTable,
    name: &str,
) -> Option<Found> {
    maps.iter().find_map(|(map, category)| {
        map.iter()
            .find(|(k, _)| aliases.same_group(k, name))
            .map(|(k, &v)| Found::new(k.clone(), v, *category))
    })
}

/// Scan ability maps in order for a synonym of `name`.
pub(crate) fn scan_abilities(
    maps: &[&BTreeMap<String, String>],
    aliases: &AliasTable,
    name: &str,
) -> Option<FoundAbility> {
    maps.iter().find_map(|map| {
        map.iter()
            .find(|(k, _)| aliases.same_group(k, name))
            .map(|(k, v)| FoundAbility {
                key: k.clone(),
                expression: v.clone(),
                readonly: false,
            })
    })
}

/// Write an ability into the first map holding a synonym, else into
/// `fallback` under the canonical key.
pub(crate) fn write_ability_in(
    maps: &mut [&mut BTreeMap<String, String>],
    aliases: &AliasTable,
    name: &str,
    expression: &str,
) -> bool {
    for map in maps.iter_mut() {
        if let Some(key) = find_key(map, aliases, name) {
            if map.get(&key).is_some_and(|v| v == expression) {
                return false;
            }
            map.insert(key, expression.to_string());
            return true;
        }
    }
    match maps.first_mut() {
        Some(fallback) => {
            fallback.insert(aliases.canonical(name), expression.to_string());
            true
        }
        None => false,
    }
}

/// Remove an ability from whichever map holds a synonym of `name`.
pub(crate) fn remove_ability_in(
    maps: &mut [&mut BTreeMap<String, String>],
    aliases: &AliasTable,
    name: &str,
) -> bool {
    for map in maps.iter_mut() {
        if let Some(key) = find_key(map, aliases, name) {
            map.remove(&key);
            return true;
        }
    }
    false
}

/// List stored abilities from every map.
pub(crate) fn list_abilities(maps: &[&BTreeMap<String, String>]) -> Vec<FoundAbility> {
    maps.iter()
        .flat_map(|map| {
            map.iter().map(|(k, v)| FoundAbility {
                key: k.clone(),
                expression: v.clone(),
                readonly: false,
            })
        })
        .collect()
}

/// Returns true if any synonym of `name` is flagged.
pub(crate) fn flag_set(flags: &BTreeMap<String, bool>, aliases: &AliasTable, name: &str) -> bool {
    flags
        .iter()
        .any(|(k, &on)| on && aliases.same_group(k, name))
}

/// Set or clear a flag across the whole alias group of `name`.
///
/// Setting stores the flag under the canonical key and drops copies stored
/// under other synonyms; clearing removes every synonym. A flag already in
/// the requested state is left as stored.
pub(crate) fn set_flag(
    flags: &mut BTreeMap<String, bool>,
    aliases: &AliasTable,
    name: &str,
    on: bool,
) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    if flag_set(flags, aliases, name) == on {
        return false;
    }
    let synonyms: Vec<String> = flags
        .keys()
        .filter(|k| aliases.same_group(k, name))
        .cloned()
        .collect();
    for key in &synonyms {
        flags.remove(key);
    }
    if on {
        flags.insert(aliases.canonical(name), true);
    }
    true
}

//! Free-form cards with no system rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    CardHeader, EntryCategory, Found, FoundAbility, Sheet, find_key, list_abilities,
    remove_ability_in, scan, scan_abilities, write_ability_in, write_value,
};
use crate::alias::AliasTable;

/// A card holding only open maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralCard {
    /// Shared fields.
    #[serde(flatten)]
    pub header: CardHeader,
    /// Open value map.
    #[serde(default)]
    pub skills: BTreeMap<String, i64>,
    /// Dice macros.
    #[serde(default)]
    pub abilities: BTreeMap<String, String>,
}

impl GeneralCard {
    /// An empty card.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: CardHeader::new(name),
            ..Self::default()
        }
    }
}

impl Sheet for GeneralCard {
    fn header(&self) -> &CardHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut CardHeader {
        &mut self.header
    }

    fn lookup(&self, aliases: &AliasTable, name: &str) -> Option<Found> {
        scan(&[(&self.skills, EntryCategory::Skills)], aliases, name)
    }

    fn write(&mut self, aliases: &AliasTable, name: &str, value: i64) -> bool {
        let key = find_key(&self.skills, aliases, name).unwrap_or_else(|| aliases.canonical(name));
        write_value(&mut self.skills, key, value)
    }

    fn remove(&mut self, aliases: &AliasTable, name: &str) -> bool {
        match find_key(&self.skills, aliases, name) {
            Some(key) => self.skills.remove(&key).is_some(),
            None => false,
        }
    }

    fn entries(&self, _aliases: &AliasTable) -> Vec<Found> {
        self.skills
            .iter()
            .map(|(k, &v)| Found::new(k.clone(), v, EntryCategory::Skills))
            .collect()
    }

    fn lookup_ability(&self, aliases: &AliasTable, name: &str) -> Option<FoundAbility> {
        scan_abilities(&[&self.abilities], aliases, name)
    }

    fn write_ability(&mut self, aliases: &AliasTable, name: &str, expression: &str) -> bool {
        write_ability_in(&mut [&mut self.abilities], aliases, name, expression)
    }

    fn remove_ability(&mut self, aliases: &AliasTable, name: &str) -> bool {
        remove_ability_in(&mut [&mut self.abilities], aliases, name)
    }

    fn abilities(&self, _aliases: &AliasTable) -> Vec<FoundAbility> {
        list_abilities(&[&self.abilities])
    }
}

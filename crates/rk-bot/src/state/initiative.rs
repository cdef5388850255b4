//! Initiative order for one channel.

use serde::{Deserialize, Serialize};

/// One combatant in the initiative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    /// Combatant name.
    pub name: String,
    /// Rolled initiative.
    pub value: i64,
}

/// Combatants in descending initiative order. Ties keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeList {
    entries: Vec<InitiativeEntry>,
}

impl InitiativeList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combatant, replacing an earlier entry with the same name.
    pub fn add(&mut self, name: impl Into<String>, value: i64) {
        let name = name.into();
        self.entries.retain(|e| e.name != name);
        let at = self
            .entries
            .iter()
            .position(|e| e.value < value)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, InitiativeEntry { name, value });
    }

    /// Remove a combatant by name. Returns true if found.
    pub fn remove(&mut self, name: &str) -> bool {
        let len_before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() < len_before
    }

    /// Drop every combatant.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Combatants, highest initiative first.
    pub fn entries(&self) -> &[InitiativeEntry] {
        &self.entries
    }

    /// Number of combatants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nobody has rolled initiative.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &InitiativeList) -> Vec<&str> {
        list.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn sorted_descending() {
        let mut list = InitiativeList::new();
        list.add("goblin", 12);
        list.add("hero", 18);
        list.add("wolf", 5);
        assert_eq!(names(&list), ["hero", "goblin", "wolf"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut list = InitiativeList::new();
        list.add("a", 10);
        list.add("b", 10);
        assert_eq!(names(&list), ["a", "b"]);
    }

    #[test]
    fn re_adding_replaces() {
        let mut list = InitiativeList::new();
        list.add("hero", 3);
        list.add("goblin", 12);
        list.add("hero", 20);
        assert_eq!(names(&list), ["hero", "goblin"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_and_clear() {
        let mut list = InitiativeList::new();
        list.add("hero", 3);
        list.add("goblin", 12);
        assert!(list.remove("hero"));
        assert!(!list.remove("hero"));
        list.clear();
        assert!(list.is_empty());
    }
}

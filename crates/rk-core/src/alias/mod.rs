//! Alias tables: groups of interchangeable names for skills and attributes.
//!
//! Every member of every group is indexed once, when the table is built, so
//! a lookup is a single hash probe on the normalized name. Tables are
//! immutable after construction and shared between cards by `Arc`.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::card::CardKind;

/// Normalize a name for alias comparison.
///
/// Trims surrounding whitespace, folds full-width ASCII forms and the
/// ideographic space to their half-width equivalents, and lowercases ASCII.
pub fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .map(|c| c.to_ascii_lowercase())
        .collect::<String>()
        .trim()
        .to_string()
}

/// An immutable, ordered set of interchangeable names.
///
/// The first member is the canonical key under which new entries are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasGroup {
    members: Arc<[String]>,
}

impl AliasGroup {
    /// Build a group, dropping blank members and duplicates.
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        let mut kept: Vec<String> = Vec::new();
        for member in members {
            let member: String = member.into();
            let norm = normalize(&member);
            if norm.is_empty() || seen.contains(&norm) {
                continue;
            }
            seen.push(norm);
            kept.push(member.trim().to_string());
        }
        Self {
            members: kept.into(),
        }
    }

    /// The canonical (first) member.
    pub fn canonical(&self) -> &str {
        self.members.first().map(String::as_str).unwrap_or("")
    }

    /// All members in declaration order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Returns true if `name` is a member, compared after normalization.
    pub fn contains(&self, name: &str) -> bool {
        let norm = normalize(name);
        self.members.iter().any(|m| normalize(m) == norm)
    }

    /// Returns true if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A pre-indexed collection of alias groups.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    groups: Vec<AliasGroup>,
    index: HashMap<String, usize>,
}

impl AliasTable {
    /// Build a table from groups of names.
    ///
    /// A name that already belongs to an earlier group keeps that group; the
    /// collision is logged and the later membership is ignored for lookup.
    pub fn new<I, G, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for group in groups {
            table.push(AliasGroup::new(group));
        }
        table
    }

    /// An empty table: every name resolves to itself.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in synonym table for a card system.
    pub fn builtin(kind: CardKind) -> Self {
        match kind {
            CardKind::Coc => Self::new(builtin::COC_GROUPS.iter().map(|g| g.iter().copied())),
            CardKind::Dnd => Self::new(builtin::DND_GROUPS.iter().map(|g| g.iter().copied())),
            CardKind::General => Self::empty(),
        }
    }

    /// Return a copy of this table with extra groups appended.
    pub fn extended<I, G, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = self.clone();
        for group in extra {
            table.push(AliasGroup::new(group));
        }
        table
    }

    fn push(&mut self, group: AliasGroup) {
        let mut kept = Vec::with_capacity(group.members().len());
        for member in group.members() {
            if let Some(&existing) = self.index.get(&normalize(member)) {
                warn!(
                    name = %member,
                    group = %self.groups[existing].canonical(),
                    "alias already belongs to another group; keeping the first"
                );
                continue;
            }
            kept.push(member.clone());
        }
        if kept.is_empty() {
            return;
        }
        let idx = self.groups.len();
        for member in &kept {
            self.index.insert(normalize(member), idx);
        }
        self.groups.push(AliasGroup::new(kept));
    }

    /// The group that contains `name`, if any.
    pub fn group(&self, name: &str) -> Option<&AliasGroup> {
        self.index
            .get(&normalize(name))
            .and_then(|&idx| self.groups.get(idx))
    }

    /// Candidate names for `name`: the group members in order, then the
    /// input itself when it is not already a member.
    pub fn resolve(&self, name: &str) -> Vec<String> {
        let trimmed = name.trim().to_string();
        match self.group(name) {
            Some(group) => {
                let mut out = group.members().to_vec();
                if !group.contains(&trimmed) {
                    out.push(trimmed);
                }
                out
            }
            None => vec![trimmed],
        }
    }

    /// The canonical key for `name`: its group's first member, or the
    /// normalized input when the name belongs to no group.
    pub fn canonical(&self, name: &str) -> String {
        match self.group(name) {
            Some(group) => group.canonical().to_string(),
            None => normalize(name),
        }
    }

    /// Returns true if both names are equal after normalization or share a
    /// group.
    pub fn same_group(&self, a: &str, b: &str) -> bool {
        let (na, nb) = (normalize(a), normalize(b));
        if na == nb {
            return true;
        }
        match (self.index.get(&na), self.index.get(&nb)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Number of groups in the table.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if the table has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// One alias table per card system, built once at configuration load.
#[derive(Debug, Clone)]
pub struct AliasRegistry {
    general: Arc<AliasTable>,
    coc: Arc<AliasTable>,
    dnd: Arc<AliasTable>,
}

impl Default for AliasRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AliasRegistry {
    /// The built-in tables for every system.
    pub fn builtin() -> Self {
        Self {
            general: Arc::new(AliasTable::builtin(CardKind::General)),
            coc: Arc::new(AliasTable::builtin(CardKind::Coc)),
            dnd: Arc::new(AliasTable::builtin(CardKind::Dnd)),
        }
    }

    /// Append extra groups to one system's table.
    pub fn with_groups<I, G, S>(mut self, kind: CardKind, extra: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slot = match kind {
            CardKind::General => &mut self.general,
            CardKind::Coc => &mut self.coc,
            CardKind::Dnd => &mut self.dnd,
        };
        *slot = Arc::new(slot.extended(extra));
        self
    }

    /// The shared table for a system.
    pub fn for_kind(&self, kind: CardKind) -> Arc<AliasTable> {
        match kind {
            CardKind::General => Arc::clone(&self.general),
            CardKind::Coc => Arc::clone(&self.coc),
            CardKind::Dnd => Arc::clone(&self.dnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> AliasTable {
        AliasTable::new(vec![
            vec!["侦察", "Spot", "spot hidden"],
            vec!["力量", "STR"],
        ])
    }

    #[test]
    fn normalize_folds_width_and_case() {
        assert_eq!(normalize("  ＳＴＲ "), "str");
        assert_eq!(normalize("Spot\u{3000}"), "spot");
        assert_eq!(normalize("侦察"), "侦察");
    }

    #[test]
    fn resolve_member_returns_group_in_order() {
        let t = table();
        assert_eq!(t.resolve("spot"), vec!["侦察", "Spot", "spot hidden"]);
    }

    #[test]
    fn resolve_unknown_is_singleton() {
        let t = table();
        assert_eq!(t.resolve("潜行"), vec!["潜行"]);
    }

    #[test]
    fn canonical_uses_first_member_or_normalized_input() {
        let t = table();
        assert_eq!(t.canonical("ｓｔｒ"), "力量");
        assert_eq!(t.canonical("Sword"), "sword");
    }

    #[test]
    fn same_group_is_case_insensitive() {
        let t = table();
        assert!(t.same_group("SPOT", "侦察"));
        assert!(t.same_group("foo", "FOO"));
        assert!(!t.same_group("力量", "侦察"));
    }

    #[test]
    fn first_group_wins_on_collision() {
        let t = AliasTable::new(vec![vec!["a", "b"], vec!["c", "b"]]);
        assert_eq!(t.canonical("b"), "a");
        assert_eq!(t.canonical("c"), "c");
    }

    #[test]
    fn colliding_member_leaves_the_later_group() {
        let t = AliasTable::new(vec![vec!["a", "b"], vec!["c", "b", "d"]]);
        assert_eq!(t.resolve("d"), ["c", "d"]);
        assert_eq!(t.resolve("b"), ["a", "b"]);
        assert!(!t.same_group("b", "d"));
        assert!(AliasTable::new(vec![vec!["a"], vec!["A"]]).group("a").unwrap().members() == ["a"]);
    }

    #[test]
    fn blank_and_duplicate_members_dropped() {
        let g = AliasGroup::new(vec!["x", " ", "X", "y"]);
        assert_eq!(g.members(), ["x", "y"]);
    }

    #[test]
    fn registry_extends_one_system() {
        let reg = AliasRegistry::builtin().with_groups(CardKind::Coc, vec![vec!["克苏鲁神话", "神话"]]);
        assert_eq!(reg.for_kind(CardKind::Coc).canonical("cm"), "克苏鲁神话");
        assert_eq!(reg.for_kind(CardKind::Dnd).canonical("神话"), "神话");
    }

    #[test]
    fn builtin_tables_are_symmetric() {
        for kind in [CardKind::Coc, CardKind::Dnd] {
            let t = AliasTable::builtin(kind);
            for group in &t.groups {
                for a in group.members() {
                    let resolved = t.resolve(a);
                    for b in group.members() {
                        assert!(resolved.contains(b), "{a} should resolve to {b}");
                    }
                }
            }
        }
    }

    proptest! {
        #[test]
        fn group_members_resolve_to_each_other(
            names in proptest::collection::hash_set("[a-z]{1,8}", 1..6)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let t = AliasTable::new(vec![names.clone()]);
            for a in &names {
                let resolved = t.resolve(a);
                for b in &names {
                    prop_assert!(resolved.contains(b));
                }
            }
        }
    }
}

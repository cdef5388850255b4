//! D&D 5th edition cards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    CardHeader, EntryCategory, Found, FoundAbility, Sheet, find_key, flag_set, list_abilities,
    remove_ability_in, scan, scan_abilities, stored, write_ability_in, write_value,
};
use crate::alias::{AliasTable, normalize};

/// Fixed vitals stored in `basic`.
pub const BASIC: &[&str] = &["等级", "经验", "生命", "生命上限", "护甲"];

/// The six ability scores stored in `props`.
pub const PROPS: &[&str] = &["力量", "敏捷", "体质", "智力", "感知", "魅力"];

const MODIFIERS: [&str; 6] = ["力量调整", "敏捷调整", "体质调整", "智力调整", "感知调整", "魅力调整"];
const SAVES: [&str; 6] = ["力量豁免", "敏捷豁免", "体质豁免", "智力豁免", "感知豁免", "魅力豁免"];

/// Skills and the index of the ability they key off.
const SKILLS: [(&str, usize); 18] = [
    ("运动", 0),
    ("体操", 1),
    ("巧手", 1),
    ("隐匿", 1),
    ("奥秘", 3),
    ("历史", 3),
    ("调查", 3),
    ("自然", 3),
    ("宗教", 3),
    ("驯兽", 4),
    ("洞悉", 4),
    ("医药", 4),
    ("察觉", 4),
    ("求生", 4),
    ("欺瞒", 5),
    ("威吓", 5),
    ("表演", 5),
    ("游说", 5),
];

const PROFICIENCY: &str = "熟练加值";
const INITIATIVE: &str = "先攻";

/// A D&D adventurer sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DndCard {
    /// Shared fields.
    #[serde(flatten)]
    pub header: CardHeader,
    /// Level, XP, HP, max HP and AC.
    #[serde(default)]
    pub basic: BTreeMap<String, i64>,
    /// The six ability scores.
    #[serde(default)]
    pub props: BTreeMap<String, i64>,
    /// Open item map.
    #[serde(default)]
    pub items: BTreeMap<String, i64>,
    /// Attack and feature macros.
    #[serde(default)]
    pub abilities: BTreeMap<String, String>,
    /// Equipment macros.
    #[serde(default)]
    pub equips: BTreeMap<String, String>,
    /// Spell macros.
    #[serde(default)]
    pub spells: BTreeMap<String, String>,
    /// Bookkeeping counters and flags.
    #[serde(default)]
    pub meta: DndMeta,
}

/// Bookkeeping stored alongside a D&D sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DndMeta {
    /// Proficient skills and saves, by canonical key.
    #[serde(default)]
    pub experienced: BTreeMap<String, bool>,
    /// Remaining spell slots by slot level.
    #[serde(default)]
    pub spell_slots: BTreeMap<u8, i64>,
    /// Maximum spell slots by slot level.
    #[serde(default)]
    pub spell_slots_max: BTreeMap<u8, i64>,
    /// Death saving throw counters.
    #[serde(default)]
    pub death_saving: DeathSaving,
}

/// Death saving throw counters. Both reset on stabilizing or dying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSaving {
    /// Successes so far.
    pub success: u8,
    /// Failures so far.
    pub failure: u8,
}

impl DndCard {
    /// An empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: CardHeader::new(name),
            ..Self::default()
        }
    }

    fn score(&self, aliases: &AliasTable, ability: usize) -> i64 {
        stored(&self.props, aliases, PROPS[ability]).unwrap_or(10)
    }

    /// Ability modifier: `(score - 10) / 2`, floored.
    fn modifier(&self, aliases: &AliasTable, ability: usize) -> i64 {
        (self.score(aliases, ability) - 10).div_euclid(2)
    }

    /// Proficiency bonus by level.
    fn proficiency(&self, aliases: &AliasTable) -> i64 {
        let level = stored(&self.basic, aliases, "等级").unwrap_or(1).max(1);
        2 + (level - 1).div_euclid(4)
    }

    fn stored_maps(&self) -> [(&BTreeMap<String, i64>, EntryCategory); 3] {
        [
            (&self.basic, EntryCategory::Basic),
            (&self.props, EntryCategory::Props),
            (&self.items, EntryCategory::Items),
        ]
    }

    fn home_for(&mut self, key: &str) -> &mut BTreeMap<String, i64> {
        if BASIC.contains(&key) {
            &mut self.basic
        } else if PROPS.contains(&key) {
            &mut self.props
        } else {
            &mut self.items
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Computed {
    Modifier(usize),
    Save(usize),
    Skill(usize),
    Proficiency,
    Initiative,
}

impl Computed {
    fn all() -> impl Iterator<Item = Self> {
        (0..6)
            .map(Self::Modifier)
            .chain((0..6).map(Self::Save))
            .chain((0..SKILLS.len()).map(Self::Skill))
            .chain([Self::Proficiency, Self::Initiative])
    }

    fn key(self) -> &'static str {
        match self {
            Self::Modifier(i) => MODIFIERS[i],
            Self::Save(i) => SAVES[i],
            Self::Skill(i) => SKILLS[i].0,
            Self::Proficiency => PROFICIENCY,
            Self::Initiative => INITIATIVE,
        }
    }

    fn find(aliases: &AliasTable, name: &str) -> Option<Self> {
        Self::all().find(|c| aliases.same_group(c.key(), name))
    }

    fn value(self, card: &DndCard, aliases: &AliasTable) -> i64 {
        let proficient = |key: &str| {
            if flag_set(&card.meta.experienced, aliases, key) {
                card.proficiency(aliases)
            } else {
                0
            }
        };
        match self {
            Self::Modifier(i) => card.modifier(aliases, i),
            Self::Save(i) => card.modifier(aliases, i) + proficient(SAVES[i]),
            Self::Skill(i) => card.modifier(aliases, SKILLS[i].1) + proficient(SKILLS[i].0),
            Self::Proficiency => card.proficiency(aliases),
            Self::Initiative => card.modifier(aliases, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
    Hp,
    Slots(u8),
    SlotsMax(u8),
}

impl Special {
    fn find(aliases: &AliasTable, name: &str) -> Option<Self> {
        if aliases.same_group("生命", name) {
            return Some(Self::Hp);
        }
        let norm = normalize(name);
        if let Some(level) = norm.strip_suffix("环上限").and_then(slot_level) {
            return Some(Self::SlotsMax(level));
        }
        norm.strip_suffix('环').and_then(slot_level).map(Self::Slots)
    }

    fn key(self) -> String {
        match self {
            Self::Hp => "生命".to_string(),
            Self::Slots(level) => format!("{level}环"),
            Self::SlotsMax(level) => format!("{level}环上限"),
        }
    }
}

fn slot_level(text: &str) -> Option<u8> {
    text.parse::<u8>().ok().filter(|l| (1..=9).contains(l))
}

impl Sheet for DndCard {
    fn header(&self) -> &CardHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut CardHeader {
        &mut self.header
    }

    fn lookup(&self, aliases: &AliasTable, name: &str) -> Option<Found> {
        if let Some(computed) = Computed::find(aliases, name) {
            return Some(Found::new(
                computed.key(),
                computed.value(self, aliases),
                EntryCategory::Computed,
            ));
        }
        match Special::find(aliases, name) {
            Some(Special::Hp) => {
                let found = scan(&self.stored_maps(), aliases, name)?;
                Some(Found {
                    category: EntryCategory::Special,
                    ..found
                })
            }
            Some(special @ Special::Slots(level)) => {
                let value = *self.meta.spell_slots.get(&level)?;
                Some(Found::new(special.key(), value, EntryCategory::Special))
            }
            Some(special @ Special::SlotsMax(level)) => {
                let value = *self.meta.spell_slots_max.get(&level)?;
                Some(Found::new(special.key(), value, EntryCategory::Special))
            }
            None => scan(&self.stored_maps(), aliases, name),
        }
    }

    fn write(&mut self, aliases: &AliasTable, name: &str, value: i64) -> bool {
        if Computed::find(aliases, name).is_some() {
            return false;
        }
        match Special::find(aliases, name) {
            Some(Special::Hp) => {
                let max = stored(&self.basic, aliases, "生命上限").unwrap_or(0);
                let value = if max > 0 { value.clamp(0, max) } else { value.max(0) };
                let key = find_key(&self.basic, aliases, name).unwrap_or_else(|| "生命".to_string());
                return write_value(&mut self.basic, key, value);
            }
            Some(Special::Slots(level)) => {
                let max = self.meta.spell_slots_max.get(&level).copied().unwrap_or(0);
                let value = value.clamp(0, max.max(0));
                if self.meta.spell_slots.get(&level) == Some(&value) {
                    return false;
                }
                self.meta.spell_slots.insert(level, value);
                return true;
            }
            Some(Special::SlotsMax(level)) => {
                let max = value.max(0);
                let mut changed = self.meta.spell_slots_max.insert(level, max) != Some(max);
                if let Some(current) = self.meta.spell_slots.get_mut(&level)
                    && *current > max
                {
                    *current = max;
                    changed = true;
                }
                return changed;
            }
            None => {}
        }
        for map in [&mut self.basic, &mut self.props, &mut self.items] {
            if let Some(key) = find_key(map, aliases, name) {
                return write_value(map, key, value);
            }
        }
        let key = aliases.canonical(name);
        write_value(self.home_for(&key), key, value)
    }

    fn remove(&mut self, aliases: &AliasTable, name: &str) -> bool {
        match find_key(&self.items, aliases, name) {
            Some(key) => self.items.remove(&key).is_some(),
            None => false,
        }
    }

    fn entries(&self, aliases: &AliasTable) -> Vec<Found> {
        let mut out: Vec<Found> = Computed::all()
            .map(|c| Found::new(c.key(), c.value(self, aliases), EntryCategory::Computed))
            .collect();
        for (map, category) in self.stored_maps() {
            for (key, &value) in map {
                let category = if aliases.same_group("生命", key) {
                    EntryCategory::Special
                } else {
                    category
                };
                out.push(Found::new(key.clone(), value, category));
            }
        }
        for (&level, &max) in &self.meta.spell_slots_max {
            let current = self.meta.spell_slots.get(&level).copied().unwrap_or(0);
            out.push(Found::new(Special::Slots(level).key(), current, EntryCategory::Special));
            out.push(Found::new(Special::SlotsMax(level).key(), max, EntryCategory::Special));
        }
        out
    }

    fn lookup_ability(&self, aliases: &AliasTable, name: &str) -> Option<FoundAbility> {
        scan_abilities(&[&self.abilities, &self.equips, &self.spells], aliases, name)
    }

    fn write_ability(&mut self, aliases: &AliasTable, name: &str, expression: &str) -> bool {
        write_ability_in(
            &mut [&mut self.abilities, &mut self.equips, &mut self.spells],
            aliases,
            name,
            expression,
        )
    }

    fn remove_ability(&mut self, aliases: &AliasTable, name: &str) -> bool {
        remove_ability_in(
            &mut [&mut self.abilities, &mut self.equips, &mut self.spells],
            aliases,
            name,
        )
    }

    fn abilities(&self, _aliases: &AliasTable) -> Vec<FoundAbility> {
        list_abilities(&[&self.abilities, &self.equips, &self.spells])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasRegistry;
    use crate::card::{Card, CardData, EntryCategory};

    fn fighter() -> Card {
        let mut data = DndCard::new("Bruenor");
        for (k, v) in [("力量", 16), ("敏捷", 13), ("体质", 15), ("智力", 8), ("感知", 12), ("魅力", 9)] {
            data.props.insert(k.to_string(), v);
        }
        data.basic.insert("等级".to_string(), 5);
        data.basic.insert("生命上限".to_string(), 44);
        data.basic.insert("生命".to_string(), 30);
        data.meta.spell_slots_max.insert(1, 3);
        data.meta.spell_slots.insert(1, 2);
        Card::new(CardData::Dnd(data), &AliasRegistry::builtin())
    }

    #[test]
    fn modifiers_floor_toward_negative() {
        let card = fighter();
        assert_eq!(card.get_entry("strmod").unwrap().value, 3);
        assert_eq!(card.get_entry("智力调整").unwrap().value, -1);
        assert_eq!(card.get_entry("chamod").unwrap().value, -1);
    }

    #[test]
    fn proficiency_by_level() {
        let card = fighter();
        assert_eq!(card.get_entry("prof").unwrap().value, 3);
    }

    #[test]
    fn saves_and_skills_add_proficiency_when_experienced() {
        let mut card = fighter();
        assert_eq!(card.get_entry("athletics").unwrap().value, 3);
        assert!(card.mark_experienced("运动", true));
        assert_eq!(card.get_entry("athletics").unwrap().value, 6);
        assert!(card.mark_experienced("strsave", true));
        assert_eq!(card.get_entry("力量豁免").unwrap().value, 6);
        assert!(card.is_experienced("力量豁免检定"));
    }

    #[test]
    fn initiative_is_dex_modifier() {
        let card = fighter();
        let e = card.get_entry("init").unwrap();
        assert_eq!(e.value, 1);
        assert_eq!(e.category, EntryCategory::Computed);
    }

    #[test]
    fn hp_clamped_to_max() {
        let mut card = fighter();
        assert!(card.set_entry("hp", 100));
        assert_eq!(card.get_entry("生命").unwrap().value, 44);
    }

    #[test]
    fn spell_slots_clamped() {
        let mut card = fighter();
        assert!(card.set_entry("1环", 9));
        assert_eq!(card.get_entry("1环").unwrap().value, 3);
        assert!(card.set_entry("1环上限", 1));
        assert_eq!(card.get_entry("1环").unwrap().value, 1);
        assert!(card.get_entry("2环").is_none());
    }

    #[test]
    fn unknown_names_become_items() {
        let mut card = fighter();
        assert!(card.set_entry("金币", 30));
        let e = card.get_entry("金币").unwrap();
        assert_eq!(e.category, EntryCategory::Items);
        assert!(card.remove_entry("金币"));
        assert!(!card.remove_entry("力量"));
    }

    #[test]
    fn abilities_span_three_maps() {
        let mut data = DndCard::new("Elminster");
        data.spells.insert("火球".to_string(), "8d6".to_string());
        data.equips.insert("长剑".to_string(), "1d8+$strmod".to_string());
        let mut card = Card::new(CardData::Dnd(data), &AliasRegistry::builtin());
        assert_eq!(card.get_ability("火球").unwrap().expression, "8d6");
        assert!(card.set_ability("火球", "9d6"));
        let CardData::Dnd(data) = card.data() else {
            panic!("expected dnd card");
        };
        assert_eq!(data.spells.get("火球").map(String::as_str), Some("9d6"));
        assert!(data.abilities.is_empty());
        assert_eq!(card.abilities().len(), 2);
    }

    #[test]
    fn death_saving_round_trip() {
        let mut card = fighter();
        let saving = DeathSaving { success: 1, failure: 2 };
        assert!(card.set_death_saving(saving));
        assert!(!card.set_death_saving(saving));
        assert_eq!(card.death_saving(), Some(saving));
    }
}

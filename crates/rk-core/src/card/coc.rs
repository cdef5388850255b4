//! Call of Cthulhu 7th edition cards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    CardHeader, Difficulty, EntryCategory, Found, FoundAbility, Sheet, find_key, list_abilities,
    remove_ability_in, scan, scan_abilities, stored, write_ability_in, write_value,
};
use crate::alias::AliasTable;

/// Fixed vitals stored in `basic`.
pub const BASIC: &[&str] = &["生命", "魔法", "理智", "幸运", "克苏鲁神话"];

/// Fixed characteristics stored in `props`.
pub const PROPS: &[&str] = &["力量", "体质", "体型", "敏捷", "外貌", "智力", "意志", "教育"];

const HARD: &[&str] = &["困难", "hard"];
const EXTREME: &[&str] = &["极难", "极限", "extreme"];

/// Split a `困难`/`极难` keyword off the front of `text`. A keyword with
/// nothing after it is a name, not a difficulty.
pub(crate) fn strip_difficulty(text: &str) -> (Difficulty, &str) {
    for (difficulty, words) in [(Difficulty::Hard, HARD), (Difficulty::Extreme, EXTREME)] {
        for word in words {
            if let Some(head) = text.get(..word.len())
                && head.eq_ignore_ascii_case(word)
                && !text[word.len()..].trim().is_empty()
            {
                return (difficulty, &text[word.len()..]);
            }
        }
    }
    (Difficulty::Normal, text)
}

/// A CoC investigator sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocCard {
    /// Shared fields.
    #[serde(flatten)]
    pub header: CardHeader,
    /// HP, MP, SAN, luck and Cthulhu Mythos.
    #[serde(default)]
    pub basic: BTreeMap<String, i64>,
    /// The eight characteristics.
    #[serde(default)]
    pub props: BTreeMap<String, i64>,
    /// Open skill map.
    #[serde(default)]
    pub skills: BTreeMap<String, i64>,
    /// Weapon and spell macros.
    #[serde(default)]
    pub abilities: BTreeMap<String, String>,
    /// Bookkeeping flags.
    #[serde(default)]
    pub meta: CocMeta,
}

/// Bookkeeping stored alongside a CoC sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocMeta {
    /// Skills marked for growth, by canonical key.
    #[serde(default)]
    pub skill_growth: BTreeMap<String, bool>,
}

impl CocCard {
    /// An empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: CardHeader::new(name),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Computed {
    HpMax,
    MpMax,
    SanMax,
    Build,
    Move,
}

impl Computed {
    const ALL: [Self; 5] = [Self::HpMax, Self::MpMax, Self::SanMax, Self::Build, Self::Move];

    fn key(self) -> &'static str {
        match self {
            Self::HpMax => "生命上限",
            Self::MpMax => "魔法上限",
            Self::SanMax => "理智上限",
            Self::Build => "体格",
            Self::Move => "移动力",
        }
    }

    fn find(aliases: &AliasTable, name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| aliases.same_group(c.key(), name))
    }

    fn value(self, card: &CocCard, aliases: &AliasTable) -> i64 {
        let attr = |name: &str| card.attr(aliases, name);
        match self {
            Self::HpMax => (attr("体质") + attr("体型")).div_euclid(10),
            Self::MpMax => attr("意志").div_euclid(5),
            Self::SanMax => 99 - attr("克苏鲁神话"),
            Self::Build => build(attr("力量") + attr("体型")),
            Self::Move => {
                let (str_, dex, siz) = (attr("力量"), attr("敏捷"), attr("体型"));
                if str_ > siz && dex > siz {
                    9
                } else if str_ < siz && dex < siz {
                    7
                } else {
                    8
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
    Hp,
    Mp,
    San,
}

impl Special {
    const ALL: [Self; 3] = [Self::Hp, Self::Mp, Self::San];

    fn key(self) -> &'static str {
        match self {
            Self::Hp => "生命",
            Self::Mp => "魔法",
            Self::San => "理智",
        }
    }

    fn find(aliases: &AliasTable, name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| aliases.same_group(s.key(), name))
    }

    /// Clamp a new value to the field's bounds.
    fn clamp(self, card: &CocCard, aliases: &AliasTable, value: i64) -> i64 {
        let max = match self {
            Self::Hp => Computed::HpMax.value(card, aliases),
            Self::Mp => Computed::MpMax.value(card, aliases),
            Self::San => return value.clamp(0, Computed::SanMax.value(card, aliases).max(0)),
        };
        // An unset maximum only bounds from below.
        if max > 0 { value.clamp(0, max) } else { value.max(0) }
    }
}

/// Build from STR+SIZ.
fn build(sum: i64) -> i64 {
    match sum {
        ..=64 => -2,
        65..=84 => -1,
        85..=124 => 0,
        125..=164 => 1,
        165..=204 => 2,
        _ => 3 + (sum - 205).div_euclid(80),
    }
}

/// Damage bonus expression from STR+SIZ.
fn damage_bonus(sum: i64) -> String {
    match sum {
        ..=64 => "-2".to_string(),
        65..=84 => "-1".to_string(),
        85..=124 => "0".to_string(),
        125..=164 => "1d4".to_string(),
        165..=204 => "1d6".to_string(),
        _ => format!("{}d6", 2 + (sum - 205).div_euclid(80)),
    }
}

const DAMAGE_BONUS: &str = "伤害加值";

impl CocCard {
    fn attr(&self, aliases: &AliasTable, name: &str) -> i64 {
        stored(&self.props, aliases, name)
            .or_else(|| stored(&self.basic, aliases, name))
            .unwrap_or(0)
    }

    fn stored_maps(&self) -> [(&BTreeMap<String, i64>, EntryCategory); 3] {
        [
            (&self.basic, EntryCategory::Basic),
            (&self.props, EntryCategory::Props),
            (&self.skills, EntryCategory::Skills),
        ]
    }

    /// The map a brand-new key belongs in.
    fn home_for(&mut self, key: &str) -> &mut BTreeMap<String, i64> {
        if BASIC.contains(&key) {
            &mut self.basic
        } else if PROPS.contains(&key) {
            &mut self.props
        } else {
            &mut self.skills
        }
    }
}

impl Sheet for CocCard {
    fn header(&self) -> &CardHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut CardHeader {
        &mut self.header
    }

    fn strip_difficulty<'a>(&self, text: &'a str) -> (Difficulty, &'a str) {
        strip_difficulty(text)
    }

    fn lookup(&self, aliases: &AliasTable, name: &str) -> Option<Found> {
        if let Some(computed) = Computed::find(aliases, name) {
            return Some(Found::new(
                computed.key(),
                computed.value(self, aliases),
                EntryCategory::Computed,
            ));
        }
        let found = scan(&self.stored_maps(), aliases, name)?;
        match Special::find(aliases, name) {
            Some(_) => Some(Found {
                category: EntryCategory::Special,
                ..found
            }),
            None => Some(found),
        }
    }

    fn write(&mut self, aliases: &AliasTable, name: &str, value: i64) -> bool {
        if Computed::find(aliases, name).is_some() {
            return false;
        }
        if let Some(special) = Special::find(aliases, name) {
            let value = special.clamp(self, aliases, value);
            let key = find_key(&self.basic, aliases, name).unwrap_or_else(|| special.key().to_string());
            return write_value(&mut self.basic, key, value);
        }
        for map in [&mut self.basic, &mut self.props, &mut self.skills] {
            if let Some(key) = find_key(map, aliases, name) {
                return write_value(map, key, value);
            }
        }
        let key = aliases.canonical(name);
        write_value(self.home_for(&key), key, value)
    }

    fn remove(&mut self, aliases: &AliasTable, name: &str) -> bool {
        match find_key(&self.skills, aliases, name) {
            Some(key) => self.skills.remove(&key).is_some(),
            None => false,
        }
    }

    fn entries(&self, aliases: &AliasTable) -> Vec<Found> {
        let mut out: Vec<Found> = Computed::ALL
            .into_iter()
            .map(|c| Found::new(c.key(), c.value(self, aliases), EntryCategory::Computed))
            .collect();
        for (map, category) in self.stored_maps() {
            for (key, &value) in map {
                let category = if Special::find(aliases, key).is_some() {
                    EntryCategory::Special
                } else {
                    category
                };
                out.push(Found::new(key.clone(), value, category));
            }
        }
        out
    }

    fn lookup_ability(&self, aliases: &AliasTable, name: &str) -> Option<FoundAbility> {
        if aliases.same_group(DAMAGE_BONUS, name) {
            return Some(FoundAbility {
                key: DAMAGE_BONUS.to_string(),
                expression: damage_bonus(self.attr(aliases, "力量") + self.attr(aliases, "体型")),
                readonly: true,
            });
        }
        scan_abilities(&[&self.abilities], aliases, name)
    }

    fn write_ability(&mut self, aliases: &AliasTable, name: &str, expression: &str) -> bool {
        if aliases.same_group(DAMAGE_BONUS, name) {
            return false;
        }
        write_ability_in(&mut [&mut self.abilities], aliases, name, expression)
    }

    fn remove_ability(&mut self, aliases: &AliasTable, name: &str) -> bool {
        remove_ability_in(&mut [&mut self.abilities], aliases, name)
    }

    fn abilities(&self, aliases: &AliasTable) -> Vec<FoundAbility> {
        let mut out = vec![FoundAbility {
            key: DAMAGE_BONUS.to_string(),
            expression: damage_bonus(self.attr(aliases, "力量") + self.attr(aliases, "体型")),
            readonly: true,
        }];
        out.extend(list_abilities(&[&self.abilities]));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasRegistry;
    use crate::card::{Card, CardData, CardKind};

    fn investigator() -> Card {
        let mut data = CocCard::new("Harvey");
        for (k, v) in [
            ("力量", 60),
            ("体质", 70),
            ("体型", 50),
            ("敏捷", 65),
            ("意志", 55),
        ] {
            data.props.insert(k.to_string(), v);
        }
        data.basic.insert("理智".to_string(), 55);
        data.basic.insert("生命".to_string(), 12);
        data.basic.insert("克苏鲁神话".to_string(), 4);
        Card::new(CardData::Coc(data), &AliasRegistry::builtin())
    }

    #[test]
    fn derived_values() {
        let card = investigator();
        assert_eq!(card.get_entry("hpmax").unwrap().value, 12);
        assert_eq!(card.get_entry("mpmax").unwrap().value, 11);
        assert_eq!(card.get_entry("sanmax").unwrap().value, 95);
        assert_eq!(card.get_entry("build").unwrap().value, 0);
        assert_eq!(card.get_entry("mov").unwrap().value, 9);
    }

    #[test]
    fn build_table_edges() {
        assert_eq!(build(64), -2);
        assert_eq!(build(65), -1);
        assert_eq!(build(124), 0);
        assert_eq!(build(164), 1);
        assert_eq!(build(204), 2);
        assert_eq!(build(205), 3);
        assert_eq!(build(285), 4);
    }

    #[test]
    fn damage_bonus_is_computed_ability() {
        let card = investigator();
        let db = card.get_ability("db").unwrap();
        assert_eq!(db.expression, "0");
        assert!(db.readonly);
        assert_eq!(damage_bonus(170), "1d6");
        assert_eq!(damage_bonus(300), "3d6");
    }

    #[test]
    fn damage_bonus_cannot_be_written() {
        let mut card = investigator();
        assert!(!card.set_ability("伤害加值", "1d4"));
        assert_eq!(card.last_modified(), 0);
    }

    #[test]
    fn hp_clamped_to_maximum() {
        let mut card = investigator();
        assert!(card.set_entry("hp", 5));
        assert_eq!(card.get_entry("生命").unwrap().value, 5);
        assert!(card.set_entry("hp", 40));
        assert_eq!(card.get_entry("生命").unwrap().value, 12);
        assert!(card.set_entry("hp", -3));
        assert_eq!(card.get_entry("生命").unwrap().value, 0);
    }

    #[test]
    fn sanity_clamped_to_sanmax() {
        let mut card = investigator();
        card.set_entry("san", 120);
        let e = card.get_entry("理智").unwrap();
        assert_eq!(e.value, 95);
        assert_eq!(e.category, EntryCategory::Special);
    }

    #[test]
    fn clamped_noop_reports_unchanged() {
        let mut card = investigator();
        assert!(!card.set_entry("生命", 99));
    }

    #[test]
    fn new_fixed_names_land_in_their_category() {
        let mut card = investigator();
        card.set_entry("luck", 40);
        card.set_entry("app", 45);
        card.set_entry("爆破", 20);
        let CardData::Coc(data) = card.data() else {
            panic!("expected coc card");
        };
        assert_eq!(data.basic.get("幸运"), Some(&40));
        assert_eq!(data.props.get("外貌"), Some(&45));
        assert_eq!(data.skills.get("爆破"), Some(&20));
        assert_eq!(card.kind(), CardKind::Coc);
    }

    #[test]
    fn difficulty_prefixes() {
        let card = investigator();
        assert_eq!(card.get_entry("极难力量").unwrap().value, 12);
        assert_eq!(card.get_entry("极限力量").unwrap().value, 12);
        assert_eq!(card.get_entry("Hard str").unwrap().value, 30);
        assert_eq!(card.get_entry("extreme str").unwrap().difficulty, Difficulty::Extreme);
    }

    #[test]
    fn stored_alias_key_is_reused_on_write() {
        let mut data = CocCard::new("x");
        data.skills.insert("spot".to_string(), 30);
        let mut card = Card::new(CardData::Coc(data), &AliasRegistry::builtin());
        card.set_entry("侦察", 35);
        let CardData::Coc(data) = card.data() else {
            panic!("expected coc card");
        };
        assert_eq!(data.skills.len(), 1);
        assert_eq!(data.skills.get("spot"), Some(&35));
    }
}

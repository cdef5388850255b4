//! Card storage as seen by the dispatcher.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use rk_core::{AliasRegistry, Card, CardData, CoreError, CoreResult};

/// Access to the cards of one channel and to which user plays which card.
///
/// Persistence is the provider's business. The dispatcher only reads
/// through this trait, and [`PendingRoll::apply`](crate::PendingRoll::apply)
/// writes through it.
pub trait CardProvider {
    /// The card linked to `user_id`.
    fn card(&self, user_id: &str) -> Option<&Card>;
    /// Mutable access to the card linked to `user_id`.
    fn card_mut(&mut self, user_id: &str) -> Option<&mut Card>;
    /// A card by its unique name.
    fn card_by_name(&self, name: &str) -> Option<&Card>;
    /// Mutable access to a card by its unique name.
    fn card_by_name_mut(&mut self, name: &str) -> Option<&mut Card>;
    /// Name of the card linked to `user_id`.
    fn linked(&self, user_id: &str) -> Option<&str>;
    /// Link `user_id` to the card called `card_name`. Returns false if no
    /// such card exists.
    fn link(&mut self, user_id: &str, card_name: &str) -> bool;
    /// Remove the link of `user_id`. Returns false if there was none.
    fn unlink(&mut self, user_id: &str) -> bool;
}

/// The persisted form of a [`MemoryCards`] store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardFile {
    /// Every card.
    pub cards: Vec<CardData>,
    /// User id to card name.
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

/// An in-memory card store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCards {
    cards: BTreeMap<String, Card>,
    links: HashMap<String, String>,
}

impl MemoryCards {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build cards from persisted data.
    pub fn from_data(
        data: impl IntoIterator<Item = CardData>,
        registry: &AliasRegistry,
    ) -> CoreResult<Self> {
        let mut store = Self::new();
        for d in data {
            store.insert(Card::new(d, registry))?;
        }
        Ok(store)
    }

    /// Load a store from a JSON [`CardFile`]. Links to missing cards are
    /// dropped.
    pub fn from_json(json: &str, registry: &AliasRegistry) -> CoreResult<Self> {
        let file: CardFile = serde_json::from_str(json)?;
        let mut store = Self::from_data(file.cards, registry)?;
        for (user, card) in &file.links {
            if !store.link(user, card) {
                tracing::warn!(user = %user, card = %card, "link to a missing card dropped");
            }
        }
        Ok(store)
    }

    /// Save the store as a JSON [`CardFile`].
    pub fn to_json(&self) -> CoreResult<String> {
        let file = CardFile {
            cards: self.to_data(),
            links: self.links.iter().map(|(u, c)| (u.clone(), c.clone())).collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Add a card. Names are unique.
    pub fn insert(&mut self, card: Card) -> CoreResult<()> {
        let name = card.name().to_string();
        if self.cards.contains_key(&name) {
            return Err(CoreError::DuplicateCard(name));
        }
        self.cards.insert(name, card);
        Ok(())
    }

    /// Remove a card and every link to it.
    pub fn remove(&mut self, name: &str) -> CoreResult<Card> {
        let card = self
            .cards
            .remove(name)
            .ok_or_else(|| CoreError::CardNotFound(name.to_string()))?;
        self.links.retain(|_, linked| linked != name);
        Ok(card)
    }

    /// Every card, ordered by name.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Snapshot of every card for persistence.
    pub fn to_data(&self) -> Vec<CardData> {
        self.cards.values().map(|c| c.data().clone()).collect()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns true if there are no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardProvider for MemoryCards {
    fn card(&self, user_id: &str) -> Option<&Card> {
        let name = self.links.get(user_id)?;
        self.cards.get(name)
    }

    fn card_mut(&mut self, user_id: &str) -> Option<&mut Card> {
        let name = self.links.get(user_id)?;
        self.cards.get_mut(name)
    }

    fn card_by_name(&self, name: &str) -> Option<&Card> {
        self.cards.get(name)
    }

    fn card_by_name_mut(&mut self, name: &str) -> Option<&mut Card> {
        self.cards.get_mut(name)
    }

    fn linked(&self, user_id: &str) -> Option<&str> {
        self.links.get(user_id).map(String::as_str)
    }

    fn link(&mut self, user_id: &str, card_name: &str) -> bool {
        if !self.cards.contains_key(card_name) {
            return false;
        }
        self.links.insert(user_id.to_string(), card_name.to_string());
        true
    }

    fn unlink(&mut self, user_id: &str) -> bool {
        self.links.remove(user_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_core::{CocCard, GeneralCard};

    fn store() -> MemoryCards {
        MemoryCards::from_data(
            [
                CardData::Coc(CocCard::new("Alice")),
                CardData::General(GeneralCard::new("Bob")),
            ],
            &AliasRegistry::builtin(),
        )
        .unwrap()
    }

    #[test]
    fn link_and_lookup() {
        let mut cards = store();
        assert!(cards.card("u1").is_none());
        assert!(cards.link("u1", "Alice"));
        assert_eq!(cards.card("u1").map(Card::name), Some("Alice"));
        assert_eq!(cards.linked("u1"), Some("Alice"));
        assert!(!cards.link("u1", "Nobody"));
        assert_eq!(cards.linked("u1"), Some("Alice"));
    }

    #[test]
    fn unlink() {
        let mut cards = store();
        cards.link("u1", "Bob");
        assert!(cards.unlink("u1"));
        assert!(!cards.unlink("u1"));
        assert!(cards.card("u1").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut cards = store();
        let err = cards
            .insert(Card::new(CardData::General(GeneralCard::new("Bob")), &AliasRegistry::builtin()))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateCard(name) if name == "Bob"));
    }

    #[test]
    fn remove_drops_links() {
        let mut cards = store();
        cards.link("u1", "Alice");
        cards.remove("Alice").unwrap();
        assert!(cards.linked("u1").is_none());
        assert!(cards.remove("Alice").is_err());
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn json_keeps_cards_and_links() {
        let mut cards = store();
        cards.link("u1", "Alice");
        cards.card_mut("u1").unwrap().set_entry("侦察", 55);
        let json = cards.to_json().unwrap();
        let back = MemoryCards::from_json(&json, &AliasRegistry::builtin()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.card("u1").unwrap().get_entry("spot hidden").unwrap().value, 55);
    }

    #[test]
    fn json_drops_dangling_links() {
        let json = r#"{"cards": [], "links": {"u1": "Ghost"}}"#;
        let cards = MemoryCards::from_json(json, &AliasRegistry::builtin()).unwrap();
        assert!(cards.linked("u1").is_none());
        assert!(MemoryCards::from_json("not json", &AliasRegistry::builtin()).is_err());
    }

    #[test]
    fn mutation_through_link() {
        let mut cards = store();
        cards.link("u1", "Alice");
        assert!(cards.card_mut("u1").unwrap().set_entry("侦察", 40));
        assert_eq!(cards.card_by_name("Alice").unwrap().get_entry("侦察").unwrap().value, 40);
        assert_eq!(cards.to_data().len(), 2);
    }
}

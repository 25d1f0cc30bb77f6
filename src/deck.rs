//! Deck construction rules.
//!
//! A deck holds one leader outside of its main body, at most [`MAX_DECK_SIZE`]
//! other cards, and at most [`MAX_COPIES`] cards sharing a base id. Mutators
//! never fail on an illegal addition: the deck is left unchanged and the
//! refusal is reported back as an [`AddOutcome`].

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::DeckError,
    models::{base_id, group_cards, Card, CardColor, CardType, Deck, StackedCard},
};

pub const MAX_DECK_SIZE: usize = 50;
pub const MAX_COPIES: usize = 4;
pub const DEFAULT_DECK_NAME: &str = "New Deck";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    LeaderReplaced,
    Refused(Refusal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    CopyLimit { base_id: String },
    DeckFull,
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refusal::CopyLimit { base_id } => {
                write!(f, "{} already has {} copies", base_id, MAX_COPIES)
            }
            Refusal::DeckFull => write!(f, "deck already has {} cards", MAX_DECK_SIZE),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckStats {
    pub total: usize,
    pub unique: usize,
    pub cost_curve: BTreeMap<u32, usize>,
    pub colors: BTreeMap<CardColor, usize>,
    pub types: BTreeMap<CardType, usize>,
}

impl Deck {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            leader: None,
            cards: Vec::new(),
            description: None,
            is_public: false,
            owner_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_card(&mut self, card: Card) -> AddOutcome {
        if card.is_leader() {
            debug!(deck = %self.id, leader = %card.id, "leader slot replaced");
            self.leader = Some(card);
            return AddOutcome::LeaderReplaced;
        }

        if self.cards.len() >= MAX_DECK_SIZE {
            debug!(deck = %self.id, card = %card.id, "deck full, card refused");
            return AddOutcome::Refused(Refusal::DeckFull);
        }

        let base = card.base_id();
        if self.copies_of(base) >= MAX_COPIES {
            debug!(deck = %self.id, card = %card.id, "copy limit reached, card refused");
            return AddOutcome::Refused(Refusal::CopyLimit {
                base_id: base.to_owned(),
            });
        }

        self.cards.push(card);
        AddOutcome::Added
    }

    /// Removes a single copy with exactly this id. Absent ids are a no-op.
    pub fn remove_card(&mut self, card_id: &str) -> bool {
        match self.cards.iter().position(|c| c.id == card_id) {
            Some(index) => {
                self.cards.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes the whole stack of this exact id, returning how many copies went.
    pub fn remove_all_of_card(&mut self, card_id: &str) -> usize {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != card_id);
        before - self.cards.len()
    }

    pub fn set_leader(&mut self, card: Card) -> Result<(), DeckError> {
        if !card.is_leader() {
            return Err(DeckError::NotALeader {
                id: card.id,
                kind: card.card_type.to_string(),
            });
        }
        self.leader = Some(card);
        Ok(())
    }

    pub fn clear_leader(&mut self) {
        self.leader = None;
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// A copy under a fresh id and timestamps, named `<name> (Copy)`.
    pub fn duplicate(&self) -> Deck {
        let now = Utc::now();
        Deck {
            id: Uuid::new_v4(),
            name: format!("{} (Copy)", self.name),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Copies in the main body sharing this base id.
    pub fn copies_of(&self, base: &str) -> usize {
        self.cards.iter().filter(|c| c.base_id() == base_id(base)).count()
    }

    pub fn stacks(&self) -> Vec<StackedCard> {
        group_cards(&self.cards)
    }

    pub fn is_complete(&self) -> bool {
        self.leader.is_some() && self.cards.len() == MAX_DECK_SIZE
    }

    pub fn stats(&self) -> DeckStats {
        let mut stats = DeckStats {
            total: self.cards.len(),
            unique: self.stacks().len(),
            ..Default::default()
        };
        for card in &self.cards {
            *stats.cost_curve.entry(card.cost).or_default() += 1;
            *stats.colors.entry(card.color).or_default() += 1;
            *stats.types.entry(card.card_type).or_default() += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{card, character, leader};

    #[test]
    fn fifth_copy_of_a_base_id_is_refused() {
        let mut deck = Deck::new(DEFAULT_DECK_NAME);
        let usopp = character("OP01-004");

        for _ in 0..MAX_COPIES {
            assert_eq!(deck.add_card(usopp.clone()), AddOutcome::Added);
        }
        assert_eq!(
            deck.add_card(usopp.clone()),
            AddOutcome::Refused(Refusal::CopyLimit {
                base_id: "OP01-004".to_string()
            })
        );
        assert_eq!(deck.cards.len(), 4);
    }

    #[test]
    fn variants_share_the_base_copy_limit() {
        let mut deck = Deck::new(DEFAULT_DECK_NAME);
        for _ in 0..3 {
            deck.add_card(character("OP01-016"));
        }
        assert_eq!(deck.add_card(character("OP01-016_p1")), AddOutcome::Added);
        assert!(matches!(
            deck.add_card(character("OP01-016_p2")),
            AddOutcome::Refused(Refusal::CopyLimit { .. })
        ));
        assert_eq!(deck.copies_of("OP01-016_p9"), 4);
    }

    #[test]
    fn deck_never_grows_past_fifty() {
        let mut deck = Deck::new(DEFAULT_DECK_NAME);
        for n in 0..60 {
            deck.add_card(character(&format!("OP02-{:03}", n)));
        }
        assert_eq!(deck.cards.len(), MAX_DECK_SIZE);
        assert_eq!(
            deck.add_card(character("OP03-001")),
            AddOutcome::Refused(Refusal::DeckFull)
        );
    }

    #[test]
    fn leaders_go_to_the_leader_slot() {
        let mut deck = Deck::new(DEFAULT_DECK_NAME);
        assert_eq!(deck.add_card(leader("OP01-001")), AddOutcome::LeaderReplaced);
        assert_eq!(deck.add_card(leader("OP01-003")), AddOutcome::LeaderReplaced);
        assert_eq!(deck.leader.as_ref().map(|l| l.id.as_str()), Some("OP01-003"));
        assert!(deck.cards.is_empty());
    }

    #[test]
    fn set_leader_rejects_other_types() {
        let mut deck = Deck::new(DEFAULT_DECK_NAME);
        let err = deck.set_leader(character("OP01-004")).unwrap_err();
        assert_eq!(
            err,
            DeckError::NotALeader {
                id: "OP01-004".to_string(),
                kind: "character".to_string()
            }
        );
        assert!(deck.leader.is_none());
        deck.set_leader(leader("OP01-001")).unwrap();
        assert!(deck.leader.is_some());
    }

    #[test]
    fn remove_one_versus_remove_stack() {
        let mut deck = Deck::new(DEFAULT_DECK_NAME);
        for _ in 0..3 {
            deck.add_card(character("OP01-004"));
        }
        deck.add_card(character("OP01-004_p1"));

        assert!(deck.remove_card("OP01-004"));
        assert_eq!(deck.cards.len(), 3);
        assert_eq!(deck.remove_all_of_card("OP01-004"), 2);
        assert_eq!(deck.cards.len(), 1);
        assert_eq!(deck.cards[0].id, "OP01-004_p1");
        assert!(!deck.remove_card("OP09-999"));
        assert_eq!(deck.remove_all_of_card("OP09-999"), 0);
    }

    #[test]
    fn duplicate_gets_fresh_identity() {
        let mut deck = Deck::new("Red Zoro");
        deck.add_card(leader("OP01-001"));
        deck.add_card(character("OP01-004"));

        let copy = deck.duplicate();
        assert_ne!(copy.id, deck.id);
        assert_eq!(copy.name, "Red Zoro (Copy)");
        assert_eq!(copy.leader, deck.leader);
        assert_eq!(copy.cards, deck.cards);
        assert!(copy.created_at >= deck.created_at);
    }

    #[test]
    fn stats_count_curve_colors_and_types() {
        let mut deck = Deck::new(DEFAULT_DECK_NAME);
        deck.add_card(leader("OP01-001"));
        deck.add_card(card("OP01-004", CardType::Character, CardColor::Red, 2));
        deck.add_card(card("OP01-004", CardType::Character, CardColor::Red, 2));
        deck.add_card(card("OP01-029", CardType::Event, CardColor::Green, 1));

        let stats = deck.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.cost_curve.get(&2), Some(&2));
        assert_eq!(stats.colors.get(&CardColor::Green), Some(&1));
        assert_eq!(stats.types.get(&CardType::Event), Some(&1));
        assert!(!deck.is_complete());
    }
}

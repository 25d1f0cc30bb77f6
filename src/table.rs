//! Single-player play-test table: a shuffled deck dealt into hand and life,
//! a Don deck feeding the cost area, and free movement of cards between
//! zones. No game rules beyond where a card may move are enforced.

use rand::{seq::SliceRandom, SeedableRng};
use rand_pcg::Pcg64Mcg;
use tracing::debug;

use crate::{
    error::TableError,
    models::{Card, CardType, Deck},
};

pub const STARTING_HAND: usize = 5;
pub const DEFAULT_LIFE: usize = 5;
pub const DON_DECK_SIZE: usize = 10;

pub type InstanceId = u32;

/// One physical copy of a card on the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CardInstance {
    pub instance_id: InstanceId,
    pub card: Card,
    pub rested: bool,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub leader: Option<CardInstance>,
    /// Top of the deck is index 0.
    pub deck: Vec<CardInstance>,
    pub hand: Vec<CardInstance>,
    /// Face-down life cards, top first.
    pub life: Vec<CardInstance>,
    pub characters: Vec<CardInstance>,
    pub stage: Option<CardInstance>,
    pub trash: Vec<CardInstance>,
    pub don_deck: usize,
    pub don_active: usize,
    pub don_rested: usize,
    rng: Pcg64Mcg,
    next_instance: InstanceId,
}

impl Table {
    pub fn new(deck: &Deck, seed: u64) -> Self {
        let mut table = Table {
            leader: None,
            deck: Vec::new(),
            hand: Vec::new(),
            life: Vec::new(),
            characters: Vec::new(),
            stage: None,
            trash: Vec::new(),
            don_deck: DON_DECK_SIZE,
            don_active: 0,
            don_rested: 0,
            rng: Pcg64Mcg::seed_from_u64(seed),
            next_instance: 1,
        };

        table.leader = deck.leader.clone().map(|card| table.instance(card));
        table.deck = deck
            .cards
            .iter()
            .cloned()
            .map(|card| table.instance(card))
            .collect();
        table.shuffle();

        let life = deck
            .leader
            .as_ref()
            .and_then(|l| l.life)
            .map_or(DEFAULT_LIFE, |life| life as usize);
        let hand = table.take_top(STARTING_HAND);
        table.hand = hand;
        table.life = table.take_top(life);

        debug!(
            deck = %deck.id,
            hand = table.hand.len(),
            life = table.life.len(),
            remaining = table.deck.len(),
            "table set up"
        );
        table
    }

    fn instance(&mut self, card: Card) -> CardInstance {
        let instance_id = self.next_instance;
        self.next_instance += 1;
        CardInstance {
            instance_id,
            card,
            rested: false,
        }
    }

    fn take_top(&mut self, count: usize) -> Vec<CardInstance> {
        let count = count.min(self.deck.len());
        self.deck.drain(..count).collect()
    }

    pub fn shuffle(&mut self) {
        self.deck.shuffle(&mut self.rng);
    }

    pub fn peek_top(&self) -> Option<&CardInstance> {
        self.deck.first()
    }

    pub fn draw(&mut self) -> Result<&CardInstance, TableError> {
        if self.deck.is_empty() {
            return Err(TableError::DeckEmpty);
        }
        let card = self.deck.remove(0);
        self.hand.push(card);
        Ok(&self.hand[self.hand.len() - 1])
    }

    pub fn take_life(&mut self) -> Result<&CardInstance, TableError> {
        if self.life.is_empty() {
            return Err(TableError::NoLife);
        }
        let card = self.life.remove(0);
        self.hand.push(card);
        Ok(&self.hand[self.hand.len() - 1])
    }

    /// Moves a card from hand to the zone its type plays to. Events resolve
    /// straight into the trash; a new stage trashes the old one.
    pub fn play(&mut self, instance_id: InstanceId) -> Result<(), TableError> {
        let index = self
            .hand
            .iter()
            .position(|c| c.instance_id == instance_id)
            .ok_or(TableError::UnknownInstance(instance_id))?;

        match self.hand[index].card.card_type {
            CardType::Character => {
                let card = self.hand.remove(index);
                self.characters.push(card);
            }
            CardType::Stage => {
                let card = self.hand.remove(index);
                if let Some(old) = self.stage.replace(card) {
                    self.trash.push(old);
                }
            }
            CardType::Event => {
                let card = self.hand.remove(index);
                self.trash.push(card);
            }
            CardType::Leader | CardType::Don => {
                return Err(TableError::NotPlayable(self.hand[index].card.id.clone()));
            }
        }
        Ok(())
    }

    /// Moves a card from hand, the character area or the stage slot to the trash.
    pub fn trash(&mut self, instance_id: InstanceId) -> Result<(), TableError> {
        let by_id = |c: &CardInstance| c.instance_id == instance_id;
        let mut card = if let Some(index) = self.hand.iter().position(by_id) {
            self.hand.remove(index)
        } else if let Some(index) = self.characters.iter().position(by_id) {
            self.characters.remove(index)
        } else if self.stage.as_ref().is_some_and(by_id) {
            self.stage.take().ok_or(TableError::UnknownInstance(instance_id))?
        } else {
            return Err(TableError::UnknownInstance(instance_id));
        };
        card.rested = false;
        self.trash.push(card);
        Ok(())
    }

    /// Moves up to `count` Don cards into the cost area, returning how many moved.
    pub fn add_don(&mut self, count: usize) -> Result<usize, TableError> {
        if self.don_deck == 0 {
            return Err(TableError::DonDeckEmpty);
        }
        let moved = count.min(self.don_deck);
        self.don_deck -= moved;
        self.don_active += moved;
        Ok(moved)
    }

    /// Rests up to `count` active Don, returning how many were rested.
    pub fn rest_don(&mut self, count: usize) -> usize {
        let rested = count.min(self.don_active);
        self.don_active -= rested;
        self.don_rested += rested;
        rested
    }

    /// Stands up to `count` rested Don, returning how many were activated.
    pub fn activate_don(&mut self, count: usize) -> usize {
        let activated = count.min(self.don_rested);
        self.don_rested -= activated;
        self.don_active += activated;
        activated
    }

    fn field_card_mut(&mut self, instance_id: InstanceId) -> Option<&mut CardInstance> {
        self.leader
            .iter_mut()
            .chain(self.characters.iter_mut())
            .chain(self.stage.iter_mut())
            .find(|c| c.instance_id == instance_id)
    }

    pub fn rest(&mut self, instance_id: InstanceId) -> Result<(), TableError> {
        self.field_card_mut(instance_id)
            .ok_or(TableError::UnknownInstance(instance_id))?
            .rested = true;
        Ok(())
    }

    pub fn activate(&mut self, instance_id: InstanceId) -> Result<(), TableError> {
        self.field_card_mut(instance_id)
            .ok_or(TableError::UnknownInstance(instance_id))?
            .rested = false;
        Ok(())
    }

    /// Start-of-turn refresh: everything stands up again.
    pub fn refresh(&mut self) {
        for card in self
            .leader
            .iter_mut()
            .chain(self.characters.iter_mut())
            .chain(self.stage.iter_mut())
        {
            card.rested = false;
        }
        self.don_active += self.don_rested;
        self.don_rested = 0;
    }

    /// Cards of the main deck currently on the table, in any zone.
    pub fn card_count(&self) -> usize {
        self.deck.len()
            + self.hand.len()
            + self.life.len()
            + self.characters.len()
            + usize::from(self.stage.is_some())
            + self.trash.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        fixtures::{card, character, leader},
        CardColor,
    };

    fn full_deck() -> Deck {
        let mut deck = Deck::new("Table");
        deck.add_card(leader("OP01-001"));
        for n in 0..12 {
            for _ in 0..4 {
                deck.add_card(character(&format!("OP01-{:03}", n + 10)));
            }
        }
        deck.add_card(card("OP01-086", CardType::Event, CardColor::Red, 1));
        deck.add_card(card("OP01-097", CardType::Stage, CardColor::Red, 1));
        deck
    }

    #[test]
    fn setup_deals_hand_life_and_don() {
        let deck = full_deck();
        let table = Table::new(&deck, 7);
        assert_eq!(table.hand.len(), STARTING_HAND);
        assert_eq!(table.life.len(), 5);
        assert_eq!(table.deck.len(), 40);
        assert_eq!(table.don_deck, DON_DECK_SIZE);
        assert_eq!(table.card_count(), 50);
        assert!(table.leader.is_some());
    }

    #[test]
    fn same_seed_same_order() {
        let deck = full_deck();
        let a = Table::new(&deck, 42);
        let b = Table::new(&deck, 42);
        let ids = |t: &Table| t.deck.iter().map(|c| c.instance_id).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn instance_ids_are_unique() {
        let table = Table::new(&full_deck(), 1);
        let mut ids: Vec<_> = table
            .deck
            .iter()
            .chain(&table.hand)
            .chain(&table.life)
            .chain(table.leader.iter())
            .map(|c| c.instance_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 51);
    }

    #[test]
    fn small_decks_deal_what_they_have() {
        let mut deck = Deck::new("tiny");
        deck.add_card(character("OP01-010"));
        deck.add_card(character("OP01-011"));
        let mut table = Table::new(&deck, 3);
        assert_eq!(table.hand.len(), 2);
        assert!(table.life.is_empty());
        assert_eq!(table.draw().unwrap_err(), TableError::DeckEmpty);
        assert_eq!(table.take_life().unwrap_err(), TableError::NoLife);
    }

    #[test]
    fn cards_move_between_zones() {
        let mut table = Table::new(&full_deck(), 9);
        // Put the stage, then the event, on top so the draws are known.
        let mut pool: Vec<CardInstance> = table
            .hand
            .drain(..)
            .chain(table.life.drain(..))
            .chain(table.deck.drain(..))
            .collect();
        pool.sort_by_key(|c| match c.card.card_type {
            CardType::Stage => 0,
            CardType::Event => 1,
            _ => 2,
        });
        table.deck = pool;

        let stage = table.draw().unwrap().instance_id;
        table.play(stage).unwrap();
        assert_eq!(table.stage.as_ref().map(|s| s.instance_id), Some(stage));

        let event = table.draw().unwrap().instance_id;
        table.play(event).unwrap();
        assert_eq!(table.trash.len(), 1);

        let character = table.draw().unwrap().instance_id;
        table.play(character).unwrap();
        assert_eq!(table.characters.len(), 1);
        table.rest(character).unwrap();
        table.trash(character).unwrap();
        assert!(table.characters.is_empty());
        assert!(!table.trash.last().unwrap().rested);

        table.trash(stage).unwrap();
        assert!(table.stage.is_none());
        assert_eq!(table.trash.len(), 3);
        assert_eq!(table.card_count(), 50);
        assert_eq!(table.trash(stage).unwrap_err(), TableError::UnknownInstance(stage));
    }

    #[test]
    fn leader_cannot_be_played_from_hand() {
        let mut table = Table::new(&full_deck(), 5);
        let leader_id = table.leader.as_ref().unwrap().instance_id;
        assert_eq!(
            table.play(leader_id).unwrap_err(),
            TableError::UnknownInstance(leader_id)
        );
    }

    #[test]
    fn don_and_resting_cycle() {
        let mut table = Table::new(&full_deck(), 11);
        assert_eq!(table.add_don(2).unwrap(), 2);
        assert_eq!(table.add_don(20).unwrap(), 8);
        assert_eq!(table.add_don(1).unwrap_err(), TableError::DonDeckEmpty);
        assert_eq!(table.rest_don(3), 3);
        assert_eq!((table.don_active, table.don_rested), (7, 3));
        assert_eq!(table.activate_don(1), 1);
        assert_eq!((table.don_active, table.don_rested), (8, 2));
        assert_eq!(table.activate_don(5), 2);
        assert_eq!(table.activate_don(1), 0);
        assert_eq!(table.rest_don(3), 3);

        let leader_id = table.leader.as_ref().unwrap().instance_id;
        table.rest(leader_id).unwrap();
        assert!(table.leader.as_ref().unwrap().rested);

        table.refresh();
        assert!(!table.leader.as_ref().unwrap().rested);
        assert_eq!((table.don_active, table.don_rested), (10, 0));

        let in_hand = table.hand[0].instance_id;
        assert_eq!(
            table.rest(in_hand).unwrap_err(),
            TableError::UnknownInstance(in_hand)
        );
    }

    #[test]
    fn take_life_moves_top_life_to_hand() {
        let mut table = Table::new(&full_deck(), 13);
        let top = table.life[0].instance_id;
        let taken = table.take_life().unwrap().instance_id;
        assert_eq!(taken, top);
        assert_eq!(table.life.len(), 4);
        assert_eq!(table.hand.len(), 6);
    }
}

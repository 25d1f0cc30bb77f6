//! Deck formula codec: one `<quantity>x<cardId>` line per distinct card.
//!
//! ```text
//! 1xOP01-001
//! 4xOP01-016
//! 2xOP01-016_p1
//! ```
//!
//! Parsing and resolving are all-or-nothing. The first bad line or unknown id
//! fails the whole import.

use std::{collections::HashMap, sync::OnceLock};

use regex::Regex;

use crate::{
    deck::{MAX_COPIES, MAX_DECK_SIZE},
    error::FormulaError,
    models::{group_cards, Card},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRef {
    pub id: String,
    pub quantity: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDeck {
    pub leader: Option<Card>,
    pub cards: Vec<Card>,
}

fn line_pattern() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^(\d+)x([A-Z]+\d{2}-\d{3}(?:_[A-Za-z0-9]+)?)$")
            .expect("valid formula regex")
    })
}

pub fn export(leader: Option<&Card>, cards: &[Card]) -> String {
    let mut lines = Vec::new();
    if let Some(leader) = leader {
        lines.push(format!("1x{}", leader.id));
    }
    for stack in group_cards(cards) {
        lines.push(format!("{}x{}", stack.count, stack.card.id));
    }
    lines.join("\n")
}

pub fn parse(text: &str) -> Result<Vec<CardRef>, FormulaError> {
    let mut refs = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(captures) = line_pattern().captures(line) else {
            return Err(FormulaError::InvalidLine {
                line: line.to_owned(),
            });
        };

        let quantity = captures[1]
            .parse::<usize>()
            .ok()
            .filter(|q| (1..=MAX_COPIES).contains(q))
            .ok_or_else(|| FormulaError::InvalidQuantity {
                line: line.to_owned(),
            })?;

        refs.push(CardRef {
            id: captures[2].to_owned(),
            quantity,
        });
    }
    Ok(refs)
}

pub fn resolve(refs: &[CardRef], catalog: &[Card]) -> Result<ImportedDeck, FormulaError> {
    let mut leader: Option<Card> = None;
    let mut cards = Vec::new();
    let mut copies: HashMap<String, usize> = HashMap::new();

    for card_ref in refs {
        let card = catalog
            .iter()
            .find(|c| c.id == card_ref.id)
            .ok_or_else(|| FormulaError::CardNotFound {
                id: card_ref.id.clone(),
            })?;

        if card.is_leader() {
            if card_ref.quantity > 1 {
                return Err(FormulaError::LeaderQuantity {
                    id: card.id.clone(),
                });
            }
            if let Some(first) = &leader {
                return Err(FormulaError::MultipleLeaders {
                    first: first.id.clone(),
                    second: card.id.clone(),
                });
            }
            leader = Some(card.clone());
            continue;
        }

        let count = copies.entry(card.base_id().to_owned()).or_default();
        *count += card_ref.quantity;
        if *count > MAX_COPIES {
            return Err(FormulaError::CopyLimit {
                base_id: card.base_id().to_owned(),
            });
        }

        cards.extend(std::iter::repeat(card.clone()).take(card_ref.quantity));
    }

    if cards.len() > MAX_DECK_SIZE {
        return Err(FormulaError::TooManyCards { count: cards.len() });
    }

    Ok(ImportedDeck { leader, cards })
}

pub fn import(text: &str, catalog: &[Card]) -> Result<ImportedDeck, FormulaError> {
    resolve(&parse(text)?, catalog)
}

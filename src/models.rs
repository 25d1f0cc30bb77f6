use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Black,
}

impl CardColor {
    pub const ALL: [CardColor; 6] = [
        CardColor::Red,
        CardColor::Blue,
        CardColor::Green,
        CardColor::Yellow,
        CardColor::Purple,
        CardColor::Black,
    ];

    /// Case-insensitive lookup against the fixed color set.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardColor::Red => "red",
            CardColor::Blue => "blue",
            CardColor::Green => "green",
            CardColor::Yellow => "yellow",
            CardColor::Purple => "purple",
            CardColor::Black => "black",
        }
    }
}

impl fmt::Display for CardColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Leader,
    Character,
    Event,
    Stage,
    Don,
}

impl CardType {
    pub const ALL: [CardType; 5] = [
        CardType::Leader,
        CardType::Character,
        CardType::Event,
        CardType::Stage,
        CardType::Don,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Leader => "leader",
            CardType::Character => "character",
            CardType::Event => "event",
            CardType::Stage => "stage",
            CardType::Don => "don",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog entry. Immutable once normalized.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub color: CardColor,
    #[serde(rename = "type")]
    pub card_type: CardType,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub power: Option<u32>,
    #[serde(default)]
    pub counter: Option<u32>,
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub life: Option<u32>,
    #[serde(default)]
    pub rarity: String,
    #[serde(default)]
    pub set_id: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub img_url: String,
}

impl Card {
    /// The id with any `_variant` promo suffix removed.
    pub fn base_id(&self) -> &str {
        base_id(&self.id)
    }

    pub fn is_leader(&self) -> bool {
        self.card_type == CardType::Leader
    }
}

pub fn base_id(id: &str) -> &str {
    match id.split_once('_') {
        Some((base, _)) => base,
        None => id,
    }
}

pub fn image_path(id: &str) -> String {
    format!("/data/en/images/{}.png", id)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub leader: Option<Card>,
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackedCard {
    pub card: Card,
    pub count: usize,
}

/// Collapse repeated ids into stacks, keeping first-encountered order.
pub fn group_cards(cards: &[Card]) -> Vec<StackedCard> {
    let mut stacks: Vec<StackedCard> = Vec::new();
    for card in cards {
        match stacks.iter_mut().find(|s| s.card.id == card.id) {
            Some(stack) => stack.count += 1,
            None => stacks.push(StackedCard {
                card: card.clone(),
                count: 1,
            }),
        }
    }
    stacks
}

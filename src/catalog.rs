use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::CatalogError,
    models::{base_id, image_path, Card, CardColor, CardType},
};

/// Where the card catalog document is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Url(String),
    File(PathBuf),
}

impl CatalogSource {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            CatalogSource::Url(raw.to_owned())
        } else {
            CatalogSource::File(PathBuf::from(raw))
        }
    }

    fn describe(&self) -> String {
        match self {
            CatalogSource::Url(url) => url.clone(),
            CatalogSource::File(path) => path.display().to_string(),
        }
    }
}

/// How repeated card ids across sets are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    FirstWins,
    /// The later record's content replaces the earlier one, keeping the earlier position.
    LastWins,
    KeepAll,
}

impl DuplicatePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "first" => Some(DuplicatePolicy::FirstWins),
            "last" => Some(DuplicatePolicy::LastWins),
            "all" => Some(DuplicatePolicy::KeepAll),
            _ => None,
        }
    }
}

/// Raw record as it appears in the catalog. Field names and shapes vary
/// between dumps, so every field is kept as a loose JSON value and read
/// through [`as_text`], [`as_texts`] or [`as_count`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCard {
    id: Option<Value>,
    name: Option<Value>,
    colors: Option<Value>,
    color: Option<Value>,
    category: Option<Value>,
    #[serde(rename = "type")]
    card_type: Option<Value>,
    cost: Option<Value>,
    power: Option<Value>,
    counter: Option<Value>,
    life: Option<Value>,
    rarity: Option<Value>,
    attributes: Option<Value>,
    attribute: Option<Value>,
    effect: Option<Value>,
    trigger: Option<Value>,
    set_id: Option<Value>,
    card_number: Option<Value>,
    img_url: Option<Value>,
}

pub async fn fetch_catalog(
    source: &CatalogSource,
    policy: DuplicatePolicy,
) -> Result<Vec<Card>, CatalogError> {
    info!(source = %source.describe(), "fetching card catalog");
    let body = match source {
        CatalogSource::Url(url) => {
            let fetch_error = |e: reqwest::Error| CatalogError::Fetch {
                source_name: url.clone(),
                message: e.to_string(),
            };
            reqwest::get(url)
                .await
                .and_then(|res| res.error_for_status())
                .map_err(fetch_error)?
                .text()
                .await
                .map_err(fetch_error)?
        }
        CatalogSource::File(path) => tokio::fs::read_to_string(path).await?,
    };

    let cards = parse_catalog(&body, policy)?;
    info!(count = cards.len(), "card catalog loaded");
    Ok(cards)
}

pub fn parse_catalog(json: &str, policy: DuplicatePolicy) -> Result<Vec<Card>, CatalogError> {
    let document: Value = serde_json::from_str(json)?;
    if !document.get("card_sets").is_some_and(Value::is_object) {
        return Err(CatalogError::MissingSets);
    }
    Ok(normalize_with(&document, policy))
}

/// Normalize a catalog document, keeping the first record of any repeated id.
pub fn normalize(document: &Value) -> Vec<Card> {
    normalize_with(document, DuplicatePolicy::FirstWins)
}

pub fn normalize_with(document: &Value, policy: DuplicatePolicy) -> Vec<Card> {
    let Some(sets) = document.get("card_sets").and_then(Value::as_object) else {
        warn!("catalog document has no card_sets object");
        return Vec::new();
    };

    let mut cards: Vec<Card> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (set_name, set) in sets {
        // Sets are either `{ "cards": [...] }` or a bare list.
        let records = match set.get("cards").unwrap_or(set).as_array() {
            Some(records) => records,
            None => {
                warn!(set = %set_name, "card set has no card list, skipping");
                continue;
            }
        };

        for record in records {
            let Some(card) = normalize_record(record) else {
                continue;
            };

            match (policy, positions.get(&card.id)) {
                (DuplicatePolicy::FirstWins, Some(_)) => {
                    debug!(id = %card.id, set = %set_name, "duplicate card id ignored");
                }
                (DuplicatePolicy::LastWins, Some(&index)) => {
                    debug!(
                        id = %card.id,
                        set = %set_name,
                        "duplicate card id replaces earlier record"
                    );
                    cards[index] = card;
                }
                _ => {
                    positions.entry(card.id.clone()).or_insert(cards.len());
                    cards.push(card);
                }
            }
        }
    }

    cards
}

fn normalize_record(record: &Value) -> Option<Card> {
    let raw: RawCard = match serde_json::from_value(record.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("malformed card record dropped: {}", e);
            return None;
        }
    };

    let Some(id) = text(&raw.id).filter(|id| !id.trim().is_empty()) else {
        warn!("card record without an id dropped");
        return None;
    };
    let name = text(&raw.name).unwrap_or_default();

    let raw_color = texts(&raw.colors)
        .into_iter()
        .next()
        .or_else(|| texts(&raw.color).into_iter().next());
    let Some(color) = raw_color.as_deref().and_then(CardColor::parse) else {
        warn!(id = %id, color = ?raw_color, "card with unrecognized color dropped");
        return None;
    };

    let raw_type = text(&raw.category).or_else(|| text(&raw.card_type));
    let Some(card_type) = raw_type.as_deref().and_then(CardType::parse) else {
        warn!(id = %id, card_type = ?raw_type, "card with unrecognized type dropped");
        return None;
    };

    let raw_cost = raw.cost.as_ref().and_then(as_count);
    let raw_life = raw.life.as_ref().and_then(as_count);
    // Leader dumps carry the starting life in the cost column.
    let (cost, life) = if card_type == CardType::Leader {
        match raw_life {
            Some(life) => (raw_cost.unwrap_or(0), Some(life)),
            None => (0, raw_cost),
        }
    } else {
        (raw_cost.unwrap_or(0), None)
    };

    let (derived_set, derived_number) = match base_id(&id).split_once('-') {
        Some((set, number)) => (set.to_owned(), number.to_owned()),
        None => (base_id(&id).to_owned(), String::new()),
    };

    let attribute = match texts(&raw.attributes) {
        attributes if !attributes.is_empty() => attributes.join(", "),
        _ => texts(&raw.attribute).join(", "),
    };

    let img_url = text(&raw.img_url)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| image_path(&id));

    Some(Card {
        name,
        color,
        card_type,
        cost,
        power: raw.power.as_ref().and_then(as_count),
        counter: raw.counter.as_ref().and_then(as_count),
        attribute,
        effect: text(&raw.effect).unwrap_or_default(),
        trigger: text(&raw.trigger).unwrap_or_default(),
        life,
        rarity: text(&raw.rarity).unwrap_or_default(),
        set_id: text(&raw.set_id).unwrap_or(derived_set),
        card_number: text(&raw.card_number).unwrap_or(derived_number),
        img_url,
        id,
    })
}

/// A string, or a number or boolean written out; lists and objects are "no value".
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// One value or a list of values, as text.
fn as_texts(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_text).collect(),
        other => as_text(other).into_iter().collect(),
    }
}

fn text(field: &Option<Value>) -> Option<String> {
    field.as_ref().and_then(as_text)
}

fn texts(field: &Option<Value>) -> Vec<String> {
    field.as_ref().map(as_texts).unwrap_or_default()
}

/// Non-negative integer from a JSON number or numeric string; anything else is "no value".
fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to fetch catalog from {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog document has no card sets")]
    MissingSets,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("{id} is a {kind} card and cannot be the leader")]
    NotALeader { id: String, kind: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Invalid format in line: {line}. Expected format: \"4xOP01-001\"")]
    InvalidLine { line: String },

    #[error("Invalid quantity in line: {line}. Must be between 1 and 4.")]
    InvalidQuantity { line: String },

    #[error("Card not found: {id}")]
    CardNotFound { id: String },

    #[error("Cannot have more than 1 leader card: {id}")]
    LeaderQuantity { id: String },

    #[error("Deck formula names more than one leader: {first} and {second}")]
    MultipleLeaders { first: String, second: String },

    #[error("Deck formula has more than 4 copies of {base_id}")]
    CopyLimit { base_id: String },

    #[error("Deck formula has {count} cards, the limit is 50")]
    TooManyCards { count: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Deck store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deck store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deck service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Deck {0} belongs to another user")]
    Forbidden(Uuid),

    #[error("Deck service returned an unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(
        "Saved decks file {} is unreadable ({reason}); moved aside to {}",
        .path.display(),
        .backup.display()
    )]
    CorruptFile {
        path: PathBuf,
        backup: PathBuf,
        reason: String,
    },

    #[error("{primary}; fallback store also failed: {fallback}")]
    Exhausted {
        primary: Box<StoreError>,
        fallback: Box<StoreError>,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to determine project directories")]
    NoProjectDirs,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Card instance {0} is not in a zone it can be moved from")]
    UnknownInstance(u32),

    #[error("The deck is empty")]
    DeckEmpty,

    #[error("No life cards remain")]
    NoLife,

    #[error("The Don deck is empty")]
    DonDeckEmpty,

    #[error("{0} cannot be played to the field")]
    NotPlayable(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No deck selected")]
    NoDeckSelected,

    #[error("Saved deck {0} not found")]
    DeckNotFound(Uuid),

    #[error("The card catalog has not been loaded")]
    CatalogNotLoaded,

    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error(transparent)]
    Formula(#[from] FormulaError),
}

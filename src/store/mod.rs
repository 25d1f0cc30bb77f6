//! Durable deck storage.
//!
//! The engine only talks to [`DeckStore`]. [`LocalDeckStore`] keeps every deck
//! in one JSON file, [`RemoteDeckStore`] talks to a PostgREST deck table scoped
//! by owner, and [`FallbackStore`] chains two stores so a failing primary
//! degrades to the secondary with a warning instead of losing the deck.

mod local;
mod remote;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

pub use local::{LocalDeckStore, SAVED_DECKS_KEY};
pub use remote::{RemoteConfig, RemoteDeckStore};

use crate::{
    error::StoreError,
    models::{Card, Deck},
};

/// Whose decks an operation may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// This device only, no authenticated user.
    Local,
    User(Uuid),
}

impl OwnerScope {
    pub fn permits(&self, deck: &Deck) -> bool {
        match (self, deck.owner_id) {
            (OwnerScope::Local, _) | (OwnerScope::User(_), None) => true,
            (OwnerScope::User(user), Some(owner)) => *user == owner,
        }
    }
}

/// A partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckPatch {
    pub name: Option<String>,
    pub leader: Option<Option<Card>>,
    pub cards: Option<Vec<Card>>,
    pub description: Option<Option<String>>,
    pub is_public: Option<bool>,
}

impl DeckPatch {
    pub fn from_deck(deck: &Deck) -> Self {
        Self {
            name: Some(deck.name.clone()),
            leader: Some(deck.leader.clone()),
            cards: Some(deck.cards.clone()),
            description: Some(deck.description.clone()),
            is_public: Some(deck.is_public),
        }
    }

    pub fn apply_to(&self, deck: &mut Deck) {
        if let Some(name) = &self.name {
            deck.name = name.clone();
        }
        if let Some(leader) = &self.leader {
            deck.leader = leader.clone();
        }
        if let Some(cards) = &self.cards {
            deck.cards = cards.clone();
        }
        if let Some(description) = &self.description {
            deck.description = description.clone();
        }
        if let Some(is_public) = self.is_public {
            deck.is_public = is_public;
        }
        deck.touch();
    }
}

pub trait DeckStore {
    fn name(&self) -> &'static str;

    fn list(&mut self, owner: &OwnerScope) -> Result<Vec<Deck>, StoreError>;

    fn get(&mut self, id: Uuid) -> Result<Option<Deck>, StoreError>;

    fn create(&mut self, deck: Deck) -> Result<Deck, StoreError>;

    fn update(&mut self, id: Uuid, patch: DeckPatch) -> Result<Option<Deck>, StoreError>;

    fn delete(&mut self, id: Uuid, owner: &OwnerScope) -> Result<bool, StoreError>;

    /// Non-fatal warnings collected since the last call.
    fn drain_warnings(&mut self) -> Vec<String> {
        Vec::new()
    }
}

impl<S: DeckStore + ?Sized> DeckStore for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list(&mut self, owner: &OwnerScope) -> Result<Vec<Deck>, StoreError> {
        (**self).list(owner)
    }

    fn get(&mut self, id: Uuid) -> Result<Option<Deck>, StoreError> {
        (**self).get(id)
    }

    fn create(&mut self, deck: Deck) -> Result<Deck, StoreError> {
        (**self).create(deck)
    }

    fn update(&mut self, id: Uuid, patch: DeckPatch) -> Result<Option<Deck>, StoreError> {
        (**self).update(id, patch)
    }

    fn delete(&mut self, id: Uuid, owner: &OwnerScope) -> Result<bool, StoreError> {
        (**self).delete(id, owner)
    }

    fn drain_warnings(&mut self) -> Vec<String> {
        (**self).drain_warnings()
    }
}

/// Overwrite-by-id save: update when the store knows the id, create otherwise.
pub fn save_deck(store: &mut dyn DeckStore, deck: &Deck) -> Result<Deck, StoreError> {
    let mut deck = deck.clone();
    deck.updated_at = Utc::now();

    if store.get(deck.id)?.is_some() {
        if let Some(updated) = store.update(deck.id, DeckPatch::from_deck(&deck))? {
            debug!(deck = %deck.id, store = store.name(), "deck updated");
            return Ok(updated);
        }
    }
    let created = store.create(deck)?;
    debug!(deck = %created.id, store = store.name(), "deck created");
    Ok(created)
}

pub struct FallbackStore<P, F> {
    primary: P,
    fallback: F,
    warnings: Vec<String>,
}

impl<P: DeckStore, F: DeckStore> FallbackStore<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            warnings: Vec::new(),
        }
    }

    fn attempt<T>(
        &mut self,
        operation: &str,
        mut run: impl FnMut(&mut dyn DeckStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match run(&mut self.primary) {
            Ok(value) => Ok(value),
            Err(primary_err) => {
                warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %primary_err,
                    "{} failed, falling back",
                    operation
                );
                self.warnings.push(format!(
                    "{} store unavailable ({}); using {} store",
                    self.primary.name(),
                    primary_err,
                    self.fallback.name()
                ));
                run(&mut self.fallback).map_err(|fallback_err| StoreError::Exhausted {
                    primary: Box::new(primary_err),
                    fallback: Box::new(fallback_err),
                })
            }
        }
    }
}

impl<P: DeckStore, F: DeckStore> DeckStore for FallbackStore<P, F> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn list(&mut self, owner: &OwnerScope) -> Result<Vec<Deck>, StoreError> {
        self.attempt("list", |store| store.list(owner))
    }

    fn get(&mut self, id: Uuid) -> Result<Option<Deck>, StoreError> {
        self.attempt("get", |store| store.get(id))
    }

    fn create(&mut self, deck: Deck) -> Result<Deck, StoreError> {
        self.attempt("create", |store| store.create(deck.clone()))
    }

    fn update(&mut self, id: Uuid, patch: DeckPatch) -> Result<Option<Deck>, StoreError> {
        self.attempt("update", |store| store.update(id, patch.clone()))
    }

    fn delete(&mut self, id: Uuid, owner: &OwnerScope) -> Result<bool, StoreError> {
        self.attempt("delete", |store| store.delete(id, owner))
    }

    fn drain_warnings(&mut self) -> Vec<String> {
        let mut warnings = std::mem::take(&mut self.warnings);
        warnings.extend(self.primary.drain_warnings());
        warnings.extend(self.fallback.drain_warnings());
        warnings
    }
}

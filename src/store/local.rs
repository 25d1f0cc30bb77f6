use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use super::{DeckPatch, DeckStore, OwnerScope};
use crate::{error::StoreError, models::Deck};

/// Namespace of the single entry holding every saved deck.
pub const SAVED_DECKS_KEY: &str = "optcg_saved_decks";

/// Saved decks as one JSON array in `<dir>/optcg_saved_decks.json`.
#[derive(Debug, Clone)]
pub struct LocalDeckStore {
    path: PathBuf,
}

impl LocalDeckStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", SAVED_DECKS_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries that don't look like a deck are dropped instead of failing the load.
    /// A file that can't be parsed at all is moved aside and reported, never
    /// overwritten.
    fn load(&self) -> Result<Vec<Deck>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                error!(path = %self.path.display(), "error loading saved decks: {}", e);
                return Err(e.into());
            }
        };

        let entries = match serde_json::from_str::<Value>(&json) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => return Err(self.quarantine("not a JSON array".to_owned())),
            Err(e) => return Err(self.quarantine(e.to_string())),
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Deck>(entry) {
                Ok(deck) => Some(deck),
                Err(e) => {
                    debug!("invalid saved deck dropped: {}", e);
                    None
                }
            })
            .collect())
    }

    fn quarantine(&self, reason: String) -> StoreError {
        let backup = self.path.with_extension(format!(
            "json.corrupt-{}",
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        ));
        error!(
            path = %self.path.display(),
            backup = %backup.display(),
            "saved decks file is corrupt: {}",
            reason
        );
        match fs::rename(&self.path, &backup) {
            Ok(()) => StoreError::CorruptFile {
                path: self.path.clone(),
                backup,
                reason,
            },
            Err(e) => e.into(),
        }
    }

    fn persist(&self, decks: &[Deck]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(decks)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl DeckStore for LocalDeckStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn list(&mut self, owner: &OwnerScope) -> Result<Vec<Deck>, StoreError> {
        let mut decks: Vec<Deck> = self
            .load()?
            .into_iter()
            .filter(|deck| owner.permits(deck))
            .collect();
        decks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(decks)
    }

    fn get(&mut self, id: Uuid) -> Result<Option<Deck>, StoreError> {
        Ok(self.load()?.into_iter().find(|deck| deck.id == id))
    }

    fn create(&mut self, deck: Deck) -> Result<Deck, StoreError> {
        let mut decks = self.load()?;
        match decks.iter_mut().find(|d| d.id == deck.id) {
            Some(existing) => *existing = deck.clone(),
            None => decks.push(deck.clone()),
        }
        self.persist(&decks)?;
        Ok(deck)
    }

    fn update(&mut self, id: Uuid, patch: DeckPatch) -> Result<Option<Deck>, StoreError> {
        let mut decks = self.load()?;
        let Some(deck) = decks.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        patch.apply_to(deck);
        let updated = deck.clone();
        self.persist(&decks)?;
        Ok(Some(updated))
    }

    fn delete(&mut self, id: Uuid, owner: &OwnerScope) -> Result<bool, StoreError> {
        let mut decks = self.load()?;
        let before = decks.len();
        decks.retain(|deck| !(deck.id == id && owner.permits(deck)));
        if decks.len() == before {
            return Ok(false);
        }
        self.persist(&decks)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{character, leader};

    #[test]
    fn missing_file_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        assert!(store.list(&OwnerScope::Local).unwrap().is_empty());
    }

    #[test]
    fn decks_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let mut deck = Deck::new("Persisted");
        deck.add_card(leader("OP01-001"));
        deck.add_card(character("OP01-004"));

        LocalDeckStore::new(dir.path()).create(deck.clone()).unwrap();

        let mut reopened = LocalDeckStore::new(dir.path());
        let loaded = reopened.get(deck.id).unwrap().unwrap();
        assert_eq!(loaded, deck);
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        let good = Deck::new("good");
        store.create(good.clone()).unwrap();

        let mut entries: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        entries.push(serde_json::json!({ "id": "x", "name": 3 }));
        entries.push(serde_json::json!("junk"));
        fs::write(store.path(), serde_json::to_string(&entries).unwrap()).unwrap();

        let decks = store.list(&OwnerScope::Local).unwrap();
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].id, good.id);
    }

    #[test]
    fn corrupt_file_is_moved_aside_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        store.create(Deck::new("precious")).unwrap();
        store.create(Deck::new("also precious")).unwrap();

        let json = fs::read_to_string(store.path()).unwrap();
        fs::write(store.path(), &json[..json.len() - 3]).unwrap();

        let err = store.list(&OwnerScope::Local).unwrap_err();
        let backup = match err {
            StoreError::CorruptFile { backup, .. } => backup,
            other => panic!("expected a corrupt file error, got {:?}", other),
        };
        assert!(fs::read_to_string(&backup).unwrap().contains("precious"));

        // The next write starts a fresh file; the old decks stay in the backup.
        store.create(Deck::new("new")).unwrap();
        assert_eq!(store.list(&OwnerScope::Local).unwrap().len(), 1);
        assert!(fs::read_to_string(&backup).unwrap().contains("also precious"));
    }

    #[test]
    fn non_array_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        fs::write(store.path(), r#"{"decks": []}"#).unwrap();

        assert!(matches!(
            store.create(Deck::new("x")),
            Err(StoreError::CorruptFile { .. })
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        let mut older = Deck::new("older");
        older.updated_at -= chrono::Duration::hours(1);
        let newer = Deck::new("newer");
        store.create(older.clone()).unwrap();
        store.create(newer.clone()).unwrap();

        let ids: Vec<Uuid> = store
            .list(&OwnerScope::Local)
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn timestamps_are_stored_as_iso_strings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        store.create(Deck::new("dates")).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let created = raw[0]["createdAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn delete_respects_owner_scope() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        let mut deck = Deck::new("owned");
        deck.owner_id = Some(Uuid::new_v4());
        store.create(deck.clone()).unwrap();

        assert!(!store.delete(deck.id, &OwnerScope::User(Uuid::new_v4())).unwrap());
        assert!(store.delete(deck.id, &OwnerScope::Local).unwrap());
        assert!(!store.delete(deck.id, &OwnerScope::Local).unwrap());
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalDeckStore::new(dir.path());
        assert!(store
            .update(Uuid::new_v4(), DeckPatch::default())
            .unwrap()
            .is_none());
    }
}

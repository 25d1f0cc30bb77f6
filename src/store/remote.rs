use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{DeckPatch, DeckStore, OwnerScope};
use crate::{
    error::StoreError,
    models::{Card, Deck},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub anon_key: String,
    /// User session token; the anon key is sent when absent.
    pub access_token: Option<String>,
    pub user_id: Option<Uuid>,
}

/// One row of the `decks` table. Leader and cards are embedded JSON documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeckRow {
    id: Uuid,
    name: String,
    #[serde(default)]
    leader: Option<Card>,
    #[serde(default)]
    cards: Vec<Card>,
    #[serde(default)]
    user_id: Option<Uuid>,
    #[serde(default)]
    is_public: bool,
    #[serde(default)]
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DeckRow> for Deck {
    fn from(row: DeckRow) -> Self {
        Deck {
            id: row.id,
            name: row.name,
            leader: row.leader,
            cards: row.cards,
            description: row.description,
            is_public: row.is_public,
            owner_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl DeckRow {
    fn from_deck(deck: Deck, user_id: Uuid) -> Self {
        DeckRow {
            id: deck.id,
            name: deck.name,
            leader: deck.leader,
            cards: deck.cards,
            user_id: Some(user_id),
            is_public: deck.is_public,
            description: deck.description,
            created_at: deck.created_at,
            updated_at: deck.updated_at,
        }
    }
}

fn patch_body(patch: &DeckPatch) -> Result<Value, StoreError> {
    let mut body = Map::new();
    if let Some(name) = &patch.name {
        body.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(leader) = &patch.leader {
        body.insert("leader".into(), serde_json::to_value(leader)?);
    }
    if let Some(cards) = &patch.cards {
        body.insert("cards".into(), serde_json::to_value(cards)?);
    }
    if let Some(description) = &patch.description {
        body.insert("description".into(), serde_json::to_value(description)?);
    }
    if let Some(is_public) = patch.is_public {
        body.insert("is_public".into(), Value::Bool(is_public));
    }
    body.insert("updated_at".into(), serde_json::to_value(Utc::now())?);
    Ok(Value::Object(body))
}

/// Decks stored in a PostgREST `decks` table. Row-level security on the
/// service side restricts rows to their owner; the store also filters by
/// `user_id` so an anon key never sees foreign decks.
pub struct RemoteDeckStore {
    config: RemoteConfig,
    client: Client,
}

impl RemoteDeckStore {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn user(&self) -> Result<Uuid, StoreError> {
        self.config.user_id.ok_or(StoreError::Unauthenticated)
    }

    fn table_url(&self, query: &str) -> String {
        format!(
            "{}/rest/v1/decks?{}",
            self.config.base_url.trim_end_matches('/'),
            query
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    fn rows(&self, request: RequestBuilder) -> Result<Vec<Deck>, StoreError> {
        let response = self.authorized(request).send()?.error_for_status()?;
        let rows: Vec<DeckRow> = response.json()?;
        Ok(rows.into_iter().map(Deck::from).collect())
    }

    /// Decks any user marked public, newest first.
    pub fn list_public(&mut self) -> Result<Vec<Deck>, StoreError> {
        let url = self.table_url("select=*&is_public=eq.true&order=updated_at.desc");
        self.rows(self.client.get(url))
    }
}

impl DeckStore for RemoteDeckStore {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn list(&mut self, owner: &OwnerScope) -> Result<Vec<Deck>, StoreError> {
        let OwnerScope::User(user) = owner else {
            return Err(StoreError::Unauthenticated);
        };
        let url = self.table_url(&format!(
            "select=*&user_id=eq.{}&order=updated_at.desc",
            user
        ));
        self.rows(self.client.get(url))
    }

    fn get(&mut self, id: Uuid) -> Result<Option<Deck>, StoreError> {
        let user = self.user()?;
        let url = self.table_url(&format!(
            "select=*&id=eq.{}&user_id=eq.{}&limit=1",
            id, user
        ));
        Ok(self.rows(self.client.get(url))?.into_iter().next())
    }

    fn create(&mut self, deck: Deck) -> Result<Deck, StoreError> {
        let user = self.user()?;
        if deck.owner_id.is_some_and(|owner| owner != user) {
            return Err(StoreError::Forbidden(deck.id));
        }
        let row = DeckRow::from_deck(deck, user);
        let request = self
            .client
            .post(self.table_url("select=*"))
            .header("Prefer", "return=representation")
            .json(&[row]);
        let created = self.rows(request)?.into_iter().next().ok_or_else(|| {
            StoreError::UnexpectedResponse("insert returned no rows".to_string())
        })?;
        debug!(deck = %created.id, "deck inserted remotely");
        Ok(created)
    }

    fn update(&mut self, id: Uuid, patch: DeckPatch) -> Result<Option<Deck>, StoreError> {
        let user = self.user()?;
        let request = self
            .client
            .patch(self.table_url(&format!("id=eq.{}&user_id=eq.{}", id, user)))
            .header("Prefer", "return=representation")
            .json(&patch_body(&patch)?);
        Ok(self.rows(request)?.into_iter().next())
    }

    fn delete(&mut self, id: Uuid, owner: &OwnerScope) -> Result<bool, StoreError> {
        let OwnerScope::User(user) = owner else {
            return Err(StoreError::Unauthenticated);
        };
        let request = self
            .client
            .delete(self.table_url(&format!("id=eq.{}&user_id=eq.{}", id, user)))
            .header("Prefer", "return=representation");
        Ok(!self.rows(request)?.is_empty())
    }
}

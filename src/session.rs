//! The deck builder's whole editing state, changed only through [`Action`]s.
//!
//! Store and catalog I/O happen outside; their results come back in as
//! actions (`CatalogLoaded`, `DeckSaved`, ...) so the state itself never
//! blocks.

use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    deck::{AddOutcome, DEFAULT_DECK_NAME},
    error::SessionError,
    filter::{visible, FilterState},
    formula,
    models::{Card, CardColor, CardType, Deck},
};

#[derive(Debug, Clone)]
pub enum Action {
    CatalogRequested,
    CatalogLoaded(Vec<Card>),
    CatalogFailed(String),

    SetSearch(String),
    ToggleColor(CardColor),
    ToggleType(CardType),
    ToggleCost(u32),
    SetPowerRange { min: Option<u32>, max: Option<u32> },
    ClearPowerRange,
    ResetFilters,

    NewDeck,
    SelectDeck(Option<Deck>),
    LoadDeck(Uuid),
    AddCard(Card),
    RemoveCard(String),
    RemoveAllOfCard(String),
    SetLeader(Card),
    ClearLeader,
    Rename(String),
    SetDescription(Option<String>),
    SetPublic(bool),
    SaveAs,
    ImportFormula(String),

    DecksLoaded(Vec<Deck>),
    DeckSaved(Deck),
    DeckDeleted(Uuid),
    StoreWarning(String),
    StoreFailed(String),
    DismissNotice,
}

#[derive(Debug, Default)]
pub struct DeckBuilder {
    all_cards: Vec<Card>,
    visible_cards: Vec<Card>,
    filters: FilterState,
    selected: Option<Deck>,
    saved: Vec<Deck>,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
}

impl DeckBuilder {
    pub fn new(saved: Vec<Deck>) -> Self {
        Self {
            saved,
            ..Default::default()
        }
    }

    pub fn all_cards(&self) -> &[Card] {
        &self.all_cards
    }

    pub fn visible_cards(&self) -> &[Card] {
        &self.visible_cards
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn selected(&self) -> Option<&Deck> {
        self.selected.as_ref()
    }

    pub fn saved_decks(&self) -> &[Deck] {
        &self.saved
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// The selected deck stamped for saving; `None` when nothing is selected.
    pub fn deck_to_save(&self) -> Option<Deck> {
        self.selected.clone().map(|mut deck| {
            deck.touch();
            deck
        })
    }

    /// Whether an import has a catalog to resolve against and a deck to fill.
    pub fn can_import(&self) -> bool {
        !self.all_cards.is_empty() && self.selected.is_some()
    }

    pub fn export_selected(&self) -> Result<String, SessionError> {
        let deck = self.selected.as_ref().ok_or(SessionError::NoDeckSelected)?;
        Ok(formula::export(deck.leader.as_ref(), &deck.cards))
    }

    /// Saved decks whose name fuzzily matches `query`, best match first.
    pub fn search_decks(&self, query: &str) -> Vec<&Deck> {
        if query.trim().is_empty() {
            return self.saved.iter().collect();
        }
        let matcher = SkimMatcherV2::default().ignore_case();
        let mut scored: Vec<(&Deck, i64)> = self
            .saved
            .iter()
            .filter_map(|deck| {
                matcher
                    .fuzzy_match(&deck.name, query)
                    .map(|score| (deck, score))
            })
            .collect();
        scored.sort_by(|(_, a), (_, b)| b.cmp(a));
        scored.into_iter().map(|(deck, _)| deck).collect()
    }

    fn refilter(&mut self) {
        self.visible_cards = visible(&self.all_cards, &self.filters);
    }

    fn selected_mut(&mut self) -> Result<&mut Deck, SessionError> {
        self.selected.as_mut().ok_or(SessionError::NoDeckSelected)
    }

    fn upsert_saved(&mut self, deck: Deck) {
        match self.saved.iter_mut().find(|d| d.id == deck.id) {
            Some(existing) => *existing = deck.clone(),
            None => self.saved.push(deck.clone()),
        }
        if self.selected.as_ref().is_some_and(|s| s.id == deck.id) {
            self.selected = Some(deck);
        }
    }

    /// Applies one action. On error the state is left exactly as it was.
    pub fn apply(&mut self, action: Action) -> Result<(), SessionError> {
        match action {
            Action::CatalogRequested => {
                self.loading = true;
                self.error = None;
            }
            Action::CatalogLoaded(cards) => {
                info!(count = cards.len(), "catalog ready");
                self.loading = false;
                self.all_cards = cards;
                self.refilter();
            }
            Action::CatalogFailed(message) => {
                warn!("catalog failed to load: {}", message);
                self.loading = false;
                self.all_cards.clear();
                self.visible_cards.clear();
                self.error = Some(message);
            }

            Action::SetSearch(search) => {
                self.filters.set_search(search);
                self.refilter();
            }
            Action::ToggleColor(color) => {
                self.filters.toggle_color(color);
                self.refilter();
            }
            Action::ToggleType(card_type) => {
                self.filters.toggle_type(card_type);
                self.refilter();
            }
            Action::ToggleCost(cost) => {
                self.filters.toggle_cost(cost);
                self.refilter();
            }
            Action::SetPowerRange { min, max } => {
                self.filters.set_power_range(min, max);
                self.refilter();
            }
            Action::ClearPowerRange => {
                self.filters.clear_power_range();
                self.refilter();
            }
            Action::ResetFilters => {
                self.filters.reset();
                self.visible_cards = self.all_cards.clone();
            }

            Action::NewDeck => {
                let deck = Deck::new(DEFAULT_DECK_NAME);
                debug!(deck = %deck.id, "new deck");
                self.selected = Some(deck);
            }
            Action::SelectDeck(deck) => self.selected = deck,
            Action::LoadDeck(id) => {
                let deck = self
                    .saved
                    .iter()
                    .find(|d| d.id == id)
                    .cloned()
                    .ok_or(SessionError::DeckNotFound(id))?;
                self.selected = Some(deck);
            }
            Action::AddCard(card) => {
                let outcome = self.selected_mut()?.add_card(card);
                if let AddOutcome::Refused(refusal) = outcome {
                    self.notice = Some(format!("Card not added: {}", refusal));
                }
            }
            Action::RemoveCard(card_id) => {
                self.selected_mut()?.remove_card(&card_id);
            }
            Action::RemoveAllOfCard(card_id) => {
                self.selected_mut()?.remove_all_of_card(&card_id);
            }
            Action::SetLeader(card) => self.selected_mut()?.set_leader(card)?,
            Action::ClearLeader => self.selected_mut()?.clear_leader(),
            Action::Rename(name) => self.selected_mut()?.rename(name),
            Action::SetDescription(description) => {
                self.selected_mut()?.description = description;
            }
            Action::SetPublic(is_public) => self.selected_mut()?.is_public = is_public,
            Action::SaveAs => {
                let copy = self
                    .selected
                    .as_ref()
                    .ok_or(SessionError::NoDeckSelected)?
                    .duplicate();
                self.selected = Some(copy);
            }
            Action::ImportFormula(text) => {
                if self.all_cards.is_empty() {
                    return Err(SessionError::CatalogNotLoaded);
                }
                // Resolve fully before touching the deck.
                let imported = formula::import(&text, &self.all_cards)?;
                let deck = self.selected_mut()?;
                deck.leader = imported.leader;
                deck.cards = imported.cards;
                info!(deck = %deck.id, cards = deck.cards.len(), "deck imported from formula");
            }

            Action::DecksLoaded(decks) => {
                self.saved = decks;
            }
            Action::DeckSaved(deck) => {
                info!(deck = %deck.id, "deck saved");
                self.upsert_saved(deck);
            }
            Action::DeckDeleted(id) => {
                self.saved.retain(|d| d.id != id);
                if self.selected.as_ref().is_some_and(|d| d.id == id) {
                    self.selected = None;
                }
            }
            Action::StoreWarning(message) => {
                warn!("{}", message);
                self.notice = Some(message);
            }
            Action::StoreFailed(message) => {
                warn!("deck store failed: {}", message);
                self.error = Some(message);
            }
            Action::DismissNotice => {
                self.notice = None;
                self.error = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{character, leader};

    fn builder() -> DeckBuilder {
        let mut builder = DeckBuilder::default();
        builder
            .apply(Action::CatalogLoaded(vec![
                leader("OP01-001"),
                character("OP01-002"),
                character("OP01-003"),
            ]))
            .unwrap();
        builder
    }

    #[test]
    fn card_actions_need_a_selected_deck() {
        let mut builder = builder();
        assert!(matches!(
            builder.apply(Action::AddCard(character("OP01-002"))),
            Err(SessionError::NoDeckSelected)
        ));
        assert!(matches!(
            builder.export_selected(),
            Err(SessionError::NoDeckSelected)
        ));
        builder.apply(Action::NewDeck).unwrap();
        builder.apply(Action::AddCard(character("OP01-002"))).unwrap();
        assert_eq!(builder.selected().unwrap().cards.len(), 1);
        assert_eq!(builder.selected().unwrap().name, DEFAULT_DECK_NAME);
    }

    #[test]
    fn import_needs_a_deck_and_changes_nothing_without_one() {
        let mut empty = DeckBuilder::default();
        assert!(!empty.can_import());
        empty.apply(Action::NewDeck).unwrap();
        assert!(!empty.can_import());

        let mut builder = builder();
        assert!(!builder.can_import());
        assert!(matches!(
            builder.apply(Action::ImportFormula("1xOP01-001".into())),
            Err(SessionError::NoDeckSelected)
        ));
        assert!(builder.selected().is_none());

        builder.apply(Action::NewDeck).unwrap();
        assert!(builder.can_import());
    }

    #[test]
    fn refused_additions_leave_a_notice() {
        let mut builder = builder();
        builder.apply(Action::NewDeck).unwrap();
        for _ in 0..5 {
            builder.apply(Action::AddCard(character("OP01-002"))).unwrap();
        }
        assert_eq!(builder.selected().unwrap().cards.len(), 4);
        assert_eq!(
            builder.notice(),
            Some("Card not added: OP01-002 already has 4 copies")
        );
        builder.apply(Action::DismissNotice).unwrap();
        assert!(builder.notice().is_none());
    }

    #[test]
    fn set_leader_rejects_characters_without_changing_state() {
        let mut builder = builder();
        builder.apply(Action::NewDeck).unwrap();
        assert!(matches!(
            builder.apply(Action::SetLeader(character("OP01-002"))),
            Err(SessionError::Deck(_))
        ));
        assert!(builder.selected().unwrap().leader.is_none());
    }

    #[test]
    fn filters_recompute_visible_cards() {
        let mut builder = builder();
        builder.apply(Action::ToggleType(CardType::Leader)).unwrap();
        assert_eq!(builder.visible_cards().len(), 1);
        builder.apply(Action::SetSearch("nothing".into())).unwrap();
        assert!(builder.visible_cards().is_empty());
        builder.apply(Action::ResetFilters).unwrap();
        assert_eq!(builder.visible_cards(), builder.all_cards());
        assert!(!builder.filters().is_active());
    }

    #[test]
    fn failed_import_applies_nothing() {
        let mut builder = builder();
        builder.apply(Action::NewDeck).unwrap();
        builder.apply(Action::AddCard(character("OP01-003"))).unwrap();
        let before = builder.selected().cloned();

        let err = builder
            .apply(Action::ImportFormula("1xOP01-001\n2xOP07-999".into()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Card not found: OP07-999");
        assert_eq!(builder.selected().cloned(), before);

        builder
            .apply(Action::ImportFormula("1xOP01-001\n4xOP01-002".into()))
            .unwrap();
        let deck = builder.selected().unwrap();
        assert_eq!(deck.leader.as_ref().map(|l| l.id.as_str()), Some("OP01-001"));
        assert_eq!(deck.cards.len(), 4);
    }

    #[test]
    fn import_without_catalog_is_refused() {
        let mut builder = DeckBuilder::default();
        builder.apply(Action::NewDeck).unwrap();
        assert!(matches!(
            builder.apply(Action::ImportFormula("1xOP01-001".into())),
            Err(SessionError::CatalogNotLoaded)
        ));
    }

    #[test]
    fn saved_decks_upsert_and_delete() {
        let mut builder = builder();
        builder.apply(Action::NewDeck).unwrap();
        let deck = builder.deck_to_save().unwrap();
        builder.apply(Action::DeckSaved(deck.clone())).unwrap();
        builder.apply(Action::Rename("Renamed".into())).unwrap();
        builder
            .apply(Action::DeckSaved(builder.deck_to_save().unwrap()))
            .unwrap();
        assert_eq!(builder.saved_decks().len(), 1);
        assert_eq!(builder.saved_decks()[0].name, "Renamed");

        builder.apply(Action::SaveAs).unwrap();
        let copy_id = builder.selected().unwrap().id;
        assert_ne!(copy_id, deck.id);
        assert_eq!(builder.selected().unwrap().name, "Renamed (Copy)");

        builder.apply(Action::LoadDeck(deck.id)).unwrap();
        builder.apply(Action::DeckDeleted(deck.id)).unwrap();
        assert!(builder.saved_decks().is_empty());
        assert!(builder.selected().is_none());
        assert!(matches!(
            builder.apply(Action::LoadDeck(deck.id)),
            Err(SessionError::DeckNotFound(_))
        ));
    }

    #[test]
    fn catalog_failure_sets_error_and_empties_catalog() {
        let mut builder = builder();
        builder.apply(Action::CatalogRequested).unwrap();
        assert!(builder.is_loading());
        builder
            .apply(Action::CatalogFailed("Failed to fetch cards".into()))
            .unwrap();
        assert!(!builder.is_loading());
        assert!(builder.all_cards().is_empty());
        assert_eq!(builder.error(), Some("Failed to fetch cards"));
    }

    #[test]
    fn deck_search_is_fuzzy_and_ranked() {
        let named = |name: &str| {
            let mut deck = Deck::new(name);
            deck.rename(name);
            deck
        };
        let builder = DeckBuilder::new(vec![
            named("Red Zoro Aggro"),
            named("Blue Doffy"),
            named("Zoro Midrange"),
        ]);
        let names: Vec<_> = builder
            .search_decks("zoro")
            .into_iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Red Zoro Aggro"));
        assert!(names.contains(&"Zoro Midrange"));
        assert_eq!(builder.search_decks("").len(), 3);
    }
}

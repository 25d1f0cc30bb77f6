use std::{
    collections::HashMap,
    fs,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use iced::{
    executor,
    widget::{self, column, image::Handle, row, text_editor},
    Application, Command, Length, Theme,
};
use native_dialog::FileDialog;
use optcg_deck_builder::{
    catalog,
    config::Config,
    error::StoreError,
    models::{Card, CardColor, CardType, Deck, StackedCard},
    session::{Action, DeckBuilder},
    store::{self, DeckStore, FallbackStore, LocalDeckStore, OwnerScope, RemoteDeckStore},
    table::{InstanceId, Table},
};
use tracing::{error, warn};
use uuid::Uuid;

const CATALOG_PAGE: usize = 60;
const MAX_COST_FILTER: u32 = 10;

type SharedStore = Arc<Mutex<Box<dyn DeckStore + Send>>>;

pub struct App {
    config: Config,
    builder: DeckBuilder,
    store: SharedStore,
    owner: OwnerScope,
    section: Section,
    formula_input: text_editor::Content,
    formula_output: String,
    deck_query: String,
    power_min: String,
    power_max: String,
    shown: usize,
    table: Option<Table>,
    status: Option<String>,
    image_cache: HashMap<String, Bytes>,
}

#[derive(Debug, Clone)]
pub enum Section {
    Catalog,
    Deck,
    SavedDecks,
    Table,
}

#[derive(Debug, Clone)]
pub enum AppMessage {
    ChangeSection(Section),
    CatalogFinished(Result<Vec<Card>, String>),
    Search(String),
    ToggleColor(CardColor),
    ToggleType(CardType),
    ToggleCost(u32),
    PowerMinChanged(String),
    PowerMaxChanged(String),
    ResetFilters,
    ShowMore,
    NewDeck,
    AddCard(String),
    RemoveCard(String),
    RemoveAllOfCard(String),
    ClearLeader,
    RenameDeck(String),
    DescriptionChanged(String),
    TogglePublic,
    SaveDeck,
    SaveAs,
    DeckStored(Result<Deck, String>, Vec<String>),
    DecksListed(Result<Vec<Deck>, String>, Vec<String>),
    LoadDeck(Uuid),
    DeleteDeck(Uuid),
    DeckRemoved(Uuid, Result<bool, String>, Vec<String>),
    SearchDecks(String),
    EditFormula(text_editor::Action),
    ImportFormula,
    ImportFormulaFile,
    ExportFormula,
    ExportFormulaFile,
    StartTable,
    TableDraw,
    TableShuffle,
    TableTakeLife,
    TableAddDon,
    TableRestDon,
    TableActivateDon,
    TableRefresh,
    TablePlay(InstanceId),
    TableTrash(InstanceId),
    TableRest(InstanceId),
    TableActivate(InstanceId),
    UpdateImageCache(String, Option<Bytes>),
    DismissNotice,
}

type AppElement<'a> = iced::Element<'a, AppMessage, Theme, iced::Renderer>;

impl Application for App {
    type Executor = executor::Default;
    type Message = AppMessage;
    type Theme = Theme;
    type Flags = Config;

    fn new(config: Self::Flags) -> (Self, iced::Command<Self::Message>) {
        let local = LocalDeckStore::new(&config.data_dir);
        let (store, owner): (Box<dyn DeckStore + Send>, OwnerScope) = match &config.remote {
            Some(remote) => (
                Box::new(FallbackStore::new(RemoteDeckStore::new(remote.clone()), local)),
                remote.user_id.map_or(OwnerScope::Local, OwnerScope::User),
            ),
            None => (Box::new(local), OwnerScope::Local),
        };

        let mut app = Self {
            builder: DeckBuilder::default(),
            store: Arc::new(Mutex::new(store)),
            owner,
            section: Section::Catalog,
            formula_input: text_editor::Content::new(),
            formula_output: String::new(),
            deck_query: String::new(),
            power_min: String::new(),
            power_max: String::new(),
            shown: CATALOG_PAGE,
            table: None,
            status: None,
            image_cache: HashMap::new(),
            config,
        };
        app.dispatch(Action::CatalogRequested);

        let source = app.config.catalog.clone();
        let policy = app.config.duplicate_policy;
        let fetch = Command::perform(
            async move {
                catalog::fetch_catalog(&source, policy)
                    .await
                    .map_err(|e| e.to_string())
            },
            AppMessage::CatalogFinished,
        );
        let list = app.list_decks();

        (app, Command::batch([fetch, list]))
    }

    fn title(&self) -> String {
        "optcg deck builder".to_owned()
    }

    fn theme(&self) -> Self::Theme {
        Theme::Dark
    }

    fn update(&mut self, message: Self::Message) -> iced::Command<Self::Message> {
        match message {
            AppMessage::ChangeSection(section) => {
                self.section = section;
            }
            AppMessage::CatalogFinished(result) => {
                match result {
                    Ok(cards) => self.dispatch(Action::CatalogLoaded(cards)),
                    Err(e) => self.dispatch(Action::CatalogFailed(e)),
                }
                return self.filters_changed();
            }
            AppMessage::Search(query) => {
                self.dispatch(Action::SetSearch(query));
                return self.filters_changed();
            }
            AppMessage::ToggleColor(color) => {
                self.dispatch(Action::ToggleColor(color));
                return self.filters_changed();
            }
            AppMessage::ToggleType(card_type) => {
                self.dispatch(Action::ToggleType(card_type));
                return self.filters_changed();
            }
            AppMessage::ToggleCost(cost) => {
                self.dispatch(Action::ToggleCost(cost));
                return self.filters_changed();
            }
            AppMessage::PowerMinChanged(value) => {
                self.power_min = value;
                self.apply_power_range();
                return self.filters_changed();
            }
            AppMessage::PowerMaxChanged(value) => {
                self.power_max = value;
                self.apply_power_range();
                return self.filters_changed();
            }
            AppMessage::ResetFilters => {
                self.power_min.clear();
                self.power_max.clear();
                self.dispatch(Action::ResetFilters);
                return self.filters_changed();
            }
            AppMessage::ShowMore => {
                self.shown += CATALOG_PAGE;
                return self.fetch_visible_images();
            }
            AppMessage::NewDeck => {
                self.dispatch(Action::NewDeck);
                self.section = Section::Deck;
            }
            AppMessage::AddCard(card_id) => {
                if let Some(card) = self.find_card(&card_id) {
                    self.dispatch(Action::AddCard(card));
                }
            }
            AppMessage::RemoveCard(card_id) => self.dispatch(Action::RemoveCard(card_id)),
            AppMessage::RemoveAllOfCard(card_id) => {
                self.dispatch(Action::RemoveAllOfCard(card_id))
            }
            AppMessage::ClearLeader => self.dispatch(Action::ClearLeader),
            AppMessage::RenameDeck(name) => self.dispatch(Action::Rename(name)),
            AppMessage::DescriptionChanged(text) => {
                let description = Some(text).filter(|t| !t.trim().is_empty());
                self.dispatch(Action::SetDescription(description));
            }
            AppMessage::TogglePublic => {
                if let Some(is_public) = self.builder.selected().map(|d| d.is_public) {
                    self.dispatch(Action::SetPublic(!is_public));
                }
            }
            AppMessage::SaveDeck => {
                if let Some(deck) = self.builder.deck_to_save() {
                    return Command::perform(
                        with_store(self.store.clone(), move |store| {
                            store::save_deck(store, &deck)
                        }),
                        |(result, warnings)| AppMessage::DeckStored(result, warnings),
                    );
                }
            }
            AppMessage::SaveAs => {
                self.dispatch(Action::SaveAs);
                return self.update(AppMessage::SaveDeck);
            }
            AppMessage::DeckStored(result, warnings) => {
                self.dispatch_warnings(warnings);
                match result {
                    Ok(deck) => self.dispatch(Action::DeckSaved(deck)),
                    Err(e) => self.dispatch(Action::StoreFailed(e)),
                }
            }
            AppMessage::DecksListed(result, warnings) => {
                self.dispatch_warnings(warnings);
                match result {
                    Ok(decks) => self.dispatch(Action::DecksLoaded(decks)),
                    Err(e) => self.dispatch(Action::StoreFailed(e)),
                }
            }
            AppMessage::LoadDeck(id) => {
                self.dispatch(Action::LoadDeck(id));
                self.section = Section::Deck;
                return self.fetch_deck_images();
            }
            AppMessage::DeleteDeck(id) => {
                let owner = self.owner;
                return Command::perform(
                    with_store(self.store.clone(), move |store| store.delete(id, &owner)),
                    move |(result, warnings)| AppMessage::DeckRemoved(id, result, warnings),
                );
            }
            AppMessage::DeckRemoved(id, result, warnings) => {
                self.dispatch_warnings(warnings);
                match result {
                    Ok(true) => self.dispatch(Action::DeckDeleted(id)),
                    Ok(false) => warn!(deck = %id, "deck was already gone"),
                    Err(e) => self.dispatch(Action::StoreFailed(e)),
                }
            }
            AppMessage::SearchDecks(query) => self.deck_query = query,
            AppMessage::EditFormula(action) => self.formula_input.perform(action),
            AppMessage::ImportFormula => {
                let text = self.formula_input.text();
                self.dispatch(Action::ImportFormula(text));
                return self.fetch_deck_images();
            }
            AppMessage::ImportFormulaFile => {
                let file = match FileDialog::new()
                    .add_filter("Deck formula", &["txt"])
                    .show_open_single_file()
                {
                    Ok(Some(f)) => f,
                    _ => return iced::Command::none(),
                };
                match fs::read_to_string(&file) {
                    Ok(text) => self.formula_input = text_editor::Content::with_text(&text),
                    Err(e) => {
                        self.status = Some(format!("Could not read {}: {}", file.display(), e))
                    }
                }
            }
            AppMessage::ExportFormula => match self.builder.export_selected() {
                Ok(text) => self.formula_output = text,
                Err(e) => self.status = Some(e.to_string()),
            },
            AppMessage::ExportFormulaFile => {
                let text = match self.builder.export_selected() {
                    Ok(text) => text,
                    Err(e) => {
                        self.status = Some(e.to_string());
                        return iced::Command::none();
                    }
                };
                let file = match FileDialog::new()
                    .add_filter("Deck formula", &["txt"])
                    .show_save_single_file()
                {
                    Ok(Some(f)) => f,
                    _ => return iced::Command::none(),
                };
                if let Err(e) = fs::write(&file, text) {
                    error!(path = %file.display(), "failed to write deck formula: {}", e);
                    self.status = Some(format!("Could not write {}: {}", file.display(), e));
                }
            }
            AppMessage::StartTable => {
                if let Some(deck) = self.builder.selected() {
                    let seed = rand::random();
                    self.table = Some(Table::new(deck, seed));
                    self.section = Section::Table;
                }
            }
            AppMessage::TableDraw => self.on_table(|t| t.draw().map(|_| ())),
            AppMessage::TableShuffle => self.on_table(|t| {
                t.shuffle();
                Ok(())
            }),
            AppMessage::TableTakeLife => self.on_table(|t| t.take_life().map(|_| ())),
            AppMessage::TableAddDon => self.on_table(|t| t.add_don(2).map(|_| ())),
            AppMessage::TableRestDon => self.on_table(|t| {
                t.rest_don(1);
                Ok(())
            }),
            AppMessage::TableActivateDon => self.on_table(|t| {
                t.activate_don(1);
                Ok(())
            }),
            AppMessage::TableRefresh => self.on_table(|t| {
                t.refresh();
                Ok(())
            }),
            AppMessage::TablePlay(id) => self.on_table(|t| t.play(id)),
            AppMessage::TableTrash(id) => self.on_table(|t| t.trash(id)),
            AppMessage::TableRest(id) => self.on_table(|t| t.rest(id)),
            AppMessage::TableActivate(id) => self.on_table(|t| t.activate(id)),
            AppMessage::UpdateImageCache(card_id, bytes) => {
                if let Some(b) = bytes {
                    self.image_cache.insert(card_id, b);
                }
            }
            AppMessage::DismissNotice => {
                self.status = None;
                self.dispatch(Action::DismissNotice);
            }
        };

        iced::Command::none()
    }

    fn view(&self) -> iced::Element<'_, Self::Message, Self::Theme, iced::Renderer> {
        let btn_catalog = widget::button("Cards")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::ChangeSection(Section::Catalog));
        let btn_deck = widget::button("Deck")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::ChangeSection(Section::Deck));
        let btn_saved = widget::button("Saved decks")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::ChangeSection(Section::SavedDecks));
        let btn_table = widget::button("Play test")
            .width(Length::Fixed(100.))
            .on_press(AppMessage::ChangeSection(Section::Table));

        let list_btn = column!(btn_catalog, btn_deck, btn_saved, btn_table).spacing(5);

        let content = match self.section {
            Section::Catalog => view_catalog(self),
            Section::Deck => view_deck(self),
            Section::SavedDecks => view_saved_decks(self),
            Section::Table => view_table(self),
        };

        let mut main = column!(content).spacing(10).padding(10);
        if let Some(message) = self
            .status
            .as_deref()
            .or(self.builder.error())
            .or(self.builder.notice())
        {
            let dismiss = widget::button("Dismiss").on_press(AppMessage::DismissNotice);
            main = main.push(row!(widget::text(message), dismiss).spacing(10));
        }

        row!(list_btn, main).into()
    }
}

impl App {
    fn dispatch(&mut self, action: Action) {
        if let Err(e) = self.builder.apply(action) {
            warn!("action rejected: {}", e);
            self.status = Some(e.to_string());
        }
    }

    fn dispatch_warnings(&mut self, warnings: Vec<String>) {
        for warning in warnings {
            self.dispatch(Action::StoreWarning(warning));
        }
    }

    fn find_card(&self, card_id: &str) -> Option<Card> {
        self.builder
            .all_cards()
            .iter()
            .find(|c| c.id == card_id)
            .cloned()
    }

    fn apply_power_range(&mut self) {
        let min = self.power_min.trim().parse().ok();
        let max = self.power_max.trim().parse().ok();
        self.dispatch(Action::ClearPowerRange);
        self.dispatch(Action::SetPowerRange { min, max });
    }

    fn on_table(
        &mut self,
        op: impl FnOnce(&mut Table) -> Result<(), optcg_deck_builder::error::TableError>,
    ) {
        if let Some(table) = self.table.as_mut() {
            if let Err(e) = op(table) {
                self.status = Some(e.to_string());
            }
        }
    }

    fn list_decks(&self) -> Command<AppMessage> {
        let owner = self.owner;
        Command::perform(
            with_store(self.store.clone(), move |store| store.list(&owner)),
            |(result, warnings)| AppMessage::DecksListed(result, warnings),
        )
    }

    fn fetch_images<'a>(&self, cards: impl Iterator<Item = &'a Card>) -> Command<AppMessage> {
        Command::batch(
            cards
                .filter(|c| !self.image_cache.contains_key(&c.id))
                .map(|c| {
                    let card_id = c.id.clone();
                    let location = self.config.image_location(&c.img_url);
                    Command::perform(
                        async move { download_image(card_id, location).await },
                        |res| AppMessage::UpdateImageCache(res.0, res.1),
                    )
                })
                .collect::<Vec<_>>(),
        )
    }

    fn fetch_visible_images(&self) -> Command<AppMessage> {
        self.fetch_images(self.builder.visible_cards().iter().take(self.shown))
    }

    fn filters_changed(&mut self) -> Command<AppMessage> {
        self.shown = CATALOG_PAGE;
        self.fetch_visible_images()
    }

    fn fetch_deck_images(&self) -> Command<AppMessage> {
        match self.builder.selected() {
            Some(deck) => self.fetch_images(deck.leader.iter().chain(deck.cards.iter())),
            None => Command::none(),
        }
    }
}

fn view_catalog<'a>(app: &'a App) -> AppElement<'a> {
    if app.builder.is_loading() {
        return widget::text("Loading cards...").into();
    }

    let search_box = widget::text_input("search cards...", &app.builder.filters().search)
        .on_input(AppMessage::Search);

    let filters = app.builder.filters();
    let color_buttons = widget::row(CardColor::ALL.into_iter().map(|color| -> AppElement<'a> {
        let label = toggle_label(color.as_str(), filters.colors.contains(&color));
        widget::button(widget::text(label))
            .on_press(AppMessage::ToggleColor(color))
            .into()
    }))
    .spacing(5);
    let type_buttons = widget::row(CardType::ALL.into_iter().map(|card_type| -> AppElement<'a> {
        let label = toggle_label(card_type.as_str(), filters.types.contains(&card_type));
        widget::button(widget::text(label))
            .on_press(AppMessage::ToggleType(card_type))
            .into()
    }))
    .spacing(5);
    let cost_buttons = widget::row((0..=MAX_COST_FILTER).map(|cost| -> AppElement<'a> {
        let label = toggle_label(&cost.to_string(), filters.costs.contains(&cost));
        widget::button(widget::text(label))
            .on_press(AppMessage::ToggleCost(cost))
            .into()
    }))
    .spacing(5);

    let power_row = row!(
        widget::text("Power"),
        widget::text_input("min", &app.power_min)
            .on_input(AppMessage::PowerMinChanged)
            .width(Length::Fixed(80.)),
        widget::text_input("max", &app.power_max)
            .on_input(AppMessage::PowerMaxChanged)
            .width(Length::Fixed(80.)),
        widget::button("Reset filters").on_press(AppMessage::ResetFilters),
    )
    .spacing(10);

    let visible = app.builder.visible_cards();
    let summary = widget::text(format!(
        "Showing {} of {} cards",
        visible.len().min(app.shown),
        visible.len()
    ));
    let btn_more = widget::button("Show more")
        .on_press_maybe((visible.len() > app.shown).then_some(AppMessage::ShowMore));

    let card_results = widget::scrollable(widget::column(
        visible
            .iter()
            .take(app.shown)
            .map(|c| view_card_result(app, c)),
    ))
    .width(Length::Fill);

    column!(
        search_box,
        color_buttons,
        type_buttons,
        cost_buttons,
        power_row,
        row!(summary, btn_more).spacing(10),
        card_results
    )
    .spacing(10)
    .into()
}

fn toggle_label(name: &str, selected: bool) -> String {
    if selected {
        format!("[x] {}", name)
    } else {
        name.to_owned()
    }
}

fn card_image<'a>(app: &'a App, card: &'a Card) -> AppElement<'a> {
    match app.image_cache.get(&card.id) {
        Some(bytes) => widget::image::<Handle>(Handle::from_memory(bytes.clone()))
            .content_fit(iced::ContentFit::ScaleDown)
            .height(100)
            .into(),
        None => widget::text(&card.id).width(Length::Fixed(72.)).into(),
    }
}

fn view_card_result<'a>(app: &'a App, card: &'a Card) -> AppElement<'a> {
    let in_deck = app
        .builder
        .selected()
        .map(|deck| deck.copies_of(card.base_id()))
        .unwrap_or(0);

    let card_info = widget::text(format!(
        "{} - {} ({} {}, cost {})",
        card.id, card.name, card.color, card.card_type, card.cost
    ));
    let card_stats = widget::text(match (card.power, card.counter) {
        (Some(p), Some(c)) => format!("power {} / counter {}", p, c),
        (Some(p), None) => format!("power {}", p),
        _ => String::new(),
    });
    let card_totals = widget::text(if card.is_leader() {
        String::new()
    } else {
        format!("{}/4 in deck", in_deck)
    });

    let should_allow_add = app
        .builder
        .selected()
        .map(|_| AppMessage::AddCard(card.id.clone()));
    let label = if card.is_leader() {
        "Set leader"
    } else {
        "Add card"
    };
    let btn_add_card = widget::button(label).on_press_maybe(should_allow_add);

    let card_col = column!(card_info, card_stats, card_totals, btn_add_card);

    row!(card_image(app, card), card_col).spacing(10).into()
}

fn view_deck<'a>(app: &'a App) -> AppElement<'a> {
    let Some(deck) = app.builder.selected() else {
        let btn_new = widget::button("New deck").on_press(AppMessage::NewDeck);
        return column!(widget::text("No deck selected"), btn_new, view_formula_input(app))
            .spacing(10)
            .into();
    };

    let field_deck_name =
        widget::text_input("Deck name", &deck.name).on_input(AppMessage::RenameDeck);
    let field_description = widget::text_input(
        "Description",
        deck.description.as_deref().unwrap_or_default(),
    )
    .on_input(AppMessage::DescriptionChanged);
    let btn_public = widget::button(if deck.is_public { "Public" } else { "Private" })
        .on_press(AppMessage::TogglePublic);
    let toolbar = row!(
        widget::button("Save deck").on_press(AppMessage::SaveDeck),
        widget::button("Save as new deck").on_press(AppMessage::SaveAs),
        widget::button("Export").on_press(AppMessage::ExportFormula),
        widget::button("Export to file").on_press(AppMessage::ExportFormulaFile),
        widget::button("Play test").on_press(AppMessage::StartTable),
        widget::button("New deck").on_press(AppMessage::NewDeck),
    )
    .spacing(5);

    let stats = deck.stats();
    let txt_stats = widget::text(format!(
        "{}/50 cards, {} unique{}",
        stats.total,
        stats.unique,
        if deck.is_complete() { " - complete" } else { "" }
    ));
    let txt_curve = widget::text(format!(
        "Curve: {}",
        stats
            .cost_curve
            .iter()
            .map(|(cost, count)| format!("{}:{}", cost, count))
            .collect::<Vec<_>>()
            .join("  ")
    ));

    let leader: AppElement<'a> = match &deck.leader {
        Some(leader) => row!(
            card_image(app, leader),
            column!(
                widget::text(format!("Leader: {} - {}", leader.id, leader.name)),
                widget::text(format!("Life {}", leader.life.unwrap_or(0))),
                widget::button("Clear leader").on_press(AppMessage::ClearLeader),
            )
        )
        .spacing(10)
        .into(),
        None => widget::text("No leader selected").into(),
    };

    let cards = widget::scrollable(widget::column(deck.stacks().into_iter().map(view_stack)))
    .height(Length::Fill)
    .width(Length::Fill);

    let output = widget::text(&app.formula_output);

    column!(
        field_deck_name,
        row!(field_description, btn_public).spacing(5),
        toolbar,
        txt_stats,
        txt_curve,
        leader,
        cards,
        output,
        view_formula_input(app)
    )
    .spacing(10)
    .into()
}

fn view_stack<'a>(stack: StackedCard) -> AppElement<'a> {
    let card_id = stack.card.id.clone();
    let txt = widget::text(format!(
        "{}x {} - {}",
        stack.count, stack.card.id, stack.card.name
    ))
    .width(Length::Fill);
    let btn_add = widget::button("+").on_press(AppMessage::AddCard(card_id.clone()));
    let btn_remove = widget::button("-").on_press(AppMessage::RemoveCard(card_id.clone()));
    let btn_remove_all =
        widget::button("Remove all").on_press(AppMessage::RemoveAllOfCard(card_id));
    row!(txt, btn_add, btn_remove, btn_remove_all)
        .spacing(5)
        .into()
}

fn view_formula_input(app: &App) -> AppElement {
    let formula_input = widget::text_editor(&app.formula_input)
        .on_action(AppMessage::EditFormula)
        .height(150);
    let buttons = row!(
        widget::button("Import formula")
            .on_press_maybe(app.builder.can_import().then_some(AppMessage::ImportFormula)),
        widget::button("Load formula file").on_press(AppMessage::ImportFormulaFile),
    )
    .spacing(5);
    column!(formula_input, buttons).spacing(5).into()
}

fn view_saved_decks(app: &App) -> AppElement {
    let search_box =
        widget::text_input("search decks...", &app.deck_query).on_input(AppMessage::SearchDecks);

    let col_decks = widget::column(
        app.builder
            .search_decks(&app.deck_query)
            .into_iter()
            .map(view_saved_deck),
    )
    .spacing(5);

    column!(search_box, widget::scrollable(col_decks).width(Length::Fill))
        .spacing(10)
        .into()
}

fn view_saved_deck(deck: &Deck) -> AppElement {
    let deck_text = format!(
        "{} ({}/50 cards{}) - updated {}",
        deck.name,
        deck.cards.len(),
        if deck.leader.is_some() { "" } else { ", no leader" },
        deck.updated_at.format("%Y-%m-%d %H:%M")
    );
    let txt_name = widget::text(deck_text).width(Length::Fill);
    let btn_view = widget::button("Open").on_press(AppMessage::LoadDeck(deck.id));
    let btn_delete = widget::button("Delete").on_press(AppMessage::DeleteDeck(deck.id));

    row!(txt_name, btn_view, btn_delete).spacing(5).into()
}

fn view_table<'a>(app: &'a App) -> AppElement<'a> {
    let Some(table) = &app.table else {
        let hint = widget::text("Open a deck and press \"Play test\" to deal a table.");
        return hint.into();
    };

    let counters = widget::text(format!(
        "Deck {}  Life {}  Trash {}  Don deck {}  Don {} active / {} rested",
        table.deck.len(),
        table.life.len(),
        table.trash.len(),
        table.don_deck,
        table.don_active,
        table.don_rested
    ));
    let controls = row!(
        widget::button("Draw").on_press(AppMessage::TableDraw),
        widget::button("Shuffle").on_press(AppMessage::TableShuffle),
        widget::button("Take life").on_press(AppMessage::TableTakeLife),
        widget::button("Add 2 Don").on_press(AppMessage::TableAddDon),
        widget::button("Rest 1 Don").on_press(AppMessage::TableRestDon),
        widget::button("Activate 1 Don").on_press(AppMessage::TableActivateDon),
        widget::button("Refresh").on_press(AppMessage::TableRefresh),
        widget::button("Redeal").on_press(AppMessage::StartTable),
    )
    .spacing(5);

    let top = widget::text(match table.peek_top() {
        Some(card) => format!("Top of deck: {} - {}", card.card.id, card.card.name),
        None => "Deck is empty".to_owned(),
    });

    let field = table
        .leader
        .iter()
        .chain(table.characters.iter())
        .chain(table.stage.iter())
        .map(|instance| -> AppElement<'a> {
            let state = if instance.rested { "rested" } else { "active" };
            let txt = widget::text(format!(
                "{} - {} ({})",
                instance.card.id, instance.card.name, state
            ))
            .width(Length::Fill);
            let id = instance.instance_id;
            let toggle = if instance.rested {
                widget::button("Activate").on_press(AppMessage::TableActivate(id))
            } else {
                widget::button("Rest").on_press(AppMessage::TableRest(id))
            };
            let trash = widget::button("Trash")
                .on_press_maybe((!instance.card.is_leader()).then_some(AppMessage::TableTrash(id)));
            row!(txt, toggle, trash).spacing(5).into()
        });

    let hand = table.hand.iter().map(|instance| -> AppElement<'a> {
        let txt = widget::text(format!(
            "{} - {} (cost {})",
            instance.card.id, instance.card.name, instance.card.cost
        ))
        .width(Length::Fill);
        let play = widget::button("Play").on_press(AppMessage::TablePlay(instance.instance_id));
        let trash = widget::button("Trash").on_press(AppMessage::TableTrash(instance.instance_id));
        row!(txt, play, trash).spacing(5).into()
    });

    column!(
        counters,
        controls,
        top,
        widget::text("Field"),
        widget::column(field),
        widget::text("Hand"),
        widget::scrollable(widget::column(hand)).width(Length::Fill),
    )
    .spacing(10)
    .into()
}

async fn with_store<T, F>(store: SharedStore, op: F) -> (Result<T, String>, Vec<String>)
where
    T: Send + 'static,
    F: FnOnce(&mut dyn DeckStore) -> Result<T, StoreError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let mut guard = match store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = op(&mut **guard).map_err(|e| e.to_string());
        (result, guard.drain_warnings())
    });
    match task.await {
        Ok(outcome) => outcome,
        Err(e) => (Err(e.to_string()), Vec::new()),
    }
}

async fn download_image(card_id: String, location: String) -> (String, Option<Bytes>) {
    let img = if location.starts_with("http://") || location.starts_with("https://") {
        match reqwest::get(&location).await {
            Ok(res) => res.bytes().await.ok(),
            Err(_) => None,
        }
    } else {
        tokio::fs::read(&location).await.ok().map(Bytes::from)
    };
    (card_id, img)
}

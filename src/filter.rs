use crate::models::{Card, CardColor, CardType};

/// Transient facet selections. `visible` is a pure function of the catalog and this state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub colors: Vec<CardColor>,
    pub types: Vec<CardType>,
    pub costs: Vec<u32>,
    pub min_power: Option<u32>,
    pub max_power: Option<u32>,
}

fn toggle<T: PartialEq>(items: &mut Vec<T>, item: T) {
    match items.iter().position(|i| *i == item) {
        Some(index) => {
            items.remove(index);
        }
        None => items.push(item),
    }
}

impl FilterState {
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn toggle_color(&mut self, color: CardColor) {
        toggle(&mut self.colors, color);
    }

    pub fn toggle_type(&mut self, card_type: CardType) {
        toggle(&mut self.types, card_type);
    }

    pub fn toggle_cost(&mut self, cost: u32) {
        toggle(&mut self.costs, cost);
    }

    /// Only the bounds that are given are overwritten.
    pub fn set_power_range(&mut self, min: Option<u32>, max: Option<u32>) {
        if min.is_some() {
            self.min_power = min;
        }
        if max.is_some() {
            self.max_power = max;
        }
    }

    pub fn clear_power_range(&mut self) {
        self.min_power = None;
        self.max_power = None;
    }

    pub fn reset(&mut self) {
        *self = FilterState::default();
    }

    pub fn is_active(&self) -> bool {
        *self != FilterState::default()
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.matches_search(card)
            && (self.colors.is_empty() || self.colors.contains(&card.color))
            && (self.types.is_empty() || self.types.contains(&card.card_type))
            && (self.costs.is_empty() || self.costs.contains(&card.cost))
            && self.matches_power(card)
    }

    fn matches_search(&self, card: &Card) -> bool {
        let terms: Vec<String> = self
            .search
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return true;
        }

        let haystack = format!(
            "{} {} {} {}",
            card.name, card.effect, card.card_type, card.color
        )
        .to_lowercase();
        terms.iter().any(|term| haystack.contains(term.as_str()))
    }

    fn matches_power(&self, card: &Card) -> bool {
        // Cards without a power value are never excluded by the range.
        let Some(power) = card.power else {
            return true;
        };
        self.min_power.map_or(true, |min| power >= min)
            && self.max_power.map_or(true, |max| power <= max)
    }
}

pub fn visible(catalog: &[Card], state: &FilterState) -> Vec<Card> {
    catalog
        .iter()
        .filter(|card| state.matches(card))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::card;

    fn catalog() -> Vec<Card> {
        let mut zoro = card("OP01-001", CardType::Leader, CardColor::Red, 0);
        zoro.name = "Roronoa Zoro".to_string();
        let mut nami = card("OP01-016", CardType::Character, CardColor::Red, 1);
        nami.name = "Nami".to_string();
        nami.effect = "Look at 5 cards from the top of your deck".to_string();
        nami.power = Some(2000);
        let mut law = card("OP01-047", CardType::Character, CardColor::Green, 5);
        law.name = "Trafalgar Law".to_string();
        law.power = Some(6000);
        let mut pistol = card("ST01-012", CardType::Event, CardColor::Blue, 1);
        pistol.name = "Gum-Gum Pistol".to_string();
        vec![zoro, nami, law, pistol]
    }

    fn ids(cards: &[Card]) -> Vec<&str> {
        cards.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn empty_state_shows_everything() {
        let all = catalog();
        assert_eq!(visible(&all, &FilterState::default()), all);
    }

    #[test]
    fn search_terms_are_ored_across_name_effect_type_and_color() {
        let all = catalog();
        let mut state = FilterState::default();

        state.set_search("LAW pistol");
        assert_eq!(ids(&visible(&all, &state)), vec!["OP01-047", "ST01-012"]);

        state.set_search("deck");
        assert_eq!(ids(&visible(&all, &state)), vec!["OP01-016"]);

        state.set_search("green");
        assert_eq!(ids(&visible(&all, &state)), vec!["OP01-047"]);

        state.set_search("   ");
        assert_eq!(visible(&all, &state).len(), 4);
    }

    #[test]
    fn facets_combine_as_conjunction() {
        let all = catalog();
        let mut state = FilterState::default();
        state.toggle_color(CardColor::Red);
        state.toggle_type(CardType::Character);
        assert_eq!(ids(&visible(&all, &state)), vec!["OP01-016"]);

        state.toggle_color(CardColor::Green);
        assert_eq!(ids(&visible(&all, &state)), vec!["OP01-016", "OP01-047"]);

        state.toggle_cost(5);
        assert_eq!(ids(&visible(&all, &state)), vec!["OP01-047"]);

        state.toggle_cost(5);
        state.toggle_color(CardColor::Red);
        assert_eq!(state.colors, vec![CardColor::Green]);
    }

    #[test]
    fn power_range_exempts_cards_without_power() {
        let all = catalog();
        let mut state = FilterState::default();
        state.set_power_range(Some(3000), None);
        assert_eq!(
            ids(&visible(&all, &state)),
            vec!["OP01-001", "OP01-047", "ST01-012"]
        );

        state.set_power_range(None, Some(5000));
        assert_eq!(state.min_power, Some(3000));
        assert_eq!(ids(&visible(&all, &state)), vec!["OP01-001", "ST01-012"]);
    }

    #[test]
    fn reset_restores_the_full_catalog() {
        let all = catalog();
        let mut state = FilterState::default();
        state.set_search("nothing matches this");
        state.toggle_type(CardType::Stage);
        state.set_power_range(Some(1), Some(2));
        assert!(visible(&all, &state).is_empty());
        assert!(state.is_active());

        state.reset();
        assert!(!state.is_active());
        assert_eq!(visible(&all, &state), all);
    }
}

//! Filter selection shared by the deck query and the shortlist view.
//!
//! The same [`CardFilter`] produces the Scryfall search string for new cards
//! and the local predicate for cards already accepted. Both sides must agree:
//! a card the query can return is a card the predicate keeps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::card::{Card, Color};

/// Mana value ranges offered by the filter bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManaValueBucket {
    UpToTwo,
    ThreeToFour,
    FiveToSix,
    SevenPlus,
}

impl ManaValueBucket {
    pub const ALL: [ManaValueBucket; 4] = [
        ManaValueBucket::UpToTwo,
        ManaValueBucket::ThreeToFour,
        ManaValueBucket::FiveToSix,
        ManaValueBucket::SevenPlus,
    ];

    /// Scryfall search clause for this range
    pub fn clause(self) -> &'static str {
        match self {
            ManaValueBucket::UpToTwo => "cmc<=2",
            ManaValueBucket::ThreeToFour => "cmc>=3 cmc<=4",
            ManaValueBucket::FiveToSix => "cmc>=5 cmc<=6",
            ManaValueBucket::SevenPlus => "cmc>=7",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ManaValueBucket::UpToTwo => "1-2",
            ManaValueBucket::ThreeToFour => "3-4",
            ManaValueBucket::FiveToSix => "5-6",
            ManaValueBucket::SevenPlus => "7+",
        }
    }

    /// Inclusive range check, mirroring [`ManaValueBucket::clause`]
    pub fn contains(self, mana_value: f64) -> bool {
        match self {
            ManaValueBucket::UpToTwo => mana_value <= 2.0,
            ManaValueBucket::ThreeToFour => (3.0..=4.0).contains(&mana_value),
            ManaValueBucket::FiveToSix => (5.0..=6.0).contains(&mana_value),
            ManaValueBucket::SevenPlus => mana_value >= 7.0,
        }
    }
}

impl fmt::Display for ManaValueBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ManaValueBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1-2" | "<=2" | "0-2" => Ok(ManaValueBucket::UpToTwo),
            "3-4" => Ok(ManaValueBucket::ThreeToFour),
            "5-6" => Ok(ManaValueBucket::FiveToSix),
            "7+" | ">=7" => Ok(ManaValueBucket::SevenPlus),
            other => Err(format!(
                "unknown mana value range '{}', expected one of 1-2, 3-4, 5-6, 7+",
                other
            )),
        }
    }
}

/// Selected colors plus at most one mana value range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFilter {
    colors: BTreeSet<Color>,
    mana_value: Option<ManaValueBucket>,
}

impl CardFilter {
    pub fn new(colors: impl IntoIterator<Item = Color>, mana_value: Option<ManaValueBucket>) -> Self {
        Self {
            colors: colors.into_iter().collect(),
            mana_value,
        }
    }

    pub fn colors(&self) -> &BTreeSet<Color> {
        &self.colors
    }

    pub fn mana_value(&self) -> Option<ManaValueBucket> {
        self.mana_value
    }

    pub fn toggle_color(&mut self, color: Color) {
        if !self.colors.remove(&color) {
            self.colors.insert(color);
        }
    }

    pub fn set_mana_value(&mut self, bucket: Option<ManaValueBucket>) {
        self.mana_value = bucket;
    }

    pub fn clear(&mut self) {
        self.colors.clear();
        self.mana_value = None;
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.mana_value.is_none()
    }

    /// Selected colors in WUBRG order, e.g. "WR"
    pub fn color_code(&self) -> String {
        self.colors.iter().map(|c| c.code()).collect()
    }

    /// Build the Scryfall search string.
    ///
    /// `base` is always first (`is:commander` by default). A color selection
    /// becomes `id<=WR -id:c`: identity within the selection, colorless cards
    /// excluded. Clauses are separated by spaces, which Scryfall reads as AND.
    pub fn build_query(&self, base: &str) -> String {
        let mut clauses: Vec<String> = Vec::new();
        if !base.trim().is_empty() {
            clauses.push(base.trim().to_string());
        }
        if !self.colors.is_empty() {
            clauses.push(format!("id<={}", self.color_code()));
            clauses.push("-id:c".to_string());
        }
        if let Some(bucket) = self.mana_value {
            clauses.push(bucket.clause().to_string());
        }
        clauses.join(" ")
    }

    /// Identity is non-empty, inside the selection and overlapping it.
    /// Any card matches an empty selection.
    pub fn matches_color(&self, card: &Card) -> bool {
        if self.colors.is_empty() {
            return true;
        }
        !card.color_identity.is_empty()
            && card.color_identity.iter().all(|c| self.colors.contains(c))
            && card.color_identity.iter().any(|c| self.colors.contains(c))
    }

    pub fn matches_mana_value(&self, card: &Card) -> bool {
        self.mana_value
            .map_or(true, |bucket| bucket.contains(card.mana_value))
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.matches_color(card) && self.matches_mana_value(card)
    }
}

/// Ordering for the shortlist view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Order the cards were accepted in
    #[default]
    Added,
    Name,
    ManaValue,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "added" => Ok(SortOrder::Added),
            "name" => Ok(SortOrder::Name),
            "mana-value" | "mv" | "cmc" => Ok(SortOrder::ManaValue),
            other => Err(format!(
                "unknown sort order '{}', expected added, name or mana-value",
                other
            )),
        }
    }
}

/// Keep the cards matching `filter`, ordered by `sort`.
///
/// Sorting is stable, so ties stay in acceptance order.
pub fn filter_cards<'a>(cards: &'a [Card], filter: &CardFilter, sort: SortOrder) -> Vec<&'a Card> {
    let mut kept: Vec<&Card> = cards.iter().filter(|card| filter.matches(card)).collect();
    match sort {
        SortOrder::Added => {}
        SortOrder::Name => kept.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        SortOrder::ManaValue => kept.sort_by(|a, b| a.mana_value.total_cmp(&b.mana_value)),
    }
    kept
}

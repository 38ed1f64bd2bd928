use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five colors a card's identity is drawn from.
///
/// Variants are declared in WUBRG order, so sorting a set of colors yields the
/// order Scryfall expects inside an identity token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    W,
    U,
    B,
    R,
    G,
}

impl Color {
    pub const ALL: [Color; 5] = [Color::W, Color::U, Color::B, Color::R, Color::G];

    pub fn code(self) -> char {
        match self {
            Color::W => 'W',
            Color::U => 'U',
            Color::B => 'B',
            Color::R => 'R',
            Color::G => 'G',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Color::W => "White",
            Color::U => "Blue",
            Color::B => "Black",
            Color::R => "Red",
            Color::G => "Green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "W" | "WHITE" => Ok(Color::W),
            "U" | "BLUE" => Ok(Color::U),
            "B" | "BLACK" => Ok(Color::B),
            "R" | "RED" => Ok(Color::R),
            "G" | "GREEN" => Ok(Color::G),
            other => Err(format!("unknown color '{}', expected one of W, U, B, R, G", other)),
        }
    }
}

/// A card as presented to the user and stored in the shortlist.
///
/// Built only from a well-formed API payload that carries an image; see
/// [`crate::providers::scryfall::parse_card`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Generated when the card is fetched; not Scryfall's id.
    pub id: String,

    pub name: String,

    pub image_url: String,

    #[serde(default)]
    pub price: Option<String>,

    #[serde(default)]
    pub mana_cost: String,

    #[serde(default)]
    pub color_identity: Vec<Color>,

    #[serde(default)]
    pub mana_value: f64,

    #[serde(default)]
    pub oracle_text: String,

    #[serde(default)]
    pub power: Option<String>,

    #[serde(default)]
    pub toughness: Option<String>,

    #[serde(default)]
    pub external_link: String,
}

impl Card {
    /// Minimal card with a fresh id; remaining fields take their empty values
    pub fn new(name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            image_url: image_url.into(),
            price: None,
            mana_cost: String::new(),
            color_identity: Vec::new(),
            mana_value: 0.0,
            oracle_text: String::new(),
            power: None,
            toughness: None,
            external_link: String::new(),
        }
    }

    pub fn with_color_identity(mut self, colors: impl IntoIterator<Item = Color>) -> Self {
        self.color_identity = colors.into_iter().collect();
        self
    }

    pub fn with_mana_value(mut self, mana_value: f64) -> Self {
        self.mana_value = mana_value;
        self
    }

    pub fn is_colorless(&self) -> bool {
        self.color_identity.is_empty()
    }

    pub fn price_label(&self) -> String {
        match &self.price {
            Some(price) => format!("${}", price),
            None => "Unknown".to_string(),
        }
    }

    /// "3 / 4" for creatures, `None` when either side is missing
    pub fn power_toughness(&self) -> Option<String> {
        match (&self.power, &self.toughness) {
            (Some(power), Some(toughness)) => Some(format!("{} / {}", power, toughness)),
            _ => None,
        }
    }

    /// Identity in canonical WUBRG order, e.g. "WR"
    pub fn identity_code(&self) -> String {
        let mut colors = self.color_identity.clone();
        colors.sort();
        colors.dedup();
        colors.into_iter().map(Color::code).collect()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        let mana_cost = if self.mana_cost.is_empty() { "-" } else { self.mana_cost.as_str() };
        writeln!(f, "  Mana Cost: {}", mana_cost)?;
        writeln!(f, "  Price: {}", self.price_label())?;
        if let Some(pt) = self.power_toughness() {
            writeln!(f, "  Power / Toughness: {}", pt)?;
        }
        if !self.oracle_text.is_empty() {
            writeln!(f, "  Oracle Text:")?;
            for line in self.oracle_text.lines() {
                writeln!(f, "    {}", line)?;
            }
        }
        if !self.external_link.is_empty() {
            writeln!(f, "  EDHREC: {}", self.external_link)?;
        }
        write!(f, "  Image: {}", self.image_url)
    }
}

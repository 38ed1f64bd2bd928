use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use std::future::Future;

use super::sf_utils;
use crate::card::{Card, Color};
use crate::config::SwipeConfig;
use crate::providers::{BaseProvider, CardSource, ProviderError, ProviderResult};

/// Random-card client for `api.scryfall.com`
pub struct ScryfallProvider {
    base: BaseProvider,
    endpoint: String,
    max_attempts: u32,
}

impl ScryfallProvider {
    pub const RANDOM_CARD_URL: &'static str = "https://api.scryfall.com/cards/random";

    pub fn new(config: &SwipeConfig) -> ProviderResult<Self> {
        config.validate()?;
        let headers = sf_utils::build_http_header(config);
        let base = BaseProvider::new("sf".to_string(), headers, config.request_timeout());

        Ok(Self {
            base,
            endpoint: config.api_endpoint.clone(),
            max_attempts: config.max_fetch_attempts,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    async fn fetch_once(&self, query: &str) -> ProviderResult<Card> {
        let params = [("q", query)];
        let payload = self.base.download_json(&self.endpoint, Some(&params[..])).await?;
        parse_card(&payload)
    }
}

#[async_trait]
impl CardSource for ScryfallProvider {
    async fn fetch_card(&self, query: &str) -> ProviderResult<Card> {
        retry_on_malformed(self.max_attempts, |_| self.fetch_once(query)).await
    }
}

/// Re-run `attempt` while it reports a card without images.
///
/// Every other outcome, success or failure, is returned as soon as it
/// happens. After `max_attempts` malformed payloads the error carries the
/// number of attempts made.
pub async fn retry_on_malformed<F, Fut>(max_attempts: u32, mut attempt: F) -> ProviderResult<Card>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ProviderResult<Card>>,
{
    for n in 1..=max_attempts {
        match attempt(n).await {
            Err(ProviderError::MalformedPayloadError { .. }) => {
                debug!("Card payload without images (attempt {}/{}), retrying", n, max_attempts);
            }
            other => return other,
        }
    }

    warn!("Giving up after {} payloads without images", max_attempts);
    Err(ProviderError::MalformedPayloadError {
        attempts: max_attempts,
    })
}

/// Normalize a Scryfall card object into a [`Card`].
///
/// Single-faced cards carry `image_uris` at the top level; multi-faced cards
/// carry them on each face, and the first face is used. Text fields fall back
/// to the first face the same way.
pub fn parse_card(payload: &Value) -> ProviderResult<Card> {
    if sf_utils::is_error_object(payload) {
        return Err(ProviderError::UpstreamError(sf_utils::error_details(payload)));
    }

    let name = sf_utils::str_field(payload, "name")
        .ok_or_else(|| ProviderError::ParseError("card payload has no name".to_string()))?;

    let face = sf_utils::first_face(payload);
    let image_url = image_png(payload)
        .or_else(|| face.and_then(image_png))
        .ok_or(ProviderError::MalformedPayloadError { attempts: 1 })?;

    let with_face_fallback = |key: &str| -> String {
        sf_utils::str_field(payload, key)
            .or_else(|| face.and_then(|f| sf_utils::str_field(f, key)))
            .unwrap_or_default()
            .to_string()
    };

    let mut card = Card::new(name, image_url);
    card.price = payload
        .get("prices")
        .and_then(|prices| sf_utils::str_field(prices, "usd"))
        .map(str::to_string);
    card.mana_cost = with_face_fallback("mana_cost");
    card.oracle_text = with_face_fallback("oracle_text");
    card.power = sf_utils::str_field(payload, "power").map(str::to_string);
    card.toughness = sf_utils::str_field(payload, "toughness").map(str::to_string);
    card.external_link = payload
        .get("related_uris")
        .and_then(|uris| sf_utils::str_field(uris, "edhrec"))
        .unwrap_or_default()
        .to_string();
    card.color_identity = parse_color_identity(payload);
    card.mana_value = payload.get("cmc").and_then(|v| v.as_f64()).unwrap_or(0.0);

    debug!("Parsed card {} ({})", card.name, card.id);
    Ok(card)
}

fn image_png(object: &Value) -> Option<&str> {
    object
        .get("image_uris")
        .and_then(|uris| sf_utils::str_field(uris, "png"))
}

fn parse_color_identity(payload: &Value) -> Vec<Color> {
    let empty_vec = vec![];
    let codes = payload
        .get("color_identity")
        .and_then(|v| v.as_array())
        .unwrap_or(&empty_vec);

    codes
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|code| match code.parse::<Color>() {
            Ok(color) => Some(color),
            Err(e) => {
                warn!("Ignoring color identity entry: {}", e);
                None
            }
        })
        .collect()
}

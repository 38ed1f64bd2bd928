use async_trait::async_trait;
use thiserror::Error;

use crate::card::Card;

/// Provider error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Upstream error: {0}")]
    UpstreamError(String),
    #[error("Card payload had no usable image after {attempts} attempts")]
    MalformedPayloadError { attempts: u32 },
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl ProviderError {
    /// Message shown inline when a deck fails to load
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::UpstreamError(_) => "No cards match these filters.".to_string(),
            ProviderError::MalformedPayloadError { .. } => {
                "The card service kept returning cards without images. Please try again.".to_string()
            }
            _ => "Could not load cards. Please try again.".to_string(),
        }
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Anything that can hand out one random card for a query.
///
/// The deck only talks to this trait, so tests can script the upstream.
#[async_trait]
pub trait CardSource: Send + Sync {
    async fn fetch_card(&self, query: &str) -> ProviderResult<Card>;
}

pub mod provider_base;
pub mod scryfall;

pub use provider_base::BaseProvider;
pub use scryfall::ScryfallProvider;

//! Swipe through random commander cards and keep a shortlist.
//!
//! The pieces, leaf first:
//! - [`shortlist::CardStore`] persists accepted cards in a key-value store.
//! - [`providers::ScryfallProvider`] fetches and normalizes single cards.
//! - [`deck::DeckManager`] keeps a prefetched queue topped up.
//! - [`filters::CardFilter`] builds the search query and the matching local predicate.
//! - [`shortlist::ShortlistView`] filters, sorts and pages the shortlist.

pub mod card;
pub mod config;
pub mod deck;
pub mod filters;
pub mod providers;
pub mod shortlist;

pub use card::{Card, Color};
pub use config::SwipeConfig;
pub use deck::{DeckManager, DeckSettings, DeckStatus};
pub use filters::{CardFilter, ManaValueBucket, SortOrder};
pub use providers::{CardSource, ProviderError, ProviderResult, ScryfallProvider};
pub use shortlist::{CardStore, FileStore, KeyValueStore, MemoryStore, ShortlistView, StorageError};

use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::card::Card;

pub mod view;

pub use view::{paginate, Page, ShortlistView};

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// String key-value store the shortlist is persisted in
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// In-process store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        // Replace atomically: write a sibling file, then rename over the target
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// The user's accepted cards, unique by name, persisted after every change
pub struct CardStore<S: KeyValueStore> {
    store: S,
    key: String,
    cards: Vec<Card>,
}

impl<S: KeyValueStore> CardStore<S> {
    pub const DEFAULT_KEY: &'static str = "Cards";

    /// Open the store and read whatever is persisted under `key`
    pub fn open(store: S, key: impl Into<String>) -> Self {
        let mut card_store = Self {
            store,
            key: key.into(),
            cards: Vec::new(),
        };
        card_store.cards = card_store.load();
        card_store
    }

    /// Read the persisted shortlist.
    ///
    /// A missing, unreadable or unparseable entry yields an empty list.
    pub fn load(&self) -> Vec<Card> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Could not read shortlist '{}': {}", self.key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Card>>(&raw) {
            Ok(cards) => {
                info!("Loaded {} shortlisted cards", cards.len());
                cards
            }
            Err(e) => {
                warn!("Shortlist '{}' is corrupt, starting empty: {}", self.key, e);
                Vec::new()
            }
        }
    }

    pub fn save(&self) -> StorageResult<()> {
        self.persist(&self.cards)
    }

    fn persist(&self, cards: &[Card]) -> StorageResult<()> {
        let json = serde_json::to_string(cards)?;
        self.store.set(&self.key, &json)
    }

    /// Add `card` unless a card with the same name is already present.
    ///
    /// Returns whether the shortlist changed. The in-memory list only changes
    /// once the new list has been written.
    pub fn append(&mut self, card: Card) -> StorageResult<bool> {
        if self.contains(&card.name) {
            return Ok(false);
        }
        let name = card.name.clone();
        let mut next = self.cards.clone();
        next.push(card);
        self.persist(&next)?;

        info!("Shortlisted {}", name);
        self.cards = next;
        Ok(true)
    }

    /// Drop the card called `name`. Returns whether one was removed.
    pub fn remove(&mut self, name: &str) -> StorageResult<bool> {
        if !self.contains(name) {
            return Ok(false);
        }
        let next: Vec<Card> = self
            .cards
            .iter()
            .filter(|card| card.name != name)
            .cloned()
            .collect();
        self.persist(&next)?;

        info!("Removed {} from shortlist", name);
        self.cards = next;
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cards.iter().any(|card| card.name == name)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

//! Local key-value persistence for favorites and the last generated recipe.
//!
//! Everything here is a convenience cache: failures are logged and swallowed,
//! never surfaced to the wizard.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::{FavoriteRecipe, Recipe};

pub const FAVORITES_KEY: &str = "ai_recipe_favorites";
pub const LAST_RECIPE_KEY: &str = "ai_recipe_last";
/// Reserved; no mutation path writes it.
pub const APP_STATE_KEY: &str = "ai_recipe_app_state";
/// Reserved; no mutation path writes it.
pub const THEME_KEY: &str = "ai_recipe_theme";

const ALL_KEYS: [&str; 4] = [FAVORITES_KEY, APP_STATE_KEY, THEME_KEY, LAST_RECIPE_KEY];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Synchronous string key-value store scoped to this application.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default store under the data directory (~/.pantry-chef/store/).
    pub fn open_default() -> Self {
        Self::new(crate::data_dir().join("store"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn io_err(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
        move |source| StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(Self::io_err(key))
    }

    /// Atomic write (temp file + rename) so a crash never leaves a half-written value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(Self::io_err(key))?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(Self::io_err(key))?;
        fs::rename(&tmp, self.path_for(key)).map_err(Self::io_err(key))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).map_err(Self::io_err(key))
        } else {
            Ok(())
        }
    }
}

/// In-memory store for tests and `--ephemeral` sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Typed access to the persisted favorites and last recipe.
pub struct Persistence {
    kv: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(kv: impl KeyValueStore + 'static) -> Self {
        Self { kv: Box::new(kv) }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.kv.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Decode {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.kv.set(key, &json)
    }

    pub fn load_favorites(&self) -> Vec<FavoriteRecipe> {
        match self.read_json(FAVORITES_KEY) {
            Ok(favorites) => favorites.unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "error loading favorites");
                Vec::new()
            }
        }
    }

    pub fn save_favorites(&self, favorites: &[FavoriteRecipe]) {
        if let Err(e) = self.write_json(FAVORITES_KEY, favorites) {
            tracing::error!(error = %e, "error saving favorites");
        }
    }

    pub fn is_favorite(&self, recipe_id: &str) -> bool {
        self.load_favorites().iter().any(|f| f.id() == recipe_id)
    }

    pub fn load_last_recipe(&self) -> Option<Recipe> {
        match self.read_json(LAST_RECIPE_KEY) {
            Ok(recipe) => recipe,
            Err(e) => {
                tracing::error!(error = %e, "error loading last recipe");
                None
            }
        }
    }

    pub fn save_last_recipe(&self, recipe: &Recipe) {
        if let Err(e) = self.write_json(LAST_RECIPE_KEY, recipe) {
            tracing::error!(error = %e, "error saving last recipe");
        }
    }

    /// Remove every key this application owns, reserved ones included.
    pub fn clear_all(&self) {
        for key in ALL_KEYS {
            if let Err(e) = self.kv.remove(key) {
                tracing::error!(error = %e, "error clearing storage");
            }
        }
    }

    /// Total size in bytes of everything currently stored.
    pub fn storage_size(&self) -> usize {
        ALL_KEYS
            .iter()
            .filter_map(|key| match self.kv.get(key) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, "error calculating storage size");
                    None
                }
            })
            .map(|value| value.len())
            .sum()
    }
}

//! Local JSON storage for users, sessions and settings.
//!
//! Each document lives in its own file in the data directory. All three are
//! rewritten together on every state change.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::models::{ChargingSession, Settings, User};
use crate::state::DomainState;

/// The documents kept in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Users,
    Sessions,
    Settings,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [StoreKey::Users, StoreKey::Sessions, StoreKey::Settings];

    pub fn filename(&self) -> &'static str {
        match self {
            StoreKey::Users => "users.json",
            StoreKey::Sessions => "sessions.json",
            StoreKey::Settings => "settings.json",
        }
    }
}

/// Durable mirror of the domain state.
#[derive(Debug, Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn path(&self, key: StoreKey) -> PathBuf {
        self.data_dir.join(key.filename())
    }

    pub fn exists(&self, key: StoreKey) -> bool {
        self.path(key).exists()
    }

    /// Loads the full state. Missing documents fall back to their defaults.
    pub fn load(&self) -> Result<DomainState, StorageError> {
        let users: Vec<User> = self.load_key(StoreKey::Users)?.unwrap_or_default();
        let sessions: Vec<ChargingSession> =
            self.load_key(StoreKey::Sessions)?.unwrap_or_default();
        let settings: Settings = self.load_key(StoreKey::Settings)?.unwrap_or_default();

        Ok(DomainState::new(users, sessions, settings))
    }

    /// Writes all three documents.
    ///
    /// Creates the data directory if it doesn't exist.
    pub fn save(&self, state: &DomainState) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        self.save_key(StoreKey::Users, &state.users)?;
        self.save_key(StoreKey::Sessions, &state.sessions)?;
        self.save_key(StoreKey::Settings, &state.settings)?;

        Ok(())
    }

    fn load_key<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>, StorageError> {
        let path = self.path(key);

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let value = serde_json::from_str(&contents)
                    .map_err(|e| StorageError::LoadError(path, e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    fn save_key<T: Serialize>(&self, key: StoreKey, value: &T) -> Result<(), StorageError> {
        let path = self.path(key);
        let contents = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::SaveError(path.clone(), e.to_string()))?;

        fs::write(&path, contents).map_err(|e| StorageError::IoError(path, e))
    }
}

/// Errors that can occur during local storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// A stored document could not be parsed.
    LoadError(PathBuf, String),
    /// A document could not be serialized.
    SaveError(PathBuf, String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::LoadError(path, e) => {
                write!(f, "Failed to load {}: {}", path.display(), e)
            }
            StorageError::SaveError(path, e) => {
                write!(f, "Failed to serialize {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::LoadError(_, _) | StorageError::SaveError(_, _) => None,
        }
    }
}

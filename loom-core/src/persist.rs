//! Session persistence.
//!
//! A session is stored as one JSON document under a fixed key. Writes replace
//! the whole entry; a stored entry that cannot be read back is deleted so the
//! next load reports "no save" instead of failing again.

use crate::engine::SessionState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Saved session is corrupt: {0}")]
    CorruptSave(String),
}

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

/// Storage key for the session.
pub const SAVE_KEY: &str = "loom_session";

/// The persisted envelope around a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    /// Save format version for compatibility checking.
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub session: SessionState,
}

impl SavedSession {
    pub fn new(session: SessionState) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now(),
            session,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and check a stored envelope from raw bytes.
    pub fn from_json(content: &[u8]) -> Result<Self, PersistError> {
        let saved: Self = serde_json::from_slice(content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        let state = &saved.session;
        if !state.document.has_scene(&state.current_scene_id) {
            return Err(PersistError::CorruptSave(format!(
                "current scene '{}' is not part of the story",
                state.current_scene_id
            )));
        }

        Ok(saved)
    }
}

/// A durable key-value blob store.
#[async_trait]
pub trait SaveStore: Send + Sync {
    /// Read the raw value under `key`, `None` if absent.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;

    /// Replace the value under `key`.
    async fn write(&self, key: &str, value: &str) -> Result<(), PersistError>;

    /// Remove `key`; removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), PersistError>;

    async fn contains(&self, key: &str) -> Result<bool, PersistError>;
}

/// Stores each key as `<key>.json` inside a directory.
///
/// Default location:
/// - Linux: ~/.local/share/loom
/// - macOS: ~/Library/Application Support/io.loom.loom
/// - Windows: C:\Users\<User>\AppData\Roaming\loom\loom\data
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The platform data directory, or `./.loom` when none is available.
    pub fn default_dir() -> PathBuf {
        ProjectDirs::from("io", "loom", "loom")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".loom"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl SaveStore for FileStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match fs::read(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool, PersistError> {
        Ok(fs::try_exists(self.path_for(key)).await?)
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SaveStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.as_bytes().to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PersistError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.entries.read().await.contains_key(key))
    }
}

/// Saves and loads the session under a single key.
#[derive(Clone)]
pub struct SaveManager {
    store: Arc<dyn SaveStore>,
    key: String,
}

impl SaveManager {
    pub fn new(store: Arc<dyn SaveStore>) -> Self {
        Self {
            store,
            key: SAVE_KEY.to_string(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Arc<dyn SaveStore> {
        &self.store
    }

    /// Save the session, returning when it was written.
    pub async fn try_save(&self, state: &SessionState) -> Result<DateTime<Utc>, PersistError> {
        let saved = SavedSession::new(state.clone());
        let content = saved.to_json()?;
        self.store.write(&self.key, &content).await?;

        tracing::info!(key = %self.key, scene = %state.current_scene_id, "session saved");
        Ok(saved.saved_at)
    }

    /// Save the session, reporting only success.
    pub async fn save(&self, state: &SessionState) -> bool {
        match self.try_save(state).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "failed to save session");
                false
            }
        }
    }

    /// Load the saved session, if any.
    ///
    /// An entry that cannot be decoded is deleted and reported as
    /// [`PersistError::CorruptSave`].
    pub async fn load(&self) -> Result<Option<SessionState>, PersistError> {
        let Some(content) = self.store.read(&self.key).await? else {
            return Ok(None);
        };

        match SavedSession::from_json(&content) {
            Ok(saved) => {
                tracing::info!(key = %self.key, saved_at = %saved.saved_at, "session loaded");
                Ok(Some(saved.session))
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding corrupt save");
                if let Err(delete_err) = self.store.delete(&self.key).await {
                    tracing::error!(key = %self.key, error = %delete_err, "failed to delete corrupt save");
                }
                Err(match e {
                    PersistError::CorruptSave(reason) => PersistError::CorruptSave(reason),
                    other => PersistError::CorruptSave(other.to_string()),
                })
            }
        }
    }

    /// Whether a save is present, without decoding it.
    pub async fn exists(&self) -> bool {
        match self.store.contains(&self.key).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to check for save");
                false
            }
        }
    }

    /// Remove the save unconditionally.
    pub async fn clear(&self) -> Result<(), PersistError> {
        self.store.delete(&self.key).await?;
        tracing::info!(key = %self.key, "save cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_story;

    fn state() -> SessionState {
        SessionState::new(sample_story()).unwrap()
    }

    fn manager() -> SaveManager {
        SaveManager::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_envelope_format() {
        let json = SavedSession::new(state()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], SAVE_VERSION);
        assert!(value["savedAt"].is_string());
        assert_eq!(value["session"]["currentSceneId"], "scene_1");
    }

    #[test]
    fn test_envelope_rejects_other_versions() {
        let mut saved = SavedSession::new(state());
        saved.version = 7;
        let json = serde_json::to_string(&saved).unwrap();

        assert!(matches!(
            SavedSession::from_json(json.as_bytes()),
            Err(PersistError::VersionMismatch {
                expected: 1,
                found: 7
            })
        ));
    }

    #[test]
    fn test_envelope_rejects_unknown_current_scene() {
        let mut saved = SavedSession::new(state());
        saved.session.current_scene_id = "scene_404".to_string();
        let json = serde_json::to_string(&saved).unwrap();

        assert!(matches!(
            SavedSession::from_json(json.as_bytes()),
            Err(PersistError::CorruptSave(_))
        ));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let saves = manager();
        let state = state();

        assert!(!saves.exists().await);
        assert!(saves.save(&state).await);
        assert!(saves.exists().await);
        assert_eq!(saves.load().await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn test_load_without_save() {
        assert_eq!(manager().load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_save_is_deleted() {
        let saves = manager();
        saves
            .store()
            .write(SAVE_KEY, "{\"version\": 1, \"session\": ")
            .await
            .unwrap();

        assert!(matches!(
            saves.load().await,
            Err(PersistError::CorruptSave(_))
        ));
        assert!(!saves.exists().await);
        assert_eq!(saves.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_is_unconditional() {
        let saves = manager();
        saves.clear().await.unwrap();

        saves.save(&state()).await;
        saves.clear().await.unwrap();
        assert!(!saves.exists().await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store: Arc<dyn SaveStore> = Arc::new(MemoryStore::new());
        let first = SaveManager::new(store.clone());
        let second = SaveManager::new(store).with_key("other");

        first.save(&state()).await;
        assert!(first.exists().await);
        assert!(!second.exists().await);
    }
}

//! StorySession - the primary public API for playing a story.
//!
//! A session ties together the traversal state machine, persistence and the
//! generation lifecycle, and exposes the handful of input events a front-end
//! needs: start, load, save, reset and choose.

use crate::autosave::AUTOSAVE_INTERVAL;
use crate::document::{Character, Choice, Scene, StoryDocument};
use crate::engine::{ChoiceOutcome, SessionState, Traversal, TraversalError, TraversalStatus};
use crate::generator::{
    GenerationError, GeneratorConfig, StoryGenerator, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    STORY_PROMPT,
};
use crate::persist::{FileStore, PersistError, SaveManager, SAVE_KEY};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Shown when a story could not be generated.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate story. Please check the API key and try again.";

/// Shown when the stored save could not be read back.
pub const CORRUPT_SAVE_MESSAGE: &str = "Failed to load saved game. The file might be corrupted.";

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("A story is already being generated")]
    GenerationInProgress,
}

/// Configuration for a story session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory for save files; the platform data directory when `None`.
    pub save_dir: Option<PathBuf>,

    /// Storage key for the session.
    pub save_key: String,

    /// Time between autosaves.
    pub autosave_interval: Duration,

    /// Model to use for generation.
    pub model: Option<String>,

    /// Maximum tokens for the generated story.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            save_dir: None,
            save_key: SAVE_KEY.to_string(),
            autosave_interval: AUTOSAVE_INTERVAL,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(DEFAULT_TEMPERATURE),
        }
    }

    /// Defaults overridden by `LOOM_SAVE_DIR`, `LOOM_AUTOSAVE_SECS` and `LOOM_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(dir) = std::env::var_os("LOOM_SAVE_DIR") {
            config.save_dir = Some(PathBuf::from(dir));
        }

        if let Ok(secs) = std::env::var("LOOM_AUTOSAVE_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.autosave_interval = Duration::from_secs(secs),
                _ => tracing::warn!(value = %secs, "ignoring invalid LOOM_AUTOSAVE_SECS"),
            }
        }

        if let Ok(model) = std::env::var("LOOM_MODEL") {
            if !model.trim().is_empty() {
                config.model = Some(model);
            }
        }

        config
    }

    /// Set the save directory.
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Set the storage key.
    pub fn with_save_key(mut self, key: impl Into<String>) -> Self {
        self.save_key = key.into();
        self
    }

    /// Set the autosave period.
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens for the generated story.
    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// A save manager backed by files in the configured directory.
    pub fn save_manager(&self) -> SaveManager {
        let store = match &self.save_dir {
            Some(dir) => FileStore::new(dir.clone()),
            None => FileStore::default(),
        };
        SaveManager::new(Arc::new(store)).with_key(self.save_key.clone())
    }

    /// Generator settings derived from this config.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            prompt: STORY_PROMPT.to_string(),
        }
    }
}

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Generating,
    Playing,
    Ended,
}

/// A read-only snapshot of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: Phase,
    pub title: Option<String>,
    pub scene: Option<Scene>,
    pub characters: Vec<Character>,
    /// Relationship scores in name order.
    pub relationships: Vec<(String, i64)>,
    pub background_image: Option<String>,
    pub last_autosave: Option<DateTime<Utc>>,
    pub ending: Option<String>,
    pub error: Option<String>,
    pub save_available: bool,
}

impl SessionView {
    /// Look up a cast member by exact name.
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Cast members who speak in the current scene, in order of first line.
    ///
    /// Speakers missing from the cast are skipped.
    pub fn scene_cast(&self) -> Vec<&Character> {
        let mut cast: Vec<&Character> = Vec::new();
        let Some(scene) = &self.scene else {
            return cast;
        };
        for entry in &scene.dialogue {
            if let Some(character) = self.character(&entry.character) {
                if !cast.iter().any(|c| c.name == character.name) {
                    cast.push(character);
                }
            }
        }
        cast
    }
}

/// A session shared between the front-end and the autosave task.
pub type SharedSession = Arc<Mutex<StorySession>>;

/// A story session.
///
/// Owns the traversal state and the save manager. All mutation happens
/// through `&mut self`, so a choice and a save can never interleave.
pub struct StorySession {
    traversal: Traversal,
    saves: SaveManager,
    generating: bool,
    last_error: Option<String>,
    last_autosave: Option<DateTime<Utc>>,
    save_exists: bool,
}

impl StorySession {
    /// Create a session, checking whether a save is available.
    pub async fn open(saves: SaveManager) -> Self {
        let save_exists = saves.exists().await;
        Self {
            traversal: Traversal::Idle,
            saves,
            generating: false,
            last_error: None,
            last_autosave: None,
            save_exists,
        }
    }

    /// Wrap the session for sharing with an autosave task.
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn traversal(&self) -> &Traversal {
        &self.traversal
    }

    pub fn saves(&self) -> &SaveManager {
        &self.saves
    }

    pub fn phase(&self) -> Phase {
        if self.generating {
            return Phase::Generating;
        }
        match self.traversal.status() {
            TraversalStatus::Idle => Phase::Start,
            TraversalStatus::Active => Phase::Playing,
            TraversalStatus::Ended => Phase::Ended,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn last_autosave(&self) -> Option<DateTime<Utc>> {
        self.last_autosave
    }

    pub fn save_exists(&self) -> bool {
        self.save_exists
    }

    /// Mark a generation as outstanding.
    ///
    /// Any story in progress is dropped from memory. The stored save is
    /// left alone; only [`reset`](Self::reset) deletes it.
    pub fn begin_generation(&mut self) -> Result<(), SessionError> {
        if self.generating {
            return Err(SessionError::GenerationInProgress);
        }
        self.generating = true;
        self.last_error = None;
        self.traversal.reset();
        tracing::info!("story generation started");
        Ok(())
    }

    /// Complete an outstanding generation with its result.
    pub fn finish_generation(
        &mut self,
        result: Result<StoryDocument, GenerationError>,
    ) -> Result<(), SessionError> {
        self.generating = false;

        let state = result.and_then(|document| {
            SessionState::new(document).map_err(|_| GenerationError::MissingEntryScene)
        });

        match state {
            Ok(state) => {
                tracing::info!(title = %state.document.title, "story started");
                self.traversal = Traversal::resume(state);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "story generation failed");
                self.traversal.reset();
                self.last_error = Some(GENERATION_FAILED_MESSAGE.to_string());
                Err(e.into())
            }
        }
    }

    /// Generate a new story and start it.
    ///
    /// Holds `&mut self` for the whole generation; front-ends that keep
    /// rendering meanwhile use [`begin_generation`](Self::begin_generation)
    /// and [`finish_generation`](Self::finish_generation) instead.
    pub async fn start<G: StoryGenerator + ?Sized>(
        &mut self,
        generator: &G,
    ) -> Result<(), SessionError> {
        self.begin_generation()?;
        let result = generator.generate().await;
        self.finish_generation(result)
    }

    /// Take the choice at `index` in the current scene.
    pub fn choose(&mut self, index: usize) -> Result<ChoiceOutcome, SessionError> {
        Ok(self.traversal.choose(index)?)
    }

    /// Apply an arbitrary choice to the current scene.
    pub fn apply_choice(&mut self, choice: &Choice) -> Result<ChoiceOutcome, SessionError> {
        Ok(self.traversal.apply_choice(choice)?)
    }

    /// End a story whose current scene has no choices.
    pub fn conclude(&mut self) -> Result<String, SessionError> {
        Ok(self.traversal.conclude()?.to_string())
    }

    /// Save the story in progress. Returns `false` if nothing was saved.
    pub async fn save(&mut self) -> bool {
        let Some(state) = self.traversal.active_state() else {
            tracing::debug!("nothing to save");
            return false;
        };
        let saved = self.saves.save(state).await;
        if saved {
            self.save_exists = true;
        }
        saved
    }

    /// Periodic save; a no-op unless a story is in progress.
    ///
    /// Returns the new autosave timestamp when a save was written.
    pub async fn autosave(&mut self) -> Option<DateTime<Utc>> {
        let state = self.traversal.active_state()?;

        match self.saves.try_save(state).await {
            Ok(saved_at) => {
                let stamp = self.last_autosave.map_or(saved_at, |last| last.max(saved_at));
                self.last_autosave = Some(stamp);
                self.save_exists = true;
                tracing::debug!(at = %stamp, "autosaved");
                Some(stamp)
            }
            Err(e) => {
                tracing::error!(error = %e, "autosave failed");
                None
            }
        }
    }

    /// Resume the saved story.
    ///
    /// Returns `Ok(false)` when there is no usable save. A corrupt save is
    /// deleted and leaves a user-facing message in [`last_error`](Self::last_error).
    pub async fn load(&mut self) -> Result<bool, SessionError> {
        if self.generating {
            return Err(SessionError::GenerationInProgress);
        }

        match self.saves.load().await {
            Ok(Some(state)) => {
                self.traversal = Traversal::resume(state);
                self.last_error = None;
                self.save_exists = true;
                Ok(true)
            }
            Ok(None) => {
                self.save_exists = false;
                Ok(false)
            }
            Err(PersistError::CorruptSave(reason)) => {
                tracing::warn!(%reason, "saved game could not be loaded");
                self.last_error = Some(CORRUPT_SAVE_MESSAGE.to_string());
                self.save_exists = false;
                Ok(false)
            }
            Err(e) => {
                self.last_error = Some(CORRUPT_SAVE_MESSAGE.to_string());
                Err(e.into())
            }
        }
    }

    /// Drop the story and delete the save.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.traversal.reset();
        self.last_error = None;
        self.saves.clear().await?;
        self.save_exists = false;
        Ok(())
    }

    /// Snapshot the session for rendering.
    pub fn view(&self) -> SessionView {
        let state = self.traversal.state();

        SessionView {
            phase: self.phase(),
            title: state.map(|s| s.document.title.clone()),
            scene: self.traversal.current_scene().cloned(),
            characters: state
                .map(|s| s.document.characters.clone())
                .unwrap_or_default(),
            relationships: state
                .map(|s| {
                    s.ledger
                        .iter()
                        .map(|(name, score)| (name.to_string(), score))
                        .collect()
                })
                .unwrap_or_default(),
            background_image: state.map(|s| s.background_image.clone()),
            last_autosave: self.last_autosave,
            ending: self.traversal.ending_text().map(str::to_string),
            error: self.last_error.clone(),
            save_available: self.save_exists,
        }
    }
}

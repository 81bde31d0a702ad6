//! Testing utilities for story sessions.
//!
//! This module provides tools for integration testing:
//! - `ScriptedGenerator` for deterministic generation without API calls
//! - `sample_story` as a small but irregular story graph
//! - `TestHarness` for driving a session backed by in-memory storage
//! - Assertion helpers for verifying session state

use crate::document::{
    Character, Choice, DialogueLine, RelationshipEffect, Scene, StoryDocument, Visuals,
};
use crate::generator::{decode_story, decode_story_text, prepare_story, GenerationError, StoryGenerator};
use crate::persist::{MemoryStore, SaveManager, SaveStore};
use crate::session::{Phase, SharedSession, StorySession};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A scripted generator result.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// A story document, validated as if it came from a backend.
    Story(StoryDocument),
    /// A raw tool payload.
    Json(Value),
    /// A plain text completion.
    Text(String),
    /// A transport failure.
    BackendDown,
}

/// A generator that returns scripted results in order.
///
/// Once the script runs out every call fails with `MissingPayload`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A generator that always produces [`sample_story`].
    pub fn sample() -> Self {
        Self::new([Scripted::Story(sample_story())])
    }

    pub async fn push(&self, result: Scripted) {
        self.script.lock().await.push_back(result);
    }

    /// Number of times `generate` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoryGenerator for ScriptedGenerator {
    async fn generate(&self) -> Result<StoryDocument, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().await.pop_front();

        match next {
            Some(Scripted::Story(story)) => prepare_story(story),
            Some(Scripted::Json(value)) => decode_story(value),
            Some(Scripted::Text(text)) => decode_story_text(&text),
            Some(Scripted::BackendDown) => Err(GenerationError::Backend(claude::Error::Network(
                "scripted backend failure".to_string(),
            ))),
            None => Err(GenerationError::MissingPayload),
        }
    }
}

fn character(name: &str, description: &str) -> Character {
    Character {
        name: name.to_string(),
        description: description.to_string(),
        portrait_url: format!("https://picsum.photos/seed/{}/200/200", name.to_lowercase()),
    }
}

fn line(character: &str, line: &str) -> DialogueLine {
    DialogueLine {
        character: character.to_string(),
        line: line.to_string(),
    }
}

fn choice(text: &str, next: Option<&str>, effects: &[(&str, i64)]) -> Choice {
    Choice {
        text: text.to_string(),
        consequence: format!("You chose to {}.", text.to_lowercase()),
        next_scene_id: next.map(str::to_string),
        relationship_effects: (!effects.is_empty()).then(|| {
            effects
                .iter()
                .map(|(character, change)| RelationshipEffect {
                    character: character.to_string(),
                    change: *change,
                })
                .collect()
        }),
    }
}

fn scene(id: &str, title: &str, narration: &str, background: &str) -> Scene {
    Scene {
        id: id.to_string(),
        title: title.to_string(),
        narration: narration.to_string(),
        dialogue: Vec::new(),
        visuals: Visuals {
            background_image: background.to_string(),
            character_illustration: format!("Cinematic still of {title}"),
        },
        choices: Vec::new(),
    }
}

/// A small story with the irregularities real generator output has.
///
/// - `scene_1`: choice 0 goes to `scene_2` (Kael +1); choice 1 goes to
///   `scene_3` (Anya -1, plus an effect for the misspelled "Kaell").
/// - `scene_2`: choice 0 ends the story; choice 1 points at the missing
///   `scene_99`.
/// - `scene_3`: empty background and no choices.
pub fn sample_story() -> StoryDocument {
    let mut dock = scene(
        "scene_1",
        "Rain on the Docks",
        "You wake beneath the flickering sign of the Meridian docks, a data shard in your fist.",
        "https://picsum.photos/1920/1080?random=1",
    );
    dock.dialogue = vec![
        line("Kael", "You're finally awake. We need to move."),
        line("You", "Where are we?"),
        line("Anya", "Somewhere we shouldn't be."),
    ];
    dock.choices = vec![
        choice("Follow Kael into the tunnels", Some("scene_2"), &[("Kael", 1)]),
        choice(
            "Hand the shard to Anya",
            Some("scene_3"),
            &[("Anya", -1), ("Kaell", 5)],
        ),
    ];

    let mut tunnels = scene(
        "scene_2",
        "The Undercity",
        "The tunnels hum with old machinery. Kael stops at a sealed door.",
        "https://picsum.photos/1920/1080?random=2",
    );
    tunnels.dialogue = vec![line("Kael", "Whatever is behind this door, we face it together.")];
    tunnels.choices = vec![
        choice("Open the door", None, &[("Kael", 2)]),
        choice("Turn back toward the lights", Some("scene_99"), &[]),
    ];

    let archive = scene(
        "scene_3",
        "The Archive",
        "Anya plugs the shard into the archive. The screen goes dark, and so does the city.",
        "",
    );

    let scenes = [dock, tunnels, archive]
        .into_iter()
        .map(|scene| (scene.id.clone(), scene))
        .collect::<BTreeMap<_, _>>();

    StoryDocument {
        title: "Neon Tides".to_string(),
        premise: "A courier wakes with a stolen memory and two strangers who want it.".to_string(),
        setting: "Meridian, a drowned megacity in 2189".to_string(),
        characters: vec![
            character("Kael", "A rugged smuggler with a cybernetic eye."),
            character("Anya", "An archivist who knows more than she says."),
            Character::player(),
        ],
        scenes,
    }
}

/// Test harness for driving a session against in-memory storage.
pub struct TestHarness {
    session: StorySession,
    saves: SaveManager,
}

impl TestHarness {
    /// A fresh session on the start screen.
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    /// A fresh session over the given store.
    pub async fn with_store(store: Arc<dyn SaveStore>) -> Self {
        let saves = SaveManager::new(store);
        let session = StorySession::open(saves.clone()).await;
        Self { session, saves }
    }

    /// A session already playing [`sample_story`].
    pub async fn started() -> Self {
        let mut harness = Self::new().await;
        if let Err(e) = harness.session.finish_generation(Ok(sample_story())) {
            panic!("sample story failed to start: {e}");
        }
        harness
    }

    pub fn session(&self) -> &StorySession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut StorySession {
        &mut self.session
    }

    pub fn saves(&self) -> &SaveManager {
        &self.saves
    }

    /// Share the session, e.g. with an autosave task.
    pub fn into_shared(self) -> SharedSession {
        self.session.into_shared()
    }

    /// Id of the current scene, if a story is in progress.
    pub fn scene_id(&self) -> Option<&str> {
        self.session
            .traversal()
            .active_state()
            .map(|state| state.current_scene_id.as_str())
    }

    /// Relationship score for a character.
    pub fn score(&self, name: &str) -> Option<i64> {
        self.session
            .traversal()
            .state()
            .and_then(|state| state.ledger.score(name))
    }
}

/// Assert the session is on the given screen.
pub fn assert_phase(harness: &TestHarness, expected: Phase) {
    assert_eq!(harness.session().phase(), expected, "unexpected phase");
}

/// Assert the player is in the given scene.
pub fn assert_scene(harness: &TestHarness, expected: &str) {
    assert_eq!(
        harness.scene_id(),
        Some(expected),
        "expected to be in scene {expected}"
    );
}

/// Assert a relationship score.
pub fn assert_score(harness: &TestHarness, name: &str, expected: i64) {
    assert_eq!(
        harness.score(name),
        Some(expected),
        "unexpected score for {name}"
    );
}

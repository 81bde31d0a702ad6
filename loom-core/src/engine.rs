//! Scene-graph traversal.
//!
//! The [`Traversal`] state machine walks a [`StoryDocument`] one choice at a
//! time. Generator output is untrusted, so a choice pointing at a scene that
//! does not exist ends the story instead of failing.

use crate::document::{
    Choice, Scene, StoryDocument, DEFAULT_BACKGROUND, ENTRY_SCENE_ID, FALLBACK_ENDING,
};
use crate::ledger::{AppliedEffect, RelationshipLedger};
use serde::{Deserialize, Serialize};
use std::mem;
use thiserror::Error;

/// Errors from traversal operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    #[error("story has no entry scene 'scene_1'")]
    MissingEntryScene,

    #[error("no story is in progress")]
    NotActive,

    #[error("scene has no choice {index} (it offers {available})")]
    NoSuchChoice { index: usize, available: usize },
}

/// Everything needed to resume a story where it was left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(rename = "story")]
    pub document: StoryDocument,
    pub current_scene_id: String,
    #[serde(rename = "relationshipScores")]
    pub ledger: RelationshipLedger,
    pub background_image: String,
}

impl SessionState {
    /// Fresh state positioned at the entry scene.
    pub fn new(document: StoryDocument) -> Result<Self, TraversalError> {
        let entry = document
            .entry_scene()
            .ok_or(TraversalError::MissingEntryScene)?;
        let background_image = entry
            .background()
            .unwrap_or(DEFAULT_BACKGROUND)
            .to_string();
        let ledger = RelationshipLedger::initialize(&document.characters);

        Ok(Self {
            current_scene_id: ENTRY_SCENE_ID.to_string(),
            background_image,
            ledger,
            document,
        })
    }

    /// The scene the player is in, if the id still resolves.
    pub fn current_scene(&self) -> Option<&Scene> {
        self.document.scene(&self.current_scene_id)
    }

    /// Narration of the current scene, or the fallback ending text.
    fn current_narration(&self) -> String {
        self.current_scene()
            .map(|scene| scene.narration.clone())
            .unwrap_or_else(|| FALLBACK_ENDING.to_string())
    }
}

/// Coarse traversal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalStatus {
    Idle,
    Active,
    Ended,
}

/// The traversal state machine.
#[derive(Debug, Clone, Default)]
pub enum Traversal {
    /// No story loaded.
    #[default]
    Idle,
    /// A story is in progress and accepts choices.
    Active(SessionState),
    /// The story reached an ending.
    Ended { state: SessionState, ending: String },
}

/// How a choice moved the traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Moved to another scene.
    Advanced { scene_id: String },
    /// The story ended; `ending` is the narration of the scene left behind.
    Ended { ending: String },
}

/// Result of applying a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOutcome {
    /// Relationship effects that changed a score.
    pub applied: Vec<AppliedEffect>,
    pub transition: Transition,
}

impl ChoiceOutcome {
    pub fn is_ending(&self) -> bool {
        matches!(self.transition, Transition::Ended { .. })
    }
}

impl Traversal {
    /// Begin a new story at its entry scene.
    pub fn start(document: StoryDocument) -> Result<Self, TraversalError> {
        Ok(Traversal::Active(SessionState::new(document)?))
    }

    /// Continue a previously saved story.
    pub fn resume(state: SessionState) -> Self {
        Traversal::Active(state)
    }

    pub fn status(&self) -> TraversalStatus {
        match self {
            Traversal::Idle => TraversalStatus::Idle,
            Traversal::Active(_) => TraversalStatus::Active,
            Traversal::Ended { .. } => TraversalStatus::Ended,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Traversal::Active(_))
    }

    /// The session state, whether active or ended.
    pub fn state(&self) -> Option<&SessionState> {
        match self {
            Traversal::Idle => None,
            Traversal::Active(state) | Traversal::Ended { state, .. } => Some(state),
        }
    }

    /// The session state, only while the story accepts choices.
    pub fn active_state(&self) -> Option<&SessionState> {
        match self {
            Traversal::Active(state) => Some(state),
            _ => None,
        }
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.active_state().and_then(SessionState::current_scene)
    }

    pub fn ending_text(&self) -> Option<&str> {
        match self {
            Traversal::Ended { ending, .. } => Some(ending),
            _ => None,
        }
    }

    /// Take the choice at `index` in the current scene.
    pub fn choose(&mut self, index: usize) -> Result<ChoiceOutcome, TraversalError> {
        let scene = self.current_scene().ok_or(TraversalError::NotActive)?;
        let choice = scene
            .choices
            .get(index)
            .cloned()
            .ok_or(TraversalError::NoSuchChoice {
                index,
                available: scene.choices.len(),
            })?;
        self.apply_choice(&choice)
    }

    /// Apply a choice: update relationships, then advance or end.
    ///
    /// The ledger update and the scene transition happen together; no caller
    /// can observe one without the other.
    pub fn apply_choice(&mut self, choice: &Choice) -> Result<ChoiceOutcome, TraversalError> {
        let mut state = self.take_active()?;

        let applied = state.ledger.apply(choice.effects());

        let next = choice
            .next_scene_id
            .as_deref()
            .and_then(|id| state.document.scene(id).map(|scene| (id, scene.background())));

        let transition = match next {
            Some((id, background)) => {
                let scene_id = id.to_string();
                if let Some(background) = background {
                    state.background_image = background.to_string();
                }
                state.current_scene_id = scene_id.clone();
                *self = Traversal::Active(state);
                Transition::Advanced { scene_id }
            }
            None => {
                if let Some(missing) = &choice.next_scene_id {
                    tracing::warn!(scene = %missing, "choice points at a missing scene, ending story");
                }
                let ending = state.current_narration();
                *self = Traversal::Ended {
                    state,
                    ending: ending.clone(),
                };
                Transition::Ended { ending }
            }
        };

        Ok(ChoiceOutcome { applied, transition })
    }

    /// End an active story whose current scene offers no way forward.
    pub fn conclude(&mut self) -> Result<&str, TraversalError> {
        let state = self.take_active()?;
        let ending = state.current_narration();
        *self = Traversal::Ended { state, ending };
        Ok(self.ending_text().unwrap_or(FALLBACK_ENDING))
    }

    /// Move the active state out, leaving any other state in place.
    fn take_active(&mut self) -> Result<SessionState, TraversalError> {
        match mem::take(self) {
            Traversal::Active(state) => Ok(state),
            other => {
                *self = other;
                Err(TraversalError::NotActive)
            }
        }
    }

    /// Drop the story and return to idle.
    pub fn reset(&mut self) {
        *self = Traversal::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RelationshipEffect;
    use crate::testing::sample_story;

    fn active() -> Traversal {
        Traversal::start(sample_story()).unwrap()
    }

    fn choice(next: Option<&str>, effects: &[(&str, i64)]) -> Choice {
        Choice {
            text: "Go".to_string(),
            consequence: String::new(),
            next_scene_id: next.map(str::to_string),
            relationship_effects: Some(
                effects
                    .iter()
                    .map(|(character, change)| RelationshipEffect {
                        character: character.to_string(),
                        change: *change,
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_start_initializes_state() {
        let traversal = active();
        let state = traversal.active_state().unwrap();

        assert_eq!(state.current_scene_id, "scene_1");
        assert_eq!(state.ledger.score("Kael"), Some(0));
        assert_eq!(state.ledger.score("Anya"), Some(0));
        assert!(!state.ledger.contains("You"));
        assert_eq!(
            state.background_image,
            sample_story().scene("scene_1").unwrap().visuals.background_image
        );
    }

    #[test]
    fn test_start_uses_default_background_when_blank() {
        let mut story = sample_story();
        if let Some(scene) = story.scenes.get_mut("scene_1") {
            scene.visuals.background_image.clear();
        }

        let traversal = Traversal::start(story).unwrap();
        assert_eq!(
            traversal.state().unwrap().background_image,
            DEFAULT_BACKGROUND
        );
    }

    #[test]
    fn test_start_without_entry_scene() {
        let mut story = sample_story();
        story.scenes.remove("scene_1");

        assert_eq!(
            Traversal::start(story).unwrap_err(),
            TraversalError::MissingEntryScene
        );
    }

    #[test]
    fn test_choice_advances_and_updates_ledger() {
        let mut traversal = active();
        let outcome = traversal
            .apply_choice(&choice(Some("scene_2"), &[("Kael", 1)]))
            .unwrap();

        assert_eq!(
            outcome.transition,
            Transition::Advanced {
                scene_id: "scene_2".to_string()
            }
        );
        assert_eq!(outcome.applied.len(), 1);

        let state = traversal.active_state().unwrap();
        assert_eq!(state.current_scene_id, "scene_2");
        assert_eq!(state.ledger.score("Kael"), Some(1));
    }

    #[test]
    fn test_background_kept_when_next_scene_has_none() {
        let mut traversal = active();
        let before = traversal.state().unwrap().background_image.clone();

        // scene_3 declares an empty background
        traversal.apply_choice(&choice(Some("scene_3"), &[])).unwrap();

        let state = traversal.active_state().unwrap();
        assert_eq!(state.current_scene_id, "scene_3");
        assert_eq!(state.background_image, before);
    }

    #[test]
    fn test_background_replaced_when_next_scene_has_one() {
        let mut traversal = active();
        traversal.apply_choice(&choice(Some("scene_2"), &[])).unwrap();

        assert_eq!(
            traversal.state().unwrap().background_image,
            sample_story().scene("scene_2").unwrap().visuals.background_image
        );
    }

    #[test]
    fn test_null_next_scene_ends_with_current_narration() {
        let mut traversal = active();
        let narration = sample_story().scene("scene_1").unwrap().narration.clone();

        let outcome = traversal.apply_choice(&choice(None, &[("Anya", 2)])).unwrap();

        assert!(outcome.is_ending());
        assert_eq!(traversal.status(), TraversalStatus::Ended);
        assert_eq!(traversal.ending_text(), Some(narration.as_str()));
        // Effects still apply on the way out
        assert_eq!(traversal.state().unwrap().ledger.score("Anya"), Some(2));
    }

    #[test]
    fn test_dangling_reference_ends_story() {
        let mut traversal = active();
        let narration = sample_story().scene("scene_1").unwrap().narration.clone();

        let outcome = traversal
            .apply_choice(&choice(Some("scene_404"), &[]))
            .unwrap();

        assert_eq!(outcome.transition, Transition::Ended { ending: narration });
        assert_eq!(traversal.status(), TraversalStatus::Ended);
        assert_eq!(traversal.state().unwrap().current_scene_id, "scene_1");
    }

    #[test]
    fn test_unknown_character_effect_is_ignored() {
        let mut traversal = active();
        let outcome = traversal
            .apply_choice(&choice(Some("scene_2"), &[("Nobody", 4), ("Kael", -2)]))
            .unwrap();

        assert_eq!(outcome.applied.len(), 1);
        let ledger = &traversal.state().unwrap().ledger;
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains("Nobody"));
        assert_eq!(ledger.score("Kael"), Some(-2));
    }

    #[test]
    fn test_choose_by_index() {
        let mut traversal = active();
        traversal.choose(0).unwrap();
        assert_eq!(traversal.state().unwrap().current_scene_id, "scene_2");

        let err = traversal.choose(7).unwrap_err();
        assert_eq!(
            err,
            TraversalError::NoSuchChoice {
                index: 7,
                available: 2
            }
        );
        // A rejected choice leaves the traversal untouched
        assert_eq!(traversal.state().unwrap().current_scene_id, "scene_2");
    }

    #[test]
    fn test_choices_require_active_story() {
        let mut idle = Traversal::Idle;
        assert_eq!(idle.choose(0).unwrap_err(), TraversalError::NotActive);
        assert_eq!(
            idle.apply_choice(&choice(None, &[])).unwrap_err(),
            TraversalError::NotActive
        );
        assert_eq!(idle.status(), TraversalStatus::Idle);

        let mut ended = active();
        ended.apply_choice(&choice(None, &[])).unwrap();
        let before = ended.state().cloned();
        assert_eq!(
            ended.apply_choice(&choice(Some("scene_2"), &[])).unwrap_err(),
            TraversalError::NotActive
        );
        // The ended state survives a rejected choice
        assert_eq!(ended.status(), TraversalStatus::Ended);
        assert_eq!(ended.state().cloned(), before);
    }

    #[test]
    fn test_conclude_scene_without_choices() {
        let mut traversal = active();
        traversal.apply_choice(&choice(Some("scene_3"), &[])).unwrap();
        assert!(traversal.current_scene().unwrap().choices.is_empty());

        let narration = sample_story().scene("scene_3").unwrap().narration.clone();
        assert_eq!(traversal.conclude().unwrap(), narration);
        assert_eq!(traversal.status(), TraversalStatus::Ended);

        assert_eq!(traversal.conclude().unwrap_err(), TraversalError::NotActive);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut traversal = active();
        traversal.reset();
        assert_eq!(traversal.status(), TraversalStatus::Idle);
        assert!(traversal.state().is_none());
    }

    #[test]
    fn test_resume_restores_position() {
        let mut traversal = active();
        traversal.choose(0).unwrap();
        let state = traversal.state().cloned().unwrap();

        let resumed = Traversal::resume(state.clone());
        assert_eq!(resumed.active_state(), Some(&state));
    }

    #[test]
    fn test_session_state_wire_format() {
        let state = SessionState::new(sample_story()).unwrap();
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["currentSceneId"], "scene_1");
        assert_eq!(value["relationshipScores"]["Kael"], 0);
        assert_eq!(value["story"]["title"], sample_story().title);
        assert!(value["backgroundImage"].is_string());
    }
}

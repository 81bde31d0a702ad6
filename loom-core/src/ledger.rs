//! Relationship scores between the player and the cast.

use crate::document::{is_player_name, Character, RelationshipEffect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An effect that actually changed a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEffect {
    pub character: String,
    pub change: i64,
    /// Score after the change was applied.
    pub score: i64,
}

/// Signed integer scores keyed by character name.
///
/// The ledger only tracks characters it was initialized with. Effects naming
/// anyone else are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipLedger {
    scores: BTreeMap<String, i64>,
}

impl RelationshipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every non-player character at zero.
    pub fn initialize(characters: &[Character]) -> Self {
        let scores = characters
            .iter()
            .filter(|c| !is_player_name(&c.name))
            .map(|c| (c.name.clone(), 0))
            .collect();
        Self { scores }
    }

    /// Apply effects in order, returning the ones that matched a tracked character.
    pub fn apply(&mut self, effects: &[RelationshipEffect]) -> Vec<AppliedEffect> {
        let mut applied = Vec::with_capacity(effects.len());
        for effect in effects {
            match self.scores.get_mut(&effect.character) {
                Some(score) => {
                    *score = score.saturating_add(effect.change);
                    applied.push(AppliedEffect {
                        character: effect.character.clone(),
                        change: effect.change,
                        score: *score,
                    });
                }
                None => {
                    tracing::debug!(character = %effect.character, "ignoring effect for untracked character");
                }
            }
        }
        applied
    }

    pub fn score(&self, name: &str) -> Option<i64> {
        self.scores.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scores.contains_key(name)
    }

    /// Scores in character-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.scores.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

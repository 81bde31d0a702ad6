//! Story document model.
//!
//! A [`StoryDocument`] is the complete generated narrative: title, cast and
//! a graph of [`Scene`]s keyed by id, connected by [`Choice`]s. Documents
//! are immutable once generated, apart from the one-time insertion of a
//! player character (see [`StoryDocument::ensure_player`]).

use loom_macros::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Id of the scene every traversal starts from.
pub const ENTRY_SCENE_ID: &str = "scene_1";

/// Name of the synthesized player character.
pub const PLAYER_NAME: &str = "You";

/// Description given to a synthesized player character.
pub const PLAYER_DESCRIPTION: &str = "The protagonist of this story.";

/// Portrait given to a synthesized player character.
pub const PLAYER_PORTRAIT_URL: &str = "https://picsum.photos/seed/protagonist/200/200";

/// Background shown before a story provides one.
pub const DEFAULT_BACKGROUND: &str = "https://picsum.photos/seed/start/1920/1080";

/// Ending text used when the scene being left cannot be found.
pub const FALLBACK_ENDING: &str = "The story concludes.";

/// Whether `name` refers to the player (case-insensitive match on "you").
pub fn is_player_name(name: &str) -> bool {
    name.to_lowercase() == PLAYER_NAME.to_lowercase()
}

/// A member of the story's cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Schema)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Unique character name, as used in dialogue and relationship effects
    pub name: String,
    /// Short description of the character
    pub description: String,
    /// Seeded picsum.photos portrait URL, e.g. https://picsum.photos/seed/kael/200/200
    #[tool(rename = "portraitUrl")]
    pub portrait_url: String,
}

impl Character {
    /// The placeholder character standing in for the player.
    pub fn player() -> Self {
        Self {
            name: PLAYER_NAME.to_string(),
            description: PLAYER_DESCRIPTION.to_string(),
            portrait_url: PLAYER_PORTRAIT_URL.to_string(),
        }
    }

    /// Whether this character represents the player.
    pub fn is_player(&self) -> bool {
        is_player_name(&self.name)
    }
}

/// A single spoken line within a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Schema)]
pub struct DialogueLine {
    /// Name of the speaking character ("You" for the player)
    pub character: String,
    pub line: String,
}

/// Visual presentation hints for a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Schema)]
#[serde(rename_all = "camelCase")]
pub struct Visuals {
    /// Background image URL from https://picsum.photos/1920/1080
    #[tool(rename = "backgroundImage")]
    pub background_image: String,
    /// Detailed prompt for an image generation model describing the featured character
    #[tool(rename = "characterIllustration")]
    pub character_illustration: String,
}

/// A change to one character's relationship score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Schema)]
pub struct RelationshipEffect {
    /// Name of the affected character
    pub character: String,
    /// Signed score change; positive improves the relationship
    pub change: i64,
}

/// An edge of the story graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Schema)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// What the player does
    pub text: String,
    /// Flavor text hinting at the outcome
    pub consequence: String,
    /// Id of the scene this choice leads to; null ends the story
    #[tool(rename = "nextSceneId")]
    #[serde(default)]
    pub next_scene_id: Option<String>,
    /// Relationship score changes applied when this choice is taken
    #[tool(rename = "relationshipEffects")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_effects: Option<Vec<RelationshipEffect>>,
}

impl Choice {
    /// Relationship effects of this choice, empty when none were declared.
    pub fn effects(&self) -> &[RelationshipEffect] {
        self.relationship_effects.as_deref().unwrap_or_default()
    }

    /// Whether this choice explicitly ends the story.
    pub fn is_terminal(&self) -> bool {
        self.next_scene_id.is_none()
    }
}

/// A node of the story graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Schema)]
pub struct Scene {
    /// Scene id, identical to its key in the scenes map
    pub id: String,
    pub title: String,
    /// Second-person narration of the scene
    pub narration: String,
    pub dialogue: Vec<DialogueLine>,
    pub visuals: Visuals,
    /// Two or three player choices
    pub choices: Vec<Choice>,
}

impl Scene {
    /// The scene's background, if it declares a non-empty one.
    pub fn background(&self) -> Option<&str> {
        let background = self.visuals.background_image.as_str();
        (!background.is_empty()).then_some(background)
    }
}

/// A complete generated story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Schema)]
pub struct StoryDocument {
    pub title: String,
    pub premise: String,
    pub setting: String,
    /// The main cast, two to four characters
    pub characters: Vec<Character>,
    /// Scenes keyed by id; the entry scene must be "scene_1"
    pub scenes: BTreeMap<String, Scene>,
}

impl StoryDocument {
    /// Look up a scene by id.
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    /// The scene traversal starts from.
    pub fn entry_scene(&self) -> Option<&Scene> {
        self.scene(ENTRY_SCENE_ID)
    }

    /// Whether `id` names a scene of this story.
    pub fn has_scene(&self, id: &str) -> bool {
        self.scenes.contains_key(id)
    }

    /// The character representing the player, if present.
    pub fn player(&self) -> Option<&Character> {
        self.characters.iter().find(|c| c.is_player())
    }

    /// Every cast member except the player.
    pub fn non_player_characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter().filter(|c| !c.is_player())
    }

    /// Append a placeholder player character if none is present.
    ///
    /// Returns `true` if a character was added.
    pub fn ensure_player(&mut self) -> bool {
        if self.player().is_some() {
            return false;
        }
        self.characters.push(Character::player());
        true
    }
}

//! Story generation boundary.
//!
//! Generator output is untrusted. Everything a backend returns passes through
//! [`prepare_story`] before the rest of the crate sees it.

mod anthropic;

pub use self::anthropic::{
    ClaudeGenerator, GeneratorConfig, StoryPayload, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    STORY_PROMPT,
};

use crate::document::{StoryDocument, ENTRY_SCENE_ID};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors from story generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("story backend failed: {0}")]
    Backend(#[from] claude::Error),

    #[error("backend returned no story payload")]
    MissingPayload,

    #[error("malformed story: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("story has no scenes")]
    EmptyStory,

    #[error("story is missing entry scene 'scene_1'")]
    MissingEntryScene,

    #[error("story generation did not finish: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Something that can produce a complete story document.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    async fn generate(&self) -> Result<StoryDocument, GenerationError>;
}

/// Decode a JSON value into a validated story.
pub fn decode_story(value: Value) -> Result<StoryDocument, GenerationError> {
    let story: StoryDocument = serde_json::from_value(value)?;
    prepare_story(story)
}

/// Decode a story embedded in free text, such as a plain completion.
///
/// Markdown code fences and any prose around the outermost JSON object are
/// ignored.
pub fn decode_story_text(text: &str) -> Result<StoryDocument, GenerationError> {
    let json = extract_json_object(text).ok_or(GenerationError::MissingPayload)?;
    let story: StoryDocument = serde_json::from_str(json)?;
    prepare_story(story)
}

/// Validate a decoded story and insert the player character if absent.
pub fn prepare_story(mut story: StoryDocument) -> Result<StoryDocument, GenerationError> {
    if story.scenes.is_empty() {
        return Err(GenerationError::EmptyStory);
    }
    if !story.has_scene(ENTRY_SCENE_ID) {
        return Err(GenerationError::MissingEntryScene);
    }

    for (key, scene) in &story.scenes {
        if key != &scene.id {
            tracing::warn!(key = %key, id = %scene.id, "scene id does not match its key");
        }
    }

    if story.ensure_player() {
        tracing::debug!("added placeholder player character");
    }

    tracing::info!(
        title = %story.title,
        scenes = story.scenes.len(),
        characters = story.characters.len(),
        "story prepared"
    );
    Ok(story)
}

fn extract_json_object(text: &str) -> Option<&str> {
    let text = strip_code_fence(text.trim());
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_story;
    use serde_json::json;

    #[test]
    fn test_decode_inserts_player() {
        let mut value = serde_json::to_value(sample_story()).unwrap();
        value["characters"]
            .as_array_mut()
            .unwrap()
            .retain(|c| c["name"] != "You");

        let story = decode_story(value).unwrap();
        assert!(story.player().is_some());
        assert_eq!(story.characters.last().unwrap().name, "You");
    }

    #[test]
    fn test_decode_rejects_missing_entry_scene() {
        let mut value = serde_json::to_value(sample_story()).unwrap();
        value["scenes"].as_object_mut().unwrap().remove("scene_1");

        assert!(matches!(
            decode_story(value),
            Err(GenerationError::MissingEntryScene)
        ));
    }

    #[test]
    fn test_decode_rejects_empty_scenes() {
        let mut value = serde_json::to_value(sample_story()).unwrap();
        value["scenes"] = json!({});

        assert!(matches!(decode_story(value), Err(GenerationError::EmptyStory)));
    }

    #[tokio::test]
    async fn test_aborted_generation_keeps_its_cause() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();

        let err = GenerationError::from(handle.await.unwrap_err());
        assert!(matches!(err, GenerationError::Interrupted(_)));
        let message = err.to_string();
        assert!(message.starts_with("story generation did not finish: "));
        assert!(message.ends_with("cancelled"));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let mut value = serde_json::to_value(sample_story()).unwrap();
        value["scenes"]["scene_1"]
            .as_object_mut()
            .unwrap()
            .remove("narration");

        assert!(matches!(decode_story(value), Err(GenerationError::Malformed(_))));
    }

    #[test]
    fn test_decode_tolerates_mismatched_scene_id() {
        let mut value = serde_json::to_value(sample_story()).unwrap();
        value["scenes"]["scene_2"]["id"] = json!("scene_two");

        let story = decode_story(value).unwrap();
        assert_eq!(story.scene("scene_2").unwrap().id, "scene_two");
    }

    #[test]
    fn test_decode_text_with_code_fence() {
        let json = serde_json::to_string_pretty(&sample_story()).unwrap();
        let text = format!("```json\n{json}\n```");

        let story = decode_story_text(&text).unwrap();
        assert_eq!(story, sample_story());
    }

    #[test]
    fn test_decode_text_with_surrounding_prose() {
        let json = serde_json::to_string(&sample_story()).unwrap();
        let text = format!("Here is your story:\n{json}\nEnjoy!");

        assert!(decode_story_text(&text).is_ok());
    }

    #[test]
    fn test_decode_text_without_json() {
        assert!(matches!(
            decode_story_text("I can't do that."),
            Err(GenerationError::MissingPayload)
        ));
        assert!(matches!(
            decode_story_text("{ not json }"),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("{}"), "{}");
    }
}

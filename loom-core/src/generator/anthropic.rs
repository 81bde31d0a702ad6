//! Story generation backed by the Claude API.

use super::{decode_story_text, prepare_story, GenerationError, StoryGenerator};
use crate::document::{Character, Scene, StoryDocument};
use async_trait::async_trait;
use claude::{Claude, Message, Request, StopReason};
use loom_macros::Tool;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Instructions sent with every generation request.
pub const STORY_PROMPT: &str = "\
You are a professional interactive narrative designer. Create a branching story game in the style of a visual novel: \
mostly text-based storytelling with short character dialogue, emotional decisions and multiple paths that depend on \
the player's choices.

Write a complete game script:
- A clear title, setting and premise.
- Two to four main characters, each with a short description and a 'portraitUrl' built from a unique seeded \
picsum.photos URL such as https://picsum.photos/seed/kael/200/200.
- Scenes written in the second person (\"you\") with immersive narration and short dialogue lines. Lines spoken by \
the player use the character name \"You\".
- Every scene offers two or three choices. Each choice has a 'text', a 'consequence' and a 'nextSceneId'.
- Some choices carry 'relationshipEffects': a list of { \"character\": name, \"change\": integer }. A positive change \
improves the relationship, a negative one worsens it. Use the exact character names from the cast.
- Branches should shift relationships or the direction of the story (romance, conflict, mystery). High scores should \
lead to allies and unique paths, low scores to conflict or betrayal.
- Include at least three major branching moments and at least two distinct endings that follow from the player's \
relationships.
- Each scene's 'visuals.backgroundImage' is a URL from https://picsum.photos/1920/1080.
- Each scene's 'visuals.characterIllustration' is a detailed prompt for an image generation model describing the \
featured character's appearance, expression, clothing and the mood of the illustration.
- Scene ids are unique and follow the pattern scene_1, scene_2 and so on. The scenes map is keyed by scene id.
- The opening scene has the id scene_1.
- An ending is a choice whose 'nextSceneId' is null.

The tone is cinematic, emotional and immersive, somewhere between a prestige TV drama and an RPG dialogue tree. \
The genre is a mix of science fiction and mystery.

Submit the finished story with the submit_story tool.";

/// Default temperature for story generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Default output budget; a full story graph is long.
pub const DEFAULT_MAX_TOKENS: usize = 16_384;

/// Configuration for [`ClaudeGenerator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model override; the client default is used when `None`.
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
    pub prompt: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(DEFAULT_TEMPERATURE),
            prompt: STORY_PROMPT.to_string(),
        }
    }
}

/// Submit the complete branching story
#[derive(Debug, Clone, Deserialize, Tool)]
#[tool(name = "submit_story")]
pub struct StoryPayload {
    /// Title of the story
    pub title: String,
    /// One or two sentence premise
    pub premise: String,
    /// Where and when the story takes place
    pub setting: String,
    /// The main cast, two to four characters
    pub characters: Vec<Character>,
    /// Scenes keyed by scene id; the opening scene is "scene_1"
    pub scenes: BTreeMap<String, Scene>,
}

impl From<StoryPayload> for StoryDocument {
    fn from(payload: StoryPayload) -> Self {
        StoryDocument {
            title: payload.title,
            premise: payload.premise,
            setting: payload.setting,
            characters: payload.characters,
            scenes: payload.scenes,
        }
    }
}

/// Generates stories with a single forced `submit_story` tool call.
pub struct ClaudeGenerator {
    client: Claude,
    config: GeneratorConfig,
}

impl ClaudeGenerator {
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            config: GeneratorConfig::default(),
        }
    }

    /// Create a generator from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, GenerationError> {
        Ok(Self::new(Claude::from_env()?))
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn request(&self) -> Request {
        let mut request = Request::new(vec![Message::user(
            "Generate a new story and submit it with the submit_story tool.",
        )])
        .with_system(&self.config.prompt)
        .with_max_tokens(self.config.max_tokens)
        .forcing_tool(StoryPayload::as_tool());

        if let Some(ref model) = self.config.model {
            request = request.with_model(model);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

#[async_trait]
impl StoryGenerator for ClaudeGenerator {
    async fn generate(&self) -> Result<StoryDocument, GenerationError> {
        tracing::info!(model = %self.config.model.as_deref().unwrap_or(self.client.model()), "requesting story");

        let response = self.client.complete(self.request()).await?;

        tracing::info!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "story response received"
        );
        if response.stop_reason == StopReason::MaxTokens {
            tracing::warn!("story response hit the token limit and is likely truncated");
        }

        match response.tool_input(StoryPayload::tool_name()) {
            Some(input) => {
                let payload: StoryPayload = serde_json::from_value(input.clone())?;
                prepare_story(payload.into())
            }
            None => {
                tracing::debug!("no submit_story call, falling back to text payload");
                decode_story_text(&response.text())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claude::ToolChoice;

    fn generator() -> ClaudeGenerator {
        ClaudeGenerator::new(Claude::new("test-key").unwrap())
    }

    #[test]
    fn test_tool_definition() {
        let tool = StoryPayload::as_tool();
        assert_eq!(tool.name, "submit_story");
        assert_eq!(tool.description, "Submit the complete branching story");

        let schema = &tool.input_schema;
        let required = schema["required"].as_array().unwrap();
        for field in ["title", "premise", "setting", "characters", "scenes"] {
            assert!(required.iter().any(|v| v == field), "missing {field}");
        }
        assert_eq!(schema["properties"]["scenes"]["type"], "object");
        assert_eq!(
            schema["properties"]["scenes"]["additionalProperties"]["properties"]["choices"]["type"],
            "array"
        );
    }

    #[test]
    fn test_request_forces_story_tool() {
        let request = generator().request();

        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(request.temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(request.system.as_deref(), Some(STORY_PROMPT));
        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));
        assert!(matches!(
            request.tool_choice,
            Some(ToolChoice::Tool { ref name }) if name == "submit_story"
        ));
        assert!(request.model.is_none());
    }

    #[test]
    fn test_request_uses_config() {
        let request = generator()
            .with_config(GeneratorConfig {
                model: Some("claude-test".to_string()),
                max_tokens: 2048,
                temperature: None,
                prompt: "Tell a short story.".to_string(),
            })
            .request();

        assert_eq!(request.model.as_deref(), Some("claude-test"));
        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.temperature, None);
        assert_eq!(request.system.as_deref(), Some("Tell a short story."));
    }

    #[test]
    fn test_payload_converts_to_document() {
        let value = serde_json::to_value(crate::testing::sample_story()).unwrap();
        let payload: StoryPayload = serde_json::from_value(value).unwrap();
        let story = prepare_story(payload.into()).unwrap();

        assert_eq!(story, crate::testing::sample_story());
    }
}

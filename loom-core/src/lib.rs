//! Branching story engine with AI-generated scene graphs.
//!
//! This crate provides:
//! - The story document model and its JSON wire format
//! - Story generation through Claude, behind the `StoryGenerator` trait
//! - A traversal state machine with relationship tracking
//! - Versioned session persistence and periodic autosave
//!
//! # Quick Start
//!
//! ```ignore
//! use loom_core::{Autosaver, ClaudeGenerator, SessionConfig, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::from_env();
//!     let generator = ClaudeGenerator::from_env()?.with_config(config.generator_config());
//!
//!     let mut session = StorySession::open(config.save_manager()).await;
//!     session.start(&generator).await?;
//!
//!     let outcome = session.choose(0)?;
//!     println!("{:?}", outcome.transition);
//!
//!     let shared = session.into_shared();
//!     let _autosaver = Autosaver::spawn(&shared, config.autosave_interval);
//!     Ok(())
//! }
//! ```

pub mod autosave;
pub mod document;
pub mod engine;
pub mod generator;
pub mod ledger;
pub mod persist;
pub mod session;
pub mod testing;

// Re-export for convenience
pub use loom_macros::{Schema, Tool};

// Primary public API
pub use autosave::{Autosaver, AUTOSAVE_INTERVAL};
pub use document::{Character, Choice, DialogueLine, RelationshipEffect, Scene, StoryDocument, Visuals};
pub use engine::{ChoiceOutcome, SessionState, Transition, Traversal, TraversalError, TraversalStatus};
pub use generator::{ClaudeGenerator, GenerationError, GeneratorConfig, StoryGenerator};
pub use ledger::{AppliedEffect, RelationshipLedger};
pub use persist::{FileStore, MemoryStore, PersistError, SaveManager, SaveStore};
pub use session::{Phase, SessionConfig, SessionError, SessionView, SharedSession, StorySession};
pub use testing::{ScriptedGenerator, TestHarness};

//! TUI widgets for the story screens

pub mod cast;
pub mod choices;
pub mod relationships;
pub mod scene;
pub mod status_bar;

pub use cast::CastWidget;
pub use choices::ChoicesWidget;
pub use relationships::RelationshipsWidget;
pub use scene::SceneWidget;
pub use status_bar::StatusBarWidget;

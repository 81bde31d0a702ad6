//! Front-end state layered over a session snapshot

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use loom_core::engine::ChoiceOutcome;
use loom_core::session::SessionView;

use crate::ui::theme::StoryTheme;
use crate::ui::widgets::relationships::signed;

/// How long a relationship change stays on screen
pub const RELATIONSHIP_TOAST: Duration = Duration::from_secs(3);

/// How long save notices stay on screen
pub const SAVE_TOAST: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Positive,
    Negative,
}

/// A transient notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    expires_at: Instant,
}

/// Main application state
pub struct App {
    /// Latest session snapshot
    pub view: SessionView,
    pub theme: StoryTheme,
    /// Highlighted choice in the current scene
    pub selected: usize,
    pub scroll: u16,
    pub show_help: bool,
    /// Spinner position on the generating screen
    pub animation_frame: usize,
    toasts: Vec<Toast>,
    scene_id: Option<String>,
    seen_autosave: Option<DateTime<Utc>>,
}

impl App {
    pub fn new(view: SessionView) -> Self {
        let scene_id = view.scene.as_ref().map(|s| s.id.clone());
        let seen_autosave = view.last_autosave;
        Self {
            view,
            theme: StoryTheme::default(),
            selected: 0,
            scroll: 0,
            show_help: false,
            animation_frame: 0,
            toasts: Vec::new(),
            scene_id,
            seen_autosave,
        }
    }

    /// Take a fresh snapshot, keeping selection and notices consistent with it.
    pub fn observe(&mut self, view: SessionView) {
        let scene_id = view.scene.as_ref().map(|s| s.id.clone());
        if scene_id != self.scene_id {
            self.selected = 0;
            self.scroll = 0;
            self.scene_id = scene_id;
        }

        if view.last_autosave.is_some() && view.last_autosave != self.seen_autosave {
            self.seen_autosave = view.last_autosave;
            self.notify("Autosaved", ToastKind::Info, SAVE_TOAST);
        }

        self.view = view;
        self.selected = self.selected.min(self.choice_count().saturating_sub(1));
    }

    pub fn choice_count(&self) -> usize {
        self.view.scene.as_ref().map_or(0, |s| s.choices.len())
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.choice_count() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(3);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(3);
    }

    pub fn notify(&mut self, text: impl Into<String>, kind: ToastKind, duration: Duration) {
        self.toasts.push(Toast {
            text: text.into(),
            kind,
            expires_at: Instant::now() + duration,
        });
    }

    /// Show one notice per relationship change.
    pub fn record_outcome(&mut self, outcome: &ChoiceOutcome) {
        for effect in &outcome.applied {
            let kind = if effect.change >= 0 {
                ToastKind::Positive
            } else {
                ToastKind::Negative
            };
            self.notify(
                format!("{} {}", effect.character, signed(effect.change)),
                kind,
                RELATIONSHIP_TOAST,
            );
        }
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    /// Advance animations and expire notices.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
        self.toasts.retain(|toast| toast.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::testing::TestHarness;

    async fn playing_app() -> (TestHarness, App) {
        let harness = TestHarness::started().await;
        let app = App::new(harness.session().view());
        (harness, app)
    }

    #[tokio::test]
    async fn test_selection_is_clamped() {
        let (_harness, mut app) = playing_app().await;
        assert_eq!(app.choice_count(), 2);

        app.select_prev();
        assert_eq!(app.selected, 0);
        app.select_next();
        app.select_next();
        assert_eq!(app.selected, 1);
    }

    #[tokio::test]
    async fn test_new_scene_resets_selection() {
        let (mut harness, mut app) = playing_app().await;
        app.select_next();
        app.scroll_down();

        let outcome = harness.session_mut().choose(1).unwrap();
        app.record_outcome(&outcome);
        app.observe(harness.session().view());

        assert_eq!(app.selected, 0);
        assert_eq!(app.scroll, 0);
        assert_eq!(app.choice_count(), 0);
        assert_eq!(app.toasts().len(), 1);
        assert_eq!(app.toasts()[0].text, "Anya -1");
        assert_eq!(app.toasts()[0].kind, ToastKind::Negative);
    }

    #[tokio::test]
    async fn test_autosave_notice_once_per_stamp() {
        let (mut harness, mut app) = playing_app().await;

        harness.session_mut().autosave().await.unwrap();
        app.observe(harness.session().view());
        app.observe(harness.session().view());

        let notices: Vec<_> = app.toasts().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(notices, ["Autosaved"]);
    }

    #[tokio::test]
    async fn test_toasts_expire() {
        let (_harness, mut app) = playing_app().await;
        app.notify("Game Saved!", ToastKind::Info, SAVE_TOAST);
        app.notify("Kael +1", ToastKind::Positive, RELATIONSHIP_TOAST);

        let now = Instant::now();
        app.tick_at(now + Duration::from_millis(2500));
        assert_eq!(app.toasts().len(), 1);
        app.tick_at(now + Duration::from_secs(4));
        assert!(app.toasts().is_empty());
    }
}

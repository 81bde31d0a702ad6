//! Status bar widget: key hints on the left, autosave time on the right

use chrono::{DateTime, Local, Utc};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use loom_core::session::Phase;

use crate::ui::theme::StoryTheme;

/// Key hints for each phase
pub fn hotkeys(phase: Phase, save_available: bool) -> &'static str {
    match phase {
        Phase::Start if save_available => " n:New story  l:Load  ?:Help  q:Quit ",
        Phase::Start => " n:New story  ?:Help  q:Quit ",
        Phase::Generating => " Weaving your story...  q:Quit ",
        Phase::Playing => " ↑/↓:Select  Enter/1-9:Choose  s:Save  R:Reset  ?:Help  q:Quit ",
        Phase::Ended => " r:Play again  q:Quit ",
    }
}

pub struct StatusBarWidget<'a> {
    phase: Phase,
    save_available: bool,
    last_autosave: Option<DateTime<Utc>>,
    theme: &'a StoryTheme,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(phase: Phase, theme: &'a StoryTheme) -> Self {
        Self {
            phase,
            save_available: false,
            last_autosave: None,
            theme,
        }
    }

    pub fn save_available(mut self, available: bool) -> Self {
        self.save_available = available;
        self
    }

    pub fn last_autosave(mut self, stamp: Option<DateTime<Utc>>) -> Self {
        self.last_autosave = stamp;
        self
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(22)])
            .split(area);

        Paragraph::new(Line::from(Span::styled(
            hotkeys(self.phase, self.save_available),
            self.theme.system_style(),
        )))
        .render(chunks[0], buf);

        if let Some(stamp) = self.last_autosave {
            let clock = stamp.with_timezone(&Local).format("%H:%M:%S");
            Paragraph::new(
                Line::from(Span::styled(
                    format!("Autosaved {clock} "),
                    self.theme.system_style(),
                ))
                .right_aligned(),
            )
            .render(chunks[1], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_hint_only_with_save() {
        assert!(hotkeys(Phase::Start, true).contains("l:Load"));
        assert!(!hotkeys(Phase::Start, false).contains("l:Load"));
        assert!(hotkeys(Phase::Ended, false).contains("r:Play again"));
    }
}

//! Scene display widget: narration followed by dialogue

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use loom_core::document::{is_player_name, Scene};

use crate::ui::theme::StoryTheme;

/// Widget for the current scene
pub struct SceneWidget<'a> {
    scene: &'a Scene,
    theme: &'a StoryTheme,
    scroll: u16,
    focused: bool,
}

impl<'a> SceneWidget<'a> {
    pub fn new(scene: &'a Scene, theme: &'a StoryTheme) -> Self {
        Self {
            scene,
            theme,
            scroll: 0,
            focused: false,
        }
    }

    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let mut lines: Vec<Line> = self
            .scene
            .narration
            .lines()
            .map(|text| Line::from(Span::styled(text, self.theme.narration_style())))
            .collect();

        for entry in &self.scene.dialogue {
            lines.push(Line::from(""));
            let is_player = is_player_name(&entry.character);
            let line = Line::from(vec![
                Span::styled(
                    format!("{}: ", entry.character),
                    self.theme.speaker_style(is_player),
                ),
                Span::styled(
                    format!("\"{}\"", entry.line),
                    if is_player {
                        self.theme.player_style()
                    } else {
                        self.theme.npc_style()
                    },
                ),
            ]);
            // The player's own lines sit on the right, like a chat transcript
            lines.push(if is_player {
                line.alignment(Alignment::Right)
            } else {
                line
            });
        }

        lines
    }
}

impl Widget for SceneWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.scene.title))
            .title_style(self.theme.title_style())
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}

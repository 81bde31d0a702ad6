//! Cast of the current scene

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use loom_core::document::Character;

use crate::ui::theme::StoryTheme;

pub struct CastWidget<'a> {
    cast: &'a [&'a Character],
    theme: &'a StoryTheme,
}

impl<'a> CastWidget<'a> {
    pub fn new(cast: &'a [&'a Character], theme: &'a StoryTheme) -> Self {
        Self { cast, theme }
    }

    fn lines(&self) -> Vec<Line<'a>> {
        if self.cast.is_empty() {
            return vec![Line::from(Span::styled(
                "Nobody speaks here.",
                self.theme.system_style(),
            ))];
        }

        let mut lines = Vec::new();
        for character in self.cast {
            if !lines.is_empty() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled(
                character.name.as_str(),
                self.theme.speaker_style(character.is_player()),
            )));
            lines.push(Line::from(Span::styled(
                character.description.as_str(),
                self.theme.narration_style(),
            )));
            lines.push(Line::from(Span::styled(
                character.portrait_url.as_str(),
                self.theme.system_style(),
            )));
        }
        lines
    }
}

impl Widget for CastWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" In this scene ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(false));

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::testing::sample_story;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
    }

    #[test]
    fn test_lists_speaker_details() {
        let theme = StoryTheme::default();
        let story = sample_story();
        let cast: Vec<&Character> = story.characters.iter().take(1).collect();
        let area = Rect::new(0, 0, 60, 5);
        let mut buf = Buffer::empty(area);
        CastWidget::new(&cast, &theme).render(area, &mut buf);

        assert!(row(&buf, 1).contains("Kael"));
        assert!(row(&buf, 2).contains("A rugged smuggler with a cybernetic eye."));
        assert!(row(&buf, 3).contains("https://picsum.photos/seed/kael/200/200"));
    }

    #[test]
    fn test_empty_cast_has_placeholder() {
        let theme = StoryTheme::default();
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        CastWidget::new(&[], &theme).render(area, &mut buf);

        assert!(row(&buf, 1).contains("Nobody speaks here."));
    }
}

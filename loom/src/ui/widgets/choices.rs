//! Numbered choice list

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use loom_core::document::Choice;

use crate::ui::theme::StoryTheme;

pub struct ChoicesWidget<'a> {
    choices: &'a [Choice],
    selected: usize,
    theme: &'a StoryTheme,
}

impl<'a> ChoicesWidget<'a> {
    pub fn new(choices: &'a [Choice], theme: &'a StoryTheme) -> Self {
        Self {
            choices,
            selected: 0,
            theme,
        }
    }

    pub fn selected(mut self, selected: usize) -> Self {
        self.selected = selected;
        self
    }
}

impl Widget for ChoicesWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" What do you do? ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        let lines: Vec<Line> = if self.choices.is_empty() {
            vec![Line::from(Span::styled(
                "Press Enter to conclude the story.",
                self.theme.system_style(),
            ))]
        } else {
            self.choices
                .iter()
                .enumerate()
                .flat_map(|(i, choice)| {
                    let selected = i == self.selected;
                    let marker = if selected { "▶ " } else { "  " };
                    let mut lines = vec![Line::from(Span::styled(
                        format!("{marker}{}. {}", i + 1, choice.text),
                        self.theme.choice_style(selected),
                    ))];
                    if !choice.consequence.is_empty() {
                        lines.push(Line::from(Span::styled(
                            format!("     {}", choice.consequence),
                            self.theme.consequence_style(),
                        )));
                    }
                    lines
                })
                .collect()
        };

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::testing::sample_story;

    fn text(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_choices_are_numbered_and_marked() {
        let story = sample_story();
        let choices = &story.entry_scene().unwrap().choices;
        let theme = StoryTheme::default();

        let area = Rect::new(0, 0, 80, 8);
        let mut buf = Buffer::empty(area);
        ChoicesWidget::new(choices, &theme)
            .selected(1)
            .render(area, &mut buf);

        let rendered = text(&buf);
        assert!(rendered.contains("  1. Follow Kael into the tunnels"));
        assert!(rendered.contains("▶ 2. Hand the shard to Anya"));
        assert!(rendered.contains("You chose to hand the shard to anya."));
    }

    #[test]
    fn test_no_choices_offers_conclusion() {
        let theme = StoryTheme::default();
        let area = Rect::new(0, 0, 60, 3);
        let mut buf = Buffer::empty(area);
        ChoicesWidget::new(&[], &theme).render(area, &mut buf);

        assert!(text(&buf).contains("Press Enter to conclude"));
    }
}

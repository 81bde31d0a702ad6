//! Relationship tracker sidebar

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::StoryTheme;

/// Format a score or change with an explicit sign
pub fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

pub struct RelationshipsWidget<'a> {
    relationships: &'a [(String, i64)],
    theme: &'a StoryTheme,
}

impl<'a> RelationshipsWidget<'a> {
    pub fn new(relationships: &'a [(String, i64)], theme: &'a StoryTheme) -> Self {
        Self {
            relationships,
            theme,
        }
    }
}

impl Widget for RelationshipsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Relationships ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(false));

        let lines: Vec<Line> = if self.relationships.is_empty() {
            vec![Line::from(Span::styled("No one yet.", self.theme.system_style()))]
        } else {
            self.relationships
                .iter()
                .map(|(name, score)| {
                    Line::from(vec![
                        Span::styled(
                            format!("{name}: "),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            signed(*score),
                            Style::default().fg(self.theme.score_color(*score)),
                        ),
                    ])
                })
                .collect()
        };

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed() {
        assert_eq!(signed(2), "+2");
        assert_eq!(signed(0), "0");
        assert_eq!(signed(-3), "-3");
    }

    #[test]
    fn test_scores_are_colored_by_sign() {
        let theme = StoryTheme::default();
        let relationships = vec![("Anya".to_string(), -1), ("Kael".to_string(), 3)];
        let area = Rect::new(0, 0, 30, 4);
        let mut buf = Buffer::empty(area);
        RelationshipsWidget::new(&relationships, &theme).render(area, &mut buf);

        // "│Anya: -1": the score starts after the border and the label
        assert_eq!(buf[(7, 1)].symbol(), "-");
        assert_eq!(buf[(7, 1)].fg, theme.negative);
        assert_eq!(buf[(7, 2)].symbol(), "+");
        assert_eq!(buf[(7, 2)].fg, theme.positive);
    }
}

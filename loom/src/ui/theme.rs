//! Color theme and styling for the story TUI

use ratatui::style::{Color, Modifier, Style};

/// Story UI color theme
#[derive(Debug, Clone)]
pub struct StoryTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub accent: Color,

    // Text colors
    pub narration_text: Color,
    pub player_text: Color,
    pub npc_dialogue: Color,
    pub consequence_text: Color,
    pub system_text: Color,

    // Relationship colors
    pub positive: Color,
    pub negative: Color,
    pub neutral: Color,

    // Error and notice colors
    pub error: Color,
    pub notice: Color,
}

impl Default for StoryTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            accent: Color::Magenta,

            narration_text: Color::White,
            player_text: Color::Cyan,
            npc_dialogue: Color::Yellow,
            consequence_text: Color::DarkGray,
            system_text: Color::DarkGray,

            positive: Color::Green,
            negative: Color::Red,
            neutral: Color::Gray,

            error: Color::LightRed,
            notice: Color::LightBlue,
        }
    }
}

impl StoryTheme {
    /// Get style for scene narration
    pub fn narration_style(&self) -> Style {
        Style::default().fg(self.narration_text)
    }

    /// Get style for lines spoken by the player
    pub fn player_style(&self) -> Style {
        Style::default()
            .fg(self.player_text)
            .add_modifier(Modifier::ITALIC)
    }

    /// Get style for NPC dialogue
    pub fn npc_style(&self) -> Style {
        Style::default().fg(self.npc_dialogue)
    }

    pub fn speaker_style(&self, is_player: bool) -> Style {
        let style = if is_player {
            self.player_style()
        } else {
            self.npc_style()
        };
        style.add_modifier(Modifier::BOLD)
    }

    pub fn consequence_style(&self) -> Style {
        Style::default()
            .fg(self.consequence_text)
            .add_modifier(Modifier::ITALIC)
    }

    /// Get style for system messages
    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.error)
            .add_modifier(Modifier::BOLD)
    }

    /// Color for a relationship score or change
    pub fn score_color(&self, value: i64) -> Color {
        match value.signum() {
            1 => self.positive,
            -1 => self.negative,
            _ => self.neutral,
        }
    }

    /// Get style for a choice row
    pub fn choice_style(&self, selected: bool) -> Style {
        if selected {
            Style::default()
                .fg(self.border_focused)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.foreground)
        }
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Get title style
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_colors() {
        let theme = StoryTheme::default();
        assert_eq!(theme.score_color(3), Color::Green);
        assert_eq!(theme.score_color(-1), Color::Red);
        assert_eq!(theme.score_color(0), theme.neutral);
    }
}

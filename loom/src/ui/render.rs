//! Render orchestration for the story TUI

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use loom_core::session::Phase;

use crate::app::{App, ToastKind};
use crate::ui::widgets::relationships::signed;
use crate::ui::widgets::{
    CastWidget, ChoicesWidget, RelationshipsWidget, SceneWidget, StatusBarWidget,
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.view.phase {
        Phase::Start => render_start(frame, app, chunks[0]),
        Phase::Generating => render_generating(frame, app, chunks[0]),
        Phase::Playing => render_playing(frame, app, chunks[0]),
        Phase::Ended => render_ending(frame, app, chunks[0]),
    }

    let status = StatusBarWidget::new(app.view.phase, &app.theme)
        .save_available(app.view.save_available)
        .last_autosave(app.view.last_autosave);
    frame.render_widget(status, chunks[1]);

    render_toasts(frame, app, area);

    if app.show_help {
        render_help_overlay(frame, app, area);
    }
}

fn render_start(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect_fixed(60, 14, area);

    let mut lines = vec![
        Line::from(Span::styled("L O O M", app.theme.title_style())),
        Line::from(Span::styled(
            "Branching sci-fi mysteries, woven fresh each time",
            app.theme.system_style(),
        )),
        Line::from(""),
        Line::from("[n] Begin a new story"),
    ];
    if app.view.save_available {
        lines.push(Line::from("[l] Continue your saved story"));
    }
    lines.push(Line::from("[q] Quit"));

    if let Some(error) = &app.view.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.as_str(), app.theme.error_style())));
        lines.push(Line::from(Span::styled(
            "[Esc] dismiss",
            app.theme.system_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup,
    );
}

fn render_generating(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect_fixed(50, 7, area);
    let spinner = SPINNER[app.animation_frame % SPINNER.len()];

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("{spinner} Weaving your story {spinner}"),
            app.theme.title_style(),
        )),
        Line::from(Span::styled(
            "This can take a minute.",
            app.theme.system_style(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(false));

    frame.render_widget(
        Paragraph::new(lines).block(block).alignment(Alignment::Center),
        popup,
    );
}

/// Playing layout: scene and choices on the left (70%), sidebar on the right
fn render_playing(frame: &mut Frame, app: &App, area: Rect) {
    let Some(scene) = &app.view.scene else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    render_title_bar(frame, app, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[1]);

    let choice_height = (scene.choices.len().max(1) * 2 + 2).min(14) as u16;
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(choice_height)])
        .split(columns[0]);

    frame.render_widget(
        SceneWidget::new(scene, &app.theme).scroll(app.scroll),
        left[0],
    );
    frame.render_widget(
        ChoicesWidget::new(&scene.choices, &app.theme).selected(app.selected),
        left[1],
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),
            Constraint::Percentage(50),
            Constraint::Length(4),
        ])
        .split(columns[1]);

    frame.render_widget(
        RelationshipsWidget::new(&app.view.relationships, &app.theme),
        right[0],
    );
    let cast = app.view.scene_cast();
    frame.render_widget(CastWidget::new(&cast, &app.theme), right[1]);
    render_backdrop(frame, app, right[2]);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = app.view.title.as_deref().unwrap_or("Untitled");
    let scene = app.view.scene.as_ref().map_or("", |s| s.title.as_str());

    let line = Line::from(vec![
        Span::styled(format!(" {title} "), app.theme.title_style()),
        Span::styled(format!("| {scene} "), Style::default().add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_backdrop(frame: &mut Frame, app: &App, area: Rect) {
    let backdrop = app.view.background_image.as_deref().unwrap_or("");
    let block = Block::default()
        .title(" Backdrop ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(false));

    frame.render_widget(
        Paragraph::new(Span::styled(backdrop, app.theme.system_style()))
            .block(block)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_ending(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect_fixed(70, 20, area);

    let mut lines = vec![
        Line::from(Span::styled("The End", app.theme.title_style())),
        Line::from(""),
        Line::from(Span::styled(
            app.view.ending.as_deref().unwrap_or_default(),
            app.theme.narration_style(),
        )),
    ];

    if !app.view.relationships.is_empty() {
        lines.push(Line::from(""));
        let mut spans = Vec::new();
        for (name, score) in &app.view.relationships {
            spans.push(Span::raw(format!("{name} ")));
            spans.push(Span::styled(
                signed(*score),
                Style::default().fg(app.theme.score_color(*score)),
            ));
            spans.push(Span::raw("   "));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[r] Play again   [q] Quit",
        app.theme.system_style(),
    )));

    let title = app
        .view
        .title
        .as_deref()
        .map(|t| format!(" {t} "))
        .unwrap_or_default();
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup,
    );
}

/// Stack notices in the top-right corner
fn render_toasts(frame: &mut Frame, app: &App, area: Rect) {
    let mut y = area.y + 1;
    for toast in app.toasts() {
        let width = (toast.text.chars().count() as u16 + 4).min(area.width);
        if y + 3 > area.bottom() {
            break;
        }
        let rect = Rect::new(area.right().saturating_sub(width + 1), y, width, 3);

        let color = match toast.kind {
            ToastKind::Info => app.theme.notice,
            ToastKind::Positive => app.theme.positive,
            ToastKind::Negative => app.theme.negative,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));

        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(Span::styled(
                toast.text.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .block(block)
            .alignment(Alignment::Center),
            rect,
        );
        y += 3;
    }
}

fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_fixed(50, 16, area);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            " Loom - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  n              New story"),
        Line::from("  l              Load saved story"),
        Line::from("  j/k or ↑/↓     Select a choice"),
        Line::from("  Enter or 1-9   Take a choice"),
        Line::from("  PgUp/PgDn      Scroll the scene"),
        Line::from("  s              Save"),
        Line::from("  R              Reset and delete the save"),
        Line::from("  q              Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or ? to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    frame.render_widget(
        Paragraph::new(help_text)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}

/// A fixed-size rectangle centered in `area`, shrunk to fit
fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::testing::TestHarness;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_start_screen_without_save() {
        let harness = TestHarness::new().await;
        let screen = draw(&App::new(harness.session().view()));

        assert!(screen.contains("Begin a new story"));
        assert!(!screen.contains("Continue your saved story"));
    }

    #[tokio::test]
    async fn test_playing_screen() {
        let harness = TestHarness::started().await;
        let screen = draw(&App::new(harness.session().view()));

        assert!(screen.contains("Neon Tides"));
        assert!(screen.contains("Rain on the Docks"));
        assert!(screen.contains("1. Follow Kael"));
        assert!(screen.contains("Kael: 0"));
        assert!(screen.contains("In this scene"));
        assert!(screen.contains("A rugged smuggler"));
    }

    #[tokio::test]
    async fn test_end_screen() {
        let mut harness = TestHarness::started().await;
        harness.session_mut().choose(0).unwrap();
        harness.session_mut().choose(0).unwrap();
        let screen = draw(&App::new(harness.session().view()));

        assert!(screen.contains("The End"));
        assert!(screen.contains("Kael +3"));
        assert!(screen.contains("Play again"));
    }
}

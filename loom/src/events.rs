//! Event handling for the story TUI

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};

use loom_core::session::Phase;

use crate::app::App;

/// A request that needs the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    NewStory,
    Load,
    Save,
    Reset,
    Choose(usize),
    Conclude,
    DismissError,
}

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
    Command(AppCommand),
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.scroll_up();
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.scroll_down();
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    // Global shortcuts (always work)
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    if app.show_help {
        return match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Enter => {
                app.show_help = false;
                EventResult::NeedsRedraw
            }
            _ => EventResult::Continue,
        };
    }

    match app.view.phase {
        Phase::Start => handle_start_key(app, key),
        Phase::Generating => match key.code {
            KeyCode::Char('q') => EventResult::Quit,
            _ => EventResult::Continue,
        },
        Phase::Playing => handle_playing_key(app, key),
        Phase::Ended => match key.code {
            KeyCode::Char('r') => EventResult::Command(AppCommand::Reset),
            KeyCode::Char('q') => EventResult::Quit,
            _ => EventResult::Continue,
        },
    }
}

fn handle_start_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char('n') => EventResult::Command(AppCommand::NewStory),
        KeyCode::Char('l') if app.view.save_available => EventResult::Command(AppCommand::Load),
        KeyCode::Esc if app.view.error.is_some() => {
            EventResult::Command(AppCommand::DismissError)
        }
        KeyCode::Char('?') => {
            app.show_help = true;
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') | KeyCode::Esc => EventResult::Quit,
        _ => EventResult::Continue,
    }
}

fn handle_playing_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_prev();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
            EventResult::NeedsRedraw
        }
        KeyCode::PageUp => {
            app.scroll_up();
            EventResult::NeedsRedraw
        }
        KeyCode::PageDown => {
            app.scroll_down();
            EventResult::NeedsRedraw
        }
        KeyCode::Enter if app.choice_count() == 0 => EventResult::Command(AppCommand::Conclude),
        KeyCode::Enter => EventResult::Command(AppCommand::Choose(app.selected)),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if index < app.choice_count() {
                EventResult::Command(AppCommand::Choose(index))
            } else {
                EventResult::Continue
            }
        }
        KeyCode::Char('s') => EventResult::Command(AppCommand::Save),
        KeyCode::Char('R') => EventResult::Command(AppCommand::Reset),
        KeyCode::Char('?') => {
            app.show_help = true;
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') => EventResult::Quit,
        _ => EventResult::Continue,
    }
}

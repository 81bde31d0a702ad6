//! Headless mode.
//!
//! A line-oriented interface for playing without a TUI, meant for scripted
//! runs and automated agents.

use std::fmt::Write as _;
use std::sync::Arc;

use loom_core::generator::StoryGenerator;
use loom_core::session::{Phase, SessionView, SharedSession};
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::ui::widgets::relationships::signed;

/// One line of headless input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessCommand {
    New,
    Load,
    Save,
    Reset,
    Status,
    Help,
    Quit,
    /// Finish a scene that offers no choices
    End,
    /// Zero-based choice index
    Choose(usize),
    Unknown(String),
}

/// Parse a line; `None` for blank input.
pub fn parse_line(line: &str) -> Option<HeadlessCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(command) = line.strip_prefix('#') {
        let command = match command.trim().to_lowercase().as_str() {
            "new" => HeadlessCommand::New,
            "load" => HeadlessCommand::Load,
            "save" => HeadlessCommand::Save,
            "reset" => HeadlessCommand::Reset,
            "status" => HeadlessCommand::Status,
            "help" => HeadlessCommand::Help,
            "quit" | "exit" => HeadlessCommand::Quit,
            "end" => HeadlessCommand::End,
            _ => HeadlessCommand::Unknown(line.to_string()),
        };
        return Some(command);
    }

    // Choices are numbered from 1 on screen
    match line.parse::<usize>() {
        Ok(n) if n >= 1 => Some(HeadlessCommand::Choose(n - 1)),
        _ => Some(HeadlessCommand::Unknown(line.to_string())),
    }
}

const HELP: &str = "\
[HELP]
  #new     - Generate a new story
  #load    - Resume the saved story
  #save    - Save the story in progress
  #reset   - Drop the story and delete the save
  #status  - Show the current scene and relationships
  #end     - Conclude a scene that has no choices
  #quit    - Exit
  <n>      - Take choice number n";

/// Text block for the current scene
pub fn describe_scene(view: &SessionView) -> String {
    let mut out = String::new();
    let Some(scene) = &view.scene else {
        return out;
    };

    let _ = writeln!(out, "[SCENE] {}", scene.title);
    let _ = writeln!(out, "{}", scene.narration);
    for line in &scene.dialogue {
        let _ = writeln!(out, "  {}: \"{}\"", line.character, line.line);
    }

    if scene.choices.is_empty() {
        let _ = writeln!(out, "[CHOICES] none; send #end to conclude");
    } else {
        let _ = writeln!(out, "[CHOICES]");
        for (i, choice) in scene.choices.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, choice.text);
        }
    }
    out
}

/// Text block for `#status`
pub fn describe_status(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[STATUS]");
    let phase = match view.phase {
        Phase::Start => "start",
        Phase::Generating => "generating",
        Phase::Playing => "playing",
        Phase::Ended => "ended",
    };
    let _ = writeln!(out, "  Phase: {phase}");
    if let Some(title) = &view.title {
        let _ = writeln!(out, "  Story: {title}");
    }
    if let Some(scene) = &view.scene {
        let _ = writeln!(out, "  Scene: {} ({})", scene.title, scene.id);
    }
    for (name, score) in &view.relationships {
        let _ = writeln!(out, "  {name}: {}", signed(*score));
    }
    if let Some(stamp) = view.last_autosave {
        let _ = writeln!(out, "  Last autosave: {}", stamp.to_rfc3339());
    }
    let _ = writeln!(out, "  Save available: {}", view.save_available);
    out
}

fn describe_ending(view: &SessionView) -> String {
    let mut out = String::from("[THE END]\n");
    if let Some(ending) = &view.ending {
        let _ = writeln!(out, "{ending}");
    }
    for (name, score) in &view.relationships {
        let _ = writeln!(out, "  {name}: {}", signed(*score));
    }
    out
}

fn print_view(view: &SessionView) {
    match view.phase {
        Phase::Playing => print!("{}", describe_scene(view)),
        Phase::Ended => print!("{}", describe_ending(view)),
        Phase::Start | Phase::Generating => {}
    }
}

/// Run the game in headless mode until `#quit` or end of input.
pub async fn run_headless(
    session: SharedSession,
    generator: Arc<dyn StoryGenerator>,
) -> anyhow::Result<()> {
    println!("=== Loom Headless Mode ===");
    println!("{HELP}");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_line(&line) else {
            continue;
        };

        match command {
            HeadlessCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            HeadlessCommand::Help => println!("{HELP}"),
            HeadlessCommand::Status => {
                print!("{}", describe_status(&session.lock().await.view()));
            }
            HeadlessCommand::New => {
                if let Err(e) = session.lock().await.begin_generation() {
                    println!("[ERROR] {e}");
                    continue;
                }
                println!("[GENERATING]");
                // The lock is released while the model works so autosave never waits on it
                let result = generator.generate().await;
                let mut session = session.lock().await;
                match session.finish_generation(result) {
                    Ok(()) => print_view(&session.view()),
                    Err(e) => {
                        let message = session.last_error().unwrap_or_default();
                        println!("[ERROR] {message} ({e})");
                    }
                }
            }
            HeadlessCommand::Load => {
                let mut session = session.lock().await;
                match session.load().await {
                    Ok(true) => {
                        println!("[LOADED]");
                        print_view(&session.view());
                    }
                    Ok(false) => match session.last_error() {
                        Some(message) => println!("[ERROR] {message}"),
                        None => println!("[ERROR] No saved story found."),
                    },
                    Err(e) => println!("[ERROR] Load failed: {e}"),
                }
            }
            HeadlessCommand::Save => {
                if session.lock().await.save().await {
                    println!("[SAVED]");
                } else {
                    println!("[ERROR] Nothing to save.");
                }
            }
            HeadlessCommand::Reset => match session.lock().await.reset().await {
                Ok(()) => println!("[RESET]"),
                Err(e) => println!("[ERROR] Reset failed: {e}"),
            },
            HeadlessCommand::Choose(index) => {
                let mut session = session.lock().await;
                match session.choose(index) {
                    Ok(outcome) => {
                        for effect in &outcome.applied {
                            println!(
                                "[RELATIONSHIP] {} {} (now {})",
                                effect.character,
                                signed(effect.change),
                                signed(effect.score)
                            );
                        }
                        print_view(&session.view());
                    }
                    Err(e) => println!("[ERROR] {e}"),
                }
            }
            HeadlessCommand::End => {
                let mut session = session.lock().await;
                match session.conclude() {
                    Ok(_) => print_view(&session.view()),
                    Err(e) => println!("[ERROR] {e}"),
                }
            }
            HeadlessCommand::Unknown(text) => {
                println!("[ERROR] Unknown input '{text}'. Type #help for help.");
            }
        }
    }

    Ok(())
}

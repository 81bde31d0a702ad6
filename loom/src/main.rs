//! Loom: a terminal player for AI-generated branching stories.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for
//! automated testing:
//!
//! ```bash
//! cargo run -p loom -- --headless --save-dir ./saves
//! ```

mod app;
mod events;
mod headless;
mod ui;

use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use loom_core::{
    Autosaver, ClaudeGenerator, FileStore, GenerationError, SessionConfig, SharedSession,
    StoryDocument, StoryGenerator, StorySession,
};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use app::{App, ToastKind, SAVE_TOAST};
use events::{handle_event, AppCommand, EventResult};
use ui::render;

const DEFAULT_LOG_FILTER: &str = "loom=info,loom_core=info,claude=info";

#[derive(Debug, Parser)]
#[command(name = "loom", version, about = "Play AI-generated branching sci-fi mysteries")]
struct Args {
    /// Line-oriented mode on stdin/stdout instead of the terminal UI
    #[arg(long)]
    headless: bool,

    /// Directory for saved stories (overrides LOOM_SAVE_DIR)
    #[arg(long, value_name = "DIR")]
    save_dir: Option<PathBuf>,

    /// Seconds between autosaves (overrides LOOM_AUTOSAVE_SECS)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    autosave_secs: Option<u64>,

    /// Claude model used for generation (overrides LOOM_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Log file for the terminal UI (defaults to loom.log in the save directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::from_env();
        if let Some(dir) = &self.save_dir {
            config = config.with_save_dir(dir);
        }
        if let Some(secs) = self.autosave_secs {
            config = config.with_autosave_interval(Duration::from_secs(secs));
        }
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        config
    }

    fn log_path(&self) -> PathBuf {
        if let Some(path) = &self.log_file {
            return path.clone();
        }
        self.save_dir
            .clone()
            .or_else(|| std::env::var_os("LOOM_SAVE_DIR").map(PathBuf::from))
            .unwrap_or_else(FileStore::default_dir)
            .join("loom.log")
    }
}

/// Install the tracing subscriber. The TUI owns the terminal, so it logs to a file.
fn init_logging(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    let path = args.log_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args)?;

    // Check for API key
    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export ANTHROPIC_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let config = args.session_config();
    let generator: Arc<dyn StoryGenerator> = Arc::new(
        ClaudeGenerator::from_env()
            .context("creating the Claude client")?
            .with_config(config.generator_config()),
    );

    let session = StorySession::open(config.save_manager()).await.into_shared();
    let autosaver = Autosaver::spawn(&session, config.autosave_interval);
    tracing::info!(
        headless = args.headless,
        autosave_secs = autosaver.period().as_secs(),
        "loom starting"
    );

    if args.headless {
        return headless::run_headless(session, generator).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(session.lock().await.view());
    let result = run_app(&mut terminal, app, session, generator).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    autosaver.stop();
    result.map_err(Into::into)
}

type Generation = JoinHandle<Result<StoryDocument, GenerationError>>;

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    session: SharedSession,
    generator: Arc<dyn StoryGenerator>,
) -> io::Result<()> {
    let mut generation: Option<Generation> = None;

    loop {
        // Hand a finished generation back to the session
        if generation.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = generation.take() {
                let result = handle.await.unwrap_or_else(|e| {
                    tracing::error!(error = %e, "generation task failed");
                    Err(GenerationError::from(e))
                });
                if session.lock().await.finish_generation(result).is_ok() {
                    app.notify("A new story begins", ToastKind::Info, SAVE_TOAST);
                }
            }
        }

        app.observe(session.lock().await.view());
        terminal.draw(|f| render(f, &app))?;

        if !event::poll(Duration::from_millis(100))? {
            app.tick();
            continue;
        }

        let command = match handle_event(&mut app, event::read()?) {
            EventResult::Quit => {
                if let Some(handle) = generation.take() {
                    handle.abort();
                }
                return Ok(());
            }
            EventResult::Command(command) => command,
            EventResult::Continue | EventResult::NeedsRedraw => continue,
        };

        let mut story = session.lock().await;
        match command {
            AppCommand::NewStory => match story.begin_generation() {
                Ok(()) => {
                    let generator = Arc::clone(&generator);
                    generation = Some(tokio::spawn(async move { generator.generate().await }));
                }
                Err(e) => app.notify(e.to_string(), ToastKind::Negative, SAVE_TOAST),
            },
            AppCommand::Load => match story.load().await {
                Ok(true) => app.notify("Story loaded", ToastKind::Info, SAVE_TOAST),
                Ok(false) => {
                    if story.last_error().is_none() {
                        app.notify("No saved story found", ToastKind::Negative, SAVE_TOAST);
                    }
                }
                Err(e) => app.notify(format!("Load failed: {e}"), ToastKind::Negative, SAVE_TOAST),
            },
            AppCommand::Save => {
                if story.save().await {
                    app.notify("Game Saved!", ToastKind::Info, SAVE_TOAST);
                } else {
                    app.notify("Save failed", ToastKind::Negative, SAVE_TOAST);
                }
            }
            AppCommand::Reset => {
                if let Err(e) = story.reset().await {
                    app.notify(format!("Reset failed: {e}"), ToastKind::Negative, SAVE_TOAST);
                }
            }
            AppCommand::Choose(index) => match story.choose(index) {
                Ok(outcome) => app.record_outcome(&outcome),
                Err(e) => app.notify(e.to_string(), ToastKind::Negative, SAVE_TOAST),
            },
            AppCommand::Conclude => {
                if let Err(e) = story.conclude() {
                    app.notify(e.to_string(), ToastKind::Negative, SAVE_TOAST);
                }
            }
            AppCommand::DismissError => story.dismiss_error(),
        }
    }
}

mod app;
mod client;
mod config;
mod form;
mod markdown;
mod prompt;
mod report;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use client::{GeminiClient, Generator};
use config::AppConfig;
use form::{Capacity, Experience, Goal};
use prompt::GenerationRequest;

#[derive(Parser, Debug)]
#[command(name = "ytstrat")]
#[command(author = "Sean Fournier")]
#[command(version = "0.1.0")]
#[command(about = "Turn a few channel details into a streamed YouTube growth strategy")]
struct Args {
    /// Channel topic or niche
    #[arg(short, long)]
    topic: Option<String>,

    /// Who the channel is for
    #[arg(short, long)]
    audience: Option<String>,

    /// Primary goal (views, authority, affiliate, "course sales", "personal brand")
    #[arg(short, long)]
    goal: Option<Goal>,

    /// Experience level (beginner, intermediate, advanced)
    #[arg(short, long)]
    experience: Option<Experience>,

    /// Posting capacity ("1 per week", "2-3 per week", daily, "1-2 per month")
    #[arg(short, long)]
    capacity: Option<Capacity>,

    /// Gemini model to use
    #[arg(long)]
    model: Option<String>,

    /// Stream the strategy as markdown to stdout instead of opening the TUI
    #[arg(short, long)]
    print: bool,

    /// Print the config file location and exit
    #[arg(long)]
    config_path: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.print);

    if args.config_path {
        println!("{}", AppConfig::config_path()?.display());
        return Ok(());
    }

    let mut config = AppConfig::load()?;
    apply_args(&mut config, &args);

    if args.print {
        return print_strategy(&config, &mut io::stdout()).await;
    }

    // Run TUI
    run_tui(config).await
}

/// Logs go to stderr when headless; the TUI owns the terminal so it logs to a file
fn init_logging(headless: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if headless {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
        return;
    }

    match open_log_file() {
        Some(file) => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .with(filter)
            .init(),
        None => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::sink))
            .with(filter)
            .init(),
    }
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join("ytstrat");
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("ytstrat.log"))
        .ok()
}

/// Command-line values win over the config file and the environment
fn apply_args(config: &mut AppConfig, args: &Args) {
    if let Some(ref model) = args.model {
        config.model = model.clone();
    }

    let defaults = &mut config.defaults;
    if let Some(ref topic) = args.topic {
        defaults.topic = topic.clone();
    }
    if let Some(ref audience) = args.audience {
        defaults.audience = audience.clone();
    }
    if let Some(goal) = args.goal {
        defaults.goal = goal;
    }
    if let Some(experience) = args.experience {
        defaults.experience = experience;
    }
    if let Some(capacity) = args.capacity {
        defaults.capacity = capacity;
    }
}

async fn print_strategy<W: Write>(config: &AppConfig, out: &mut W) -> Result<()> {
    let input = &config.defaults;
    input.validate()?;

    let client = GeminiClient::from_config(config)?;
    tracing::info!(model = %client.model(), topic = %input.topic.trim(), "streaming strategy");

    let request = GenerationRequest::new(input, config.temperature);
    let mut fragments = client.stream(request);

    let mut count = 0usize;
    while let Some(fragment) = fragments.next().await {
        let text = fragment.context("strategy generation failed")?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        count += 1;
    }
    writeln!(out)?;

    tracing::info!(fragments = count, "strategy complete");
    Ok(())
}

async fn run_tui(config: AppConfig) -> Result<()> {
    // Create app state
    let mut app = App::new(config);
    ui::init_theme(app.theme.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Abort any in-flight request before leaving
    app.cancel();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Short poll so streamed fragments show up promptly
        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.q_quits() => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key) {
                                tracing::warn!("Key handling failed: {:#}", e);
                                app.status_message = Some(format!("Error: {}", e));
                                app.status_message_time = Some(std::time::Instant::now());
                            }
                        }
                    }
                }
            }
        }

        // Drain stream events
        app.tick();
    }
}

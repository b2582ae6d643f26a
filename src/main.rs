use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    error::Error,
    io::{self, stdin},
    sync::Arc,
    time::Duration,
};
use tracing::info;

use typeboard::api::HttpApi;
use typeboard::app::{App, RuntimeSettings};
use typeboard::app_dirs::AppDirs;
use typeboard::config::{Config, ConfigStore, FileConfigStore};
use typeboard::runtime::{spawn_status_probe, CrosstermEventSource, FixedTicker, Runner};
use typeboard::{ui, TICK_RATE_MS};

/// terminal typing speed test with a live global leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type a random passage against a 30 second clock, submit your wpm and accuracy, and watch the global leaderboard re-rank itself live."
)]
pub struct Cli {
    /// number of seconds to run the test
    #[clap(short = 's', long)]
    number_of_secs: Option<u64>,

    /// custom prompt to use instead of a random passage
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// base url of the typeboard backend
    #[clap(long)]
    server_url: Option<String>,
}

impl Cli {
    /// CLI flags win over the config file.
    fn to_settings(&self, cfg: &Config) -> RuntimeSettings {
        let mut settings = RuntimeSettings::from(cfg);
        if let Some(secs) = self.number_of_secs {
            settings.number_of_secs = secs as f64;
        }
        if let Some(url) = &self.server_url {
            settings.server_url = url.clone();
        }
        settings.custom_prompt = self.prompt.clone();
        settings
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(e) = init_tracing() {
        eprintln!("warning: file logging disabled: {e}");
    }

    let store = FileConfigStore::new();
    let config = store.load();
    if !store.exists() {
        // First run: materialize the defaults so they are discoverable.
        let _ = store.save(&config);
    }

    let settings = cli.to_settings(&config);
    let api = Arc::new(HttpApi::new(&settings.server_url)?);
    info!("typeboard starting against {}", settings.server_url);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (event_source, events_tx) = CrosstermEventSource::new();
    spawn_status_probe(api.clone(), events_tx.clone());

    let mut app = App::new(settings, api, events_tx);
    let runner = Runner::new(event_source, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    let run_result = run(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn run<B, E, T>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>>
where
    B: ratatui::backend::Backend,
    E: typeboard::runtime::EventSource,
    T: typeboard::runtime::Ticker,
{
    loop {
        terminal.draw(|f| ui::draw(app, f))?;
        app.on_event(runner.step());
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::{fmt, EnvFilter};

    let Some(log_path) = AppDirs::log_path() else {
        return Ok(());
    };
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::File::create(&log_path)?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("typeboard=info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

use std::{
    fs::{self, File},
    io::{self, Write},
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stock_analysis::{
    analysis::{run_analysis, AnalysisRequest, RunEvent},
    config::{AppConfig, Cli},
    market::YahooProvider,
    report,
    ui::{run_app, App},
};

fn main() -> Result<()> {
    let config = AppConfig::from_cli(Cli::parse())?;
    init_tracing(&config)?;

    let provider = YahooProvider::new(config.timeout)?;
    info!(candidates = config.candidates.len(), plain = config.plain, "starting");

    if config.plain {
        return run_plain(&config, &provider);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config);
    let res = run_app(&mut terminal, &mut app, &provider);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// The dashboard owns the terminal, so logs go to a file unless running plain.
fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.plain {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    if let Some(dir) = config.log_file.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("opening log file {}", config.log_file.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run_plain(config: &AppConfig, provider: &YahooProvider) -> Result<()> {
    let request = AnalysisRequest::new(&config.preselected, config.amount);
    if request.tickers().is_empty() {
        anyhow::bail!("no tickers selected, pass --tickers AAPL,MSFT");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;

    let run = run_analysis(provider, &request, |event| {
        if let RunEvent::Notice(notice) = event {
            if write_error.is_none() {
                if let Err(err) = report::write_notice(&mut out, notice) {
                    write_error = Some(err);
                }
            }
        }
    });

    if let Some(err) = write_error {
        return Err(err.into());
    }
    report::write_run(&mut out, &run)?;
    out.flush()?;
    Ok(())
}

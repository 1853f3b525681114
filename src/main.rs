use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;

mod app;
mod backend;
mod config;
mod handler;
mod logging;
mod session;
mod tui;
mod ui;

use app::App;
use backend::BackendClient;
use config::{Config, BACKEND_URL_ENV};
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Chat with your PDF documents from the terminal", version)]
struct Cli {
    /// Base URL of the document backend
    #[arg(short, long)]
    backend_url: Option<String>,
    /// PDF to preselect in the upload form
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Where to write the log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    let config = Config::load()?;
    let log_file = config.resolve_log_file(cli.log_file.as_deref())?;
    logging::init(&log_file)?;

    let env_url = std::env::var(BACKEND_URL_ENV).ok();
    let backend_url = config.resolve_backend_url(cli.backend_url.as_deref(), env_url.as_deref());
    log::info!("Starting with backend {}", backend_url);
    let backend = BackendClient::new(&backend_url, config.request_timeout())?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(backend, events.sender());
    if let Some(path) = &cli.file {
        app.preselect_file(&path.to_string_lossy());
    }

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    log::info!("Exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

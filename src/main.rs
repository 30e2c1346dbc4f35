use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tasklink::{
    api::{HttpTaskApi, TaskApi},
    app::App,
    cli::{Cli, Command, FilterArgs},
    commands,
    config::AppConfig,
    preferences::PreferenceStore,
    task_list::Filters,
    ui,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| Command::Tui(FilterArgs::default()));
    let interactive = matches!(command, Command::Tui(_));
    cli.logging.init(interactive)?;

    let config = AppConfig::load(cli.config.as_deref(), cli.base_url.clone())
        .context("failed to load configuration")?;
    let api: Arc<dyn TaskApi> =
        Arc::new(HttpTaskApi::new(&config).context("failed to create API client")?);
    info!(base_url = %config.base_url, interactive, "starting");

    match command {
        Command::Tui(filters) => {
            tokio::task::block_in_place(|| run_tui(api, &config, filters.to_filters()))
        }
        other => {
            let mut stdout = io::stdout();
            commands::run(api.as_ref(), other, &mut stdout).await
        }
    }
}

fn run_tui(api: Arc<dyn TaskApi>, config: &AppConfig, filters: Filters) -> anyhow::Result<()> {
    let preferences = PreferenceStore::open(&config.preferences_path);
    let (mut app, mut events) = App::new(api, preferences, config);
    app.seed_filters(filters);
    app.start();

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app, &mut events);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "terminal loop failed");
    }
    result.context("terminal loop failed")
}

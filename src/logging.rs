//! Logging setup.
//!
//! The interactive client always logs to a file so output never lands on the
//! alternate screen. One-shot commands log to stderr unless a file is requested.

use crate::config::default_log_path;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const COMPONENT: &str = "tasklink";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Clone, Debug, Default, clap::Args)]
pub struct LoggingArgs {
    /// Log verbosity when RUST_LOG is not set
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Write logs to this file instead of the default destination
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn init(&self, interactive: bool) -> anyhow::Result<()> {
        let level = Level::from(self.log_level.unwrap_or_default());
        match (&self.log_file, interactive) {
            (Some(path), _) => init_to_file(level, path),
            (None, true) => init_to_file(level, &default_log_path()),
            (None, false) => init_with_writer(level, std::io::stderr),
        }
    }
}

pub fn init_to_file(level: Level, log_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    init_with_writer(level, log_file)
}

pub fn init_with_writer<W>(level: Level, writer: W) -> anyhow::Result<()>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{COMPONENT}={level}")));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    tracing_subscriber::registry().with(filter).with(layer).try_init()?;
    Ok(())
}

use crate::columns::Column;
use crate::logging::LoggingArgs;
use crate::task_list::{Filters, StatusFilter};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tasklink",
    version,
    about = "Browse project-management tasks and chat with the assistant about them"
)]
pub struct Cli {
    /// Config file (defaults to <config dir>/tasklink/config.toml)
    #[arg(long, global = true, env = "TASKLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding config and TASKLINK_BASE_URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Interactive task table (default)
    Tui(FilterArgs),
    /// Print the filtered, sorted task list
    List {
        #[command(flatten)]
        filters: FilterArgs,
        /// Column to sort by
        #[arg(long, value_enum, default_value_t = Column::Id)]
        sort: Column,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Show one task in detail
    Show { id: i64 },
    /// Link a task to a new assistant conversation
    Integrate { id: i64 },
    /// Send one message to the assistant
    Chat {
        message: String,
        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,
    },
    /// List known projects
    Projects,
    /// Ask the server to refresh its task cache
    Refresh,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long, value_enum, default_value_t = StatusFilter::All)]
    pub status: StatusFilter,
    /// Project id
    #[arg(long)]
    pub project: Option<String>,
    /// Exact assigner name
    #[arg(long)]
    pub assigner: Option<String>,
    /// Case-insensitive text search
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> Filters {
        Filters {
            status: self.status,
            project: self.project.clone(),
            assigner: self.assigner.clone(),
            search: self.search.clone().unwrap_or_default(),
        }
    }
}

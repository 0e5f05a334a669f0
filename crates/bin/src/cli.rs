//! CLI argument definitions for the session registry binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Session registry demo
#[derive(Parser, Debug)]
#[command(name = "session-registry")]
#[command(about = "Share one sync session per remote target across local databases")]
#[command(version)]
pub struct Cli {
    /// Registry settings file (JSON)
    #[arg(long, global = true, env = "SESSION_REGISTRY_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Eviction grace period in milliseconds, overrides the settings file
    #[arg(long, global = true, env = "SESSION_REGISTRY_GRACE_MS")]
    pub grace_ms: Option<u64>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open databases against an in-memory sync service and show the sessions they share
    Demo(DemoArgs),
    /// Print the effective registry settings
    Settings,
}

/// Arguments for the demo command
#[derive(clap::Args, Debug)]
pub struct DemoArgs {
    /// User to sync as
    #[arg(short, long, default_value = "demo-user")]
    pub user: String,

    /// Partitions to open; repeat for several
    #[arg(short, long = "partition", default_values_t = vec!["/~/notes".to_string(), "/~/tasks".to_string()])]
    pub partitions: Vec<String>,

    /// Local databases to open per partition
    #[arg(short, long, default_value_t = 2)]
    pub copies: usize,

    /// Directory the local database paths are placed under
    #[arg(short = 'D', long, default_value = "data")]
    pub data_dir: PathBuf,
}

use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Background keystroke and mouse telemetry collector.
#[derive(Parser)]
#[command(name = "typtel-daemon", version)]
pub struct DaemonArgs {
    /// Run in the foreground instead of detaching.
    #[arg(long)]
    pub force: bool,
    /// Data directory. Defaults to `$XDG_DATA_HOME/typtel`.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

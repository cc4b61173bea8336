pub mod bar;
pub mod charts;
pub mod control;
pub mod daemon_path;
pub mod dashboard;
pub mod output;
pub mod process;
pub mod report;
pub mod terminal;
pub mod typing;

use std::path::{Path, PathBuf};

use anyhow::Result;
use bar::{process_bar_command, BarCommand};
use charts::{open_charts, open_leaderboard};
use clap::{Parser, Subcommand};
use control::{process_odometer_command, process_settings_command, print_status, OdometerAction, SettingsAction};
use output::stats::StatsReader;
use process::{restart_server, stop_server};
use report::{print_today, process_stats_command, StatsCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{
        start_daemon,
        storage::{
            odometer::OdometerStore, record_storage::RecordStorageImpl, settings::SettingsStore,
            status::StatusStore, typing_results::TypingResultsStore, RECORDS_DIR,
        },
    },
    utils::{
        clock::DefaultClock,
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "typtel", version, long_about = None)]
#[command(about = "Keystroke and mouse telemetry. Without a command opens the dashboard")]
struct Args {
    #[command(subcommand)]
    commands: Option<Commands>,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $XDG_DATA_HOME/typtel or $HOME/.local/share/typtel"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Print today's keystrokes and words")]
    Today,
    #[command(about = "Detailed statistics")]
    Stats {
        #[command(flatten)]
        command: StatsCommand,
    },
    #[command(about = "Typing speed test")]
    Test,
    #[command(about = "Open charts in the browser", visible_alias = "charts")]
    V,
    #[command(about = "Menu bar title and menu")]
    Bar {
        #[command(flatten)]
        command: BarCommand,
    },
    #[command(about = "Days with the least mouse travel")]
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, help = "Open the leaderboard page in the browser instead")]
        html: bool,
    },
    #[command(about = "Session counter of keystrokes, words, clicks and distance")]
    Odometer {
        #[command(subcommand)]
        action: OdometerAction,
    },
    #[command(about = "Show or change settings")]
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    #[command(about = "Show whether the daemon is running")]
    Status,
    #[command(about = "Starts a daemon for the application")]
    Init,
    #[command(
        about = "Run a daemon directly in current console. Used for debugging"
    )]
    Serve,
    #[command(about = "Stop currently running daemon.")]
    Stop,
}

/// Locations of every file the clients touch.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub dir: PathBuf,
}

impl AppContext {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn reader(&self) -> Result<StatsReader<RecordStorageImpl>> {
        let storage = RecordStorageImpl::new(self.dir.join(RECORDS_DIR))?;
        Ok(StatsReader::new(storage, Box::new(DefaultClock)))
    }

    pub fn settings(&self) -> SettingsStore {
        SettingsStore::new(&self.dir)
    }

    pub fn odometer(&self) -> OdometerStore {
        OdometerStore::new(&self.dir)
    }

    pub fn typing_results(&self) -> TypingResultsStore {
        TypingResultsStore::new(&self.dir)
    }

    pub fn status(&self) -> StatusStore {
        StatusStore::new(&self.dir)
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let dir = resolve_application_path(args.dir)?;
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
    let context = AppContext::new(dir);

    match args.commands {
        None => dashboard::run_dashboard(&context).await,
        Some(Commands::Today) => print_today(&context).await,
        Some(Commands::Stats { command }) => process_stats_command(&context, command).await,
        Some(Commands::Test) => typing::run_typing_test(&context).await,
        Some(Commands::V) => open_charts(&context).await,
        Some(Commands::Bar { command }) => process_bar_command(&context, command).await,
        Some(Commands::Leaderboard { limit, html }) => {
            if html {
                open_leaderboard(&context).await
            } else {
                report::print_leaderboard(&context, limit).await
            }
        }
        Some(Commands::Odometer { action }) => process_odometer_command(&context, action).await,
        Some(Commands::Settings { action }) => process_settings_command(&context, action).await,
        Some(Commands::Status) => print_status(&context).await,
        Some(Commands::Init) => restart_server(context.dir()),
        Some(Commands::Serve) => start_daemon(context.dir).await,
        Some(Commands::Stop) => stop_server(&context).await,
    }
}

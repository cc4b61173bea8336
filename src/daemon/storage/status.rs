use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

use super::document::JsonDocument;

pub const STATUS_FILE: &str = "daemon.json";

/// Heartbeat written by the daemon while it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub pid: u32,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub last_flush: Option<DateTime<Utc>>,
    pub mouse_tracking: bool,
    pub inertia: bool,
    /// Binary of the daemon that wrote the status.
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

impl DaemonStatus {
    pub fn new(pid: u32, now: DateTime<Utc>) -> Self {
        Self {
            pid,
            version: env!("CARGO_PKG_VERSION").into(),
            started_at: now,
            heartbeat_at: now,
            last_flush: None,
            mouse_tracking: false,
            inertia: false,
            executable: std::env::current_exe().ok(),
        }
    }

    /// Whether the recorded pid still runs the binary that wrote this status. A reused pid of any
    /// other program, the typtel CLI included, doesn't count.
    pub fn is_alive(&self) -> bool {
        self.executable
            .as_deref()
            .is_some_and(|executable| is_running(self.pid, executable))
    }

    /// A heartbeat older than `max_age` means the daemon died without cleaning up.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.heartbeat_at <= max_age
    }
}

#[derive(Debug, Clone)]
pub struct StatusStore {
    document: JsonDocument,
}

impl StatusStore {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            document: JsonDocument::new(app_dir.join(STATUS_FILE)),
        }
    }

    pub async fn load(&self) -> Option<DaemonStatus> {
        self.document.read().await
    }

    pub async fn save(&self, status: &DaemonStatus) -> Result<()> {
        self.document.write(status).await
    }

    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(self.document.path()).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether `pid` is a process started from `executable`.
pub fn is_running(pid: u32, executable: &Path) -> bool {
    let system = System::new_all();
    system
        .process(Pid::from_u32(pid))
        .and_then(|process| process.exe())
        .is_some_and(|exe| same_file(exe, executable))
}

fn same_file(left: &Path, right: &Path) -> bool {
    if left == right {
        return true;
    }
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

const APPLICATION_DIR: &str = "typtel";

/// Resolves the data directory: `$XDG_DATA_HOME/typtel`, falling back to
/// `$HOME/.local/share/typtel`. On Windows `%APPDATA%\typtel` is used.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = base_data_dir()?;
    path.push(APPLICATION_DIR);
    ensure_dir(path)
}

/// Uses `dir` when given, otherwise the default location.
pub fn resolve_application_path(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => ensure_dir(dir),
        None => create_application_default_path(),
    }
}

#[cfg(windows)]
fn base_data_dir() -> Result<PathBuf> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("APPDATA should be present on Windows"))
}

#[cfg(not(windows))]
fn base_data_dir() -> Result<PathBuf> {
    env::var("XDG_DATA_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var("HOME").ok().map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/share");
                path
            })
        })
        .ok_or_else(|| anyhow!("Couldn't find neither XDG_DATA_HOME nor HOME"))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

use std::fmt::Write;

use anyhow::{anyhow, Result};
use chrono::{Duration, Local, Utc};
use clap::Subcommand;

use crate::daemon::storage::{
    odometer::OdometerSession,
    settings::Settings,
    status::DaemonStatus,
};

use super::{output::format::{format_absolute, format_distance}, AppContext};

/// A heartbeat older than this means the daemon is gone.
const HEARTBEAT_MAX_AGE: Duration = Duration::seconds(10);

#[derive(Subcommand, Debug)]
pub enum OdometerAction {
    Start,
    Stop,
    Reset,
    Status,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    #[command(about = "Print every setting")]
    Show,
    #[command(about = "Print one setting, e.g. `inertia.max_speed`")]
    Get { key: String },
    #[command(about = "Change one setting, e.g. `set distance_unit cars`")]
    Set { key: String, value: String },
}

pub async fn process_odometer_command(context: &AppContext, action: OdometerAction) -> Result<()> {
    let store = context.odometer();
    let now = Utc::now();
    let session = match action {
        OdometerAction::Start => {
            store
                .update(|session| {
                    session.start(now);
                    true
                })
                .await?
        }
        OdometerAction::Stop => {
            store
                .update(|session| {
                    session.stop();
                    true
                })
                .await?
        }
        OdometerAction::Reset => {
            store
                .update(|session| {
                    session.reset(now);
                    true
                })
                .await?
        }
        OdometerAction::Status => store.load().await,
    };
    let settings = context.settings().load().await;
    print!("{}", render_odometer(&session, &settings));
    Ok(())
}

pub fn render_odometer(session: &OdometerSession, settings: &Settings) -> String {
    let mut out = String::new();
    let state = if session.active { "Active" } else { "Inactive" };
    let _ = writeln!(out, "Odometer: {state} (toggle with {})", settings.odometer_hotkey.label());
    if let Some(started) = session.started_at {
        let _ = writeln!(
            out,
            "Since:      {}",
            started.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    let _ = writeln!(out, "Keystrokes: {}", format_absolute(session.keystrokes));
    let _ = writeln!(out, "Words:      {}", format_absolute(session.words));
    let _ = writeln!(out, "Clicks:     {}", format_absolute(session.clicks));
    let _ = writeln!(
        out,
        "Distance:   {}",
        format_distance(session.distance, settings.distance_unit, settings.pixels_per_inch)
    );
    out
}

pub async fn process_settings_command(context: &AppContext, action: SettingsAction) -> Result<()> {
    let store = context.settings();
    match action {
        SettingsAction::Show => {
            let settings = store.load().await;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Get { key } => {
            let value = store
                .load()
                .await
                .get(&key)?
                .ok_or_else(|| anyhow!("Unknown setting {key}"))?;
            println!("{value}");
        }
        SettingsAction::Set { key, value } => {
            let updated = store.set(&key, &value).await?;
            if let Some(value) = updated.get(&key)? {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

pub async fn print_status(context: &AppContext) -> Result<()> {
    let status = context.status().load().await;
    let alive = status.as_ref().is_some_and(DaemonStatus::is_alive);
    print!("{}", render_status(status.as_ref(), alive, Utc::now()));
    Ok(())
}

fn render_status(status: Option<&DaemonStatus>, alive: bool, now: chrono::DateTime<Utc>) -> String {
    let Some(status) = status.filter(|_| alive) else {
        return "Daemon is not running. Start it with `typtel init`\n".into();
    };
    let mut out = String::new();
    let _ = writeln!(out, "Daemon is running (pid {}, v{})", status.pid, status.version);
    if !status.is_fresh(now, HEARTBEAT_MAX_AGE) {
        let _ = writeln!(out, "Warning: no heartbeat since {}", local_time(status.heartbeat_at));
    }
    let _ = writeln!(out, "Started:        {}", local_time(status.started_at));
    let _ = writeln!(
        out,
        "Last flush:     {}",
        status
            .last_flush
            .map(local_time)
            .unwrap_or_else(|| "never".into())
    );
    let _ = writeln!(out, "Mouse tracking: {}", on_off(status.mouse_tracking));
    let _ = writeln!(out, "Inertia:        {}", on_off(status.inertia));
    out
}

fn local_time(time: chrono::DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

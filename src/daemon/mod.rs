use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use collection::{
    collector::DataCollectionModule,
    listener::{spawn_listener, ListenerHandle},
};
use inertia::InertiaEngine;
use processing::{aggregator::Aggregator, ProcessingModule};
use storage::{
    odometer::OdometerStore,
    record_event::RecordEvent,
    record_storage::RecordStorageImpl,
    settings::{Settings, SettingsStore},
    status::{DaemonStatus, StatusStore},
    RECORDS_DIR,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    input_api::{GenericInputSource, GenericKeySink, InputEvent, InputSource, PERMISSION_HINT},
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod collection;
pub mod inertia;
pub mod processing;
pub mod shutdown;
pub mod storage;

const RAW_CHANNEL_CAPACITY: usize = 4096;
const RECORD_CHANNEL_CAPACITY: usize = 1024;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    let status_store = StatusStore::new(&dir);
    ensure_single_instance(&status_store).await?;

    let source = GenericInputSource::new()?;
    let inertia = GenericKeySink::new()
        .inspect_err(|e| warn!("Key repeat emulation is unavailable {e:?}"))
        .ok()
        .map(|sink| InertiaEngine::new(Arc::new(sink)));

    let shutdown_token = CancellationToken::new();
    let outcome = run_pipeline(dir, Box::new(source), inertia, &shutdown_token, DefaultClock).await?;

    match outcome {
        Some(Err(e)) => Err(e.context(PERMISSION_HINT)),
        _ => Ok(()),
    }
}

/// Refuses to start when `daemon.json` names another live daemon of this binary.
async fn ensure_single_instance(status_store: &StatusStore) -> Result<()> {
    let Some(status) = status_store.load().await else {
        return Ok(());
    };
    if status.pid != std::process::id() && status.is_alive() {
        bail!("Daemon is already running with pid {}", status.pid);
    }
    info!("Found a stale status file of pid {}", status.pid);
    Ok(())
}

/// Wires the listener, collector, aggregator and heartbeat together and runs them until shutdown.
/// Returns the listener outcome if the OS hook has already stopped.
async fn run_pipeline(
    dir: PathBuf,
    source: Box<dyn InputSource>,
    inertia: Option<InertiaEngine>,
    shutdown_token: &CancellationToken,
    clock: impl Clock + Clone,
) -> Result<Option<Result<()>>> {
    let settings_store = SettingsStore::new(&dir);
    let status_store = StatusStore::new(&dir);
    let settings = settings_store.load().await;
    let (settings_sender, settings_receiver) = watch::channel(settings.clone());
    let odometer = OdometerStore::new(&dir);

    let ListenerHandle {
        events,
        mut outcome,
    } = spawn_listener(source, RAW_CHANNEL_CAPACITY)?;

    let (sender, receiver) = mpsc::channel::<RecordEvent>(RECORD_CHANNEL_CAPACITY);
    let inertia_available = inertia.is_some();
    let collector = create_collector(
        events,
        sender,
        shutdown_token,
        settings_receiver,
        odometer.clone(),
        inertia,
        clock.clone(),
    );

    let flush_interval = Duration::from_millis(settings.flush_interval_ms);
    let (processor, last_flush) = create_processor(
        dir.join(RECORDS_DIR),
        receiver,
        odometer,
        flush_interval,
        clock.clone(),
    )?;

    let heartbeat = Heartbeat {
        settings_store,
        settings_sender,
        status_store: status_store.clone(),
        status: DaemonStatus::new(std::process::id(), clock.time()),
        last_flush,
        inertia_available,
    };

    info!("Daemon started in {:?}", dir);
    let (_, collection_result, processing_result, _) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        collector.run(),
        processor.run(),
        heartbeat.run(shutdown_token, clock),
    );

    if let Err(collection_result) = collection_result {
        error!("Collection module got an error {:?}", collection_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    if let Err(e) = status_store.remove().await {
        error!("Failed to remove status file {e:?}");
    }
    info!("Daemon stopped");

    Ok(outcome.try_recv().ok())
}

fn create_collector(
    raw: mpsc::Receiver<InputEvent>,
    sender: mpsc::Sender<RecordEvent>,
    shutdown_token: &CancellationToken,
    settings: watch::Receiver<Settings>,
    odometer: OdometerStore,
    inertia: Option<InertiaEngine>,
    clock: impl Clock,
) -> DataCollectionModule {
    DataCollectionModule::new(
        raw,
        sender,
        shutdown_token.clone(),
        settings,
        odometer,
        inertia,
        Box::new(clock),
    )
}

type LastFlush = watch::Receiver<Option<DateTime<Utc>>>;

fn create_processor(
    record_dir: PathBuf,
    receiver: mpsc::Receiver<RecordEvent>,
    odometer: OdometerStore,
    flush_interval: Duration,
    clock: impl Clock,
) -> Result<(ProcessingModule<Aggregator<RecordStorageImpl>>, LastFlush)> {
    let storage = RecordStorageImpl::new(record_dir)?;
    let aggregator = Aggregator::new(storage, odometer, Box::new(clock));
    let last_flush = aggregator.last_flush();
    Ok((
        ProcessingModule::new(receiver, aggregator, flush_interval),
        last_flush,
    ))
}

/// Re-reads `settings.json` so that changes made by the clients reach the collector, and keeps
/// `daemon.json` current.
struct Heartbeat {
    settings_store: SettingsStore,
    settings_sender: watch::Sender<Settings>,
    status_store: StatusStore,
    status: DaemonStatus,
    last_flush: LastFlush,
    inertia_available: bool,
}

impl Heartbeat {
    async fn run(mut self, shutdown: &CancellationToken, clock: impl Clock) {
        loop {
            self.beat(clock.time()).await;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = clock.sleep(HEARTBEAT_INTERVAL) => {}
            }
        }
    }

    async fn beat(&mut self, now: DateTime<Utc>) {
        let settings = self.settings_store.load().await;
        self.status.heartbeat_at = now;
        self.status.last_flush = *self.last_flush.borrow();
        self.status.mouse_tracking = settings.mouse_tracking;
        self.status.inertia = self.inertia_available && settings.inertia.enabled;

        let changed = self.settings_sender.send_if_modified(|current| {
            if *current == settings {
                return false;
            }
            *current = settings;
            true
        });
        if changed {
            info!("Settings reloaded");
        }

        if let Err(e) = self.status_store.save(&self.status).await {
            error!("Failed to write daemon status {e:?}");
        }
    }
}

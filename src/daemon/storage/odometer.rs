use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{document::JsonDocument, entities::CountersEntity};

pub const ODOMETER_FILE: &str = "odometer.json";

/// A user controlled session counter.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometerSession {
    pub active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub keystrokes: u64,
    pub words: u64,
    pub clicks: u64,
    /// Pixels.
    pub distance: f64,
}

impl OdometerSession {
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.active = true;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = OdometerSession {
            active: self.active,
            started_at: self.active.then_some(now),
            ..Default::default()
        };
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) {
        if self.active {
            self.stop()
        } else {
            self.start(now)
        }
    }

    /// Adds counters if the session is running. Returns whether anything was added.
    pub fn accumulate(&mut self, counters: &CountersEntity) -> bool {
        if !self.active {
            return false;
        }
        self.keystrokes += counters.keystrokes;
        self.words += counters.words;
        self.clicks += counters.clicks;
        self.distance += counters.distance;
        true
    }
}

/// `odometer.json` in the data directory. Both the CLI and the daemon update it, every update is a
/// locked read-modify-write of the whole document.
#[derive(Debug, Clone)]
pub struct OdometerStore {
    document: JsonDocument,
}

impl OdometerStore {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            document: JsonDocument::new(app_dir.join(ODOMETER_FILE)),
        }
    }

    pub async fn load(&self) -> OdometerSession {
        self.document.read().await.unwrap_or_default()
    }

    pub async fn update(
        &self,
        change: impl FnOnce(&mut OdometerSession) -> bool,
    ) -> Result<OdometerSession> {
        self.document.update(|session| Ok(change(session))).await
    }

    pub async fn accumulate(&self, counters: &CountersEntity) -> Result<()> {
        self.update(|session| session.accumulate(counters)).await?;
        Ok(())
    }

    pub async fn toggle(&self, now: DateTime<Utc>) -> Result<OdometerSession> {
        let session = self
            .update(|session| {
                session.toggle(now);
                true
            })
            .await?;
        info!("Odometer toggled, active: {}", session.active);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{daemon::storage::entities::CountersEntity, input_api::keys::KeyClass};

    use super::*;

    fn counters() -> CountersEntity {
        let mut counters = CountersEntity::default();
        counters.record_keystroke(KeyClass::Letter);
        counters.record_keystroke(KeyClass::Special);
        counters.record_word();
        counters.record_click();
        counters.record_movement(120.);
        counters
    }

    #[test]
    fn session_lifecycle() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let mut session = OdometerSession::default();
        assert!(!session.accumulate(&counters()));

        session.start(start);
        assert!(session.accumulate(&counters()));
        session.start(start + Duration::hours(1));
        assert_eq!(session.started_at, Some(start));
        assert_eq!(session.keystrokes, 2);
        assert_eq!(session.words, 1);
        assert_eq!(session.distance, 120.);

        session.stop();
        assert!(!session.accumulate(&counters()));
        assert_eq!(session.keystrokes, 2);

        session.reset(start);
        assert_eq!(session.keystrokes, 0);
        assert_eq!(session.started_at, None);

        session.start(start);
        session.reset(start + Duration::minutes(5));
        assert!(session.active);
        assert_eq!(session.started_at, Some(start + Duration::minutes(5)));
    }

    #[tokio::test]
    async fn store_persists_accumulation() -> Result<()> {
        let dir = tempdir()?;
        let store = OdometerStore::new(dir.path());
        let now = Utc::now();

        store.accumulate(&counters()).await?;
        assert_eq!(store.load().await.keystrokes, 0);

        assert!(store.toggle(now).await?.active);
        store.accumulate(&counters()).await?;
        store.accumulate(&counters()).await?;
        let session = store.load().await;
        assert_eq!(session.keystrokes, 4);
        assert_eq!(session.clicks, 2);

        assert!(!store.toggle(now).await?.active);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_accumulation_is_not_lost() -> Result<()> {
        let dir = tempdir()?;
        let store = OdometerStore::new(dir.path());
        store.toggle(Utc::now()).await?;

        let mut keystroke = CountersEntity::default();
        keystroke.record_keystroke(KeyClass::Letter);
        let tasks = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.accumulate(&keystroke).await })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await??;
        }

        assert_eq!(store.load().await.keystrokes, 50);
        Ok(())
    }
}

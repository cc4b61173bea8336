use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{
    daemon::storage::{
        entities::{CountersEntity, HourDeltaEntity},
        odometer::OdometerStore,
        record_event::RecordEvent,
        record_storage::{RecordFileHandle, RecordStorage},
    },
    utils::clock::Clock,
};

use super::module::EventProcessor;

type Bucket = (NaiveDate, u8);

/// Bridges [ProcessingModule](super::ProcessingModule) and [RecordStorage]. Telemetry is summed
/// per local (date, hour) in memory and written out when the hour changes, on every flush tick
/// and on shutdown. Buckets that fail to be written stay pending and are retried.
pub struct Aggregator<R: RecordStorage> {
    records_storage: R,
    current_handle: Option<R::RecordFile>,
    pending: BTreeMap<Bucket, CountersEntity>,
    odometer: OdometerStore,
    date_provider: Box<dyn Clock>,
    last_flush: watch::Sender<Option<DateTime<Utc>>>,
}

impl<R: RecordStorage> Aggregator<R> {
    pub fn new(records_storage: R, odometer: OdometerStore, date_provider: Box<dyn Clock>) -> Self {
        Self {
            records_storage,
            current_handle: None,
            pending: BTreeMap::new(),
            odometer,
            date_provider,
            last_flush: watch::Sender::new(None),
        }
    }

    /// Time of the last successful write.
    pub fn last_flush(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_flush.subscribe()
    }

    async fn move_file_handle(&mut self, date: NaiveDate) -> Result<R::RecordFile> {
        match self.current_handle.take() {
            Some(file) if file.get_date() == date => return Ok(file),
            Some(mut file) => file.flush().await?,
            None => {}
        };
        self.records_storage.create_or_append_record(date).await
    }

    /// Writes every pending bucket except `keep`.
    async fn flush(&mut self, keep: Option<Bucket>) -> Result<()> {
        let ready: Vec<Bucket> = self
            .pending
            .keys()
            .filter(|bucket| Some(**bucket) != keep)
            .copied()
            .collect();
        if ready.is_empty() {
            return Ok(());
        }

        let mut dates: Vec<NaiveDate> = ready.iter().map(|(date, _)| *date).collect();
        dates.dedup();

        for date in dates {
            let buckets: Vec<Bucket> = ready.iter().filter(|(d, _)| *d == date).copied().collect();
            let deltas: Vec<HourDeltaEntity> = buckets
                .iter()
                .filter_map(|bucket| {
                    let counters = self.pending.get(bucket)?;
                    Some(HourDeltaEntity::new(bucket.1, *counters))
                })
                .collect();

            let mut handle = self.move_file_handle(date).await?;
            let result = handle.append(deltas).await;
            self.current_handle = Some(handle);
            result?;

            let mut written = CountersEntity::default();
            for bucket in &buckets {
                if let Some(counters) = self.pending.remove(bucket) {
                    written += &counters;
                }
            }
            debug!("Flushed {} hour buckets of {date}", buckets.len());

            if let Err(e) = self.odometer.accumulate(&written).await {
                error!("Failed to update odometer {e:?}");
            }
        }

        self.last_flush.send_replace(Some(self.date_provider.time()));
        Ok(())
    }
}

impl<R: RecordStorage> EventProcessor for Aggregator<R> {
    async fn process_next(&mut self, message: RecordEvent) -> Result<()> {
        let bucket = message.bucket();
        message.apply_to(self.pending.entry(bucket).or_default());

        if self.pending.len() > 1 {
            self.flush(Some(bucket)).await?;
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        self.flush(None).await
    }

    async fn finalize(&mut self) -> Result<()> {
        self.flush(None).await?;
        if let Some(v) = self.current_handle.as_mut() {
            v.flush().await?;
        }
        info!("Aggregator finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future::Future,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use anyhow::{anyhow, Result};
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
    use tempfile::tempdir;

    use crate::{
        daemon::{
            processing::module::EventProcessor,
            storage::{
                entities::DayRecord,
                odometer::OdometerStore,
                record_event::{RecordEvent, TelemetryEvent},
                record_storage::{RecordStorage, RecordStorageImpl},
            },
        },
        input_api::keys::KeyClass,
        utils::{
            clock::{test_clock::FixedClock, Clock},
            logging::TEST_LOGGING,
        },
    };

    use super::Aggregator;

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(10, 15, 0).unwrap(),
    );

    fn letter(clock: &FixedClock) -> RecordEvent {
        RecordEvent::new(
            TelemetryEvent::Keystroke {
                class: KeyClass::Letter,
                word_boundary: false,
            },
            clock.time(),
        )
    }

    #[tokio::test]
    async fn hour_change_flushes_previous_bucket() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().join("records"))?;
        let clock = FixedClock::at_local(TEST_START_DATE);
        let mut aggregator = Aggregator::new(
            storage,
            OdometerStore::new(dir.path()),
            Box::new(clock.clone()),
        );

        aggregator.process_next(letter(&clock)).await?;
        clock.advance(Duration::minutes(10));
        aggregator.process_next(letter(&clock)).await?;

        let reader = RecordStorageImpl::new(dir.path().join("records"))?;
        assert_eq!(reader.get_data_for(TEST_START_DATE.date()).await?.totals().keystrokes, 0);

        clock.advance(Duration::hours(1));
        aggregator.process_next(letter(&clock)).await?;
        let day = reader.get_data_for(TEST_START_DATE.date()).await?;
        assert_eq!(day.hours[10].keystrokes, 2);
        assert_eq!(day.hours[11].keystrokes, 0);
        assert!(aggregator.last_flush().borrow().is_some());

        aggregator.finalize().await?;
        let day = reader.get_data_for(TEST_START_DATE.date()).await?;
        assert_eq!(day.hours[11].keystrokes, 1);
        Ok(())
    }

    #[tokio::test]
    async fn tick_flushes_and_feeds_odometer() -> Result<()> {
        let dir = tempdir()?;
        let storage = RecordStorageImpl::new(dir.path().join("records"))?;
        let clock = FixedClock::at_local(TEST_START_DATE);
        let odometer = OdometerStore::new(dir.path());
        odometer.toggle(clock.time()).await?;
        let mut aggregator = Aggregator::new(storage, odometer.clone(), Box::new(clock.clone()));

        aggregator.process_next(letter(&clock)).await?;
        aggregator
            .process_next(RecordEvent::new(
                TelemetryEvent::MouseMove { distance: 12.5 },
                clock.time(),
            ))
            .await?;
        aggregator.tick().await?;
        aggregator.tick().await?;

        let reader = RecordStorageImpl::new(dir.path().join("records"))?;
        let day = reader.get_data_for(TEST_START_DATE.date()).await?;
        assert_eq!(day.hours[10].keystrokes, 1);
        assert_eq!(day.hours[10].distance, 12.5);
        assert_eq!(day.hours[10].movements, 1);

        let session = odometer.load().await;
        assert_eq!(session.keystrokes, 1);
        assert_eq!(session.distance, 12.5);
        Ok(())
    }

    /// Fails the first `failures` attempts to open a file.
    struct FlakyStorage {
        inner: RecordStorageImpl,
        failures: AtomicUsize,
    }

    impl RecordStorage for FlakyStorage {
        type RecordFile = <RecordStorageImpl as RecordStorage>::RecordFile;

        fn create_or_append_record(
            &self,
            date: NaiveDate,
        ) -> impl Future<Output = Result<Self::RecordFile>> {
            let fail = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
                .is_ok();
            async move {
                if fail {
                    Err(anyhow!("disk unavailable"))
                } else {
                    self.inner.create_or_append_record(date).await
                }
            }
        }

        fn get_data_for(&self, date: NaiveDate) -> impl Future<Output = Result<DayRecord>> + Send {
            self.inner.get_data_for(date)
        }

        fn recorded_days(&self) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send {
            self.inner.recorded_days()
        }
    }

    #[tokio::test]
    async fn failed_writes_are_retried() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = FlakyStorage {
            inner: RecordStorageImpl::new(dir.path().join("records"))?,
            failures: AtomicUsize::new(1),
        };
        let clock = FixedClock::at_local(TEST_START_DATE);
        let mut aggregator = Aggregator::new(
            storage,
            OdometerStore::new(dir.path()),
            Box::new(clock.clone()),
        );

        aggregator.process_next(letter(&clock)).await?;
        assert!(aggregator.tick().await.is_err());
        aggregator.process_next(letter(&clock)).await?;
        aggregator.tick().await?;

        let reader = RecordStorageImpl::new(dir.path().join("records"))?;
        let day = reader.get_data_for(TEST_START_DATE.date()).await?;
        assert_eq!(day.hours[10].keystrokes, 2);
        Ok(())
    }
}

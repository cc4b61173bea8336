use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::time::Instant;

/// Source of time for the daemon and the stat queries. Swapped for a fixed clock in tests so that
/// "today" and hour buckets are deterministic.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);

    fn local_time(&self) -> DateTime<Local> {
        self.time().with_timezone(&Local)
    }

    /// Local date used for day files.
    fn today(&self) -> NaiveDate {
        self.local_time().date_naive()
    }
}

#[derive(Clone, Copy)]
pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

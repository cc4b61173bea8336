use anyhow::Result;

use crate::daemon::storage::record_event::RecordEvent;

/// Represents an event processor. Events are handed over one by one, `tick` is called
/// periodically so that buffered state can be written out, `finalize` once on shutdown.
pub trait EventProcessor {
    fn process_next(&mut self, message: RecordEvent) -> impl std::future::Future<Output = Result<()>>;

    fn tick(&mut self) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}

pub mod format;
pub mod stats;

use std::{future, sync::Arc};

use anyhow::Result;
use chrono::NaiveDate;
use futures::{stream, Stream, StreamExt};
use tracing::error;

use crate::daemon::storage::{entities::DayRecord, record_storage::RecordStorage};

/// Reads every day between `start` and `end` (both inclusive). Files are read a few at a time,
/// results come out in date order.
pub fn extract_days<R>(
    storage: Arc<R>,
    start: NaiveDate,
    end: NaiveDate,
) -> impl Stream<Item = Result<DayRecord>>
where
    R: RecordStorage + Send + Sync + 'static,
{
    date_range(start, end)
        .map(move |day| {
            let storage = storage.clone();
            async move {
                storage
                    .get_data_for(day)
                    .await
                    .inspect_err(|e| error!("Failed to read records of {day} {e}"))
            }
        })
        .buffered(4)
}

/// Returns a stream of dates between start (inclusive) and end (inclusive).
fn date_range(start: NaiveDate, end: NaiveDate) -> impl Stream<Item = NaiveDate> {
    stream::unfold(Some(start), move |current| {
        future::ready(match current {
            Some(day) if day <= end => Some((day, day.succ_opt())),
            _ => None,
        })
    })
}

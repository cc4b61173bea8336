use std::time::Duration;

use anyhow::Result;
use module::EventProcessor;
use tokio::{sync::mpsc::Receiver, time::MissedTickBehavior};
use tracing::{debug, error, trace};

use super::storage::record_event::RecordEvent;

pub mod aggregator;
pub mod module;

/// Receives telemetry from the collector and hands it to a [EventProcessor]. Besides the events it
/// drives a flush timer.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<RecordEvent>,
    processor: Processor,
    flush_interval: Duration,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<RecordEvent>, processor: P, flush_interval: Duration) -> Self {
        Self {
            receiver,
            processor,
            flush_interval,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                record = self.receiver.recv() => {
                    let Some(record) = record else { break };
                    trace!("Processing event {:?}", record);
                    if let Err(e) = self.processor.process_next(record).await {
                        error!("Error processing event {:?}: {e:?}", record)
                    }
                }
                _ = ticker.tick() => {
                    debug!("Flush tick");
                    if let Err(e) = self.processor.tick().await {
                        error!("Error during periodic flush {e:?}")
                    }
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}

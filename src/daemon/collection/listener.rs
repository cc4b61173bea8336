use anyhow::Result;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tracing::{error, warn};

use crate::input_api::{EventSink, InputEvent, InputSource};

/// Raw events flowing out of the OS hook thread plus the hook's final outcome.
pub struct ListenerHandle {
    pub events: mpsc::Receiver<InputEvent>,
    pub outcome: oneshot::Receiver<Result<()>>,
}

/// Runs `source` on a dedicated thread. The hook callback never blocks: when the channel is full
/// events are dropped.
pub fn spawn_listener(mut source: Box<dyn InputSource>, capacity: usize) -> Result<ListenerHandle> {
    let (sender, events) = mpsc::channel(capacity);
    let (outcome_sender, outcome) = oneshot::channel();

    std::thread::Builder::new()
        .name("typtel-input".into())
        .spawn(move || {
            // Holds the channel open until the outcome is delivered.
            let keep_open = sender.clone();
            let mut dropped = 0u64;
            let sink: EventSink = Box::new(move |event| match sender.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    if dropped % 1000 == 1 {
                        warn!("Event channel is full, {dropped} events dropped so far");
                    }
                }
                Err(TrySendError::Closed(_)) => {}
            });
            let result = source.listen(sink);
            if let Err(e) = &result {
                error!("Input listener stopped {e:?}");
            }
            let _ = outcome_sender.send(result);
            drop(keep_open);
        })?;

    Ok(ListenerHandle { events, outcome })
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};

    use crate::input_api::{keys::Key, InputEvent, MockInputSource};

    use super::spawn_listener;

    #[tokio::test]
    async fn events_are_forwarded_until_the_source_returns() -> Result<()> {
        let mut source = MockInputSource::new();
        source.expect_listen().times(1).returning(|mut sink| {
            sink(InputEvent::KeyPress(Key::Letter('a')));
            sink(InputEvent::ButtonPress);
            Ok(())
        });

        let mut handle = spawn_listener(Box::new(source), 8)?;
        let mut received = vec![];
        while let Some(event) = handle.events.recv().await {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![InputEvent::KeyPress(Key::Letter('a')), InputEvent::ButtonPress]
        );
        handle.outcome.await??;
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_reported() -> Result<()> {
        let mut source = MockInputSource::new();
        source
            .expect_listen()
            .returning(|_| Err(anyhow!("permission denied")));

        let mut handle = spawn_listener(Box::new(source), 8)?;
        assert!(handle.events.recv().await.is_none());
        assert!(handle.outcome.await?.is_err());
        Ok(())
    }
}

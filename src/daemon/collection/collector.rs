use std::collections::HashSet;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace_span, warn, Instrument};

use crate::{
    daemon::{
        inertia::InertiaEngine,
        storage::{
            odometer::OdometerStore,
            record_event::{RecordEvent, TelemetryEvent},
            settings::Settings,
        },
    },
    input_api::{keys::Key, InputEvent},
    utils::clock::Clock,
};

use super::{hotkey::HotkeyDetector, mouse::MouseTracker};

/// Turns raw OS events into [RecordEvent]s and forwards them to the processing module.
pub struct DataCollectionModule {
    raw: mpsc::Receiver<InputEvent>,
    next: mpsc::Sender<RecordEvent>,
    shutdown: CancellationToken,
    settings: watch::Receiver<Settings>,
    odometer: OdometerStore,
    inertia: Option<InertiaEngine>,
    time_provider: Box<dyn Clock>,
    held_keys: HashSet<Key>,
    hotkey: HotkeyDetector,
    mouse: MouseTracker,
}

impl DataCollectionModule {
    pub fn new(
        raw: mpsc::Receiver<InputEvent>,
        next: mpsc::Sender<RecordEvent>,
        shutdown: CancellationToken,
        settings: watch::Receiver<Settings>,
        odometer: OdometerStore,
        inertia: Option<InertiaEngine>,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            raw,
            next,
            shutdown,
            settings,
            odometer,
            inertia,
            time_provider,
            held_keys: HashSet::new(),
            hotkey: HotkeyDetector::default(),
            mouse: MouseTracker::default(),
        }
    }

    /// Handles one raw event. Returns the telemetry it produced, if any.
    async fn collect(&mut self, event: InputEvent) -> Option<TelemetryEvent> {
        let settings = self.settings.borrow().clone();
        match event {
            InputEvent::KeyPress(key) => {
                // The OS reports held keys repeatedly, those presses don't count.
                if !self.held_keys.insert(key) {
                    return None;
                }
                if self.hotkey.on_press(key, settings.odometer_hotkey) {
                    if let Err(e) = self.odometer.toggle(self.time_provider.time()).await {
                        error!("Failed to toggle odometer {e:?}");
                    }
                    return None;
                }
                if let Some(inertia) = self.inertia.as_mut() {
                    inertia.on_press(key, &settings.inertia);
                }
                Some(TelemetryEvent::Keystroke {
                    class: key.class(),
                    word_boundary: key.is_word_boundary(),
                })
            }
            InputEvent::KeyRelease(key) => {
                self.held_keys.remove(&key);
                if let Some(inertia) = self.inertia.as_mut() {
                    inertia.on_release(key, self.time_provider.instant());
                }
                None
            }
            InputEvent::ButtonPress if settings.mouse_tracking => Some(TelemetryEvent::MouseClick),
            InputEvent::MouseMove { x, y } if settings.mouse_tracking => {
                let today = self.time_provider.today();
                self.mouse
                    .move_to(x, y, today)
                    .map(|distance| TelemetryEvent::MouseMove { distance })
            }
            InputEvent::ButtonPress | InputEvent::MouseMove { .. } => {
                self.mouse.reset();
                None
            }
        }
    }

    /// Executes the collector event loop. Ends on shutdown or when the OS hook goes away, in the
    /// latter case the rest of the daemon is asked to shut down too.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let event = tokio::select! {
                // Dropping self also drops the sender, which lets the processing module drain
                // and finish.
                _ = self.shutdown.cancelled() => {
                    info!("Collector shutting down");
                    return Ok(())
                }
                event = self.raw.recv() => event,
            };

            let Some(event) = event else {
                warn!("Input listener closed its channel");
                self.shutdown.cancel();
                return Ok(());
            };

            if let Some(telemetry) = self.collect(event).await {
                let record = RecordEvent::new(telemetry, self.time_provider.time());
                let span = trace_span!("Sending telemetry");
                debug!("Sending message {:?}", record);
                self.next
                    .send(record)
                    .instrument(span)
                    .await
                    .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use tempfile::tempdir;
    use tokio::sync::{mpsc, watch};
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::storage::{
            odometer::OdometerStore,
            record_event::{RecordEvent, TelemetryEvent},
            settings::{OdometerHotkey, Settings},
        },
        input_api::{
            keys::{Key, KeyClass, ModifierKey},
            InputEvent,
        },
        utils::{clock::test_clock::FixedClock, logging::TEST_LOGGING},
    };

    use super::DataCollectionModule;

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );

    async fn collect_all(
        events: Vec<InputEvent>,
        settings: Settings,
        odometer: OdometerStore,
    ) -> Result<Vec<TelemetryEvent>> {
        let (raw_sender, raw) = mpsc::channel(64);
        let (sender, mut receiver) = mpsc::channel::<RecordEvent>(64);
        let (_settings_sender, settings) = watch::channel(settings);
        let shutdown = CancellationToken::new();

        for event in events {
            raw_sender.send(event).await?;
        }
        drop(raw_sender);

        let collector = DataCollectionModule::new(
            raw,
            sender,
            shutdown.clone(),
            settings,
            odometer,
            None,
            Box::new(FixedClock::at_local(TEST_START_DATE)),
        );
        collector.run().await?;
        assert!(shutdown.is_cancelled());

        let mut collected = vec![];
        while let Some(record) = receiver.recv().await {
            collected.push(record.event);
        }
        Ok(collected)
    }

    fn press(key: Key) -> [InputEvent; 2] {
        [InputEvent::KeyPress(key), InputEvent::KeyRelease(key)]
    }

    #[tokio::test]
    async fn keystrokes_are_classified_once_per_press() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let mut events = vec![
            InputEvent::KeyPress(Key::Letter('a')),
            InputEvent::KeyPress(Key::Letter('a')),
            InputEvent::KeyPress(Key::Letter('a')),
            InputEvent::KeyRelease(Key::Letter('a')),
        ];
        events.extend(press(Key::Modifier(ModifierKey::Shift)));
        events.extend(press(Key::Space));

        let collected = collect_all(events, Settings::default(), OdometerStore::new(dir.path())).await?;
        assert_eq!(
            collected,
            vec![
                TelemetryEvent::Keystroke {
                    class: KeyClass::Letter,
                    word_boundary: false
                },
                TelemetryEvent::Keystroke {
                    class: KeyClass::Modifier,
                    word_boundary: false
                },
                TelemetryEvent::Keystroke {
                    class: KeyClass::Special,
                    word_boundary: true
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn mouse_events_respect_tracking_setting() -> Result<()> {
        let dir = tempdir()?;
        let events = vec![
            InputEvent::MouseMove { x: 0., y: 0. },
            InputEvent::MouseMove { x: 3., y: 4. },
            InputEvent::ButtonPress,
        ];

        let collected = collect_all(
            events.clone(),
            Settings::default(),
            OdometerStore::new(dir.path()),
        )
        .await?;
        assert_eq!(
            collected,
            vec![
                TelemetryEvent::MouseMove { distance: 5. },
                TelemetryEvent::MouseClick
            ]
        );

        let settings = Settings {
            mouse_tracking: false,
            ..Settings::default()
        };
        let collected = collect_all(events, settings, OdometerStore::new(dir.path())).await?;
        assert!(collected.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn hotkey_toggles_odometer_without_counting() -> Result<()> {
        let dir = tempdir()?;
        let odometer = OdometerStore::new(dir.path());
        let events = vec![
            InputEvent::KeyPress(Key::Modifier(ModifierKey::Command)),
            InputEvent::KeyPress(Key::Modifier(ModifierKey::Control)),
            InputEvent::KeyPress(Key::Letter('o')),
            InputEvent::KeyRelease(Key::Letter('o')),
        ];

        let collected = collect_all(events, Settings::default(), odometer.clone()).await?;
        assert_eq!(collected.len(), 2);
        assert!(collected.iter().all(|event| matches!(
            event,
            TelemetryEvent::Keystroke {
                class: KeyClass::Modifier,
                ..
            }
        )));
        assert!(odometer.load().await.active);
        Ok(())
    }

    #[tokio::test]
    async fn modifier_release_before_o_keeps_the_combination() -> Result<()> {
        let dir = tempdir()?;
        let odometer = OdometerStore::new(dir.path());
        let settings = Settings {
            odometer_hotkey: OdometerHotkey::CmdShiftO,
            ..Settings::default()
        };
        // Both shift keys report as shift, the second one is let go before the O.
        let events = vec![
            InputEvent::KeyPress(Key::Modifier(ModifierKey::Shift)),
            InputEvent::KeyPress(Key::Modifier(ModifierKey::Command)),
            InputEvent::KeyRelease(Key::Modifier(ModifierKey::Shift)),
            InputEvent::KeyPress(Key::Letter('o')),
        ];

        let collected = collect_all(events, settings, odometer.clone()).await?;
        assert_eq!(collected.len(), 2);
        assert!(odometer.load().await.active);
        Ok(())
    }
}

use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};

use crate::input_api::keys::KeyClass;

use super::entities::CountersEntity;

/// Discrete telemetry produced by the collector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    Keystroke { class: KeyClass, word_boundary: bool },
    MouseClick,
    /// Pixels travelled since the previous position.
    MouseMove { distance: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordEvent {
    pub event: TelemetryEvent,
    pub timestamp: DateTime<Utc>,
}

impl RecordEvent {
    pub fn new(event: TelemetryEvent, timestamp: DateTime<Utc>) -> Self {
        Self { event, timestamp }
    }

    /// Local (date, hour) this event is counted in.
    pub fn bucket(&self) -> (NaiveDate, u8) {
        let local = self.timestamp.with_timezone(&Local);
        (local.date_naive(), local.hour() as u8)
    }

    pub fn apply_to(&self, counters: &mut CountersEntity) {
        match self.event {
            TelemetryEvent::Keystroke {
                class,
                word_boundary,
            } => {
                counters.record_keystroke(class);
                if word_boundary {
                    counters.record_word();
                }
            }
            TelemetryEvent::MouseClick => counters.record_click(),
            TelemetryEvent::MouseMove { distance } => counters.record_movement(distance),
        }
    }
}

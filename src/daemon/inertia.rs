//! Accelerating key repeat. While a key is held the daemon synthesizes presses of it at a rate
//! that speeds up the longer the key stays down.
//!
//! The global hook only observes input, it can't swallow the OS auto-repeat. Synthesized presses
//! arrive on top of the native repeats, so the OS repeat should be turned off (or its delay set
//! above `threshold_ms`) while inertia is enabled.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    daemon::storage::settings::{InertiaSettings, MaxSpeed},
    input_api::{
        keys::{Key, ModifierKey},
        KeySink,
    },
};

/// Scaled key counts at which the repeat rate steps up.
pub const ACCELERATION_TABLE: [u32; 8] = [7, 12, 17, 21, 24, 26, 28, 30];

pub const BASE_REPEAT_INTERVAL_MS: u64 = 35;

/// Two shift taps closer than this reset acceleration.
pub const SHIFT_DOUBLE_TAP: Duration = Duration::from_millis(300);

/// Speed step for `key_count` repeats, 1..=9.
pub fn acceleration_step(key_count: u32) -> u32 {
    ACCELERATION_TABLE
        .iter()
        .position(|threshold| *threshold > key_count)
        .map_or(ACCELERATION_TABLE.len() as u32 + 1, |idx| idx as u32 + 1)
}

/// Shortest repeat interval allowed for a speed, in milliseconds.
pub fn max_speed_cap_ms(speed: MaxSpeed) -> u64 {
    match speed {
        MaxSpeed::UltraFast => 7,
        MaxSpeed::VeryFast => 8,
        MaxSpeed::PrettyFast => 10,
        MaxSpeed::Fast => 12,
        MaxSpeed::Medium => 20,
        MaxSpeed::Slow => 50,
    }
}

/// The accel rate only scales how fast the steps are climbed, never the final cap.
pub fn repeat_interval(key_count: u32, settings: &InertiaSettings) -> Duration {
    let rate = settings.accel_rate.max(0.);
    let scaled = (key_count as f64 * rate).floor() as u32;
    let step = acceleration_step(scaled) as u64;
    let interval = BASE_REPEAT_INTERVAL_MS / step;
    Duration::from_millis(interval.max(max_speed_cap_ms(settings.max_speed)))
}

#[derive(Debug, Default)]
pub struct ShiftTapDetector {
    last_tap: Option<Instant>,
    taps: u32,
}

impl ShiftTapDetector {
    /// Registers a shift release. Returns true on a double tap.
    pub fn tap(&mut self, now: Instant) -> bool {
        let quick = self
            .last_tap
            .is_some_and(|last| now.duration_since(last) < SHIFT_DOUBLE_TAP);
        self.last_tap = Some(now);
        if !quick {
            self.taps = 1;
            return false;
        }
        self.taps += 1;
        if self.taps >= 2 {
            self.taps = 0;
            return true;
        }
        false
    }
}

struct ActiveRepeat {
    stop: CancellationToken,
    count: Arc<AtomicU32>,
}

/// Drives one repeat task per held key.
pub struct InertiaEngine {
    sink: Arc<dyn KeySink>,
    repeats: HashMap<Key, ActiveRepeat>,
    shift: ShiftTapDetector,
}

impl InertiaEngine {
    pub fn new(sink: Arc<dyn KeySink>) -> Self {
        Self {
            sink,
            repeats: HashMap::new(),
            shift: ShiftTapDetector::default(),
        }
    }

    pub fn on_press(&mut self, key: Key, settings: &InertiaSettings) {
        if !settings.enabled {
            self.stop_all();
            return;
        }
        if key.modifier().is_some() {
            return;
        }
        self.stop(key);

        let repeat = ActiveRepeat {
            stop: CancellationToken::new(),
            count: Arc::new(AtomicU32::new(0)),
        };
        tokio::spawn(repeat_key(
            self.sink.clone(),
            key,
            settings.clone(),
            repeat.stop.clone(),
            repeat.count.clone(),
        ));
        self.repeats.insert(key, repeat);
    }

    pub fn on_release(&mut self, key: Key, now: Instant) {
        self.stop(key);
        if key == Key::Modifier(ModifierKey::Shift) && self.shift.tap(now) {
            debug!("Shift double tap, resetting acceleration");
            for repeat in self.repeats.values() {
                repeat.count.store(0, Ordering::Relaxed);
            }
        }
    }

    pub fn stop_all(&mut self) {
        for (_, repeat) in self.repeats.drain() {
            repeat.stop.cancel();
        }
    }

    fn stop(&mut self, key: Key) {
        if let Some(repeat) = self.repeats.remove(&key) {
            repeat.stop.cancel();
        }
    }
}

impl Drop for InertiaEngine {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn repeat_key(
    sink: Arc<dyn KeySink>,
    key: Key,
    settings: InertiaSettings,
    stop: CancellationToken,
    count: Arc<AtomicU32>,
) {
    tokio::select! {
        _ = stop.cancelled() => return,
        _ = tokio::time::sleep(Duration::from_millis(settings.threshold_ms)) => (),
    }
    loop {
        let key_count = count.fetch_add(1, Ordering::Relaxed) + 1;
        let interval = repeat_interval(key_count, &settings);
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = tokio::time::sleep(interval) => (),
        }
        if let Err(e) = sink.press(key) {
            warn!("Stopping repeat of {key} {e:?}");
            return;
        }
    }
}

//! Global keyboard and mouse capture. [GenericInputSource] picks the backend compiled in with the
//! `capture` feature; without it the daemon can still be built and tested against mocks.

#[cfg(feature = "capture")]
pub mod rdev_backend;

pub mod keys;

use anyhow::Result;
use keys::Key;

/// Raw event as reported by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPress(Key),
    KeyRelease(Key),
    ButtonPress,
    MouseMove { x: f64, y: f64 },
}

pub type EventSink = Box<dyn FnMut(InputEvent) + Send>;

/// Contract the platform backends implement.
#[cfg_attr(test, mockall::automock)]
pub trait InputSource: Send {
    /// Blocks the calling thread and hands every captured event to `sink`. Returns when the hook
    /// stops or fails to start (usually because of missing permissions).
    fn listen(&mut self, sink: EventSink) -> Result<()>;
}

/// Injects synthetic key presses. Used to emulate accelerated key repeat.
#[cfg_attr(test, mockall::automock)]
pub trait KeySink: Send + Sync {
    fn press(&self, key: Key) -> Result<()>;
}

/// Instructions shown when the OS refuses the global hook.
pub const PERMISSION_HINT: &str = "typtel needs permission to observe global input. On macOS grant \
    Accessibility and Input Monitoring access to the daemon binary in System Settings > Privacy & \
    Security. On Linux an X11 session (or membership in the `input` group) is required.";

/// Cross platform [InputSource].
pub struct GenericInputSource {
    inner: Box<dyn InputSource>,
}

impl GenericInputSource {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "capture")] {
                Ok(Self {
                    inner: Box::new(rdev_backend::RdevInputSource),
                })
            } else {
                Err(anyhow::anyhow!(
                    "typtel was built without an input backend, rebuild with `--features capture`"
                ))
            }
        }
    }
}

impl InputSource for GenericInputSource {
    fn listen(&mut self, sink: EventSink) -> Result<()> {
        self.inner.listen(sink)
    }
}

/// Cross platform [KeySink].
pub struct GenericKeySink {
    inner: Box<dyn KeySink>,
}

impl GenericKeySink {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "capture")] {
                Ok(Self {
                    inner: Box::new(rdev_backend::RdevKeySink),
                })
            } else {
                Err(anyhow::anyhow!(
                    "typtel was built without an input backend, key repeat emulation is unavailable"
                ))
            }
        }
    }
}

impl KeySink for GenericKeySink {
    fn press(&self, key: Key) -> Result<()> {
        self.inner.press(key)
    }
}

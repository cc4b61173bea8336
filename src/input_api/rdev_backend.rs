use anyhow::{anyhow, Result};
use rdev::{EventType, Key as RawKey};
use tracing::{debug, instrument};

use super::{
    keys::{Key, ModifierKey},
    EventSink, InputEvent, InputSource, KeySink,
};

/// Listens through `rdev`. X11 on Linux, low level hooks on Windows, event taps on macOS.
pub struct RdevInputSource;

impl InputSource for RdevInputSource {
    #[instrument(skip_all)]
    fn listen(&mut self, mut sink: EventSink) -> Result<()> {
        debug!("Installing global input hook");
        rdev::listen(move |event| {
            if let Some(event) = convert_event(event.event_type) {
                sink(event);
            }
        })
        .map_err(|e| anyhow!("Global input hook failed: {e:?}"))
    }
}

pub struct RdevKeySink;

impl KeySink for RdevKeySink {
    fn press(&self, key: Key) -> Result<()> {
        let raw = to_raw_key(key).ok_or_else(|| anyhow!("Key {key} can't be synthesized"))?;
        rdev::simulate(&EventType::KeyPress(raw))
            .map_err(|e| anyhow!("Failed to synthesize {key}: {e:?}"))
    }
}

fn convert_event(event: EventType) -> Option<InputEvent> {
    match event {
        EventType::KeyPress(key) => Some(InputEvent::KeyPress(from_raw_key(key))),
        EventType::KeyRelease(key) => Some(InputEvent::KeyRelease(from_raw_key(key))),
        EventType::ButtonPress(_) => Some(InputEvent::ButtonPress),
        EventType::MouseMove { x, y } => Some(InputEvent::MouseMove { x, y }),
        EventType::ButtonRelease(_) | EventType::Wheel { .. } => None,
    }
}

const LETTERS: [(RawKey, char); 26] = [
    (RawKey::KeyA, 'a'),
    (RawKey::KeyB, 'b'),
    (RawKey::KeyC, 'c'),
    (RawKey::KeyD, 'd'),
    (RawKey::KeyE, 'e'),
    (RawKey::KeyF, 'f'),
    (RawKey::KeyG, 'g'),
    (RawKey::KeyH, 'h'),
    (RawKey::KeyI, 'i'),
    (RawKey::KeyJ, 'j'),
    (RawKey::KeyK, 'k'),
    (RawKey::KeyL, 'l'),
    (RawKey::KeyM, 'm'),
    (RawKey::KeyN, 'n'),
    (RawKey::KeyO, 'o'),
    (RawKey::KeyP, 'p'),
    (RawKey::KeyQ, 'q'),
    (RawKey::KeyR, 'r'),
    (RawKey::KeyS, 's'),
    (RawKey::KeyT, 't'),
    (RawKey::KeyU, 'u'),
    (RawKey::KeyV, 'v'),
    (RawKey::KeyW, 'w'),
    (RawKey::KeyX, 'x'),
    (RawKey::KeyY, 'y'),
    (RawKey::KeyZ, 'z'),
];

const DIGITS: [RawKey; 10] = [
    RawKey::Num0,
    RawKey::Num1,
    RawKey::Num2,
    RawKey::Num3,
    RawKey::Num4,
    RawKey::Num5,
    RawKey::Num6,
    RawKey::Num7,
    RawKey::Num8,
    RawKey::Num9,
];

const KEYPAD_DIGITS: [RawKey; 10] = [
    RawKey::Kp0,
    RawKey::Kp1,
    RawKey::Kp2,
    RawKey::Kp3,
    RawKey::Kp4,
    RawKey::Kp5,
    RawKey::Kp6,
    RawKey::Kp7,
    RawKey::Kp8,
    RawKey::Kp9,
];

const FUNCTION_KEYS: [RawKey; 12] = [
    RawKey::F1,
    RawKey::F2,
    RawKey::F3,
    RawKey::F4,
    RawKey::F5,
    RawKey::F6,
    RawKey::F7,
    RawKey::F8,
    RawKey::F9,
    RawKey::F10,
    RawKey::F11,
    RawKey::F12,
];

const PUNCTUATION: [(RawKey, char); 13] = [
    (RawKey::BackQuote, '`'),
    (RawKey::Minus, '-'),
    (RawKey::Equal, '='),
    (RawKey::LeftBracket, '['),
    (RawKey::RightBracket, ']'),
    (RawKey::SemiColon, ';'),
    (RawKey::Quote, '\''),
    (RawKey::BackSlash, '\\'),
    (RawKey::Comma, ','),
    (RawKey::Dot, '.'),
    (RawKey::Slash, '/'),
    (RawKey::KpMinus, '-'),
    (RawKey::KpPlus, '+'),
];

fn from_raw_key(key: RawKey) -> Key {
    if let Some((_, c)) = LETTERS.iter().find(|(raw, _)| *raw == key) {
        return Key::Letter(*c);
    }
    if let Some(d) = DIGITS.iter().position(|raw| *raw == key) {
        return Key::Digit(d as u8);
    }
    if let Some(d) = KEYPAD_DIGITS.iter().position(|raw| *raw == key) {
        return Key::Digit(d as u8);
    }
    if let Some(n) = FUNCTION_KEYS.iter().position(|raw| *raw == key) {
        return Key::Function(n as u8 + 1);
    }
    if let Some((_, c)) = PUNCTUATION.iter().find(|(raw, _)| *raw == key) {
        return Key::Punctuation(*c);
    }

    match key {
        RawKey::ShiftLeft | RawKey::ShiftRight => Key::Modifier(ModifierKey::Shift),
        RawKey::ControlLeft | RawKey::ControlRight => Key::Modifier(ModifierKey::Control),
        RawKey::Alt | RawKey::AltGr => Key::Modifier(ModifierKey::Option),
        RawKey::MetaLeft | RawKey::MetaRight => Key::Modifier(ModifierKey::Command),
        RawKey::Function => Key::Modifier(ModifierKey::Function),
        RawKey::CapsLock => Key::Modifier(ModifierKey::CapsLock),
        RawKey::Space => Key::Space,
        RawKey::Return | RawKey::KpReturn => Key::Return,
        RawKey::Tab => Key::Tab,
        RawKey::Backspace => Key::Backspace,
        RawKey::Delete | RawKey::KpDelete => Key::Delete,
        RawKey::Escape => Key::Escape,
        RawKey::UpArrow => Key::Up,
        RawKey::DownArrow => Key::Down,
        RawKey::LeftArrow => Key::Left,
        RawKey::RightArrow => Key::Right,
        RawKey::Home => Key::Home,
        RawKey::End => Key::End,
        RawKey::PageUp => Key::PageUp,
        RawKey::PageDown => Key::PageDown,
        RawKey::Unknown(code) => Key::Other(code),
        _ => Key::Other(0),
    }
}

fn to_raw_key(key: Key) -> Option<RawKey> {
    let raw = match key {
        Key::Letter(c) => LETTERS.iter().find(|(_, l)| *l == c)?.0,
        Key::Digit(d) => *DIGITS.get(d as usize)?,
        Key::Function(n) => *FUNCTION_KEYS.get((n as usize).checked_sub(1)?)?,
        Key::Punctuation(c) => PUNCTUATION.iter().find(|(_, p)| *p == c)?.0,
        Key::Space => RawKey::Space,
        Key::Return => RawKey::Return,
        Key::Tab => RawKey::Tab,
        Key::Backspace => RawKey::Backspace,
        Key::Delete => RawKey::Delete,
        Key::Escape => RawKey::Escape,
        Key::Up => RawKey::UpArrow,
        Key::Down => RawKey::DownArrow,
        Key::Left => RawKey::LeftArrow,
        Key::Right => RawKey::RightArrow,
        Key::Home => RawKey::Home,
        Key::End => RawKey::End,
        Key::PageUp => RawKey::PageUp,
        Key::PageDown => RawKey::PageDown,
        Key::Modifier(_) | Key::Other(_) => return None,
    };
    Some(raw)
}

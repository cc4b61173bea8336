use std::fmt::Display;

/// Platform independent key identity. Backends map their own key codes into this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// `a`..=`z`, always lowercase.
    Letter(char),
    Digit(u8),
    /// Any other printable character such as `-` or `/`.
    Punctuation(char),
    Modifier(ModifierKey),
    Space,
    Return,
    Tab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// `F1`..=`F24`.
    Function(u8),
    /// Keys that have no dedicated variant. Carries the backend's raw code.
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    Shift,
    Control,
    Option,
    Command,
    Function,
    CapsLock,
}

/// Counting category of a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    Letter,
    Modifier,
    Special,
}

impl Key {
    pub fn class(&self) -> KeyClass {
        match self {
            Key::Letter(_) => KeyClass::Letter,
            Key::Modifier(_) => KeyClass::Modifier,
            _ => KeyClass::Special,
        }
    }

    /// Space, return and tab each close a word.
    pub fn is_word_boundary(&self) -> bool {
        matches!(self, Key::Space | Key::Return | Key::Tab)
    }

    pub fn modifier(&self) -> Option<ModifierKey> {
        match self {
            Key::Modifier(modifier) => Some(*modifier),
            _ => None,
        }
    }

    /// Builds a key from a typed character. Letters are folded to lowercase.
    pub fn from_char(c: char) -> Key {
        match c {
            'a'..='z' => Key::Letter(c),
            'A'..='Z' => Key::Letter(c.to_ascii_lowercase()),
            '0'..='9' => Key::Digit(c as u8 - b'0'),
            ' ' => Key::Space,
            '\n' | '\r' => Key::Return,
            '\t' => Key::Tab,
            c => Key::Punctuation(c),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Letter(c) | Key::Punctuation(c) => write!(f, "{c}"),
            Key::Digit(d) => write!(f, "{d}"),
            Key::Modifier(m) => write!(f, "{m:?}"),
            Key::Function(n) => write!(f, "F{n}"),
            Key::Other(code) => write!(f, "key#{code}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(Key::Letter('a').class(), KeyClass::Letter);
        assert_eq!(Key::from_char('Z'), Key::Letter('z'));
        assert_eq!(Key::Modifier(ModifierKey::CapsLock).class(), KeyClass::Modifier);
        assert_eq!(Key::Modifier(ModifierKey::Function).class(), KeyClass::Modifier);
        for key in [
            Key::Digit(1),
            Key::Space,
            Key::Return,
            Key::Backspace,
            Key::Escape,
            Key::Function(5),
            Key::Punctuation(';'),
            Key::Other(300),
        ] {
            assert_eq!(key.class(), KeyClass::Special, "{key}");
        }
    }

    #[test]
    fn word_boundaries() {
        assert!(Key::Space.is_word_boundary());
        assert!(Key::Return.is_word_boundary());
        assert!(Key::Tab.is_word_boundary());
        assert!(!Key::Letter('a').is_word_boundary());
        assert!(!Key::Backspace.is_word_boundary());
        assert!(!Key::Punctuation('.').is_word_boundary());
    }
}

use crate::daemon::storage::settings::KeyboardLayout;

const QWERTY: &str = "qwertyuiop[]asdfghjkl;'zxcvbnm,./QWERTYUIOP{}ASDFGHJKL:\"ZXCVBNM<>?-=_+";
const DVORAK: &str = "',.pyfgcrl/=aoeuidhtns-;qjkxbmwvz\"<>PYFGCRL?+AOEUIDHTNS_:QJKXBMWVZ[]{}";
const COLEMAK: &str = "qwfpgjluy;[]arstdhneio'zxcvbkm,./QWFPGJLUY:{}ARSTDHNEIO\"ZXCVBKM<>?-=_+";

fn layout_chars(layout: KeyboardLayout) -> Option<&'static str> {
    match layout {
        KeyboardLayout::Qwerty => None,
        KeyboardLayout::Dvorak => Some(DVORAK),
        KeyboardLayout::Colemak => Some(COLEMAK),
    }
}

/// Character the layout produces for a key that a qwerty keyboard reports as `c`.
pub fn map_char(layout: KeyboardLayout, c: char) -> char {
    let Some(target) = layout_chars(layout) else {
        return c;
    };
    QWERTY
        .chars()
        .position(|q| q == c)
        .and_then(|index| target.chars().nth(index))
        .unwrap_or(c)
}

/// Emulates `layout` on top of a qwerty keyboard.
pub fn transform(layout: KeyboardLayout, text: &str) -> String {
    text.chars().map(|c| map_char(layout, c)).collect()
}

use std::collections::HashSet;

use crate::{
    daemon::storage::settings::OdometerHotkey,
    input_api::keys::{Key, ModifierKey},
};

const HOTKEY_KEY: Key = Key::Letter('o');

/// Latches modifier presses until a non modifier key arrives, then checks that key against the
/// odometer hotkey. Releases don't clear the latch, so letting go of one of two held shift keys
/// keeps shift in the combination.
#[derive(Debug, Default)]
pub struct HotkeyDetector {
    held: HashSet<ModifierKey>,
}

impl HotkeyDetector {
    /// Returns true when `key` completes `hotkey`.
    pub fn on_press(&mut self, key: Key, hotkey: OdometerHotkey) -> bool {
        if let Some(modifier) = key.modifier() {
            if modifier != ModifierKey::CapsLock {
                self.held.insert(modifier);
            }
            return false;
        }

        let wanted = hotkey.modifiers();
        let triggered = key == HOTKEY_KEY
            && self.held.len() == wanted.len()
            && wanted.iter().all(|m| self.held.contains(m));
        self.held.clear();
        triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_all(detector: &mut HotkeyDetector, keys: &[Key], hotkey: OdometerHotkey) -> bool {
        keys.iter().fold(false, |_, key| detector.on_press(*key, hotkey))
    }

    const CMD: Key = Key::Modifier(ModifierKey::Command);
    const CTRL: Key = Key::Modifier(ModifierKey::Control);
    const SHIFT: Key = Key::Modifier(ModifierKey::Shift);
    const OPT: Key = Key::Modifier(ModifierKey::Option);

    #[test]
    fn default_hotkey() {
        let mut detector = HotkeyDetector::default();
        assert!(press_all(&mut detector, &[CMD, CTRL, HOTKEY_KEY], OdometerHotkey::CmdCtrlO));
        assert!(!press_all(&mut detector, &[CMD, HOTKEY_KEY], OdometerHotkey::CmdCtrlO));
        assert!(!press_all(&mut detector, &[CMD, CTRL, Key::Letter('p')], OdometerHotkey::CmdCtrlO));
    }

    #[test]
    fn extra_modifiers_do_not_match() {
        let mut detector = HotkeyDetector::default();
        assert!(!press_all(
            &mut detector,
            &[CMD, CTRL, SHIFT, HOTKEY_KEY],
            OdometerHotkey::CmdCtrlO
        ));
    }

    #[test]
    fn alternative_hotkeys() {
        let mut detector = HotkeyDetector::default();
        assert!(press_all(&mut detector, &[CMD, SHIFT, HOTKEY_KEY], OdometerHotkey::CmdShiftO));
        assert!(press_all(&mut detector, &[OPT, CMD, HOTKEY_KEY], OdometerHotkey::CmdOptO));
        assert!(press_all(&mut detector, &[CTRL, SHIFT, HOTKEY_KEY], OdometerHotkey::CtrlShiftO));
        assert!(!press_all(&mut detector, &[CMD, CTRL, HOTKEY_KEY], OdometerHotkey::CtrlShiftO));
    }

    #[test]
    fn only_non_modifier_presses_clear_state() {
        let mut detector = HotkeyDetector::default();
        detector.on_press(CMD, OdometerHotkey::CmdCtrlO);
        detector.on_press(CTRL, OdometerHotkey::CmdCtrlO);
        detector.on_press(Key::Letter('a'), OdometerHotkey::CmdCtrlO);
        assert!(!detector.on_press(HOTKEY_KEY, OdometerHotkey::CmdCtrlO));

        assert!(press_all(&mut detector, &[CMD, CTRL, HOTKEY_KEY], OdometerHotkey::CmdCtrlO));
    }

    #[test]
    fn repeated_modifiers_latch_once() {
        let mut detector = HotkeyDetector::default();
        assert!(press_all(
            &mut detector,
            &[SHIFT, SHIFT, CMD, HOTKEY_KEY],
            OdometerHotkey::CmdShiftO
        ));
    }
}

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    input_api::keys::ModifierKey,
    utils::units::{DistanceUnit, DEFAULT_PIXELS_PER_INCH},
};

use super::document::JsonDocument;

pub const SETTINGS_FILE: &str = "settings.json";

/// User preferences shared by the daemon and the clients. Every field has a default, so a partial
/// or missing file still yields usable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub show_keystrokes: bool,
    pub show_words: bool,
    pub show_clicks: bool,
    pub show_distance: bool,
    pub distance_unit: DistanceUnit,
    pub mouse_tracking: bool,
    pub show_key_types: bool,
    pub inertia: InertiaSettings,
    pub odometer_hotkey: OdometerHotkey,
    pub typing: TypingSettings,
    pub flush_interval_ms: u64,
    pub pixels_per_inch: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_keystrokes: true,
            show_words: true,
            show_clicks: false,
            show_distance: false,
            distance_unit: DistanceUnit::Feet,
            mouse_tracking: true,
            show_key_types: false,
            inertia: InertiaSettings::default(),
            odometer_hotkey: OdometerHotkey::default(),
            typing: TypingSettings::default(),
            flush_interval_ms: 2000,
            pixels_per_inch: DEFAULT_PIXELS_PER_INCH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertiaSettings {
    pub enabled: bool,
    pub max_speed: MaxSpeed,
    /// How long a key has to be held before repeating starts.
    pub threshold_ms: u64,
    pub accel_rate: f64,
}

impl Default for InertiaSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_speed: MaxSpeed::Fast,
            threshold_ms: 200,
            accel_rate: 1.0,
        }
    }
}

/// Cap on the repeat rate of accelerated keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxSpeed {
    UltraFast,
    VeryFast,
    PrettyFast,
    #[default]
    Fast,
    Medium,
    Slow,
}

impl MaxSpeed {
    /// Unrecognized names fall back to [MaxSpeed::Fast].
    pub fn from_name(name: &str) -> MaxSpeed {
        serde_json::from_value(Value::String(name.to_owned())).unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OdometerHotkey {
    #[default]
    #[serde(rename = "cmd+ctrl+o")]
    CmdCtrlO,
    #[serde(rename = "cmd+shift+o")]
    CmdShiftO,
    #[serde(rename = "cmd+opt+o")]
    CmdOptO,
    #[serde(rename = "ctrl+shift+o")]
    CtrlShiftO,
}

impl OdometerHotkey {
    /// Modifiers that must be held together with `O`.
    pub fn modifiers(self) -> [ModifierKey; 2] {
        match self {
            OdometerHotkey::CmdCtrlO => [ModifierKey::Command, ModifierKey::Control],
            OdometerHotkey::CmdShiftO => [ModifierKey::Command, ModifierKey::Shift],
            OdometerHotkey::CmdOptO => [ModifierKey::Command, ModifierKey::Option],
            OdometerHotkey::CtrlShiftO => [ModifierKey::Control, ModifierKey::Shift],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OdometerHotkey::CmdCtrlO => "⌘⌃O",
            OdometerHotkey::CmdShiftO => "⌘⇧O",
            OdometerHotkey::CmdOptO => "⌘⌥O",
            OdometerHotkey::CtrlShiftO => "⌃⇧O",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingSettings {
    pub theme: String,
    pub custom_texts: Vec<String>,
    pub layout: KeyboardLayout,
    pub language: WordLanguage,
    pub word_count: u32,
    pub punctuation: bool,
    pub live_wpm: bool,
    pub pace_caret: PaceCaret,
    pub custom_pace_wpm: f64,
    pub test_type: TestType,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            theme: "default".into(),
            custom_texts: vec![],
            layout: KeyboardLayout::Qwerty,
            language: WordLanguage::Us,
            word_count: 25,
            punctuation: true,
            live_wpm: true,
            pace_caret: PaceCaret::Off,
            custom_pace_wpm: 60.,
            test_type: TestType::Words,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardLayout {
    #[default]
    Qwerty,
    Dvorak,
    Colemak,
}

impl KeyboardLayout {
    pub const ALL: [KeyboardLayout; 3] = [Self::Qwerty, Self::Dvorak, Self::Colemak];

    /// Unrecognized layouts behave like qwerty.
    pub fn from_name(name: &str) -> KeyboardLayout {
        serde_json::from_value(Value::String(name.to_owned())).unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyboardLayout::Qwerty => "qwerty",
            KeyboardLayout::Dvorak => "dvorak",
            KeyboardLayout::Colemak => "colemak",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordLanguage {
    #[default]
    Us,
    Au,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaceCaret {
    #[default]
    Off,
    Pb,
    Average,
    Custom,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Words,
    Custom,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_ms < 100 {
            bail!("flush_interval_ms must be at least 100");
        }
        if !(self.pixels_per_inch > 0.) {
            bail!("pixels_per_inch must be positive");
        }
        if !(self.inertia.accel_rate >= 0.) {
            bail!("inertia.accel_rate can't be negative");
        }
        if self.typing.word_count == 0 {
            bail!("typing.word_count must be positive");
        }
        Ok(())
    }

    /// Looks up a dotted key such as `inertia.max_speed`.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let root = serde_json::to_value(self)?;
        Ok(key
            .split('.')
            .try_fold(&root, |value, part| value.get(part))
            .cloned())
    }

    /// Returns a copy with `key` replaced. Values of string fields are taken verbatim, a list field
    /// takes either a JSON array or a single verbatim entry, everything else is parsed as JSON
    /// (`true`, `25`).
    pub fn with_value(&self, key: &str, raw: &str) -> Result<Settings> {
        let mut root = serde_json::to_value(self)?;
        let slot = key
            .split('.')
            .try_fold(&mut root, |value, part| value.get_mut(part))
            .ok_or_else(|| anyhow!("Unknown setting {key}"))?;

        let value = match slot {
            Value::String(_) => Value::String(raw.to_owned()),
            Value::Object(_) => bail!("{key} is a group, set one of its fields instead"),
            Value::Array(_) if !raw.trim_start().starts_with('[') => {
                Value::Array(vec![Value::String(raw.to_owned())])
            }
            _ => serde_json::from_str(raw)
                .with_context(|| format!("Can't parse {raw:?} as a value for {key}"))?,
        };
        *slot = value;

        let updated: Settings = serde_json::from_value(root)
            .with_context(|| format!("Invalid value {raw:?} for {key}"))?;
        updated.validate()?;
        Ok(updated)
    }
}

/// File backed settings. Readers never fail on a bad file, they fall back to defaults.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    document: JsonDocument,
}

impl SettingsStore {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            document: JsonDocument::new(app_dir.join(SETTINGS_FILE)),
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub async fn load(&self) -> Settings {
        self.document.read().await.unwrap_or_default()
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        self.document.write(settings).await
    }

    /// Modifies the stored settings without racing other writers.
    pub async fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<Settings> {
        self.document
            .update(|settings: &mut Settings| {
                change(settings);
                Ok(true)
            })
            .await
    }

    pub async fn set(&self, key: &str, raw: &str) -> Result<Settings> {
        self.document
            .update(|settings: &mut Settings| {
                *settings = settings.with_value(key, raw)?;
                Ok(true)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.show_keystrokes);
        assert!(settings.show_words);
        assert!(!settings.show_clicks);
        assert!(!settings.show_distance);
        assert!(settings.mouse_tracking);
        assert_eq!(settings.distance_unit, DistanceUnit::Feet);
        assert!(!settings.inertia.enabled);
        assert_eq!(settings.inertia.max_speed, MaxSpeed::Fast);
        assert_eq!(settings.inertia.threshold_ms, 200);
        assert_eq!(settings.inertia.accel_rate, 1.0);
        assert_eq!(settings.odometer_hotkey, OdometerHotkey::CmdCtrlO);
        assert_eq!(settings.typing.theme, "default");
        assert!(settings.typing.custom_texts.is_empty());
    }

    #[test]
    fn partial_documents_fill_defaults() -> Result<()> {
        let settings: Settings =
            serde_json::from_str(r#"{"show_clicks":true,"inertia":{"enabled":true}}"#)?;
        assert!(settings.show_clicks);
        assert!(settings.inertia.enabled);
        assert_eq!(settings.inertia.threshold_ms, 200);
        assert!(settings.show_keystrokes);
        Ok(())
    }

    #[test]
    fn get_by_dotted_key() -> Result<()> {
        let settings = Settings::default();
        assert_eq!(settings.get("show_words")?, Some(json!(true)));
        assert_eq!(settings.get("inertia.max_speed")?, Some(json!("fast")));
        assert_eq!(settings.get("odometer_hotkey")?, Some(json!("cmd+ctrl+o")));
        assert_eq!(settings.get("nonexistent")?, None);
        Ok(())
    }

    #[test]
    fn set_overwrites_and_validates() -> Result<()> {
        let settings = Settings::default()
            .with_value("show_clicks", "true")?
            .with_value("distance_unit", "frisbee")?
            .with_value("inertia.max_speed", "ultra_fast")?
            .with_value("typing.custom_texts", r#"["one","two"]"#)?
            .with_value("typing.theme", "gruvbox")?;
        assert!(settings.show_clicks);
        assert_eq!(settings.distance_unit, DistanceUnit::Frisbee);
        assert_eq!(settings.inertia.max_speed, MaxSpeed::UltraFast);
        assert_eq!(settings.typing.custom_texts, vec!["one", "two"]);
        assert_eq!(settings.typing.theme, "gruvbox");

        let updated = settings.with_value("show_clicks", "false")?;
        assert!(!updated.show_clicks);

        assert!(settings.with_value("nonexistent", "1").is_err());
        assert!(settings.with_value("show_clicks", "maybe").is_err());
        assert!(settings.with_value("distance_unit", "parsecs").is_err());
        assert!(settings.with_value("flush_interval_ms", "5").is_err());
        assert!(settings.with_value("inertia", "{}").is_err());
        Ok(())
    }

    #[test]
    fn list_settings_take_plain_text() -> Result<()> {
        let settings = Settings::default()
            .with_value("typing.custom_texts", "the quick fox --- jumps over")?;
        assert_eq!(
            settings.typing.custom_texts,
            vec!["the quick fox --- jumps over"]
        );

        let settings = settings.with_value("typing.custom_texts", r#"  ["a", "b"]"#)?;
        assert_eq!(settings.typing.custom_texts, vec!["a", "b"]);
        assert!(settings.with_value("typing.custom_texts", "[broken").is_err());
        Ok(())
    }

    #[test]
    fn lenient_names() {
        assert_eq!(MaxSpeed::from_name("slow"), MaxSpeed::Slow);
        assert_eq!(MaxSpeed::from_name("warp"), MaxSpeed::Fast);
        assert_eq!(KeyboardLayout::from_name("dvorak"), KeyboardLayout::Dvorak);
        assert_eq!(KeyboardLayout::from_name("unknown"), KeyboardLayout::Qwerty);
    }

    #[tokio::test]
    async fn store_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.load().await, Settings::default());

        store.set("show_distance", "true").await?;
        let loaded = store.load().await;
        assert!(loaded.show_distance);

        tokio::fs::write(store.path(), "{not json").await?;
        assert_eq!(store.load().await, Settings::default());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_values_leave_the_file_alone() -> Result<()> {
        let dir = tempdir()?;
        let store = SettingsStore::new(dir.path());
        store.set("show_clicks", "true").await?;
        assert!(store.set("show_clicks", "maybe").await.is_err());
        assert!(store.load().await.show_clicks);

        let updated = store.update(|settings| settings.typing.word_count = 50).await?;
        assert_eq!(updated.typing.word_count, 50);
        assert!(store.load().await.show_clicks);
        Ok(())
    }
}

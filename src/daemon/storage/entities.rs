use std::ops::AddAssign;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::input_api::keys::KeyClass;

/// Counters kept for a single hour. Every field defaults so that older lines missing a counter
/// still parse.
#[derive(PartialEq, Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct CountersEntity {
    #[serde(default)]
    pub keystrokes: u64,
    #[serde(default)]
    pub letters: u64,
    #[serde(default)]
    pub modifiers: u64,
    #[serde(default)]
    pub special: u64,
    #[serde(default)]
    pub words: u64,
    #[serde(default)]
    pub clicks: u64,
    /// Mouse travel in pixels.
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub movements: u64,
}

impl CountersEntity {
    pub fn is_empty(&self) -> bool {
        *self == CountersEntity::default()
    }

    pub fn record_keystroke(&mut self, class: KeyClass) {
        self.keystrokes += 1;
        match class {
            KeyClass::Letter => self.letters += 1,
            KeyClass::Modifier => self.modifiers += 1,
            KeyClass::Special => self.special += 1,
        }
    }

    pub fn record_word(&mut self) {
        self.words += 1;
    }

    pub fn record_click(&mut self) {
        self.clicks += 1;
    }

    pub fn record_movement(&mut self, distance: f64) {
        self.distance += distance;
        self.movements += 1;
    }
}

impl AddAssign<&CountersEntity> for CountersEntity {
    fn add_assign(&mut self, rhs: &CountersEntity) {
        self.keystrokes += rhs.keystrokes;
        self.letters += rhs.letters;
        self.modifiers += rhs.modifiers;
        self.special += rhs.special;
        self.words += rhs.words;
        self.clicks += rhs.clicks;
        self.distance += rhs.distance;
        self.movements += rhs.movements;
    }
}

/// A line in a day file: counters to add to one hour of that day. Consecutive lines for the same
/// hour are merged by the writer, but readers must still sum them.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HourDeltaEntity {
    pub hour: u8,
    #[serde(flatten)]
    pub counters: CountersEntity,
}

impl HourDeltaEntity {
    pub fn new(hour: u8, counters: CountersEntity) -> Self {
        Self { hour, counters }
    }
}

/// The 24 hour buckets of a local day.
#[derive(PartialEq, Debug, Clone)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub hours: [CountersEntity; 24],
}

impl DayRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            hours: [CountersEntity::default(); 24],
        }
    }

    /// Adds a delta. Deltas with an hour outside 0..24 are ignored.
    pub fn apply(&mut self, delta: &HourDeltaEntity) -> bool {
        match self.hours.get_mut(delta.hour as usize) {
            Some(hour) => {
                *hour += &delta.counters;
                true
            }
            None => false,
        }
    }

    pub fn totals(&self) -> CountersEntity {
        let mut totals = CountersEntity::default();
        for hour in &self.hours {
            totals += hour;
        }
        totals
    }

    /// Hours with at least one keystroke.
    pub fn active_hours(&self) -> usize {
        self.hours.iter().filter(|v| v.keystrokes > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn key_classes_sum_to_keystrokes() {
        let mut counters = CountersEntity::default();
        counters.record_keystroke(KeyClass::Letter);
        counters.record_keystroke(KeyClass::Letter);
        counters.record_keystroke(KeyClass::Modifier);
        counters.record_keystroke(KeyClass::Special);
        assert_eq!(counters.keystrokes, 4);
        assert_eq!(
            counters.letters + counters.modifiers + counters.special,
            counters.keystrokes
        );
    }

    #[test]
    fn lines_missing_counters_parse() {
        let delta: HourDeltaEntity = serde_json::from_str(r#"{"hour":3,"keystrokes":5}"#).unwrap();
        assert_eq!(delta.hour, 3);
        assert_eq!(delta.counters.keystrokes, 5);
        assert_eq!(delta.counters.distance, 0.);
    }

    #[test]
    fn day_record_ignores_invalid_hours() {
        let mut day = DayRecord::empty(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let mut counters = CountersEntity::default();
        counters.record_keystroke(KeyClass::Letter);
        assert!(day.apply(&HourDeltaEntity::new(23, counters)));
        assert!(!day.apply(&HourDeltaEntity::new(24, counters)));
        assert_eq!(day.totals().keystrokes, 1);
        assert_eq!(day.active_hours(), 1);
    }
}

use std::{collections::BTreeMap, path::Path};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::document::JsonDocument;

pub const TYPING_RESULTS_FILE: &str = "typing_tests.json";

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WpmStats {
    pub personal_best: f64,
    pub test_count: u64,
    pub total_wpm: f64,
}

impl WpmStats {
    pub fn average(&self) -> f64 {
        if self.test_count == 0 {
            0.
        } else {
            self.total_wpm / self.test_count as f64
        }
    }

    /// Returns true when `wpm` is a new personal best.
    fn record(&mut self, wpm: f64) -> bool {
        self.test_count += 1;
        self.total_wpm += wpm;
        if wpm > self.personal_best {
            self.personal_best = wpm;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingResults {
    pub overall: WpmStats,
    pub modes: BTreeMap<String, WpmStats>,
}

/// Stats key of a test configuration, e.g. `mode_25_punct`.
pub fn mode_key(word_count: u32, punctuation: bool) -> String {
    if punctuation {
        format!("mode_{word_count}_punct")
    } else {
        format!("mode_{word_count}_no_punct")
    }
}

impl TypingResults {
    pub fn record(&mut self, wpm: f64, mode: &str) -> bool {
        self.overall.record(wpm);
        self.modes.entry(mode.to_owned()).or_default().record(wpm)
    }

    pub fn mode(&self, mode: &str) -> WpmStats {
        self.modes.get(mode).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct TypingResultsStore {
    document: JsonDocument,
}

impl TypingResultsStore {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            document: JsonDocument::new(app_dir.join(TYPING_RESULTS_FILE)),
        }
    }

    pub async fn load(&self) -> TypingResults {
        self.document.read().await.unwrap_or_default()
    }

    pub async fn record(&self, wpm: f64, mode: &str) -> Result<TypingResults> {
        self.document
            .update(|results: &mut TypingResults| {
                results.record(wpm, mode);
                Ok(true)
            })
            .await
    }
}

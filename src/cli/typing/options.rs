//! Searchable options overlay of the typing test.

use crate::daemon::storage::settings::{
    KeyboardLayout, PaceCaret, TestType, TypingSettings, WordLanguage,
};

use super::themes::THEMES;

pub const TEST_LENGTHS: [u32; 4] = [10, 25, 50, 100];
const PACE_CARETS: [PaceCaret; 4] = [
    PaceCaret::Off,
    PaceCaret::Pb,
    PaceCaret::Average,
    PaceCaret::Custom,
];
const TEST_TYPES: [TestType; 2] = [TestType::Words, TestType::Custom];
const LANGUAGES: [WordLanguage; 2] = [WordLanguage::Us, WordLanguage::Au];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionId {
    Theme,
    TestType,
    Layout,
    LiveWpm,
    TestLength,
    Punctuation,
    PaceCaret,
    Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Toggle,
    Choice,
}

#[derive(Debug, Clone, Copy)]
pub struct TestOption {
    pub id: OptionId,
    pub label: &'static str,
    pub kind: OptionKind,
}

pub const ALL_OPTIONS: [TestOption; 8] = [
    TestOption {
        id: OptionId::Theme,
        label: "Theme",
        kind: OptionKind::Choice,
    },
    TestOption {
        id: OptionId::TestType,
        label: "Test Type",
        kind: OptionKind::Choice,
    },
    TestOption {
        id: OptionId::Layout,
        label: "Keyboard Layout",
        kind: OptionKind::Choice,
    },
    TestOption {
        id: OptionId::LiveWpm,
        label: "Live WPM",
        kind: OptionKind::Toggle,
    },
    TestOption {
        id: OptionId::TestLength,
        label: "Test Length",
        kind: OptionKind::Choice,
    },
    TestOption {
        id: OptionId::Punctuation,
        label: "Punctuation",
        kind: OptionKind::Toggle,
    },
    TestOption {
        id: OptionId::PaceCaret,
        label: "Pace Caret",
        kind: OptionKind::Choice,
    },
    TestOption {
        id: OptionId::Language,
        label: "Language",
        kind: OptionKind::Choice,
    },
];

impl TestOption {
    pub fn choices(&self) -> Vec<String> {
        match self.id {
            OptionId::Theme => THEMES.iter().map(|t| t.name.to_owned()).collect(),
            OptionId::TestType => vec!["words".into(), "custom".into()],
            OptionId::Layout => KeyboardLayout::ALL
                .iter()
                .map(|l| l.name().to_owned())
                .collect(),
            OptionId::TestLength => TEST_LENGTHS.iter().map(|n| n.to_string()).collect(),
            OptionId::PaceCaret => vec![
                "off".into(),
                "personal best".into(),
                "average".into(),
                "custom".into(),
            ],
            OptionId::Language => vec!["US English".into(), "AU English".into()],
            OptionId::LiveWpm | OptionId::Punctuation => vec!["on".into(), "off".into()],
        }
    }

    /// Index of the current value among [TestOption::choices].
    pub fn current(&self, settings: &TypingSettings) -> usize {
        let position = match self.id {
            OptionId::Theme => THEMES.iter().position(|t| t.id == settings.theme),
            OptionId::TestType => TEST_TYPES.iter().position(|t| *t == settings.test_type),
            OptionId::Layout => KeyboardLayout::ALL
                .iter()
                .position(|l| *l == settings.layout),
            OptionId::TestLength => TEST_LENGTHS.iter().position(|n| *n == settings.word_count),
            OptionId::PaceCaret => PACE_CARETS.iter().position(|p| *p == settings.pace_caret),
            OptionId::Language => LANGUAGES.iter().position(|l| *l == settings.language),
            OptionId::LiveWpm => Some(usize::from(!settings.live_wpm)),
            OptionId::Punctuation => Some(usize::from(!settings.punctuation)),
        };
        position.unwrap_or(0)
    }

    pub fn value_label(&self, settings: &TypingSettings) -> String {
        if self.id == OptionId::TestLength && !TEST_LENGTHS.contains(&settings.word_count) {
            return settings.word_count.to_string();
        }
        self.choices()
            .into_iter()
            .nth(self.current(settings))
            .unwrap_or_default()
    }

    /// Applies choice `index`. Toggles ignore the index and flip.
    pub fn apply(&self, settings: &mut TypingSettings, index: usize) {
        match self.id {
            OptionId::Theme => {
                if let Some(theme) = THEMES.get(index) {
                    settings.theme = theme.id.to_owned();
                }
            }
            OptionId::TestType => {
                if let Some(test_type) = TEST_TYPES.get(index) {
                    settings.test_type = *test_type;
                }
            }
            OptionId::Layout => {
                if let Some(layout) = KeyboardLayout::ALL.get(index) {
                    settings.layout = *layout;
                }
            }
            OptionId::TestLength => {
                if let Some(count) = TEST_LENGTHS.get(index) {
                    settings.word_count = *count;
                }
            }
            OptionId::PaceCaret => {
                if let Some(pace) = PACE_CARETS.get(index) {
                    settings.pace_caret = *pace;
                }
            }
            OptionId::Language => {
                if let Some(language) = LANGUAGES.get(index) {
                    settings.language = *language;
                }
            }
            OptionId::LiveWpm => settings.live_wpm = !settings.live_wpm,
            OptionId::Punctuation => settings.punctuation = !settings.punctuation,
        }
    }
}

/// Options whose label contains `query`, ignoring case.
pub fn filter_options(query: &str) -> Vec<TestOption> {
    let query = query.to_lowercase();
    ALL_OPTIONS
        .iter()
        .filter(|option| option.label.to_lowercase().contains(&query))
        .copied()
        .collect()
}

pub fn find_option(id: OptionId) -> Option<TestOption> {
    ALL_OPTIONS.iter().find(|option| option.id == id).copied()
}

/// State of the overlay: search query, the filtered list and an optional open choice list.
#[derive(Debug, Clone)]
pub struct OptionsMenu {
    pub query: String,
    pub filtered: Vec<TestOption>,
    pub selected: usize,
    pub submenu: Option<Submenu>,
}

#[derive(Debug, Clone)]
pub struct Submenu {
    pub option: TestOption,
    pub selected: usize,
}

impl Default for OptionsMenu {
    fn default() -> Self {
        Self {
            query: String::new(),
            filtered: filter_options(""),
            selected: 0,
            submenu: None,
        }
    }
}

impl OptionsMenu {
    pub fn refilter(&mut self) {
        self.filtered = filter_options(&self.query);
        self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
    }

    pub fn push_query(&mut self, c: char) {
        self.query.push(c);
        self.refilter();
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.refilter();
    }

    pub fn up(&mut self) {
        match &mut self.submenu {
            Some(submenu) => submenu.selected = submenu.selected.saturating_sub(1),
            None => self.selected = self.selected.saturating_sub(1),
        }
    }

    pub fn down(&mut self) {
        match &mut self.submenu {
            Some(submenu) => {
                let last = submenu.option.choices().len().saturating_sub(1);
                submenu.selected = (submenu.selected + 1).min(last);
            }
            None => self.selected = (self.selected + 1).min(self.filtered.len().saturating_sub(1)),
        }
    }

    pub fn selected_option(&self) -> Option<TestOption> {
        self.filtered.get(self.selected).copied()
    }

    /// Enter on the list: toggles flip right away, choices open their list. Inside a list the
    /// highlighted choice is applied. Returns true when settings changed.
    pub fn confirm(&mut self, settings: &mut TypingSettings) -> bool {
        if let Some(submenu) = self.submenu.take() {
            submenu.option.apply(settings, submenu.selected);
            return true;
        }
        let Some(option) = self.selected_option() else {
            return false;
        };
        match option.kind {
            OptionKind::Toggle => {
                option.apply(settings, 0);
                true
            }
            OptionKind::Choice => {
                self.submenu = Some(Submenu {
                    option,
                    selected: option.current(settings),
                });
                false
            }
        }
    }
}

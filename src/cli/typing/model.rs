use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::thread_rng;

use crate::{
    daemon::storage::{
        settings::{PaceCaret, TypingSettings},
        typing_results::{mode_key, TypingResults},
    },
    utils::percentage::{ratio_percentage, Percentage},
};

use super::{layouts, options::OptionsMenu, words::TextGenerator};

const CHARS_PER_WORD: f64 = 5.;
const COMMAND_MODIFIERS: KeyModifiers = KeyModifiers::CONTROL.union(KeyModifiers::ALT);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Ready,
    Running,
    Finished,
    Options,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub wpm: f64,
    pub accuracy: Percentage,
    pub errors: usize,
    pub elapsed: Duration,
    pub mode: String,
    pub personal_best: bool,
}

/// Removes the trailing word together with the spaces after it.
pub fn delete_last_word(text: &str) -> String {
    let trimmed = text.trim_end_matches(' ');
    let kept = trimmed.trim_end_matches(|c: char| c != ' ');
    kept.to_owned()
}

pub fn words_per_minute(chars: usize, elapsed: Duration) -> f64 {
    let minutes = elapsed.as_secs_f64() / 60.;
    if minutes <= 0. {
        return 0.;
    }
    chars as f64 / CHARS_PER_WORD / minutes
}

/// Typing test state machine. Key handling is pure so the terminal loop only draws, persists the
/// finished result and saves changed options.
pub struct TypingTest {
    pub settings: TypingSettings,
    pub results: TypingResults,
    generator: TextGenerator,
    target: Vec<char>,
    typed: Vec<char>,
    errors: usize,
    state: TestState,
    started: Option<Instant>,
    finished: Option<Instant>,
    result_recorded: bool,
    last_result: Option<TestResult>,
    pub menu: OptionsMenu,
    settings_changed: bool,
}

impl TypingTest {
    pub fn new(settings: TypingSettings, results: TypingResults) -> Self {
        let generator = TextGenerator::new(settings.language);
        Self::with_generator(settings, results, generator)
    }

    pub fn with_generator(
        settings: TypingSettings,
        results: TypingResults,
        generator: TextGenerator,
    ) -> Self {
        let mut test = Self {
            settings,
            results,
            generator,
            target: vec![],
            typed: vec![],
            errors: 0,
            state: TestState::Ready,
            started: None,
            finished: None,
            result_recorded: false,
            last_result: None,
            menu: OptionsMenu::default(),
            settings_changed: false,
        };
        test.reset();
        test
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn last_result(&self) -> Option<&TestResult> {
        self.last_result.as_ref()
    }

    pub fn set_target(&mut self, text: &str) {
        self.target = text.chars().collect();
    }

    pub fn mode(&self) -> String {
        mode_key(self.settings.word_count, self.settings.punctuation)
    }

    /// New text, cleared input and timers.
    pub fn reset(&mut self) {
        if self.generator.language() != self.settings.language {
            self.generator = TextGenerator::new(self.settings.language);
        }
        let text = self.generator.generate(&self.settings, &mut thread_rng());
        self.set_target(&text);
        self.typed.clear();
        self.errors = 0;
        self.state = TestState::Ready;
        self.started = None;
        self.finished = None;
        self.result_recorded = false;
        self.last_result = None;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.started {
            Some(started) => self.finished.unwrap_or(now).saturating_duration_since(started),
            None => Duration::ZERO,
        }
    }

    pub fn wpm(&self, now: Instant) -> f64 {
        words_per_minute(self.typed.len(), self.elapsed(now))
    }

    pub fn correct_chars(&self) -> usize {
        self.typed
            .iter()
            .zip(&self.target)
            .filter(|(typed, target)| typed == target)
            .count()
    }

    pub fn accuracy(&self) -> Percentage {
        ratio_percentage(self.correct_chars() as u64, self.typed.len() as u64)
    }

    /// Target pace in words per minute, if a pace caret is enabled and has a reference.
    pub fn pace_wpm(&self) -> Option<f64> {
        let mode = self.results.mode(&self.mode());
        let wpm = match self.settings.pace_caret {
            PaceCaret::Off => return None,
            PaceCaret::Pb => mode.personal_best,
            PaceCaret::Average => mode.average(),
            PaceCaret::Custom => self.settings.custom_pace_wpm,
        };
        (wpm > 0.).then_some(wpm)
    }

    /// Index in the target where the pace caret currently sits.
    pub fn pace_position(&self, now: Instant) -> Option<usize> {
        if self.state != TestState::Running {
            return None;
        }
        let wpm = self.pace_wpm()?;
        let minutes = self.elapsed(now).as_secs_f64() / 60.;
        let position = (wpm * CHARS_PER_WORD * minutes) as usize;
        Some(position.min(self.target.len()))
    }

    /// Returns true once after options were changed.
    pub fn take_settings_change(&mut self) -> bool {
        std::mem::take(&mut self.settings_changed)
    }

    /// Result of a finished test. Given out once per test and folded into the in-memory results.
    pub fn take_result(&mut self) -> Option<TestResult> {
        if self.state != TestState::Finished || self.result_recorded {
            return None;
        }
        self.result_recorded = true;
        let elapsed = self.elapsed(Instant::now());
        let mode = self.mode();
        let wpm = words_per_minute(self.typed.len(), elapsed);
        let personal_best = self.results.record(wpm, &mode);
        let result = TestResult {
            wpm,
            accuracy: self.accuracy(),
            errors: self.errors,
            elapsed,
            mode,
            personal_best,
        };
        self.last_result = Some(result.clone());
        Some(result)
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Flow::Quit;
        }
        if self.state == TestState::Options {
            self.handle_options_key(key);
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Tab => self.reset(),
            KeyCode::Enter if self.state == TestState::Finished => self.reset(),
            KeyCode::Esc => {
                self.menu = OptionsMenu::default();
                self.state = TestState::Options;
            }
            KeyCode::Backspace if self.state == TestState::Running => {
                if key.modifiers.contains(KeyModifiers::ALT) {
                    let typed = self.typed.iter().collect::<String>();
                    self.typed = delete_last_word(&typed).chars().collect();
                } else {
                    self.typed.pop();
                }
            }
            KeyCode::Char(c) if !key.modifiers.intersects(COMMAND_MODIFIERS) => {
                self.type_char(layouts::map_char(self.settings.layout, c), now);
            }
            _ => {}
        }
        Flow::Continue
    }

    fn type_char(&mut self, c: char, now: Instant) {
        match self.state {
            TestState::Ready => {
                self.state = TestState::Running;
                self.started = Some(now);
            }
            TestState::Running => {}
            TestState::Finished | TestState::Options => return,
        }

        let index = self.typed.len();
        let correct = self.target.get(index) == Some(&c);
        if !correct {
            self.errors += 1;
        }
        self.typed.push(c);

        if correct && self.typed.len() >= self.target.len() {
            self.state = TestState::Finished;
            self.finished = Some(now);
        }
    }

    fn handle_options_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc if self.menu.submenu.is_some() => self.menu.submenu = None,
            KeyCode::Esc | KeyCode::Tab => self.reset(),
            KeyCode::Up => self.menu.up(),
            KeyCode::Down => self.menu.down(),
            KeyCode::Enter => {
                if self.menu.confirm(&mut self.settings) {
                    self.settings_changed = true;
                }
            }
            KeyCode::Backspace if self.menu.submenu.is_none() => self.menu.pop_query(),
            KeyCode::Char(c) if self.menu.submenu.is_none() => self.menu.push_query(c),
            _ => {}
        }
    }
}

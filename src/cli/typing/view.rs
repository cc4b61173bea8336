use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{
    model::{TestState, TypingTest},
    options::OptionsMenu,
    themes::{theme_or_default, Theme},
};

const MAX_WIDTH: u16 = 80;
const CONTENT_HEIGHT: u16 = 14;
const OPTIONS_HEIGHT: u16 = 14;

/// Rect of at most `width` x `height` in the middle of `area`. An empty area is returned as is.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    if area.width == 0 || area.height == 0 {
        return area;
    }
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn render(frame: &mut Frame, test: &TypingTest, now: Instant) {
    let theme = theme_or_default(&test.settings.theme);
    let area = frame.size();
    if test.state() == TestState::Options {
        render_options(frame, test, theme, centered(area, MAX_WIDTH - 20, OPTIONS_HEIGHT));
        return;
    }

    let area = centered(area, MAX_WIDTH, CONTENT_HEIGHT);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    let label = Style::default().fg(theme.label_text);
    frame.render_widget(Paragraph::new(header(test)).style(label), rows[0]);

    let status = match test.state() {
        TestState::Ready => Line::from(Span::styled(
            "Start typing to begin",
            Style::default().fg(theme.primary_accent),
        )),
        TestState::Running if test.settings.live_wpm => Line::from(Span::styled(
            format!("{:.0} wpm", test.wpm(now)),
            Style::default().fg(theme.primary_accent),
        )),
        _ => Line::default(),
    };
    frame.render_widget(Paragraph::new(status), rows[1]);

    frame.render_widget(
        Paragraph::new(Text::from(Line::from(target_spans(test, theme, now))))
            .wrap(Wrap { trim: false }),
        rows[2],
    );

    let summary = match test.state() {
        TestState::Finished => finished_lines(test, theme),
        _ => personal_best_lines(test, theme),
    };
    frame.render_widget(Paragraph::new(summary), rows[3]);

    let hints = match test.state() {
        TestState::Finished => "enter/tab restart · esc options · ctrl+c quit",
        _ => "tab restart · esc options · ctrl+c quit",
    };
    frame.render_widget(Paragraph::new(hints).style(label), rows[4]);
}

fn header(test: &TypingTest) -> String {
    let settings = &test.settings;
    let mut parts = vec![format!("{} words", settings.word_count)];
    if settings.punctuation {
        parts.push("punctuation".into());
    }
    parts.push(settings.layout.name().into());
    parts.join(" · ")
}

fn target_spans<'a>(test: &'a TypingTest, theme: &Theme, now: Instant) -> Vec<Span<'a>> {
    let target = test.target();
    let typed = test.typed();
    let pace = test.pace_position(now);
    let cursor = (test.state() != TestState::Finished).then_some(typed.len());

    (0..target.len().max(typed.len()))
        .map(|index| {
            let expected = target.get(index).copied();
            let (c, mut style) = match typed.get(index) {
                Some(actual) if Some(*actual) == expected => {
                    (*actual, Style::default().fg(theme.correct_text))
                }
                Some(actual) => (
                    expected.unwrap_or(*actual),
                    Style::default()
                        .fg(theme.error_text)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                None => (
                    expected.unwrap_or(' '),
                    Style::default().fg(theme.remaining_text),
                ),
            };
            if cursor == Some(index) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if pace == Some(index) {
                style = style.bg(theme.secondary_accent);
            }
            Span::styled(c.to_string(), style)
        })
        .collect()
}

fn personal_best_lines(test: &TypingTest, theme: &Theme) -> Vec<Line<'static>> {
    let mode = test.results.mode(&test.mode());
    if mode.test_count == 0 {
        return vec![];
    }
    vec![Line::from(Span::styled(
        format!(
            "Best {:.0} wpm · average {:.0} wpm · {} tests",
            mode.personal_best,
            mode.average(),
            mode.test_count
        ),
        Style::default().fg(theme.label_text),
    ))]
}

fn finished_lines(test: &TypingTest, theme: &Theme) -> Vec<Line<'static>> {
    let accent = Style::default()
        .fg(theme.primary_accent)
        .add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(Span::styled("Complete!", accent))];
    if let Some(result) = test.last_result() {
        lines.push(Line::from(Span::styled(
            format!(
                "{:.0} wpm · {} accuracy · {} errors · {:.1}s",
                result.wpm,
                result.accuracy,
                result.errors,
                result.elapsed.as_secs_f64()
            ),
            Style::default().fg(theme.correct_text),
        )));
        if result.personal_best {
            lines.push(Line::from(Span::styled(
                "New personal best!",
                Style::default().fg(theme.secondary_accent),
            )));
        }
    }
    lines
}

fn render_options(frame: &mut Frame, test: &TypingTest, theme: &Theme, area: Rect) {
    let menu: &OptionsMenu = &test.menu;
    let selected = Style::default()
        .bg(theme.selected_bg)
        .fg(theme.primary_accent);
    let normal = Style::default().fg(theme.correct_text);
    let label = Style::default().fg(theme.label_text);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.primary_accent)),
            Span::styled(menu.query.clone(), normal),
        ]),
        Line::default(),
    ];

    match &menu.submenu {
        Some(submenu) => {
            lines.push(Line::from(Span::styled(submenu.option.label, label)));
            for (index, choice) in submenu.option.choices().into_iter().enumerate() {
                let style = if index == submenu.selected { selected } else { normal };
                lines.push(Line::from(Span::styled(format!("  {choice}"), style)));
            }
        }
        None if menu.filtered.is_empty() => {
            lines.push(Line::from(Span::styled("No matching options", label)));
        }
        None => {
            for (index, option) in menu.filtered.iter().enumerate() {
                let style = if index == menu.selected { selected } else { normal };
                lines.push(Line::from(vec![
                    Span::styled(format!("{:<18}", option.label), style),
                    Span::styled(option.value_label(&test.settings), label),
                ]));
            }
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title("Options");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    use crate::{
        cli::typing::words::TextGenerator,
        daemon::storage::{settings::TypingSettings, typing_results::TypingResults},
    };

    use super::*;

    fn screen(test: &TypingTest, width: u16, height: u16) -> Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height))?;
        terminal.draw(|frame| render(frame, test, Instant::now()))?;
        Ok(terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect())
    }

    fn typing_test(target: &str) -> TypingTest {
        let mut test = TypingTest::with_generator(
            TypingSettings::default(),
            TypingResults::default(),
            TextGenerator::with_words(vec!["word".into()]),
        );
        test.set_target(target);
        test
    }

    fn press(test: &mut TypingTest, code: KeyCode) {
        test.handle_key(KeyEvent::new(code, KeyModifiers::NONE), Instant::now());
    }

    #[test]
    fn centering() {
        let empty = Rect::new(0, 0, 0, 0);
        assert_eq!(centered(empty, 10, 10), empty);
        assert_eq!(centered(Rect::new(0, 0, 80, 24), 20, 4), Rect::new(30, 10, 20, 4));
        assert_eq!(centered(Rect::new(0, 0, 10, 5), 20, 8), Rect::new(0, 0, 10, 5));
    }

    #[test]
    fn ready_screen() -> Result<()> {
        let test = typing_test("hello world");
        let screen = screen(&test, 80, 24)?;
        assert!(screen.contains("Start typing"));
        assert!(screen.contains("hello world"));
        assert!(screen.contains("25 words"));
        Ok(())
    }

    #[test]
    fn running_screen() -> Result<()> {
        let mut test = typing_test("hello world");
        for c in "hellx".chars() {
            press(&mut test, KeyCode::Char(c));
        }
        let screen = screen(&test, 80, 24)?;
        assert!(screen.contains("hello world"));
        assert!(screen.contains("wpm"));
        assert!(!screen.contains("Start typing"));
        Ok(())
    }

    #[test]
    fn finished_screen() -> Result<()> {
        let mut test = typing_test("hi");
        press(&mut test, KeyCode::Char('h'));
        press(&mut test, KeyCode::Char('i'));
        test.take_result();
        let screen = screen(&test, 80, 24)?;
        assert!(screen.contains("Complete"));
        assert!(screen.contains("accuracy"));
        Ok(())
    }

    #[test]
    fn options_screen() -> Result<()> {
        let mut test = typing_test("hello");
        press(&mut test, KeyCode::Esc);
        let screen_text = screen(&test, 80, 24)?;
        assert!(screen_text.contains("Options"));
        assert!(screen_text.contains("Theme"));
        assert!(screen_text.contains("Default"));

        for c in "zzzz".chars() {
            press(&mut test, KeyCode::Char(c));
        }
        assert!(screen(&test, 80, 24)?.contains("No matching options"));
        Ok(())
    }

    #[test]
    fn tiny_terminal_does_not_panic() -> Result<()> {
        let test = typing_test("hello");
        screen(&test, 1, 1)?;
        Ok(())
    }
}

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tracing::error;

use crate::{cli::typing, daemon::storage::settings::Settings};

use super::{
    output::{
        format::{format_distance, format_number},
        stats::{DailyStats, HourlyStats, MouseStats},
    },
    terminal::{self, Tui},
    AppContext,
};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub struct DashboardData {
    pub today: DailyStats,
    pub week: Vec<DailyStats>,
    pub hourly: Vec<HourlyStats>,
    pub mouse: MouseStats,
    pub settings: Settings,
}

pub enum DashboardState {
    Loading,
    Ready(Box<DashboardData>),
    Failed(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum DashboardAction {
    Nothing,
    Refresh,
    Quit,
    TypingTest,
}

pub fn handle_key(key: KeyEvent) -> DashboardAction {
    if key.kind != KeyEventKind::Press {
        return DashboardAction::Nothing;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => DashboardAction::Quit,
        KeyCode::Char('q') | KeyCode::Esc => DashboardAction::Quit,
        KeyCode::Char('r') => DashboardAction::Refresh,
        KeyCode::Char('t') => DashboardAction::TypingTest,
        _ => DashboardAction::Nothing,
    }
}

/// Opens the dashboard. `t` leaves it for the typing test.
pub async fn run_dashboard(context: &AppContext) -> Result<()> {
    let next = {
        let (mut terminal, _guard) = terminal::enter()?;
        dashboard_loop(&mut terminal, context).await?
    };
    if next == DashboardAction::TypingTest {
        typing::run_typing_test(context).await?;
    }
    Ok(())
}

async fn dashboard_loop(terminal: &mut Tui, context: &AppContext) -> Result<DashboardAction> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    let mut state = DashboardState::Loading;

    loop {
        terminal.draw(|frame| render(frame, &state))?;
        tokio::select! {
            _ = ticker.tick() => {
                state = load(context).await;
            }
            event = events.next() => {
                let Some(event) = event else { return Ok(DashboardAction::Quit) };
                if let Event::Key(key) = event? {
                    match handle_key(key) {
                        DashboardAction::Nothing => {}
                        DashboardAction::Refresh => state = load(context).await,
                        action => return Ok(action),
                    }
                }
            }
        }
    }
}

async fn load(context: &AppContext) -> DashboardState {
    let data = async {
        let reader = context.reader()?;
        anyhow::Ok(DashboardData {
            today: reader.today_stats().await?,
            week: reader.week_stats().await?,
            hourly: reader.hourly_stats(reader.today()).await?,
            mouse: reader.today_mouse_stats().await?,
            settings: context.settings().load().await,
        })
    };
    match data.await {
        Ok(data) => DashboardState::Ready(Box::new(data)),
        Err(e) => {
            error!("Failed to load dashboard {e:?}");
            DashboardState::Failed(e.to_string())
        }
    }
}

fn bar(value: u64, max: u64) -> char {
    if value == 0 || max == 0 {
        return BARS[0];
    }
    let index = (value * (BARS.len() as u64 - 1) / max).max(1) as usize;
    BARS[index.min(BARS.len() - 1)]
}

/// One column per hour with labels every six hours.
pub fn render_hourly_graph(hourly: &[HourlyStats]) -> String {
    if hourly.is_empty() {
        return "No data".into();
    }
    let max = hourly.iter().map(|h| h.keystrokes).max().unwrap_or(0);
    if max == 0 {
        return "No activity today".into();
    }
    let bars = hourly
        .iter()
        .map(|h| format!("{} ", bar(h.keystrokes, max)))
        .collect::<String>();
    let labels = hourly
        .iter()
        .map(|h| {
            if h.hour % 6 == 0 {
                format!("{:<2}", h.hour)
            } else {
                "  ".into()
            }
        })
        .collect::<String>();
    format!("{}\n{}", bars.trim_end(), labels.trim_end())
}

/// One line per day: weekday, bar and compact count.
pub fn render_weekly_graph(week: &[DailyStats]) -> String {
    if week.is_empty() {
        return "No data".into();
    }
    let max = week.iter().map(|d| d.keystrokes).max().unwrap_or(0);
    if max == 0 {
        return "No activity this week".into();
    }
    week.iter()
        .map(|day| {
            format!(
                "{} {} {}",
                day.date.format("%a"),
                bar(day.keystrokes, max),
                format_number(day.keystrokes)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(frame: &mut Frame, state: &DashboardState) {
    let area = frame.size();
    let data = match state {
        DashboardState::Loading => {
            frame.render_widget(Paragraph::new("Loading..."), area);
            return;
        }
        DashboardState::Failed(message) => {
            let text = vec![
                Line::from(Span::styled(
                    format!("Error: {message}"),
                    Style::default().fg(Color::Red),
                )),
                Line::from("Press q to quit"),
            ];
            frame.render_widget(Paragraph::new(text), area);
            return;
        }
        DashboardState::Ready(data) => data,
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(6),
            Constraint::Length(4),
            Constraint::Min(9),
            Constraint::Length(1),
        ])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[1]);

    let title = Span::styled(
        "Typing Telemetry",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    );
    frame.render_widget(Paragraph::new(Line::from(title)), layout[0]);

    let week_keystrokes: u64 = data.week.iter().map(|d| d.keystrokes).sum();
    let week_words: u64 = data.week.iter().map(|d| d.words).sum();
    let today = vec![
        Line::from(format!("Keystrokes: {}", format_number(data.today.keystrokes))),
        Line::from(format!("Words:      {}", format_number(data.today.words))),
        Line::from(format!("Clicks:     {}", format_number(data.mouse.click_count))),
        Line::from(format!(
            "Distance:   {}",
            format_distance(
                data.mouse.total_distance,
                data.settings.distance_unit,
                data.settings.pixels_per_inch
            )
        )),
    ];
    frame.render_widget(
        Paragraph::new(today).block(Block::default().borders(Borders::ALL).title("Today")),
        columns[0],
    );
    let week = vec![
        Line::from(format!("Keystrokes: {}", format_number(week_keystrokes))),
        Line::from(format!("Words:      {}", format_number(week_words))),
    ];
    frame.render_widget(
        Paragraph::new(week).block(Block::default().borders(Borders::ALL).title("This Week")),
        columns[1],
    );

    frame.render_widget(
        Paragraph::new(render_hourly_graph(&data.hourly))
            .block(Block::default().borders(Borders::ALL).title("Hourly")),
        layout[2],
    );
    frame.render_widget(
        Paragraph::new(render_weekly_graph(&data.week))
            .block(Block::default().borders(Borders::ALL).title("Last 7 days")),
        layout[3],
    );
    frame.render_widget(
        Paragraph::new("q quit · r refresh · t typing test")
            .style(Style::default().fg(Color::DarkGray)),
        layout[4],
    );
}

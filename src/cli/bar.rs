//! Menu bar presenter. A status bar host (xbar, SwiftBar, waybar...) runs `typtel bar` and shows
//! the first line as the title, `--menu` adds the dropdown content.

use std::{fmt::Write, time::Duration};

use anyhow::Result;
use clap::Args;
use tracing::{debug, error};

use crate::daemon::storage::{odometer::OdometerSession, settings::Settings};

use super::{
    output::{
        format::{format_absolute, format_distance, medal},
        stats::{Averages, DailyStats, LeaderboardEntry, MouseStats, Rates},
    },
    AppContext,
};

const WATCH_INTERVAL: Duration = Duration::from_secs(5);
const MENU_LEADERBOARD_SIZE: usize = 10;

#[derive(Args, Debug)]
pub struct BarCommand {
    #[arg(long, help = "Print the full menu after the title")]
    menu: bool,
    #[arg(long, help = "Keep running and print the title whenever it changes")]
    watch: bool,
}

pub async fn process_bar_command(context: &AppContext, command: BarCommand) -> Result<()> {
    if command.watch {
        return watch_title(context).await;
    }

    let settings = context.settings().load().await;
    let reader = context.reader()?;
    let today = reader.today_stats().await?;
    let mouse = reader.today_mouse_stats().await?;
    println!("{}", render_title(&today, &mouse, &settings));

    if command.menu {
        let menu = MenuData {
            today,
            mouse,
            week: reader.week_stats().await?,
            week_mouse: reader.week_mouse_stats().await?,
            averages: reader.averages().await?,
            odometer: context.odometer().load().await,
            leaderboard: reader.mouse_leaderboard(MENU_LEADERBOARD_SIZE).await?,
        };
        println!("---");
        print!("{}", render_menu(&menu, &settings));
    }
    Ok(())
}

/// Polls the store and prints the title only when it differs from the last one printed.
async fn watch_title(context: &AppContext) -> Result<()> {
    let reader = context.reader()?;
    let mut last = None;
    let mut ticker = tokio::time::interval(WATCH_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let settings = context.settings().load().await;
        let title = match (reader.today_stats().await, reader.today_mouse_stats().await) {
            (Ok(today), Ok(mouse)) => render_title(&today, &mouse, &settings),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to read today's stats {e:?}");
                "⌨️ --".to_string()
            }
        };
        if last.as_ref() != Some(&title) {
            println!("{title}");
            last = Some(title);
        } else {
            debug!("Title unchanged");
        }
    }
}

/// Enabled parts joined by ` | `. Distance is only shown once there is some.
pub fn render_title(today: &DailyStats, mouse: &MouseStats, settings: &Settings) -> String {
    let mut parts = vec![];
    if settings.show_keystrokes {
        parts.push(format!("⌨️{}", format_absolute(today.keystrokes)));
    }
    if settings.show_words {
        parts.push(format!("{}w", format_absolute(today.words)));
    }
    if settings.show_clicks {
        parts.push(format!("🖱️{}", format_absolute(mouse.click_count)));
    }
    if settings.show_distance && mouse.total_distance > 0. {
        parts.push(distance(mouse.total_distance, settings));
    }

    if parts.is_empty() {
        "⌨️".into()
    } else {
        parts.join(" | ")
    }
}

pub struct MenuData {
    pub today: DailyStats,
    pub mouse: MouseStats,
    pub week: Vec<DailyStats>,
    pub week_mouse: Vec<MouseStats>,
    pub averages: Averages,
    pub odometer: OdometerSession,
    pub leaderboard: Vec<LeaderboardEntry>,
}

pub fn render_menu(menu: &MenuData, settings: &Settings) -> String {
    let mut out = String::new();
    let week_keystrokes: u64 = menu.week.iter().map(|d| d.keystrokes).sum();
    let week_words: u64 = menu.week.iter().map(|d| d.words).sum();
    let week_clicks: u64 = menu.week_mouse.iter().map(|d| d.click_count).sum();
    let week_distance: f64 = menu.week_mouse.iter().map(|d| d.total_distance).sum();

    let _ = writeln!(
        out,
        "Today: {} keystrokes ({} words)",
        format_absolute(menu.today.keystrokes),
        format_absolute(menu.today.words)
    );
    let _ = writeln!(
        out,
        "Today: 🖱️ {} clicks, {} distance",
        format_absolute(menu.mouse.click_count),
        distance(menu.mouse.total_distance, settings)
    );
    let _ = writeln!(
        out,
        "This Week: {} keystrokes ({} words)",
        format_absolute(week_keystrokes),
        format_absolute(week_words)
    );
    let _ = writeln!(
        out,
        "This Week: 🖱️ {} clicks, {} distance",
        format_absolute(week_clicks),
        distance(week_distance, settings)
    );

    let _ = writeln!(out, "Hourly average today:");
    write_hourly(&mut out, &menu.averages.today_per_hour, settings);
    let _ = writeln!(out, "Hourly average this week:");
    write_hourly(&mut out, &menu.averages.week_per_hour, settings);

    let daily = &menu.averages.week_per_day;
    let _ = writeln!(out, "Daily average:");
    let _ = writeln!(out, "   {} keystrokes/day", format_absolute(daily.keystrokes as u64));
    let _ = writeln!(out, "   {} words/day", format_absolute(daily.words as u64));
    let _ = writeln!(out, "   {} clicks/day", format_absolute(daily.clicks as u64));
    let _ = writeln!(out, "   {}/day", distance(daily.distance, settings));

    let state = if menu.odometer.active { "Active" } else { "Inactive" };
    let _ = writeln!(
        out,
        "Odometer: {state} ({}) {} keystrokes, {} words, {}",
        settings.odometer_hotkey.label(),
        format_absolute(menu.odometer.keystrokes),
        format_absolute(menu.odometer.words),
        distance(menu.odometer.distance, settings)
    );

    if !menu.leaderboard.is_empty() {
        let _ = writeln!(out, "Stillness Leaderboard:");
        for entry in &menu.leaderboard {
            let prefix = medal(entry.rank).map(|m| format!("{m} ")).unwrap_or_default();
            let _ = writeln!(
                out,
                "   {prefix}#{}: {} - {}",
                entry.rank,
                entry.date.format("%b %-d, %Y"),
                distance(entry.total_distance, settings)
            );
        }
    }
    out
}

fn write_hourly(out: &mut String, rates: &Rates, settings: &Settings) {
    let _ = writeln!(out, "   {:.0} keystrokes/hr", rates.keystrokes);
    let _ = writeln!(out, "   {:.0} words/hr", rates.words);
    let _ = writeln!(out, "   {:.0} clicks/hr", rates.clicks);
    let _ = writeln!(out, "   {}/hr", distance(rates.distance, settings));
}

fn distance(pixels: f64, settings: &Settings) -> String {
    format_distance(pixels, settings.distance_unit, settings.pixels_per_inch)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        cli::output::stats::{Averages, DailyStats, LeaderboardEntry, MouseStats, Rates},
        daemon::storage::{odometer::OdometerSession, settings::Settings},
    };

    use super::{render_menu, render_title, MenuData};

    const TODAY: NaiveDate = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();

    fn today(keystrokes: u64, words: u64) -> DailyStats {
        DailyStats {
            date: TODAY,
            keystrokes,
            words,
            letters: keystrokes,
            modifiers: 0,
            special: 0,
        }
    }

    fn mouse(distance: f64, clicks: u64) -> MouseStats {
        MouseStats {
            date: TODAY,
            total_distance: distance,
            movement_count: 1,
            click_count: clicks,
        }
    }

    #[test]
    fn title_uses_enabled_parts() {
        let settings = Settings::default();
        assert_eq!(
            render_title(&today(12345, 2000), &mouse(0., 3), &settings),
            "⌨️12,345 | 2,000w"
        );

        let settings = Settings {
            show_clicks: true,
            show_distance: true,
            ..Settings::default()
        };
        assert_eq!(
            render_title(&today(1, 0), &mouse(1200., 3), &settings),
            "⌨️1 | 0w | 🖱️3 | 1ft"
        );
        assert_eq!(
            render_title(&today(1, 0), &mouse(0., 3), &settings),
            "⌨️1 | 0w | 🖱️3"
        );
    }

    #[test]
    fn empty_selection_is_keyboard_icon() {
        let settings = Settings {
            show_keystrokes: false,
            show_words: false,
            ..Settings::default()
        };
        assert_eq!(render_title(&today(5, 1), &mouse(10., 1), &settings), "⌨️");
    }

    #[test]
    fn menu_lists_totals_and_medals() {
        let rates = Rates {
            keystrokes: 120.4,
            words: 20.,
            clicks: 2.,
            distance: 1200.,
        };
        let menu = MenuData {
            today: today(1000, 100),
            mouse: mouse(2400., 4),
            week: vec![today(1000, 100), today(500, 50)],
            week_mouse: vec![mouse(2400., 4)],
            averages: Averages {
                today_per_hour: rates,
                week_per_hour: rates,
                week_per_day: rates,
            },
            odometer: OdometerSession::default(),
            leaderboard: (1..=4)
                .map(|rank| LeaderboardEntry {
                    rank,
                    date: TODAY,
                    total_distance: 1200.,
                })
                .collect(),
        };
        let rendered = render_menu(&menu, &Settings::default());
        assert!(rendered.contains("Today: 1,000 keystrokes (100 words)"));
        assert!(rendered.contains("This Week: 1,500 keystrokes (150 words)"));
        assert!(rendered.contains("   120 keystrokes/hr"));
        assert!(rendered.contains("Odometer: Inactive (⌘⌃O)"));
        assert!(rendered.contains("🥇 #1: Jul 4, 2018 - 1ft"));
        assert!(rendered.contains("   #4: Jul 4, 2018"));
    }
}

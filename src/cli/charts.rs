//! Static HTML pages opened in the browser: charts of the recorded history and the stillness
//! leaderboard.

use std::{
    fmt::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::{
    daemon::storage::{entities::DayRecord, odometer::OdometerSession, settings::Settings},
    utils::units::{pixels_to_feet, DistanceUnit, FEET_PER_CAR, FEET_PER_FRISBEE_FIELD},
};

use super::{
    output::{
        format::{format_distance, medal},
        stats::LeaderboardEntry,
    },
    AppContext,
};

const CHARTS_TEMPLATE: &str = include_str!("../../assets/charts.html");
const DATA_PLACEHOLDER: &str = "__TYPTEL_DATA__";
pub const CHARTS_FILE: &str = "charts.html";
pub const LEADERBOARD_FILE: &str = "leaderboard.html";
const LEADERBOARD_SIZE: usize = 30;
const HEATMAP_LEVELS: u64 = 4;

#[derive(Debug, Serialize)]
struct ChartsData {
    weekly: PeriodData,
    monthly: PeriodData,
    yearly: PeriodData,
    odometer: OdometerData,
    show_key_types: bool,
    unit: DistanceUnit,
    feet_per_unit: FeetPerUnit,
}

#[derive(Debug, Serialize)]
struct FeetPerUnit {
    feet: f64,
    cars: f64,
    frisbee: f64,
}

#[derive(Debug, Default, Serialize)]
struct PeriodData {
    labels: Vec<String>,
    keystrokes: Vec<u64>,
    words: Vec<u64>,
    letters: Vec<u64>,
    modifiers: Vec<u64>,
    special: Vec<u64>,
    distance_feet: Vec<f64>,
    totals: PeriodTotals,
    heatmap: Vec<HeatmapRow>,
}

#[derive(Debug, Default, Serialize)]
struct PeriodTotals {
    keystrokes: u64,
    words: u64,
    distance_feet: f64,
}

#[derive(Debug, Serialize)]
struct HeatmapRow {
    label: String,
    keystrokes: Vec<u64>,
    levels: Vec<u64>,
}

#[derive(Debug, Serialize)]
struct OdometerData {
    active: bool,
    start_time: Option<String>,
    keystrokes: u64,
    words: u64,
    clicks: u64,
    distance_feet: f64,
}

/// Color bucket of a heatmap cell: 0 for no activity, then quarters of the busiest hour.
fn heatmap_level(value: u64, max: u64) -> u64 {
    if value == 0 || max == 0 {
        return 0;
    }
    let ratio = value as f64 / max as f64;
    ((ratio * HEATMAP_LEVELS as f64) as u64 + 1).min(HEATMAP_LEVELS)
}

fn period(days: &[DayRecord], pixels_per_inch: f64) -> PeriodData {
    let mut data = PeriodData::default();
    let max_hour = days
        .iter()
        .flat_map(|day| day.hours.iter().map(|h| h.keystrokes))
        .max()
        .unwrap_or(0);

    for day in days {
        let totals = day.totals();
        let feet = pixels_to_feet(totals.distance, pixels_per_inch);
        data.labels.push(day.date.format("%b %-d").to_string());
        data.keystrokes.push(totals.keystrokes);
        data.words.push(totals.words);
        data.letters.push(totals.letters);
        data.modifiers.push(totals.modifiers);
        data.special.push(totals.special);
        data.distance_feet.push(feet);
        data.totals.keystrokes += totals.keystrokes;
        data.totals.words += totals.words;
        data.totals.distance_feet += feet;

        let keystrokes = day.hours.iter().map(|h| h.keystrokes).collect::<Vec<_>>();
        data.heatmap.push(HeatmapRow {
            label: day.date.format("%a %b %-d").to_string(),
            levels: keystrokes.iter().map(|k| heatmap_level(*k, max_hour)).collect(),
            keystrokes,
        });
    }
    data
}

fn odometer_data(session: &OdometerSession, pixels_per_inch: f64) -> OdometerData {
    OdometerData {
        active: session.active,
        start_time: session.started_at.map(|start| {
            DateTime::<Local>::from(start)
                .format("%b %-d, %Y %-I:%M %p")
                .to_string()
        }),
        keystrokes: session.keystrokes,
        words: session.words,
        clicks: session.clicks,
        distance_feet: pixels_to_feet(session.distance, pixels_per_inch),
    }
}

/// Tail of `days` covering the last `n` days.
fn last(days: &[DayRecord], n: usize) -> &[DayRecord] {
    &days[days.len().saturating_sub(n)..]
}

/// `year` holds the last 365 days in order, oldest first.
fn render_charts(
    year: &[DayRecord],
    odometer: &OdometerSession,
    settings: &Settings,
) -> Result<String> {
    let ppi = settings.pixels_per_inch;
    let data = ChartsData {
        weekly: period(last(year, 7), ppi),
        monthly: period(last(year, 30), ppi),
        yearly: period(year, ppi),
        odometer: odometer_data(odometer, ppi),
        show_key_types: settings.show_key_types,
        unit: settings.distance_unit,
        feet_per_unit: FeetPerUnit {
            feet: 1.,
            cars: FEET_PER_CAR,
            frisbee: FEET_PER_FRISBEE_FIELD,
        },
    };
    // Keeps a stray "</script>" inside a string from closing the tag.
    let json = serde_json::to_string(&data)?.replace("</", "<\\/");
    Ok(CHARTS_TEMPLATE.replace(DATA_PLACEHOLDER, &json))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_leaderboard_page(entries: &[LeaderboardEntry], settings: &Settings) -> String {
    let mut rows = String::new();
    for entry in entries {
        let rank = medal(entry.rank)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("#{}", entry.rank));
        let _ = write!(
            rows,
            r#"
            <tr>
                <td class="rank">{rank}</td>
                <td class="date">{}</td>
                <td class="distance">{}</td>
            </tr>"#,
            entry.date.format("%A, %b %-d, %Y"),
            escape_html(&format_distance(
                entry.total_distance,
                settings.distance_unit,
                settings.pixels_per_inch
            )),
        );
    }
    if entries.is_empty() {
        rows.push_str(
            r#"
            <tr><td colspan="3" class="empty">No mouse activity recorded yet</td></tr>"#,
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Stillness Leaderboard</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: #16161e;
            color: #e0e0e0;
            display: flex;
            justify-content: center;
            padding: 40px;
        }}
        .leaderboard-container {{ background: #1f1f2e; border-radius: 12px; padding: 24px 32px; }}
        h1 {{ margin-top: 0; }}
        table {{ border-collapse: collapse; min-width: 480px; }}
        td {{ padding: 10px 14px; border-bottom: 1px solid #2a2a3a; }}
        .rank {{ width: 48px; text-align: center; font-size: 20px; }}
        .distance {{ text-align: right; color: #7aa2f7; font-variant-numeric: tabular-nums; }}
        .empty {{ text-align: center; color: #808090; }}
        .note {{ color: #808090; font-size: 13px; max-width: 480px; }}
    </style>
</head>
<body>
    <div class="leaderboard-container">
        <h1>🧘 Stillness Leaderboard</h1>
        <table>{rows}
        </table>
        <p class="note">
            Days when you moved your mouse the least. Days without any recorded movement are left
            out.
        </p>
    </div>
</body>
</html>
"#
    )
}

/// Writes the page into the application directory and returns its path.
async fn write_page(dir: &Path, name: &str, content: String) -> Result<PathBuf> {
    let path = dir.join(name);
    tokio::fs::write(&path, content).await?;
    Ok(path)
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        fn browser_command(path: &Path) -> Command {
            let mut command = Command::new("open");
            command.arg(path);
            command
        }
    } else if #[cfg(windows)] {
        fn browser_command(path: &Path) -> Command {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            command
        }
    } else {
        fn browser_command(path: &Path) -> Command {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        }
    }
}

fn open_in_browser(path: &Path) -> Result<()> {
    let status = browser_command(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if !status.success() {
        bail!("Can't open {path:?} in the browser, open it manually");
    }
    Ok(())
}

async fn publish(dir: &Path, name: &str, content: String) -> Result<()> {
    let path = write_page(dir, name, content).await?;
    info!("Wrote {path:?}");
    println!("Saved to {}", path.display());
    open_in_browser(&path)
}

pub async fn open_charts(context: &AppContext) -> Result<()> {
    let settings = context.settings().load().await;
    let odometer = context.odometer().load().await;
    let year = context.reader()?.last_days(365).await?;
    let page = render_charts(&year, &odometer, &settings)?;
    publish(context.dir(), CHARTS_FILE, page).await
}

pub async fn open_leaderboard(context: &AppContext) -> Result<()> {
    let settings = context.settings().load().await;
    let entries = context.reader()?.mouse_leaderboard(LEADERBOARD_SIZE).await?;
    let page = render_leaderboard_page(&entries, &settings);
    publish(context.dir(), LEADERBOARD_FILE, page).await
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use serde_json::Value;
    use tempfile::tempdir;

    use crate::daemon::storage::entities::{CountersEntity, HourDeltaEntity};

    use super::*;

    const TODAY: NaiveDate = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();

    fn year() -> Vec<DayRecord> {
        (0..365)
            .rev()
            .map(|offset| {
                let mut day = DayRecord::empty(TODAY - Duration::days(offset));
                if offset < 3 {
                    day.apply(&HourDeltaEntity::new(
                        9,
                        CountersEntity {
                            keystrokes: 100 * (offset as u64 + 1),
                            words: 20,
                            letters: 80,
                            distance: 1200. * 15.,
                            ..Default::default()
                        },
                    ));
                }
                day
            })
            .collect()
    }

    fn embedded_data(page: &str) -> Result<Value> {
        let start = page.find("const data = ").unwrap() + "const data = ".len();
        let end = start + page[start..].find(";\n").unwrap();
        Ok(serde_json::from_str(&page[start..end])?)
    }

    #[test]
    fn heatmap_levels() {
        assert_eq!(heatmap_level(0, 100), 0);
        assert_eq!(heatmap_level(5, 0), 0);
        assert_eq!(heatmap_level(1, 100), 1);
        assert_eq!(heatmap_level(30, 100), 2);
        assert_eq!(heatmap_level(60, 100), 3);
        assert_eq!(heatmap_level(80, 100), 4);
        assert_eq!(heatmap_level(100, 100), 4);
    }

    #[test]
    fn charts_page_embeds_periods() -> Result<()> {
        let odometer = OdometerSession {
            active: true,
            started_at: Some(Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap()),
            keystrokes: 42,
            ..Default::default()
        };
        let settings = Settings {
            show_key_types: true,
            distance_unit: DistanceUnit::Cars,
            ..Default::default()
        };
        let page = render_charts(&year(), &odometer, &settings)?;
        assert!(!page.contains(DATA_PLACEHOLDER));
        assert!(page.contains("chart.js"));

        let data = embedded_data(&page)?;
        assert_eq!(data["weekly"]["labels"].as_array().unwrap().len(), 7);
        assert_eq!(data["monthly"]["labels"].as_array().unwrap().len(), 30);
        assert_eq!(data["yearly"]["labels"].as_array().unwrap().len(), 365);
        assert_eq!(data["weekly"]["labels"][6], "Jul 4");
        assert_eq!(data["weekly"]["keystrokes"][6], 100);
        assert_eq!(data["weekly"]["totals"]["keystrokes"], 600);
        assert_eq!(data["weekly"]["totals"]["distance_feet"], 45.);
        assert_eq!(data["weekly"]["heatmap"][4]["label"], "Mon Jul 2");
        assert_eq!(data["weekly"]["heatmap"][4]["levels"][9], 4);
        assert_eq!(data["weekly"]["heatmap"][6]["levels"][9], 2);
        assert_eq!(data["weekly"]["heatmap"][6]["levels"][10], 0);
        assert_eq!(data["show_key_types"], true);
        assert_eq!(data["unit"], "cars");
        assert_eq!(data["feet_per_unit"]["frisbee"], 330.);
        assert_eq!(data["odometer"]["active"], true);
        assert_eq!(data["odometer"]["keystrokes"], 42);
        assert!(data["odometer"]["start_time"].as_str().unwrap().contains("2018"));
        Ok(())
    }

    #[test]
    fn leaderboard_page() {
        let entries = (1..=4)
            .map(|rank| LeaderboardEntry {
                rank,
                date: NaiveDate::from_ymd_opt(2006, 1, rank as u32 + 1).unwrap(),
                total_distance: 1200. * rank as f64,
            })
            .collect::<Vec<_>>();
        let page = render_leaderboard_page(&entries, &Settings::default());
        assert!(page.contains("Stillness Leaderboard"));
        assert!(page.contains("🥇"));
        assert!(page.contains("🥉"));
        assert!(page.contains("#4"));
        assert!(page.contains("Monday, Jan 2, 2006"));
        assert!(page.contains("1ft"));

        let empty = render_leaderboard_page(&[], &Settings::default());
        assert!(empty.contains("No mouse activity recorded yet"));
    }

    #[tokio::test]
    async fn pages_are_written_to_the_app_dir() -> Result<()> {
        let dir = tempdir()?;
        let path = write_page(dir.path(), LEADERBOARD_FILE, "<html></html>".into()).await?;
        assert_eq!(path, dir.path().join(LEADERBOARD_FILE));
        assert_eq!(tokio::fs::read_to_string(path).await?, "<html></html>");
        Ok(())
    }
}

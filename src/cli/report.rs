use std::fmt::{Display, Write};

use ansi_term::Colour;
use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    daemon::storage::{
        entities::{CountersEntity, DayRecord},
        settings::Settings,
        typing_results::TypingResults,
    },
    utils::percentage::ratio_percentage,
};

use super::{
    output::{
        format::{format_absolute, format_distance, medal},
        stats::{Averages, LeaderboardEntry},
    },
    AppContext, Args,
};

const DEFAULT_REPORT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct StatsCommand {
    #[arg(
        long = "start",
        short,
        help = "First day of the table. Examples are \"yesterday\", \"last monday\", \"15/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "Last day of the table. Examples are \"yesterday\", \"15/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long,
        conflicts_with_all = ["start_date", "end_date"],
        help = "Show the current calendar week, starting on Monday"
    )]
    week: bool,
}

pub async fn print_today(context: &AppContext) -> Result<()> {
    let stats = context.reader()?.today_stats().await?;
    println!(
        "Today: {} keystrokes, {} words",
        format_absolute(stats.keystrokes),
        format_absolute(stats.words)
    );
    Ok(())
}

/// `stats` prints today, a per day table, averages, the key type split and typing test records.
pub async fn process_stats_command(context: &AppContext, command: StatsCommand) -> Result<()> {
    let reader = context.reader()?;
    let now = Local::now();
    let (start, end) = if command.week {
        (week_start(now), now.date_naive())
    } else {
        parse_range(command.start_date, command.end_date, command.date_style, now)?
    };

    let report = StatsReport {
        today: reader.day(reader.today()).await?,
        days: reader.range(start, end).await?,
        averages: reader.averages().await?,
        typing: context.typing_results().load().await,
        settings: context.settings().load().await,
    };
    print!("{report}");
    Ok(())
}

pub async fn print_leaderboard(context: &AppContext, limit: usize) -> Result<()> {
    let settings = context.settings().load().await;
    let entries = context.reader()?.mouse_leaderboard(limit).await?;
    print!("{}", render_leaderboard(&entries, &settings));
    Ok(())
}

fn render_leaderboard(entries: &[LeaderboardEntry], settings: &Settings) -> String {
    if entries.is_empty() {
        return "No mouse activity recorded yet\n".into();
    }
    let mut out = String::new();
    for entry in entries {
        let rank = medal(entry.rank)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", entry.rank));
        let _ = writeln!(
            out,
            "{rank:>4}  {}  {}",
            entry.date.format("%a %b %e, %Y"),
            format_distance(
                entry.total_distance,
                settings.distance_unit,
                settings.pixels_per_inch
            )
        );
    }
    out
}

fn week_start(now: DateTime<Local>) -> NaiveDate {
    now.beginning_of_week().date_naive()
}

/// Resolves the inclusive day range of the table. Defaults to the last 7 days.
fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<(NaiveDate, NaiveDate)> {
    let dialect: chrono_english::Dialect = date_style.into();
    let parse = |value: Option<String>, name: &str| -> Result<Option<NaiveDate>> {
        match value.map(|s| parse_date_string(&s, now, dialect)) {
            Some(Ok(v)) => Ok(Some(v.with_timezone(&Local).date_naive())),
            Some(Err(e)) => Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate {name} date {e}"),
                )
                .into()),
            None => Ok(None),
        }
    };

    let end = parse(end_date, "end")?.unwrap_or(now.date_naive());
    let start = parse(start_date, "start")?
        .unwrap_or(end - Duration::days(DEFAULT_REPORT_DAYS - 1));
    if start > end {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Start {start} is after end {end}"),
            )
            .into());
    }
    Ok((start, end))
}

struct StatsReport {
    today: DayRecord,
    days: Vec<DayRecord>,
    averages: Averages,
    typing: TypingResults,
    settings: Settings,
}

impl StatsReport {
    fn distance(&self, pixels: f64) -> String {
        format_distance(
            pixels,
            self.settings.distance_unit,
            self.settings.pixels_per_inch,
        )
    }
}

impl Display for StatsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let heading = Colour::Cyan.bold();
        let today = self.today.totals();

        writeln!(f, "{}", heading.paint(format!("Today ({})", self.today.date)))?;
        writeln!(f, "  Keystrokes  {}", format_absolute(today.keystrokes))?;
        writeln!(f, "  Words       {}", format_absolute(today.words))?;
        writeln!(f, "  Clicks      {}", format_absolute(today.clicks))?;
        writeln!(f, "  Distance    {}", self.distance(today.distance))?;
        writeln!(f)?;

        writeln!(
            f,
            "{}",
            heading.paint(format!(
                "{:<12}{:>12}{:>10}{:>10}{:>14}",
                "Date", "Keystrokes", "Words", "Clicks", "Distance"
            ))
        )?;
        let mut total = CountersEntity::default();
        for day in &self.days {
            let totals = day.totals();
            total += &totals;
            writeln!(
                f,
                "{:<12}{:>12}{:>10}{:>10}{:>14}",
                day.date.format("%Y-%m-%d").to_string(),
                format_absolute(totals.keystrokes),
                format_absolute(totals.words),
                format_absolute(totals.clicks),
                self.distance(totals.distance)
            )?;
        }
        writeln!(
            f,
            "{}",
            Colour::White.bold().paint(format!(
                "{:<12}{:>12}{:>10}{:>10}{:>14}",
                "Total",
                format_absolute(total.keystrokes),
                format_absolute(total.words),
                format_absolute(total.clicks),
                self.distance(total.distance)
            ))
        )?;
        writeln!(f)?;

        let averages = &self.averages;
        writeln!(f, "{}", heading.paint("Averages"))?;
        writeln!(
            f,
            "  Today       {:.0} keystrokes/hr, {:.0} words/hr",
            averages.today_per_hour.keystrokes, averages.today_per_hour.words
        )?;
        writeln!(
            f,
            "  This week   {:.0} keystrokes/hr, {:.0} words/hr",
            averages.week_per_hour.keystrokes, averages.week_per_hour.words
        )?;
        writeln!(
            f,
            "  Per day     {} keystrokes, {} words",
            format_absolute(averages.week_per_day.keystrokes as u64),
            format_absolute(averages.week_per_day.words as u64)
        )?;
        writeln!(f)?;

        writeln!(f, "{}", heading.paint("Key types"))?;
        writeln!(
            f,
            "  Letters {}  Modifiers {}  Special {}",
            ratio_percentage(total.letters, total.keystrokes),
            ratio_percentage(total.modifiers, total.keystrokes),
            ratio_percentage(total.special, total.keystrokes)
        )?;
        writeln!(f)?;

        writeln!(f, "{}", heading.paint("Typing test"))?;
        let overall = &self.typing.overall;
        if overall.test_count == 0 {
            writeln!(f, "  No tests taken yet, try `typtel test`")?;
        } else {
            writeln!(
                f,
                "  Personal best {:.0} WPM, average {:.0} WPM over {} tests",
                overall.personal_best,
                overall.average(),
                overall.test_count
            )?;
        }
        Ok(())
    }
}

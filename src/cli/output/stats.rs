//! Read side of the store. Every query works on whole local days and treats missing files and
//! hours as zero.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use chrono::NaiveDate;
use futures::TryStreamExt;

use crate::{
    daemon::storage::{entities::DayRecord, record_storage::RecordStorage},
    utils::{clock::Clock, time::trailing_days},
};

use super::extract_days;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub keystrokes: u64,
    pub words: u64,
    pub letters: u64,
    pub modifiers: u64,
    pub special: u64,
}

impl From<&DayRecord> for DailyStats {
    fn from(day: &DayRecord) -> Self {
        let totals = day.totals();
        Self {
            date: day.date,
            keystrokes: totals.keystrokes,
            words: totals.words,
            letters: totals.letters,
            modifiers: totals.modifiers,
            special: totals.special,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyStats {
    pub hour: u8,
    pub keystrokes: u64,
    pub words: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseStats {
    pub date: NaiveDate,
    /// Pixels.
    pub total_distance: f64,
    pub movement_count: u64,
    pub click_count: u64,
}

impl From<&DayRecord> for MouseStats {
    fn from(day: &DayRecord) -> Self {
        let totals = day.totals();
        Self {
            date: day.date,
            total_distance: totals.distance,
            movement_count: totals.movements,
            click_count: totals.clicks,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub date: NaiveDate,
    pub total_distance: f64,
}

/// Per hour or per day rates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rates {
    pub keystrokes: f64,
    pub words: f64,
    pub clicks: f64,
    pub distance: f64,
}

impl Rates {
    fn of(days: &[DayRecord], divisor: f64) -> Self {
        let mut rates = Rates::default();
        for day in days {
            let totals = day.totals();
            rates.keystrokes += totals.keystrokes as f64;
            rates.words += totals.words as f64;
            rates.clicks += totals.clicks as f64;
            rates.distance += totals.distance;
        }
        rates.keystrokes /= divisor;
        rates.words /= divisor;
        rates.clicks /= divisor;
        rates.distance /= divisor;
        rates
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averages {
    /// Today divided by today's active hours.
    pub today_per_hour: Rates,
    /// Last 7 days divided by their summed active hours.
    pub week_per_hour: Rates,
    /// Last 7 days divided by the days that had any activity.
    pub week_per_day: Rates,
}

/// Queries over a [RecordStorage]. "Today" comes from the clock, so tests can pin it.
pub struct StatsReader<R> {
    storage: Arc<R>,
    clock: Box<dyn Clock>,
}

impl<R: RecordStorage + Send + Sync + 'static> StatsReader<R> {
    pub fn new(storage: R, clock: Box<dyn Clock>) -> Self {
        Self {
            storage: Arc::new(storage),
            clock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn day(&self, date: NaiveDate) -> Result<DayRecord> {
        self.storage.get_data_for(date).await
    }

    /// The `n` days ending today, oldest first.
    pub async fn last_days(&self, n: u32) -> Result<Vec<DayRecord>> {
        let days = trailing_days(self.today(), n);
        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return Ok(vec![]);
        };
        self.range(*first, *last).await
    }

    pub async fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayRecord>> {
        extract_days(self.storage.clone(), start, end)
            .try_collect()
            .await
    }

    pub async fn today_stats(&self) -> Result<DailyStats> {
        self.day_stats(self.today()).await
    }

    pub async fn day_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        Ok(DailyStats::from(&self.day(date).await?))
    }

    pub async fn week_stats(&self) -> Result<Vec<DailyStats>> {
        self.historical_stats(7).await
    }

    pub async fn historical_stats(&self, days: u32) -> Result<Vec<DailyStats>> {
        Ok(self.last_days(days).await?.iter().map(DailyStats::from).collect())
    }

    pub async fn hourly_stats(&self, date: NaiveDate) -> Result<Vec<HourlyStats>> {
        Ok(hourly(&self.day(date).await?))
    }

    pub async fn all_hourly_stats_for_days(
        &self,
        days: u32,
    ) -> Result<BTreeMap<NaiveDate, Vec<HourlyStats>>> {
        Ok(self
            .last_days(days)
            .await?
            .iter()
            .map(|day| (day.date, hourly(day)))
            .collect())
    }

    pub async fn today_mouse_stats(&self) -> Result<MouseStats> {
        Ok(MouseStats::from(&self.day(self.today()).await?))
    }

    pub async fn week_mouse_stats(&self) -> Result<Vec<MouseStats>> {
        self.mouse_historical_stats(7).await
    }

    pub async fn mouse_historical_stats(&self, days: u32) -> Result<Vec<MouseStats>> {
        Ok(self.last_days(days).await?.iter().map(MouseStats::from).collect())
    }

    /// Days with the least mouse travel. Days without any recorded travel don't take part.
    pub async fn mouse_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut days = vec![];
        for date in self.storage.recorded_days().await? {
            let distance = self.day(date).await?.totals().distance;
            if distance > 0. {
                days.push((date, distance));
            }
        }
        days.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        Ok(days
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, (date, total_distance))| LeaderboardEntry {
                rank: i + 1,
                date,
                total_distance,
            })
            .collect())
    }

    /// Hours of `date` with keystrokes, at least 1 so it can be divided by.
    pub async fn active_hours(&self, date: NaiveDate) -> Result<usize> {
        Ok(self.day(date).await?.active_hours().max(1))
    }

    pub async fn averages(&self) -> Result<Averages> {
        let week = self.last_days(7).await?;
        let today = week.last().cloned().unwrap_or_else(|| DayRecord::empty(self.today()));

        let week_hours: usize = week.iter().map(DayRecord::active_hours).sum();
        let active_days = week.iter().filter(|day| day.active_hours() > 0).count();

        Ok(Averages {
            today_per_hour: Rates::of(&[today.clone()], today.active_hours().max(1) as f64),
            week_per_hour: Rates::of(&week, week_hours.max(1) as f64),
            week_per_day: Rates::of(&week, active_days.max(1) as f64),
        })
    }
}

fn hourly(day: &DayRecord) -> Vec<HourlyStats> {
    day.hours
        .iter()
        .enumerate()
        .map(|(hour, counters)| HourlyStats {
            hour: hour as u8,
            keystrokes: counters.keystrokes,
            words: counters.words,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
    use tempfile::{tempdir, TempDir};

    use crate::{
        daemon::storage::{
            entities::CountersEntity,
            record_storage::{record_delta, RecordStorageImpl},
        },
        utils::{clock::test_clock::FixedClock, logging::TEST_LOGGING},
    };

    use super::StatsReader;

    const TODAY: NaiveDate = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(TODAY, NaiveTime::from_hms_opt(15, 0, 0).unwrap());

    fn typing(keystrokes: u64, words: u64) -> CountersEntity {
        CountersEntity {
            keystrokes,
            letters: keystrokes,
            words,
            ..Default::default()
        }
    }

    fn mouse(distance: f64, clicks: u64) -> CountersEntity {
        CountersEntity {
            distance,
            movements: 1,
            clicks,
            ..Default::default()
        }
    }

    fn reader() -> Result<(TempDir, RecordStorageImpl, StatsReader<RecordStorageImpl>)> {
        let dir = tempdir()?;
        let writer = RecordStorageImpl::new(dir.path().to_path_buf())?;
        let reader = StatsReader::new(
            RecordStorageImpl::new(dir.path().to_path_buf())?,
            Box::new(FixedClock::at_local(TEST_START_DATE)),
        );
        Ok((dir, writer, reader))
    }

    #[tokio::test]
    async fn empty_store_reads_as_zero() -> Result<()> {
        *TEST_LOGGING;
        let (_dir, _, reader) = reader()?;

        let today = reader.today_stats().await?;
        assert_eq!(today.date, TODAY);
        assert_eq!(today.keystrokes, 0);

        let week = reader.week_stats().await?;
        assert_eq!(week.len(), 7);
        assert_eq!(week.last().map(|v| v.date), Some(TODAY));
        assert_eq!(week[0].date, TODAY - Duration::days(6));

        let hourly = reader.hourly_stats(TODAY).await?;
        assert_eq!(hourly.len(), 24);
        assert!(hourly.iter().enumerate().all(|(i, h)| h.hour as usize == i));

        assert!(reader.mouse_leaderboard(10).await?.is_empty());
        assert_eq!(reader.active_hours(TODAY).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn daily_and_hourly_stats() -> Result<()> {
        let (_dir, writer, reader) = reader()?;
        record_delta(&writer, TODAY, 9, typing(100, 20)).await?;
        record_delta(&writer, TODAY, 9, typing(50, 5)).await?;
        record_delta(&writer, TODAY, 14, typing(10, 1)).await?;
        record_delta(&writer, TODAY - Duration::days(2), 9, typing(7, 1)).await?;

        let today = reader.today_stats().await?;
        assert_eq!(today.keystrokes, 160);
        assert_eq!(today.words, 26);
        assert_eq!(today.letters, 160);

        let hourly = reader.hourly_stats(TODAY).await?;
        assert_eq!(hourly[9].keystrokes, 150);
        assert_eq!(hourly[14].words, 1);
        assert_eq!(hourly[0].keystrokes, 0);

        let week = reader.week_stats().await?;
        assert_eq!(week[4].keystrokes, 7);
        assert_eq!(week[6].keystrokes, 160);

        let history = reader.historical_stats(30).await?;
        assert_eq!(history.len(), 30);

        let all = reader.all_hourly_stats_for_days(3).await?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[&(TODAY - Duration::days(2))][9].keystrokes, 7);

        assert_eq!(reader.active_hours(TODAY).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn mouse_stats_and_leaderboard() -> Result<()> {
        let (_dir, writer, reader) = reader()?;
        record_delta(&writer, TODAY, 10, mouse(300., 2)).await?;
        record_delta(&writer, TODAY, 11, mouse(200., 1)).await?;
        record_delta(&writer, TODAY - Duration::days(1), 10, mouse(100., 0)).await?;
        record_delta(&writer, TODAY - Duration::days(3), 10, mouse(100., 0)).await?;
        record_delta(&writer, TODAY - Duration::days(40), 10, typing(3, 0)).await?;

        let today = reader.today_mouse_stats().await?;
        assert_eq!(today.total_distance, 500.);
        assert_eq!(today.movement_count, 2);
        assert_eq!(today.click_count, 3);

        let week = reader.week_mouse_stats().await?;
        assert_eq!(week.len(), 7);
        assert_eq!(week[5].total_distance, 100.);

        let board = reader.mouse_leaderboard(10).await?;
        assert_eq!(board.len(), 3);
        assert_eq!(
            board.iter().map(|e| (e.rank, e.date)).collect::<Vec<_>>(),
            vec![
                (1, TODAY - Duration::days(3)),
                (2, TODAY - Duration::days(1)),
                (3, TODAY),
            ]
        );
        assert_eq!(reader.mouse_leaderboard(1).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn averages_use_active_hours_and_days() -> Result<()> {
        let (_dir, writer, reader) = reader()?;
        record_delta(&writer, TODAY, 9, typing(100, 10)).await?;
        record_delta(&writer, TODAY, 10, typing(100, 10)).await?;
        record_delta(&writer, TODAY - Duration::days(1), 9, typing(400, 40)).await?;

        let averages = reader.averages().await?;
        assert_eq!(averages.today_per_hour.keystrokes, 100.);
        assert_eq!(averages.week_per_hour.keystrokes, 200.);
        assert_eq!(averages.week_per_day.keystrokes, 300.);
        assert_eq!(averages.week_per_day.words, 30.);
        Ok(())
    }
}

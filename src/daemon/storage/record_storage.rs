use std::{
    future::Future,
    io::{ErrorKind, SeekFrom},
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{
        AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite,
        AsyncWriteExt, BufReader,
    },
};
use tracing::{debug, error, warn};

use crate::{
    fs::operations::seek_to_last_line,
    utils::time::{date_to_record_name, record_name_to_date},
};

use super::entities::{CountersEntity, DayRecord, HourDeltaEntity};

/// Interface for abstracting storage of hour deltas.
pub trait RecordStorage {
    type RecordFile: RecordFileHandle;

    /// Opens or creates the file of a local day. Deltas are appended to it as they get flushed.
    fn create_or_append_record(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Self::RecordFile>>;

    /// Sums every delta of a day. Missing days read as zero.
    fn get_data_for(&self, date: NaiveDate) -> impl Future<Output = Result<DayRecord>> + Send;

    /// Dates that have a record file, oldest first.
    fn recorded_days(&self) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send;
}

impl<T: Deref> RecordStorage for T
where
    T::Target: RecordStorage,
{
    type RecordFile = <T::Target as RecordStorage>::RecordFile;

    fn create_or_append_record(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Self::RecordFile>> {
        self.deref().create_or_append_record(date)
    }

    fn get_data_for(&self, date: NaiveDate) -> impl Future<Output = Result<DayRecord>> + Send {
        self.deref().get_data_for(date)
    }

    fn recorded_days(&self) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send {
        self.deref().recorded_days()
    }
}

pub trait RecordFileHandle {
    fn append(&mut self, deltas: Vec<HourDeltaEntity>) -> impl Future<Output = Result<()>>;
    fn get_date(&self) -> NaiveDate;
    fn flush(&mut self) -> impl Future<Output = Result<()>>;
}

/// Appends a single hour delta to the file of `date`.
pub async fn record_delta(
    storage: &impl RecordStorage,
    date: NaiveDate,
    hour: u8,
    delta: CountersEntity,
) -> Result<()> {
    let mut file = storage.create_or_append_record(date).await?;
    file.append(vec![HourDeltaEntity::new(hour, delta)]).await?;
    file.flush().await
}

/// Stores every local day as `records/YYYY-MM-DD.jsonl`.
pub struct RecordStorageImpl {
    record_dir: PathBuf,
}

impl RecordStorageImpl {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self { record_dir })
    }

    async fn read_deltas(path: &Path) -> Result<Vec<HourDeltaEntity>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<HourDeltaEntity>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let mut reader = BufReader::new(file);
            let mut deltas = vec![];
            let mut line = Vec::new();
            let mut number = 0;
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line).await? == 0 {
                    break;
                }
                number += 1;
                if let Some(delta) = parse_line(&line, path, number) {
                    deltas.push(delta);
                }
            }

            reader.into_inner().unlock_async().await?;

            Ok(deltas)
        }

        match extract(path).await {
            Ok(v) => Ok(v),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e)?,
        }
    }
}

/// Parses one JSONL line. Blank lines are ignored, corrupt ones are reported and skipped.
fn parse_line(line: &[u8], path: &Path, number: usize) -> Option<HourDeltaEntity> {
    if line.trim_ascii().is_empty() {
        return None;
    }
    // A crash can cut the last write short.
    serde_json::from_slice::<HourDeltaEntity>(line.trim_ascii())
        .inspect_err(|e| {
            warn!(
                "Skipping illegal line {number} in {path:?} {}: {e}",
                String::from_utf8_lossy(line).trim_end()
            )
        })
        .ok()
}

impl RecordStorage for RecordStorageImpl {
    type RecordFile = DayRecordFile;

    async fn create_or_append_record(&self, date: NaiveDate) -> Result<Self::RecordFile> {
        let path = self.record_dir.join(date_to_record_name(date));

        let file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(path)
            .await?;

        Ok(DayRecordFile::new(file, date))
    }

    async fn get_data_for(&self, date: NaiveDate) -> Result<DayRecord> {
        let path = self.record_dir.join(date_to_record_name(date));
        let mut day = DayRecord::empty(date);
        for delta in Self::read_deltas(&path).await? {
            if !day.apply(&delta) {
                warn!("Ignoring delta with hour {} in {path:?}", delta.hour);
            }
        }
        Ok(day)
    }

    async fn recorded_days(&self) -> Result<Vec<NaiveDate>> {
        let mut entries = tokio::fs::read_dir(&self.record_dir).await?;
        let mut days = vec![];
        while let Some(entry) = entries.next_entry().await? {
            if let Some(date) = entry.file_name().to_str().and_then(record_name_to_date) {
                days.push(date);
            }
        }
        days.sort();
        Ok(days)
    }
}

pub struct DayRecordFile {
    file: File,
    date: NaiveDate,
}

impl RecordFileHandle for DayRecordFile {
    async fn append(&mut self, deltas: Vec<HourDeltaEntity>) -> Result<()> {
        if deltas.is_empty() {
            return Ok(());
        }
        self.file.lock_exclusive()?;
        let result = Self::append_with_file(&mut self.file, deltas).await;
        self.file.unlock_async().await?;
        result
    }

    fn get_date(&self) -> NaiveDate {
        self.date
    }

    async fn flush(&mut self) -> Result<()> {
        self.file.sync_data().await?;
        Ok(())
    }
}

impl DayRecordFile {
    fn new(file: File, date: NaiveDate) -> Self {
        Self { file, date }
    }

    /// Rewrites the last line merged with `deltas`. Only the tail of the file is touched, so a
    /// file keeps roughly one line per active hour. A failed write puts the previous tail back,
    /// which keeps a retry of the same deltas from counting them twice.
    async fn append_with_file(file: &mut impl TailFile, deltas: Vec<HourDeltaEntity>) -> Result<()> {
        let start = seek_to_last_line(file, 1024).await?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail).await?;

        let last_delta = match tail.trim_ascii() {
            [] => None,
            line => match serde_json::from_slice::<HourDeltaEntity>(line) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Last delta was corrupted and will be overwritten {e}");
                    None
                }
            },
        };

        let mut buffer = Vec::<u8>::new();
        for delta in collapse_deltas(last_delta, deltas) {
            serde_json::to_writer(&mut buffer, &delta)?;
            buffer.push(b'\n');
        }

        if let Err(e) = replace_tail(file, start, &buffer).await {
            warn!("Writing deltas failed, restoring the previous tail: {e}");
            if let Err(restore) = replace_tail(file, start, &tail).await {
                error!("Can't restore the tail of the record: {restore}");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// The file operations needed to rewrite the end of a record.
pub trait TailFile: AsyncRead + AsyncWrite + AsyncSeek + Unpin {
    fn truncate(&mut self, len: u64) -> impl Future<Output = std::io::Result<()>>;
}

impl TailFile for File {
    async fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len).await
    }
}

/// Replaces everything from `start` to the end of the file with `content`.
async fn replace_tail(file: &mut impl TailFile, start: u64, content: &[u8]) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(start)).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.truncate(start + content.len() as u64).await
}

/// Merges consecutive deltas of the same hour.
fn collapse_deltas(
    last_delta: Option<HourDeltaEntity>,
    deltas: impl IntoIterator<Item = HourDeltaEntity>,
) -> Vec<HourDeltaEntity> {
    let mut collapsed: Vec<HourDeltaEntity> = last_delta.into_iter().collect();
    for delta in deltas {
        match collapsed.last_mut() {
            Some(last) if last.hour == delta.hour => last.counters += &delta.counters,
            _ => collapsed.push(delta),
        }
    }
    collapsed
}

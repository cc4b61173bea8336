//! Storage is split into small files inside the application directory.
//!  - `records/` holds one JSONL file per local day, see [record_storage::RecordStorageImpl].
//!    Each line is an hour delta. The writer merges consecutive deltas of the same hour by
//!    rewriting the last line.
//!  - `settings.json`, `odometer.json`, `typing_tests.json` are whole documents replaced
//!    atomically on every write, see [document::JsonDocument].
//!  - `daemon.json` is the daemon heartbeat, see [status].

pub mod document;
pub mod entities;
pub mod odometer;
pub mod record_event;
pub mod record_storage;
pub mod settings;
pub mod status;
pub mod typing_results;

pub const RECORDS_DIR: &str = "records";

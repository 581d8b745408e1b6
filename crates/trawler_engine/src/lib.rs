//! Trawler engine: drivers, checkpoint persistence and the polling loop.
mod checkpoint;
mod decode;
mod driver;
mod http;
mod rows;
mod runner;

pub use checkpoint::{CheckpointStore, PersistError, BACKUP_SUFFIX};
pub use decode::decode_snapshot;
pub use driver::{DriverError, PageDriver};
pub use http::{HttpDriverSettings, HttpTableDriver};
pub use rows::{extract_rows, MIN_ROW_CELLS};
pub use runner::{EngineError, HarvestReport, HarvestRunner, Outcome, RunnerSettings};

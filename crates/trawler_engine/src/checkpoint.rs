use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use trawler_core::Record;
use trawler_logging::{trawl_info, trawl_warn};

/// Suffix appended to the checkpoint path to form the backup path.
pub const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A save failed and the backup could not be put back either. The run
    /// can no longer guarantee what is on disk.
    #[error("save failed ({save}); backup restore also failed ({restore})")]
    RestoreFailed { save: String, restore: String },
}

impl PersistError {
    /// The one fatal persistence condition. Everything else is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PersistError::RestoreFailed { .. })
    }
}

/// On-disk form of a record. Missing fields deserialize to empty strings and
/// are then weeded out by re-validation on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    item_number: String,
    #[serde(default)]
    cost: String,
    #[serde(default)]
    sku: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    product: String,
    #[serde(default)]
    dimensions: String,
    #[serde(default)]
    weight_kg: String,
    #[serde(default, rename = "type")]
    kind: String,
}

impl From<&Record> for StoredRecord {
    fn from(record: &Record) -> Self {
        Self {
            item_number: record.item_number.clone(),
            cost: record.cost.clone(),
            sku: record.sku.clone(),
            details: record.details.clone(),
            product: record.product.clone(),
            dimensions: record.dimensions.clone(),
            weight_kg: record.weight_kg.clone(),
            kind: record.kind.clone(),
        }
    }
}

impl From<StoredRecord> for Record {
    fn from(stored: StoredRecord) -> Self {
        Self {
            item_number: stored.item_number,
            cost: stored.cost,
            sku: stored.sku,
            details: stored.details,
            product: stored.product,
            dimensions: stored.dimensions,
            weight_kg: stored.weight_kg,
            kind: stored.kind,
        }
    }
}

/// Durable home of the harvested collection.
///
/// The checkpoint file is the sole source of truth for what has been
/// harvested; in-memory state is advisory until flushed through here. The
/// store owns the per-run backup flag: the pre-run checkpoint is set aside
/// exactly once, on the first save of this process, and read back only if a
/// later save fails.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    backup_taken: bool,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_taken: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(BACKUP_SUFFIX);
        PathBuf::from(os)
    }

    /// Reads the checkpoint if present.
    ///
    /// An absent or unreadable file yields an empty collection. A corrupt
    /// file is deleted so later saves are not blocked by it. Loaded records
    /// are re-validated; invalid ones are filtered out and counted.
    pub fn load(&self) -> Vec<Record> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                trawl_warn!("failed to read checkpoint {:?}: {}", self.path, err);
                return Vec::new();
            }
        };

        let stored: Vec<StoredRecord> = match serde_json::from_str(&text) {
            Ok(stored) => stored,
            Err(err) => {
                trawl_warn!("discarding corrupt checkpoint {:?}: {}", self.path, err);
                if let Err(remove_err) = fs::remove_file(&self.path) {
                    trawl_warn!(
                        "could not remove corrupt checkpoint {:?}: {}",
                        self.path,
                        remove_err
                    );
                }
                return Vec::new();
            }
        };

        let total = stored.len();
        let records: Vec<Record> = stored
            .into_iter()
            .map(Record::from)
            .filter(|record| record.is_well_formed())
            .collect();
        if records.len() != total {
            trawl_warn!(
                "filtered out {} invalid records while loading {:?}",
                total - records.len(),
                self.path
            );
        }
        records
    }

    /// Number of records currently durable on disk. A diagnostic read used
    /// by shutdown reporting; never fails.
    pub fn record_count(&self) -> usize {
        self.load().len()
    }

    /// Writes the full collection, replacing the checkpoint atomically.
    ///
    /// On the first save of the run an existing checkpoint is renamed to the
    /// backup path before the write. On a write failure the backup is
    /// restored over the checkpoint path; the save error stays recoverable
    /// unless that restoration itself fails.
    pub fn save(&mut self, records: &[Record]) -> Result<(), PersistError> {
        match self.try_save(records) {
            Ok(()) => Ok(()),
            Err(err) => match self.restore_backup() {
                Ok(true) => {
                    trawl_warn!("save failed, restored backup over {:?}", self.path);
                    Err(err)
                }
                Ok(false) => Err(err),
                Err(restore_err) => Err(PersistError::RestoreFailed {
                    save: err.to_string(),
                    restore: restore_err.to_string(),
                }),
            },
        }
    }

    fn try_save(&mut self, records: &[Record]) -> Result<(), PersistError> {
        self.take_backup_once()?;

        let stored: Vec<StoredRecord> = records.iter().map(StoredRecord::from).collect();
        let content = serde_json::to_string_pretty(&stored)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|err| PersistError::Io(err.error))?;
        Ok(())
    }

    /// Sets the pre-run checkpoint aside, at most once per process run.
    fn take_backup_once(&mut self) -> Result<(), PersistError> {
        if self.backup_taken {
            return Ok(());
        }
        if self.path.exists() {
            let backup = self.backup_path();
            if backup.exists() {
                fs::remove_file(&backup)?;
            }
            fs::rename(&self.path, &backup)?;
            trawl_info!("set aside pre-run checkpoint as {:?}", backup);
        }
        self.backup_taken = true;
        Ok(())
    }

    /// Puts the backup back over the checkpoint path. Returns whether a
    /// backup existed to restore.
    fn restore_backup(&self) -> Result<bool, io::Error> {
        let backup = self.backup_path();
        if !backup.is_file() {
            return Ok(false);
        }
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        fs::rename(&backup, &self.path)?;
        Ok(true)
    }
}

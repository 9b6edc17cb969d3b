//! CSV-file backed stores.
//!
//! Files are reread on every lookup so edits made by an operator while the
//! daemon runs are picked up without a restart. Each store serializes its own
//! reads and writes through one mutex; the two stores are independent.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::{
    AttendanceEvent, AttendanceSink, InsertOutcome, StoreError, StudentRecord, StudentRegistry,
    TIMESTAMP_FORMAT,
};

/// Header-keyed row; column order in the file does not matter.
#[derive(Debug, Deserialize)]
struct StudentRow {
    name: String,
    roll: String,
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create_dir_all {:?}: {e}", parent)))?;
        }
    }
    Ok(())
}

fn is_missing_or_empty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true)
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CsvStudentRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvStudentRegistry {
    /// Creates parent directories; the file itself appears on first insert.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path)?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file. A missing file is an empty registry; for a
    /// roll listed twice the later row wins.
    pub fn load_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let _g = self.lock.lock().map_err(|_| StoreError::Poisoned("students"))?;
        self.load_unlocked()
    }

    fn load_unlocked(&self) -> Result<HashMap<String, String>, StoreError> {
        let mut out = HashMap::new();
        if !self.path.exists() {
            return Ok(out);
        }
        let mut rdr = csv::Reader::from_path(&self.path)?;
        for row in rdr.deserialize::<StudentRow>() {
            let row = row?;
            out.insert(row.roll, row.name);
        }
        Ok(out)
    }
}

impl StudentRegistry for CsvStudentRegistry {
    fn lookup(&self, roll: &str) -> Result<Option<StudentRecord>, StoreError> {
        let all = self.load_all()?;
        Ok(all
            .get(roll)
            .map(|name| StudentRecord::new(roll, name.clone())))
    }

    fn insert_if_absent(&self, record: StudentRecord) -> Result<InsertOutcome, StoreError> {
        let _g = self.lock.lock().map_err(|_| StoreError::Poisoned("students"))?;
        if self.load_unlocked()?.contains_key(&record.roll) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let needs_header = is_missing_or_empty(&self.path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Io(format!("open students csv {:?}: {e}", self.path)))?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            w.write_record(["name", "roll"])?;
        }
        w.write_record([record.name.as_str(), record.roll.as_str()])?;
        w.flush()?;
        Ok(InsertOutcome::Inserted)
    }
}

// ---------------------------------------------------------------------------
// Attendance log
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CsvAttendanceLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvAttendanceLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path)?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the log back in append order. A missing file is an empty log.
    pub fn read_events(&self) -> Result<Vec<AttendanceEvent>, StoreError> {
        let _g = self.lock.lock().map_err(|_| StoreError::Poisoned("attendance"))?;
        let mut out = Vec::new();
        if !self.path.exists() {
            return Ok(out);
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec?;
            if rec.len() != 3 {
                return Err(StoreError::Csv(format!(
                    "attendance row {}: expected 3 fields, got {}",
                    i + 1,
                    rec.len()
                )));
            }
            let timestamp = NaiveDateTime::parse_from_str(&rec[2], TIMESTAMP_FORMAT).map_err(|e| {
                StoreError::Csv(format!("attendance row {}: bad timestamp '{}': {e}", i + 1, &rec[2]))
            })?;
            out.push(AttendanceEvent {
                name: rec[0].to_string(),
                roll: rec[1].to_string(),
                timestamp,
            });
        }
        Ok(out)
    }
}

impl AttendanceSink for CsvAttendanceLog {
    fn append(&self, event: &AttendanceEvent) -> Result<(), StoreError> {
        let _g = self.lock.lock().map_err(|_| StoreError::Poisoned("attendance"))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Io(format!("open attendance log {:?}: {e}", self.path)))?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        let ts = event.timestamp_string();
        w.write_record([event.name.as_str(), event.roll.as_str(), ts.as_str()])?;
        w.flush()?;
        Ok(())
    }
}

//! qra-store
//!
//! Persistence collaborators for the attendance gate:
//!
//! - [`StudentRegistry`]: `(roll -> name)` lookup plus insert-if-absent.
//! - [`AttendanceSink`]: append-only check-in log. No dedup; every append
//!   is a new row.
//!
//! Two implementations of each: CSV files (the on-disk layout below) and
//! in-memory (tests, ephemeral runs).
//!
//! ## On-disk layout
//!
//! | File               | Header        | Row                           |
//! |--------------------|---------------|-------------------------------|
//! | students CSV       | `name,roll`   | `Alice,R1`                    |
//! | attendance log CSV | none          | `Alice,R1,2026-03-02 09:15:04` |
//!
//! Nothing here is coordinated with the gate's mode/token state; a check-in
//! that validated but failed to persist is not retried.

mod csv_store;
mod error;
mod memory;
mod types;

pub use csv_store::{CsvAttendanceLog, CsvStudentRegistry};
pub use error::StoreError;
pub use memory::{MemoryAttendanceLog, MemoryStudentRegistry};
pub use types::*;

/// Roll-keyed student lookup.
pub trait StudentRegistry: Send + Sync {
    fn lookup(&self, roll: &str) -> Result<Option<StudentRecord>, StoreError>;

    /// Insert `record` unless its roll is already present. Check and insert
    /// are one step; two concurrent registrations of the same roll produce
    /// exactly one record.
    fn insert_if_absent(&self, record: StudentRecord) -> Result<InsertOutcome, StoreError>;
}

/// Append-only attendance event log.
pub trait AttendanceSink: Send + Sync {
    fn append(&self, event: &AttendanceEvent) -> Result<(), StoreError>;
}

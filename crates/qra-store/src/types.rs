use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Log timestamp layout: local wall-clock, second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub roll: String,
    pub name: String,
}

impl StudentRecord {
    pub fn new<R: Into<String>, N: Into<String>>(roll: R, name: N) -> Self {
        Self {
            roll: roll.into(),
            name: name.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceEvent {
    pub roll: String,
    pub name: String,
    pub timestamp: NaiveDateTime,
}

impl AttendanceEvent {
    /// Event stamped with the local time, truncated to whole seconds.
    pub fn now(student: &StudentRecord) -> Self {
        let now = Local::now().naive_local();
        let timestamp = now.with_nanosecond(0).unwrap_or(now);
        Self {
            roll: student.roll.clone(),
            name: student.name.clone(),
            timestamp,
        }
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

use std::fmt;

/// Persistence failures. Always distinct from "no such student": a lookup
/// that finds nothing is `Ok(None)`, never an error.
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem error (open, create dir, write).
    Io(String),
    /// Malformed CSV or a CSV-library write failure.
    Csv(String),
    /// A previous holder of the store lock panicked.
    Poisoned(&'static str),
    /// The blocking task running the store call died before returning.
    Task(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "store io error: {msg}"),
            StoreError::Csv(msg) => write!(f, "store csv error: {msg}"),
            StoreError::Poisoned(which) => write!(f, "store lock poisoned: {which}"),
            StoreError::Task(msg) => write!(f, "store task failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Csv(e.to_string())
    }
}

//! Registration and check-in dispatch.
//!
//! Each call validates the presented token against one gate snapshot, then
//! talks to the persistence collaborators. The validation decision is final:
//! if persistence fails afterwards the request reports
//! `StorageUnavailable` and nothing is retried or rolled back.
//!
//! Store calls are synchronous file IO; they run on the blocking pool so a
//! slow disk never parks a runtime worker.

use qra_gate::{Mode, Rejection, Token, Verdict};
use std::sync::Arc;

use qra_store::{AttendanceEvent, InsertOutcome, StoreError, StudentRecord};
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    AlreadyRegistered,
    Rejected(Rejection),
    /// Token was fine but the input was not (empty name or roll).
    Invalid(&'static str),
    StorageUnavailable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckInOutcome {
    CheckedIn(StudentRecord),
    RollNotFound,
    Rejected(Rejection),
    Invalid(&'static str),
    StorageUnavailable,
}

/// Register `name` under `roll` if `token` is live and the gate is in
/// register mode.
pub async fn register(st: &AppState, token: &str, roll: &str, name: &str) -> RegisterOutcome {
    if let Verdict::Rejected(r) = st.gate.validate(&Token::new(token), Mode::Register).await {
        return RegisterOutcome::Rejected(r);
    }

    let (roll, name) = (roll.trim(), name.trim());
    if roll.is_empty() {
        return RegisterOutcome::Invalid("roll is required");
    }
    if name.is_empty() {
        return RegisterOutcome::Invalid("name is required");
    }

    let students = Arc::clone(&st.students);
    let record = StudentRecord::new(roll, name);
    match blocking(move || students.insert_if_absent(record)).await {
        Ok(InsertOutcome::Inserted) => {
            info!(roll, "register/ok");
            RegisterOutcome::Registered
        }
        Ok(InsertOutcome::AlreadyExists) => {
            info!(roll, "register/already_exists");
            RegisterOutcome::AlreadyRegistered
        }
        Err(e) => {
            warn!(roll, error = %e, "register/storage_failed");
            RegisterOutcome::StorageUnavailable
        }
    }
}

/// Record attendance for `roll` if `token` is live and the gate is in
/// attendance mode. Repeated check-ins each append a new event.
pub async fn check_in(st: &AppState, token: &str, roll: &str) -> CheckInOutcome {
    if let Verdict::Rejected(r) = st.gate.validate(&Token::new(token), Mode::Attendance).await {
        return CheckInOutcome::Rejected(r);
    }

    let roll = roll.trim();
    if roll.is_empty() {
        return CheckInOutcome::Invalid("roll is required");
    }

    let students = Arc::clone(&st.students);
    let key = roll.to_string();
    let student = match blocking(move || students.lookup(&key)).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            info!(roll, "scan/roll_not_found");
            return CheckInOutcome::RollNotFound;
        }
        Err(e) => {
            warn!(roll, error = %e, "scan/lookup_failed");
            return CheckInOutcome::StorageUnavailable;
        }
    };

    let attendance = Arc::clone(&st.attendance);
    let event = AttendanceEvent::now(&student);
    if let Err(e) = blocking(move || attendance.append(&event)).await {
        warn!(roll, error = %e, "scan/append_failed");
        return CheckInOutcome::StorageUnavailable;
    }

    info!(roll, "scan/ok");
    CheckInOutcome::CheckedIn(student)
}

/// Run a store call on the blocking pool. A panicked or cancelled task is
/// reported like any other storage failure.
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

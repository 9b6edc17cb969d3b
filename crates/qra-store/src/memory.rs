//! In-memory stores. Same contracts as the CSV ones, nothing survives the
//! process.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{
    AttendanceEvent, AttendanceSink, InsertOutcome, StoreError, StudentRecord, StudentRegistry,
};

#[derive(Debug, Default)]
pub struct MemoryStudentRegistry {
    rows: Mutex<BTreeMap<String, String>>,
}

impl MemoryStudentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `(roll, name)` pairs.
    pub fn with_students<I, R, N>(students: I) -> Self
    where
        I: IntoIterator<Item = (R, N)>,
        R: Into<String>,
        N: Into<String>,
    {
        let rows = students
            .into_iter()
            .map(|(r, n)| (r.into(), n.into()))
            .collect();
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StudentRegistry for MemoryStudentRegistry {
    fn lookup(&self, roll: &str) -> Result<Option<StudentRecord>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned("students"))?;
        Ok(rows
            .get(roll)
            .map(|name| StudentRecord::new(roll, name.clone())))
    }

    fn insert_if_absent(&self, record: StudentRecord) -> Result<InsertOutcome, StoreError> {
        let mut rows = self.rows.lock().map_err(|_| StoreError::Poisoned("students"))?;
        if rows.contains_key(&record.roll) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.insert(record.roll, record.name);
        Ok(InsertOutcome::Inserted)
    }
}

#[derive(Debug, Default)]
pub struct MemoryAttendanceLog {
    events: Mutex<Vec<AttendanceEvent>>,
}

impl MemoryAttendanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, in order.
    pub fn events(&self) -> Vec<AttendanceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AttendanceSink for MemoryAttendanceLog {
    fn append(&self, event: &AttendanceEvent) -> Result<(), StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::Poisoned("attendance"))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_absent_keeps_first_name() {
        let reg = MemoryStudentRegistry::new();
        assert_eq!(
            reg.insert_if_absent(StudentRecord::new("R1", "Alice")).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            reg.insert_if_absent(StudentRecord::new("R1", "Mallory")).unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(
            reg.lookup("R1").unwrap(),
            Some(StudentRecord::new("R1", "Alice"))
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn attendance_keeps_duplicates_in_order() {
        let log = MemoryAttendanceLog::new();
        let alice = StudentRecord::new("R1", "Alice");
        let ev = AttendanceEvent::now(&alice);
        log.append(&ev).unwrap();
        log.append(&ev).unwrap();
        assert_eq!(log.events(), vec![ev.clone(), ev]);
    }
}

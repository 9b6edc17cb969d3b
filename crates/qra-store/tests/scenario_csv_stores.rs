//! Scenario: CSV-backed student registry and attendance log
//!
//! # Invariants under test
//!
//! 1. A missing students file is an empty registry, not an error.
//! 2. The first insert writes the `name,roll` header; later inserts do not.
//! 3. Registering an existing roll returns `AlreadyExists` and writes nothing.
//! 4. Files written by hand with reordered columns still resolve by header.
//! 5. Every attendance append is a new row (no dedup) in `name,roll,timestamp`
//!    layout, readable back in order.
//! 6. A malformed students file surfaces as `StoreError`, never as "not found".

use std::fs;

use qra_store::{
    AttendanceEvent, AttendanceSink, CsvAttendanceLog, CsvStudentRegistry, InsertOutcome,
    StoreError, StudentRecord, StudentRegistry,
};

#[test]
fn missing_file_is_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let reg = CsvStudentRegistry::open(dir.path().join("nested/students.csv")).unwrap();
    assert_eq!(reg.lookup("R1").unwrap(), None);
    assert!(dir.path().join("nested").is_dir(), "parent dir created on open");
}

#[test]
fn insert_writes_header_once_and_refuses_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.csv");
    let reg = CsvStudentRegistry::open(&path).unwrap();

    assert_eq!(
        reg.insert_if_absent(StudentRecord::new("R1", "Alice")).unwrap(),
        InsertOutcome::Inserted
    );
    assert_eq!(
        reg.insert_if_absent(StudentRecord::new("R2", "Bob")).unwrap(),
        InsertOutcome::Inserted
    );
    assert_eq!(
        reg.insert_if_absent(StudentRecord::new("R1", "Alice Again")).unwrap(),
        InsertOutcome::AlreadyExists
    );

    let raw = fs::read_to_string(&path).unwrap();
    assert_eq!(raw, "name,roll\nAlice,R1\nBob,R2\n");
    assert_eq!(
        reg.lookup("R2").unwrap(),
        Some(StudentRecord::new("R2", "Bob"))
    );
}

#[test]
fn names_with_commas_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let reg = CsvStudentRegistry::open(dir.path().join("students.csv")).unwrap();
    reg.insert_if_absent(StudentRecord::new("R9", "Doe, Jane"))
        .unwrap();
    assert_eq!(
        reg.lookup("R9").unwrap(),
        Some(StudentRecord::new("R9", "Doe, Jane"))
    );
}

#[test]
fn hand_written_file_with_reordered_columns_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.csv");
    fs::write(&path, "roll,name\nR7,Grace\n").unwrap();

    let reg = CsvStudentRegistry::open(&path).unwrap();
    assert_eq!(
        reg.lookup("R7").unwrap(),
        Some(StudentRecord::new("R7", "Grace"))
    );
}

#[test]
fn malformed_file_is_store_error_not_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.csv");
    fs::write(&path, "who,what\nx,y\n").unwrap();

    let reg = CsvStudentRegistry::open(&path).unwrap();
    let err = reg.lookup("x").unwrap_err();
    assert!(matches!(err, StoreError::Csv(_)), "{err}");
}

#[test]
fn attendance_appends_every_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs/attendance_log.csv");
    let log = CsvAttendanceLog::open(&path).unwrap();

    let alice = StudentRecord::new("R1", "Alice");
    let first = AttendanceEvent::now(&alice);
    log.append(&first).unwrap();
    log.append(&first).unwrap();

    let events = log.read_events().unwrap();
    assert_eq!(events, vec![first.clone(), first.clone()]);

    let raw = fs::read_to_string(&path).unwrap();
    let expected_line = format!("Alice,R1,{}", first.timestamp_string());
    assert_eq!(raw.lines().collect::<Vec<_>>(), vec![expected_line.as_str(); 2]);
}

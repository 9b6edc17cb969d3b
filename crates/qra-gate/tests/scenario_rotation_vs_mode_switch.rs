//! Scenario: rotation racing a switch into register mode
//!
//! # Invariants under test
//!
//! 1. While in attendance mode every `rotate` changes the live token.
//! 2. While in register mode `rotate` never mutates the state.
//! 3. `switch_to(Register)` followed by `validate(returned, Register)` is
//!    `Accepted` even while other tasks hammer `rotate`.

use std::sync::Arc;

use qra_gate::{Mode, ModeState, TokenGenerator, Verdict};

#[tokio::test]
async fn rotation_always_changes_token_in_attendance() {
    let ms = ModeState::new();
    let gen = TokenGenerator::default();

    let mut prev = ms.read().await;
    for _ in 0..200 {
        let next = ms.rotate(&gen).await.expect("attendance mode rotates");
        assert_ne!(next.token, prev.token);
        assert_eq!(next.mode, Mode::Attendance);
        assert_eq!(next.generation, prev.generation + 1);
        prev = next;
    }
}

#[tokio::test]
async fn rotation_is_idle_in_register_mode() {
    let ms = ModeState::new();
    let gen = TokenGenerator::default();
    let reg = ms.switch_to(Mode::Register, &gen).await;

    for _ in 0..50 {
        assert!(ms.rotate(&gen).await.is_none());
    }
    assert_eq!(ms.read().await, reg);
}

#[tokio::test]
async fn register_switch_wins_against_concurrent_rotators() {
    let ms = Arc::new(ModeState::new());
    let gen = TokenGenerator::default();
    ms.switch_to(Mode::Attendance, &gen).await;

    let mut rotators = Vec::new();
    for _ in 0..4 {
        let ms = Arc::clone(&ms);
        rotators.push(tokio::spawn(async move {
            for _ in 0..200 {
                ms.rotate(&gen).await;
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::task::yield_now().await;
    let reg = ms.switch_to(Mode::Register, &gen).await;
    assert_eq!(
        ms.validate(&reg.token, Mode::Register).await,
        Verdict::Accepted
    );

    for r in rotators {
        r.await.unwrap();
    }

    // Rotators saw register mode after the switch and stayed idle.
    let after = ms.read().await;
    assert_eq!(after, reg);
    assert_eq!(
        ms.validate(&reg.token, Mode::Register).await,
        Verdict::Accepted
    );
}

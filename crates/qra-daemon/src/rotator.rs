//! Background token rotation.
//!
//! One task for the process lifetime. Each tick, in attendance mode, mints a
//! new token and publishes it; in register mode the tick leaves the gate
//! alone and only re-renders if the served image is behind the live token.
//! The mode check and the token write are one `ModeState::rotate` call, so
//! an operator switch can land at any point without being overwritten.

use std::sync::Arc;
use std::time::Duration;

use qra_gate::GateSnapshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::state::{AppState, BusMsg};

/// Run one rotation step. Returns the new snapshot, or `None` when idle
/// (not in attendance mode).
///
/// A publish failure is logged and otherwise ignored: the token is already
/// live and the next tick mints and publishes again. When idle, a failed
/// publish from the last mode switch is retried here without minting.
pub async fn rotate_once(st: &AppState) -> Option<GateSnapshot> {
    let Some(snap) = st.gate.rotate(&st.tokens).await else {
        republish_if_behind(st).await;
        return None;
    };
    debug!(generation = snap.generation, "qr/rotate");

    if let Err(e) = st.publisher.publish(&snap).await {
        warn!(generation = snap.generation, error = %e, "qr publish failed; retrying next tick");
    }

    let _ = st.bus.send(BusMsg::QrRotated {
        generation: snap.generation,
    });
    Some(snap)
}

/// Publish the live snapshot if the served image is missing or older.
/// Reads the gate only; never mints.
async fn republish_if_behind(st: &AppState) {
    let live = st.gate.read().await;
    if live.token.is_empty() {
        return;
    }
    let served = st.publisher.current().await.map(|img| img.generation);
    if served.is_some_and(|g| g >= live.generation) {
        return;
    }
    match st.publisher.publish(&live).await {
        Ok(_) => info!(generation = live.generation, mode = %live.mode, "qr republished"),
        Err(e) => warn!(generation = live.generation, error = %e, "qr republish failed"),
    }
}

/// Spawn the rotator. The first tick fires immediately, so the boot state's
/// empty token is replaced as soon as the runtime schedules the task.
pub fn spawn_rotator(st: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    info!(period_ms = period.as_millis() as u64, "rotator started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // A slow tick must not cause a burst of catch-up mints.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            rotate_once(&st).await;
        }
    })
}

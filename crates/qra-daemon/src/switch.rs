//! Mode transitions triggered by an operator.
//!
//! Every transition mints a token and publishes its QR before returning, so
//! the screen never shows a code that the gate would refuse. That includes
//! the switch back to attendance: waiting for the next rotator tick would
//! leave up to one period with a stale (or, at boot, empty) token.

use qra_gate::{GateSnapshot, Mode, Token};
use tracing::{info, warn};

use crate::state::{AppState, BusMsg};

/// Enter register mode with a fresh token. Returns the token now live.
pub async fn switch_to_register(st: &AppState) -> Token {
    switch_to(st, Mode::Register).await.token
}

/// Enter attendance mode with a fresh token. Rotation resumes on the next
/// rotator tick.
pub async fn switch_to_attendance(st: &AppState) -> Token {
    switch_to(st, Mode::Attendance).await.token
}

async fn switch_to(st: &AppState, mode: Mode) -> GateSnapshot {
    let snap = st.gate.switch_to(mode, &st.tokens).await;
    info!(mode = %snap.mode, generation = snap.generation, "mode/{}", mode);

    if let Err(e) = st.publisher.publish(&snap).await {
        // The token is live regardless; the rotator (attendance) or the next
        // switch (register) republishes.
        warn!(generation = snap.generation, error = %e, "qr publish failed after mode switch");
    }

    let _ = st.bus.send(BusMsg::ModeChanged {
        mode: snap.mode,
        generation: snap.generation,
    });
    snap
}

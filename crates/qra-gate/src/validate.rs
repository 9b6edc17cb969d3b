//! Pure token checks against one `GateSnapshot`.
//!
//! Callers must take the snapshot once per request (see
//! [`crate::ModeState::validate`]); checking mode and token from two
//! separate reads can pair a token from one generation with a mode from
//! another.

use crate::{GateSnapshot, Mode, Rejection, Token, Verdict};

/// Check `presented` against the snapshot for an operation that needs `expected`.
///
/// Token mismatch wins over mode mismatch: a stale token is `Expired` even
/// when the mode also differs. An empty token is never accepted, so the
/// boot state (nothing minted yet) admits nobody.
pub fn validate(snap: &GateSnapshot, presented: &Token, expected: Mode) -> Verdict {
    if !snap.token.matches(presented) {
        return Verdict::Rejected(Rejection::Expired);
    }
    if snap.mode != expected {
        return Verdict::Rejected(Rejection::WrongMode);
    }
    Verdict::Accepted
}

/// Which operation `presented` currently opens, if any.
///
/// Used where the caller has no expected mode yet (the scan form picks the
/// registration or check-in form from the answer).
pub fn resolve(snap: &GateSnapshot, presented: &Token) -> Result<Mode, Rejection> {
    if !snap.token.matches(presented) {
        return Err(Rejection::Expired);
    }
    Ok(snap.mode)
}

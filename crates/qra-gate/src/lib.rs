//! qra-gate
//!
//! Token lifecycle and mode state machine for the attendance gate.
//!
//! Architectural decisions:
//! - Exactly one live token; minting a new one expires every earlier token
//! - `{mode, token}` is guarded as one unit by a single lock (`ModeState`)
//! - Validation reads one snapshot, never mode and token separately
//! - Tokens come from the OS CSPRNG only
//!
//! No IO, no wall-clock. The daemon owns the timer and the publishing side.

mod state;
mod token;
mod types;
mod validate;

pub use state::ModeState;
pub use token::{TokenGenerator, DEFAULT_TOKEN_BYTES, MAX_TOKEN_BYTES, MIN_TOKEN_BYTES};
pub use types::*;
pub use validate::{resolve, validate};

use std::fmt;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Which operation the currently displayed QR code authorizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Attendance,
    Register,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Attendance => "attendance",
            Mode::Register => "register",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque access token. Only the live one is ever accepted.
///
/// `Debug` is hand-written so tokens do not leak into logs through `{:?}`.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// The boot value: nothing has been minted yet.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time equality for checking a presented token against the
    /// live one. Running time does not depend on the length of a matching
    /// prefix. An empty token matches nothing.
    pub fn matches(&self, presented: &Token) -> bool {
        let (a, b) = (self.0.as_bytes(), presented.0.as_bytes());
        if a.is_empty() || b.is_empty() {
            return false;
        }
        // Pad both to the longer length with different fill bytes so a
        // length mismatch can never compare equal.
        let n = a.len().max(b.len());
        let mut a_pad = vec![0u8; n];
        let mut b_pad = vec![0xFFu8; n];
        a_pad[..a.len()].copy_from_slice(a);
        b_pad[..b.len()].copy_from_slice(b);

        (a.len().ct_eq(&b.len()) & a_pad.ct_eq(&b_pad)).into()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.len())
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Consistent `{mode, token}` pair as seen under one lock acquisition.
///
/// `generation` increases by one on every write. It lets downstream
/// consumers (the QR publisher) order writes without looking at the token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateSnapshot {
    pub mode: Mode,
    pub token: Token,
    pub generation: u64,
}

impl GateSnapshot {
    /// Process-start state: attendance mode, no token yet.
    pub fn boot() -> Self {
        Self {
            mode: Mode::Attendance,
            token: Token::empty(),
            generation: 0,
        }
    }
}

/// Why a presented token was refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Token is not the live one (older, forged, or empty).
    Expired,
    /// Token is live but the gate is in the other mode.
    WrongMode,
}

/// Outcome of [`crate::validate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Verdict::Accepted => None,
            Verdict::Rejected(r) => Some(*r),
        }
    }
}

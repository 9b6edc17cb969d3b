//! Request and response types for all qra-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be encoded by Axum
//! and decoded by tests. No business logic lives here.

use qra_gate::Mode;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /health  /status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

/// Gate status without the token itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub mode: Mode,
    pub generation: u64,
    /// Whether `/qr_image` currently has an image to serve.
    pub has_image: bool,
    pub uptime_secs: u64,
}

// ---------------------------------------------------------------------------
// /current_qr_token
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ---------------------------------------------------------------------------
// /scan_form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanFormQuery {
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /register
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub roll: String,
    pub token: String,
}

// ---------------------------------------------------------------------------
// POST /scan
// ---------------------------------------------------------------------------

/// Missing fields decode as empty: no token is `Expired`, no roll is
/// rejected as invalid input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanForm {
    pub token: String,
    pub roll: String,
}

/// `{success, name?, roll?, msg?}`: `name`/`roll` on success, `msg` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ScanResponse {
    pub fn checked_in(name: impl Into<String>, roll: impl Into<String>) -> Self {
        Self {
            success: true,
            name: Some(name.into()),
            roll: Some(roll.into()),
            msg: None,
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            name: None,
            roll: None,
            msg: Some(msg.into()),
        }
    }
}

//! Typed view over the merged config tree.
//!
//! Every key is optional; an absent key takes its default. Present keys with
//! the wrong type or out-of-range values are errors, not silent defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8899";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8899";
pub const DEFAULT_ROTATION_PERIOD_MS: u64 = 2_000;
pub const MIN_ROTATION_PERIOD_MS: u64 = 50;

const DEFAULT_TOKEN_BYTES: u64 = 4;
const TOKEN_BYTES_RANGE: std::ops::RangeInclusive<u64> = 4..=32;
const DEFAULT_MODULE_PX: u64 = 8;
const MODULE_PX_RANGE: std::ops::RangeInclusive<u64> = 1..=64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateConfig {
    pub bind_addr: SocketAddr,
    /// Prefix of the URL encoded into every QR code (no trailing slash).
    pub public_base_url: String,
    pub rotation_period: Duration,
    /// Random bytes per token; the token is their lower-case hex.
    pub token_bytes: usize,
    pub students_csv: PathBuf,
    pub attendance_csv: PathBuf,
    /// Where to mirror the current QR PNG on disk, if anywhere.
    pub qr_output_path: Option<PathBuf>,
    /// Edge length of one QR module in pixels.
    pub qr_module_px: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8899)),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            rotation_period: Duration::from_millis(DEFAULT_ROTATION_PERIOD_MS),
            token_bytes: DEFAULT_TOKEN_BYTES as usize,
            students_csv: PathBuf::from("students.csv"),
            attendance_csv: PathBuf::from("attendance_log.csv"),
            qr_output_path: None,
            qr_module_px: DEFAULT_MODULE_PX as u32,
        }
    }
}

impl GateConfig {
    /// Build from the merged config JSON produced by `load_layered_yaml*`.
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let d = Self::default();

        let bind_addr = match opt_str(cfg, "server", "bind_addr")? {
            Some(s) => s
                .parse::<SocketAddr>()
                .with_context(|| format!("server.bind_addr is not a socket address: '{s}'"))?,
            None => d.bind_addr,
        };

        let public_base_url = opt_str(cfg, "server", "public_base_url")?
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(d.public_base_url);
        if !(public_base_url.starts_with("http://") || public_base_url.starts_with("https://")) {
            return Err(anyhow!(
                "server.public_base_url must start with http:// or https:// (got '{public_base_url}')"
            ));
        }

        let period_ms = opt_u64(cfg, "rotation", "period_ms")?.unwrap_or(DEFAULT_ROTATION_PERIOD_MS);
        if period_ms < MIN_ROTATION_PERIOD_MS {
            return Err(anyhow!(
                "rotation.period_ms must be >= {MIN_ROTATION_PERIOD_MS} (got {period_ms})"
            ));
        }

        let token_bytes = opt_u64(cfg, "token", "bytes")?.unwrap_or(DEFAULT_TOKEN_BYTES);
        if !TOKEN_BYTES_RANGE.contains(&token_bytes) {
            return Err(anyhow!(
                "token.bytes out of bounds ({}..={}): {token_bytes}",
                TOKEN_BYTES_RANGE.start(),
                TOKEN_BYTES_RANGE.end()
            ));
        }

        let module_px = opt_u64(cfg, "qr", "module_px")?.unwrap_or(DEFAULT_MODULE_PX);
        if !MODULE_PX_RANGE.contains(&module_px) {
            return Err(anyhow!(
                "qr.module_px out of bounds ({}..={}): {module_px}",
                MODULE_PX_RANGE.start(),
                MODULE_PX_RANGE.end()
            ));
        }

        Ok(Self {
            bind_addr,
            public_base_url,
            rotation_period: Duration::from_millis(period_ms),
            token_bytes: token_bytes as usize,
            students_csv: opt_str(cfg, "storage", "students_csv")?
                .map(PathBuf::from)
                .unwrap_or(d.students_csv),
            attendance_csv: opt_str(cfg, "storage", "attendance_csv")?
                .map(PathBuf::from)
                .unwrap_or(d.attendance_csv),
            qr_output_path: opt_str(cfg, "qr", "output_path")?.map(PathBuf::from),
            qr_module_px: module_px as u32,
        })
    }

    /// The URL a scanner opens for `token`.
    pub fn scan_url(&self, token: &str) -> String {
        format!("{}/scan_form?token={}", self.public_base_url, token)
    }
}

/// `cfg.section.key`, or `None` when either is absent. A section that is
/// present but not a mapping is an error.
fn lookup<'a>(cfg: &'a Value, section: &str, key: &str) -> Result<Option<&'a Value>> {
    match cfg.get(section) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(keys)) => Ok(keys.get(key).filter(|v| !v.is_null())),
        Some(other) => Err(anyhow!("{section} must be a mapping (got {other})")),
    }
}

fn opt_str<'a>(cfg: &'a Value, section: &str, key: &str) -> Result<Option<&'a str>> {
    match lookup(cfg, section, key)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(anyhow!("{section}.{key} must be a string (got {other})")),
    }
}

/// Accepts a non-negative integer or a string holding one.
fn opt_u64(cfg: &Value, section: &str, key: &str) -> Result<Option<u64>> {
    let bad = |got: &dyn std::fmt::Display| {
        anyhow!("{section}.{key} must be a non-negative integer (got {got})")
    };
    match lookup(cfg, section, key)? {
        None => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| bad(n)),
        Some(Value::String(s)) => s.trim().parse::<u64>().map(Some).map_err(|_| bad(&format!("'{s}'"))),
        Some(other) => Err(bad(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_url_joins_base_and_token() {
        let c = GateConfig {
            public_base_url: "https://gate.example".to_string(),
            ..GateConfig::default()
        };
        assert_eq!(
            c.scan_url("ab12cd34"),
            "https://gate.example/scan_form?token=ab12cd34"
        );
    }

    #[test]
    fn scalar_section_is_a_type_error() {
        let err = GateConfig::from_config_json(&serde_json::json!({"rotation": 500})).unwrap_err();
        assert!(err.to_string().contains("rotation must be a mapping"), "{err}");
    }

    #[test]
    fn default_bind_addr_matches_constant() {
        assert_eq!(GateConfig::default().bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }
}

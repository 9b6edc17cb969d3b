//! qra-config
//!
//! Layered YAML configuration for the attendance gate daemon.
//!
//! The config is two levels deep: `section.key: value`. The sections and keys
//! the daemon reads are listed in [`KNOWN_KEYS`].
//!
//! - Docs are applied left to right. A later doc replaces individual keys
//!   inside a section; other keys of that section survive.
//! - The merged config is hashed (SHA-256 over key-sorted compact JSON) so the
//!   daemon can log which config it booted with.
//! - Keys outside [`KNOWN_KEYS`] are reported by [`report_unused_keys`], as a
//!   warning or a hard failure depending on policy. A typo like
//!   `rotation.period` would otherwise leave the default in force silently.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;

mod gate_config;

pub use gate_config::{
    GateConfig, DEFAULT_BIND_ADDR, DEFAULT_PUBLIC_BASE_URL, DEFAULT_ROTATION_PERIOD_MS,
    MIN_ROTATION_PERIOD_MS,
};

/// Every `section -> keys` pair [`GateConfig::from_config_json`] reads.
/// Keep in step with `gate_config.rs`.
pub const KNOWN_KEYS: &[(&str, &[&str])] = &[
    ("server", &["bind_addr", "public_base_url"]),
    ("rotation", &["period_ms"]),
    ("token", &["bytes"]),
    ("storage", &["students_csv", "attendance_csv"]),
    ("qr", &["output_path", "module_px"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Dotted names (`section.key`, or `section` for a non-mapping section), sorted.
    pub unused_keys: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_keys.is_empty()
    }
}

/// List config keys the daemon never reads.
///
/// `Fail` turns a non-clean report into an error; `Warn` always returns it.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut unused = Vec::new();
    if let Some(sections) = config_json.as_object() {
        for (section, body) in sections {
            let known = known_keys(section);
            match body {
                Value::Object(keys) => unused.extend(
                    keys.keys()
                        .filter(|k| !known.contains(&k.as_str()))
                        .map(|k| format!("{section}.{k}")),
                ),
                // A scalar in a known section is a type error for GateConfig.
                _ if known.is_empty() => unused.push(section.clone()),
                _ => {}
            }
        }
    }
    unused.sort();

    let report = UnusedKeyReport {
        unused_keys: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: qra-daemon does not read {}",
            report.unused_keys.join(", ")
        );
    }

    Ok(report)
}

fn known_keys(section: &str) -> &'static [&'static str] {
    KNOWN_KEYS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    /// Always a JSON object of sections.
    pub config_json: Value,
}

impl LoadedConfig {
    /// The empty config: every key takes its default.
    pub fn empty() -> Result<Self> {
        load_layered_yaml_from_strings(&[])
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("read config {p}")))
        .collect::<Result<Vec<_>>>()?;
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Map::new();
    for (i, raw) in yaml_docs.iter().enumerate() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {i}: invalid yaml"))?;
        match serde_json::to_value(yaml).context("yaml->json conversion failed")? {
            // An empty doc parses as null: no overrides.
            Value::Null => {}
            Value::Object(layer) => overlay(&mut merged, layer),
            other => bail!("config layer {i}: top level must be a mapping of sections (got {other})"),
        }
    }

    let canonical_json =
        serde_json::to_string(&sorted(&merged)).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: Value::Object(merged),
    })
}

/// Apply one layer: keys replace keys inside a section; a non-mapping on
/// either side replaces the whole section.
fn overlay(base: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (section, body) in layer {
        match body {
            Value::Object(new_keys) => match base.get_mut(&section) {
                Some(Value::Object(keys)) => keys.extend(new_keys),
                _ => {
                    base.insert(section, Value::Object(new_keys));
                }
            },
            other => {
                base.insert(section, other);
            }
        }
    }
}

/// Sections and their keys in lexical order, independent of YAML order.
fn sorted(cfg: &Map<String, Value>) -> Value {
    let mut sections: Vec<_> = cfg.iter().collect();
    sections.sort_by_key(|(name, _)| *name);
    sections
        .into_iter()
        .map(|(name, body)| {
            let body = match body {
                Value::Object(keys) => {
                    let mut keys: Vec<_> = keys.iter().collect();
                    keys.sort_by_key(|(k, _)| *k);
                    Value::Object(keys.into_iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                }
                other => other.clone(),
            };
            (name.clone(), body)
        })
        .collect::<Map<_, _>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layer_replaces_keys_not_sections() {
        let c = load_layered_yaml_from_strings(&[
            "qr:\n  module_px: 4\n  output_path: a.png\n",
            "qr:\n  module_px: 6\n",
        ])
        .unwrap();
        assert_eq!(c.config_json["qr"]["module_px"], 6);
        assert_eq!(c.config_json["qr"]["output_path"], "a.png");
    }

    #[test]
    fn non_mapping_top_level_is_rejected() {
        let err = load_layered_yaml_from_strings(&["- server\n"]).unwrap_err();
        assert!(err.to_string().contains("mapping of sections"), "{err}");
    }

    #[test]
    fn empty_config_hash_is_stable() {
        let a = LoadedConfig::empty().unwrap();
        let b = load_layered_yaml_from_strings(&[""]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.canonical_json, "{}");
    }

    #[test]
    fn every_known_section_is_distinct() {
        let mut names: Vec<_> = KNOWN_KEYS.iter().map(|(s, _)| *s).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), KNOWN_KEYS.len());
    }
}

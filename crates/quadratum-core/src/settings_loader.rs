//! Settings loading from configuration files.
//!
//! This module provides functions to load [`Settings`] from TOML files, JSON
//! files, and to apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `QUADRATUM_DEBUG` | `debug` |
//! | `QUADRATUM_LOG_LEVEL` | `log_level` |
//! | `QUADRATUM_SUBMIT_TIMEOUT_MS` | `submit_timeout_ms` |
//! | `QUADRATUM_TAG_MAX_LEN` | `tag_max_len` |
//! | `QUADRATUM_RADIO_ID_SUFFIX_PATTERN` | `radio_id_suffix_pattern` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use quadratum_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file("quadratum.toml").unwrap();
//! let settings = settings_loader::from_path_with_env("quadratum.json").unwrap();
//! ```

use std::path::Path;

use crate::error::FormsError;
use crate::settings::Settings;

/// Serialization format of a settings or form definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.toml`
    Toml,
    /// `.json`, and the fallback for any other extension.
    Json,
}

impl FileFormat {
    /// Picks the format from the file extension: `.toml` (any case) is
    /// TOML, everything else JSON.
    pub fn from_path(path: &Path) -> Self {
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::Toml
        } else {
            Self::Json
        }
    }
}

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, FormsError> {
    // Deserialize into a generic value first, then merge over the defaults so
    // partial files are accepted.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormsError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_with_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, FormsError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, FormsError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormsError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_with_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, FormsError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from a file, picking the format with
/// [`FileFormat::from_path`], then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed.
pub fn from_path_with_env(path: impl AsRef<Path>) -> Result<Settings, FormsError> {
    let path = path.as_ref();
    let mut settings = match FileFormat::from_path(path) {
        FileFormat::Toml => from_toml_file(path)?,
        FileFormat::Json => from_json_file(path)?,
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Unparseable numeric values are ignored and leave the setting unchanged.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("QUADRATUM_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("QUADRATUM_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("QUADRATUM_SUBMIT_TIMEOUT_MS") {
        if let Ok(ms) = val.parse::<u64>() {
            settings.submit_timeout_ms = ms;
        }
    }

    if let Ok(val) = std::env::var("QUADRATUM_TAG_MAX_LEN") {
        if let Ok(len) = val.parse::<usize>() {
            settings.tag_max_len = len;
        }
    }

    if let Ok(val) = std::env::var("QUADRATUM_RADIO_ID_SUFFIX_PATTERN") {
        settings.radio_id_suffix_pattern = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, FormsError> {
    std::fs::read_to_string(path).map_err(|e| {
        tracing::debug!(path = %path.display(), format, error = %e, "cannot read settings file");
        FormsError::IoError(e)
    })
}

fn merge_with_defaults(value: serde_json::Value, format: &str) -> Result<Settings, FormsError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        FormsError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        FormsError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

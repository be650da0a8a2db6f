//! Settings system for the quadratum form pipeline.
//!
//! This module provides the [`Settings`] struct, which holds the pipeline
//! configuration, and [`LazySettings`], a globally-accessible,
//! lazily-initialized settings instance.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// User-facing messages emitted by the validator and submission coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    /// Generic message for a missing required value.
    pub required: String,
    /// Message for a malformed email address.
    pub invalid_email: String,
    /// Message for a malformed phone number.
    pub invalid_phone: String,
    /// Message for a value that does not parse as a URL.
    pub invalid_url: String,
    /// Live-region summary shown when a submission is blocked.
    pub summary: String,
    /// Live-region message for customer forms without an email field.
    pub missing_email: String,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            required: "This field is required.".to_string(),
            invalid_email: "Enter a valid email".to_string(),
            invalid_phone: "Enter a valid phone".to_string(),
            invalid_url: "Enter a valid URL".to_string(),
            summary: "Please fix the highlighted fields and try again.".to_string(),
            missing_email:
                "This form is missing an Email field. Add an Email block and try again."
                    .to_string(),
        }
    }
}

/// The complete set of pipeline settings.
///
/// # Examples
///
/// ```
/// use quadratum_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.submit_timeout_ms, 5000);
/// assert_eq!(settings.error_slot_suffix, "-err");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log level filter (e.g. "info", "debug", "quadratum_forms=trace").
    pub log_level: String,

    // ── Submission ───────────────────────────────────────────────────

    /// Milliseconds after which a busy submit control is unconditionally released.
    pub submit_timeout_ms: u64,
    /// The action name passed to reCAPTCHA v3 `execute`.
    pub recaptcha_action: String,

    // ── Error targets ────────────────────────────────────────────────

    /// Suffix appended to a control id to find its error slot.
    pub error_slot_suffix: String,
    /// Regex stripped from a control id before the second error-slot lookup.
    pub radio_id_suffix_pattern: String,

    // ── Attribution ──────────────────────────────────────────────────

    /// Maximum length (in characters) of a packed `key=value` tag.
    pub tag_max_len: usize,

    // ── Messages ─────────────────────────────────────────────────────

    /// User-facing messages.
    pub messages: MessageSettings,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            submit_timeout_ms: 5000,
            recaptcha_action: "submit".to_string(),
            error_slot_suffix: "-err".to_string(),
            radio_id_suffix_pattern: r"-\d+$".to_string(),
            tag_max_len: 80,
            messages: MessageSettings::default(),
            extra: HashMap::new(),
        }
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup, then use
/// [`get`](LazySettings::get) or [`get_or_default`](LazySettings::get_or_default).
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, installing the defaults if nothing
    /// was configured yet.
    pub fn get_or_default(&self) -> &Settings {
        self.inner.get_or_init(Settings::default)
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();

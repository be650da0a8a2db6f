//! Core error types for the quadratum form pipeline.
//!
//! [`ValidationError`] describes a single field-level failure and is recovered
//! locally by the validator. [`FormsError`] covers everything that can go wrong
//! outside of field validation: configuration, definition loading, I/O and the
//! third-party challenge exchange.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A field-level validation failure.
///
/// Carries the user-facing message, a short code identifying the rule that
/// failed (e.g. "required", "invalid_email") and optional parameters.
///
/// # Examples
///
/// ```
/// use quadratum_core::error::ValidationError;
///
/// let err = ValidationError::new("Enter a valid email", "invalid_email");
/// assert_eq!(err.to_string(), "Enter a valid email");
/// assert_eq!(err.code, "invalid_email");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The user-facing error message.
    pub message: String,
    /// A short code identifying the type of validation failure.
    pub code: String,
    /// Additional parameters providing context for the error message.
    pub params: HashMap<String, String>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
        }
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if this is the generic "required" failure.
    pub fn is_required(&self) -> bool {
        self.code == "required"
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for the quadratum pipeline.
///
/// None of these errors is fatal to a page: challenge failures degrade to the
/// submit safety timeout, and configuration errors only surface at load time
/// (CLI, settings files, form definitions).
#[derive(Error, Debug)]
pub enum FormsError {
    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A form definition is structurally unusable.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Challenge exchange ───────────────────────────────────────────

    /// The challenge SDK for the configured mode is not loaded on the page.
    #[error("Challenge provider unavailable: {0}")]
    ChallengeUnavailable(String),

    /// The challenge SDK reported a failure or dropped its callback.
    #[error("Challenge failed: {0}")]
    ChallengeFailed(String),

    /// The challenge SDK did not produce a token within the safety window.
    #[error("Challenge timed out after {0} ms")]
    ChallengeTimeout(u64),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FormsError {
    /// Returns the process exit code associated with this error.
    ///
    /// - `ValidationError` and challenge errors -> 1
    /// - `ConfigurationError`, `ImproperlyConfigured`, `SerializationError` -> 2
    /// - `IoError` -> 3
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationError(_)
            | Self::ChallengeUnavailable(_)
            | Self::ChallengeFailed(_)
            | Self::ChallengeTimeout(_) => 1,
            Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::SerializationError(_) => 2,
            Self::IoError(_) => 3,
        }
    }

    /// Returns `true` for errors produced by the challenge exchange.
    pub const fn is_challenge(&self) -> bool {
        matches!(
            self,
            Self::ChallengeUnavailable(_) | Self::ChallengeFailed(_) | Self::ChallengeTimeout(_)
        )
    }
}

impl From<ValidationError> for FormsError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, FormsError>`.
pub type FormsResult<T> = Result<T, FormsError>;

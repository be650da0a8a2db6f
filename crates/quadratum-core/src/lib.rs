//! # quadratum-core
//!
//! Core types, settings and error types for the quadratum form pipeline.
//! This crate has no pipeline dependencies and provides the foundation for
//! all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Pipeline settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{FormsError, FormsResult, ValidationError};
pub use settings::{MessageSettings, Settings, SETTINGS};

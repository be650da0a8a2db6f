//! # quadratum
//!
//! Client-side form pipeline for storefront forms: field validation with
//! inline errors, conditional wrappers, multi-step navigation, marketing
//! attribution capture and submission guarded by an optional bot challenge.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on
//! `quadratum` for everything, or on the individual crates for finer-grained
//! control.
//!
//! ```
//! use quadratum::core::Settings;
//! use quadratum::forms::captcha::ChallengeProviders;
//! use quadratum::forms::attribution::PageContext;
//! use quadratum::forms::{FormDefinition, FormRegistry};
//!
//! let def = FormDefinition::from_json_str(r#"{"id": "contact"}"#).unwrap();
//! let registry = FormRegistry::new(Settings::default(), ChallengeProviders::new());
//! let form = registry
//!     .init(&def, &PageContext::from_url("https://shop.example/contact"))
//!     .unwrap();
//! assert_eq!(form.id(), "contact");
//! ```

/// Settings, error types and logging setup.
pub use quadratum_core as core;

/// Validation, conditions, steps, attribution and submission.
#[cfg(feature = "forms")]
pub use quadratum_forms as forms;

/// Signal dispatcher used for form lifecycle events.
#[cfg(feature = "signals")]
pub use quadratum_signals as signals;

/// Management commands (CLI).
#[cfg(feature = "cli")]
pub use quadratum_cli as cli;

// Third-party re-exports.
pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;

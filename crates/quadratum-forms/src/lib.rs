//! # quadratum-forms
//!
//! The storefront form pipeline: a DOM-independent model of a form, the
//! field validator, conditional visibility, multi-step navigation, guarded
//! submission with optional invisible challenges, and attribution capture.
//!
//! ## Modules
//!
//! - [`definition`] - Serde definitions of the form markup contract
//! - [`fields`] - Controls, kinds and validity state
//! - [`form`] - The runtime [`FormModel`](form::FormModel)
//! - [`validators`] - Per-value rules (required, email, phone, URL)
//! - [`error_target`] - Error slot resolution
//! - [`validation`] - The field validator
//! - [`conditions`] - Conditional visibility
//! - [`steps`] - Step navigation
//! - [`captcha`] - Turnstile and reCAPTCHA v3 providers
//! - [`attribution`] - Attribution capture and tag packing
//! - [`submission`] - The submission coordinator
//! - [`events`] - Lifecycle events
//! - [`instance`] - Form instances and the page registry
//! - [`checks`] - Static definition checks
//!
//! ## Example
//!
//! ```
//! use quadratum_core::Settings;
//! use quadratum_forms::attribution::PageContext;
//! use quadratum_forms::captcha::ChallengeProviders;
//! use quadratum_forms::definition::FormDefinition;
//! use quadratum_forms::form::Scope;
//! use quadratum_forms::instance::FormRegistry;
//!
//! let def = FormDefinition::from_json_str(r#"{
//!     "id": "contact",
//!     "groups": [{"required": true, "controls": [{"id": "qf-1", "name": "contact[email]", "kind": "email"}]}]
//! }"#).unwrap();
//!
//! let registry = FormRegistry::new(Settings::default(), ChallengeProviders::new());
//! let ctx = PageContext::from_url("https://shop.example/pages/contact?utm_source=ig");
//! let form = registry.init(&def, &ctx).unwrap();
//!
//! assert!(!form.validate(Scope::Form).ok);
//! form.on_input(0, "ada@example.com");
//! assert!(form.validate(Scope::Form).ok);
//! ```

pub mod attribution;
pub mod captcha;
pub mod checks;
pub mod conditions;
pub mod definition;
pub mod error_target;
pub mod events;
pub mod fields;
pub mod form;
pub mod instance;
pub mod steps;
pub mod submission;
pub mod validation;
pub mod validators;

pub use definition::FormDefinition;
pub use events::FormEvent;
pub use form::{FormModel, Scope};
pub use instance::{FormInstance, FormRegistry};
pub use submission::SubmitOutcome;
pub use validation::{FieldValidator, ValidationReport};

//! Form lifecycle events.
//!
//! Every [`FormInstance`](crate::instance::FormInstance) owns a
//! `Signal<FormEvent>` that bubbles to the page-level [`PAGE_EVENTS`] signal,
//! so analytics code can subscribe to one form or to every form on the page.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

use quadratum_signals::Signal;

use crate::form::Scope;

/// The page-level signal every form bubbles to.
pub static PAGE_EVENTS: Lazy<Arc<Signal<FormEvent>>> = Lazy::new(|| Arc::new(Signal::new()));

/// A lifecycle notification from a form instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    /// The form was initialized on the page.
    Viewed {
        /// Form id.
        form_id: String,
    },
    /// A submit or Next was blocked by validation.
    ValidationFailed {
        /// Form id.
        form_id: String,
        /// The scope that failed.
        scope: Scope,
        /// Number of invalid fields.
        invalid: usize,
    },
    /// A submission passed validation and the busy guard.
    SubmitAttempt {
        /// Form id.
        form_id: String,
        /// `none`, `turnstile` or `recaptcha_v3`.
        challenge: String,
    },
    /// The active step changed.
    StepChanged {
        /// Form id.
        form_id: String,
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
    },
    /// The submit safety timer released the busy flag.
    SubmitReleased {
        /// Form id.
        form_id: String,
    },
}

impl FormEvent {
    /// The dotted event name used by analytics listeners.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Viewed { .. } => "quadratum.form.view",
            Self::ValidationFailed { .. } => "quadratum.form.invalid",
            Self::SubmitAttempt { .. } => "quadratum.form.submit",
            Self::StepChanged { .. } => "quadratum.form.step",
            Self::SubmitReleased { .. } => "quadratum.form.released",
        }
    }

    /// The id of the form that emitted the event.
    pub fn form_id(&self) -> &str {
        match self {
            Self::Viewed { form_id }
            | Self::ValidationFailed { form_id, .. }
            | Self::SubmitAttempt { form_id, .. }
            | Self::StepChanged { form_id, .. }
            | Self::SubmitReleased { form_id } => form_id,
        }
    }
}

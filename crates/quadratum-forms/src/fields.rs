//! Form controls and their validity state.
//!
//! A [`Control`] is a single named input discovered from the host markup. The
//! [`FieldKind`] decides which validation rules apply and how the control
//! contributes to a conditional rule's "current value".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a control in document order.
pub type ControlId = usize;

/// The type of a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// `<textarea>`.
    Textarea,
    /// `<input type="email">`.
    Email,
    /// `<input type="tel">`.
    Tel,
    /// `<input type="url">`.
    Url,
    /// `<input type="checkbox">`.
    Checkbox,
    /// `<input type="radio">`, grouped by name.
    Radio,
    /// `<select>`.
    Select,
    /// `<input type="hidden">`.
    Hidden,
    /// `<input type="text">` and any input type without dedicated rules.
    #[serde(other)]
    Text,
}

impl FieldKind {
    /// Returns `true` for controls whose value only counts while checked.
    pub const fn is_checkable(self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio)
    }

    /// Returns `true` for controls validated as free text (including the
    /// email, tel and url refinements).
    pub const fn is_free_text(self) -> bool {
        matches!(
            self,
            Self::Text | Self::Textarea | Self::Email | Self::Tel | Self::Url | Self::Hidden
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Select => "select",
            Self::Hidden => "hidden",
        };
        write!(f, "{name}")
    }
}

/// Result of the most recent validation pass for a control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum Validity {
    /// Not validated yet (or outside every scope validated so far).
    #[default]
    Unvalidated,
    /// Passed its rules in the last pass that covered it.
    Valid,
    /// Failed; carries the first failing rule's message.
    Invalid(String),
}

impl Validity {
    /// Returns `true` if the control is currently marked invalid.
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Returns the error message, if invalid.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Invalid(msg) => Some(msg),
            _ => None,
        }
    }
}

/// A single input control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// The HTML `id` (may be empty).
    pub id: String,
    /// The HTML `name` (may be empty).
    pub name: String,
    /// The control type.
    pub kind: FieldKind,
    /// The current value. Checkable controls keep their submit value here.
    pub value: String,
    /// Checked state for checkboxes and radios.
    pub checked: bool,
    /// Native `required` constraint.
    pub native_required: bool,
    /// Validity from the last validation pass.
    pub validity: Validity,
    /// Mirrors `aria-invalid="true"`.
    pub aria_invalid: bool,
    /// The wrapper group this control lives in, if any.
    pub group: Option<usize>,
}

impl Control {
    /// Creates an unchecked, optional control with an empty value.
    ///
    /// Checkable controls default to the value `"on"`, like the browser does.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        let value = if kind.is_checkable() { "on" } else { "" };
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            value: value.to_string(),
            checked: false,
            native_required: false,
            validity: Validity::Unvalidated,
            aria_invalid: false,
            group: None,
        }
    }

    /// Sets the current value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Sets the checked state.
    #[must_use]
    pub const fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Sets the native `required` constraint.
    #[must_use]
    pub const fn with_required(mut self, required: bool) -> Self {
        self.native_required = required;
        self
    }

    /// The value this control contributes to a conditional rule, if any.
    ///
    /// Checkable controls contribute only while checked; every other control
    /// always contributes its value.
    pub fn displayed_value(&self) -> Option<&str> {
        if self.kind.is_checkable() {
            self.checked.then_some(self.value.as_str())
        } else {
            Some(self.value.as_str())
        }
    }

    pub(crate) fn mark_invalid(&mut self, message: &str) {
        self.aria_invalid = true;
        if !self.validity.is_invalid() {
            self.validity = Validity::Invalid(message.to_string());
        }
    }

    pub(crate) fn mark_valid(&mut self) {
        self.aria_invalid = false;
        self.validity = Validity::Valid;
    }
}

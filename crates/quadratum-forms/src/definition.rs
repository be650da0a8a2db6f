//! Declarative form definitions.
//!
//! A [`FormDefinition`] is the typed rendition of the host template's
//! data-attribute contract: wrapper flags (`data-template`, `data-captcha`,
//! `data-captcha-key`, `data-msg-error`, ...), field wrappers
//! (`data-q-field`, `data-required`, `data-cond*`), steps (`.q-step`) and the
//! controls inside them. Definitions are loaded from JSON or TOML and turned
//! into a runtime [`FormModel`](crate::form::FormModel) once.
//!
//! Document order is: step groups (step by step), then top-level groups,
//! then loose controls, then top-level error slots.

use serde::{Deserialize, Serialize};

use quadratum_core::settings_loader::FileFormat;
use quadratum_core::FormsError;

use crate::fields::FieldKind;

/// Top-level form definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefinition {
    /// Unique form id; re-initialization is keyed on it.
    pub id: String,
    /// `"steps"` enables the step navigator.
    pub template: Option<String>,
    /// `none`, `turnstile` or `recaptcha_v3`.
    pub captcha: Option<String>,
    /// Site key for the challenge provider.
    pub captcha_key: Option<String>,
    /// Live-region message shown when submission is blocked.
    pub msg_error: Option<String>,
    /// Extra class for the generated "Next" button.
    pub btn_variant: Option<String>,
    /// Create missing attribution hidden inputs.
    pub attrib_create: bool,
    /// Pack attribution into `contact[tags]`. Defaults to on.
    pub pack_tags: Option<bool>,
    /// Whether the form has a native submit button. Defaults to on.
    pub submit_button: Option<bool>,
    /// Ordered steps, each with its field wrappers.
    pub steps: Vec<StepDefinition>,
    /// Field wrappers outside any step.
    pub groups: Vec<GroupDefinition>,
    /// Controls outside any wrapper (hidden inputs, tags, tokens).
    pub controls: Vec<ControlDefinition>,
    /// Id-addressable error slots outside any wrapper.
    pub error_slots: Vec<ErrorSlotDefinition>,
}

/// A `.q-step` container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDefinition {
    /// Optional label, for diagnostics only.
    pub title: Option<String>,
    /// Field wrappers inside the step.
    pub groups: Vec<GroupDefinition>,
}

/// A `data-q-field` wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDefinition {
    /// Wrapper id (diagnostics only).
    pub id: Option<String>,
    /// `data-required="true"`.
    pub required: bool,
    /// Controls inside the wrapper; the first one is the group's field.
    pub controls: Vec<ControlDefinition>,
    /// `data-cond="1"` rule.
    pub condition: Option<ConditionDefinition>,
    /// The wrapper's generic `.q-error` slot.
    pub error_slot: Option<ErrorSlotDefinition>,
}

/// A single control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDefinition {
    /// HTML id.
    pub id: String,
    /// HTML name.
    pub name: String,
    /// Control type.
    pub kind: FieldKind,
    /// Initial value; checkables default to `"on"`.
    pub value: Option<String>,
    /// Initial checked state.
    pub checked: bool,
    /// Native `required`.
    pub required: bool,
}

impl Default for ControlDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: FieldKind::Text,
            value: None,
            checked: false,
            required: false,
        }
    }
}

/// `data-cond-field`, `data-cond-operator`, `data-cond-value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionDefinition {
    /// Name of the control(s) the rule watches.
    pub field: String,
    /// `equals` (default), `contains` or `checked`.
    pub operator: String,
    /// Comparison value.
    pub value: String,
}

impl Default for ConditionDefinition {
    fn default() -> Self {
        Self {
            field: String::new(),
            operator: "equals".to_string(),
            value: String::new(),
        }
    }
}

/// An element that receives error text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorSlotDefinition {
    /// HTML id, e.g. `qf-12-err`.
    pub id: Option<String>,
}

impl FormDefinition {
    /// Parses a definition from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, FormsError> {
        serde_json::from_str(json).map_err(|e| {
            FormsError::SerializationError(format!("Failed to parse form definition JSON: {e}"))
        })
    }

    /// Parses a definition from TOML.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, FormsError> {
        toml::from_str(toml_str).map_err(|e| {
            FormsError::SerializationError(format!("Failed to parse form definition TOML: {e}"))
        })
    }

    /// Reads a definition file, choosing the format the same way settings
    /// files are read (`.toml` is TOML, anything else JSON).
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, FormsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match FileFormat::from_path(path) {
            FileFormat::Toml => Self::from_toml_str(&content),
            FileFormat::Json => Self::from_json_str(&content),
        }
    }

    /// Returns `true` if the wrapper declares the step template.
    pub fn is_step_form(&self) -> bool {
        self.template.as_deref() == Some("steps")
    }

    /// Iterates over every group in document order.
    pub fn all_groups(&self) -> impl Iterator<Item = &GroupDefinition> {
        self.steps
            .iter()
            .flat_map(|step| step.groups.iter())
            .chain(self.groups.iter())
    }

    /// Iterates over every control in document order.
    pub fn all_controls(&self) -> impl Iterator<Item = &ControlDefinition> {
        self.all_groups()
            .flat_map(|group| group.controls.iter())
            .chain(self.controls.iter())
    }
}

//! Error slot resolution.
//!
//! A control's error text goes to the first slot found by:
//!
//! 1. the element whose id is `{control id}{suffix}`;
//! 2. the same lookup after stripping the radio-option suffix pattern from
//!    the control id (`qf-7-2` -> `qf-7-err`);
//! 3. the generic slot of the control's field wrapper.
//!
//! When none exists the message is kept on the control only.

use regex::Regex;

use quadratum_core::{FormsError, Settings};

use crate::fields::ControlId;
use crate::form::{FormModel, SlotId};

/// Resolves the error slot for a control.
#[derive(Debug, Clone)]
pub struct ErrorTargetResolver {
    suffix: String,
    strip: Regex,
}

impl ErrorTargetResolver {
    /// Builds a resolver from the configured suffix and strip pattern.
    pub fn new(suffix: impl Into<String>, strip_pattern: &str) -> Result<Self, FormsError> {
        let strip = Regex::new(strip_pattern).map_err(|e| {
            FormsError::ConfigurationError(format!(
                "Invalid radio id suffix pattern '{strip_pattern}': {e}"
            ))
        })?;
        Ok(Self {
            suffix: suffix.into(),
            strip,
        })
    }

    /// Builds a resolver from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, FormsError> {
        Self::new(&settings.error_slot_suffix, &settings.radio_id_suffix_pattern)
    }

    /// Returns the slot that receives `control`'s error text, if any.
    pub fn resolve(&self, model: &FormModel, control: ControlId) -> Option<SlotId> {
        let control = model.control(control)?;
        if !control.id.is_empty() {
            let exact = format!("{}{}", control.id, self.suffix);
            if let Some(slot) = slot_by_html_id(model, &exact) {
                return Some(slot);
            }
            let base = self.strip.replace(&control.id, "");
            if base != control.id {
                let stripped = format!("{base}{}", self.suffix);
                if let Some(slot) = slot_by_html_id(model, &stripped) {
                    return Some(slot);
                }
            }
        }
        control
            .group
            .and_then(|gid| model.groups().get(gid))
            .and_then(|group| group.error_slot)
    }
}

fn slot_by_html_id(model: &FormModel, html_id: &str) -> Option<SlotId> {
    model
        .slots()
        .iter()
        .position(|slot| slot.id.as_deref() == Some(html_id))
}

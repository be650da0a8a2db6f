//! The field validator.
//!
//! A validation pass walks the field wrappers of a [`Scope`] in document
//! order, skipping wrappers hidden by a conditional rule. Each wrapper's
//! field is cleared first, then checked against the rules for its kind; the
//! first failing rule's message is written to the control and to its error
//! slot. Radio groups are validated once per pass, form-wide by name, and
//! their error lands on the group's first member.

use std::collections::HashSet;

use serde::Serialize;

use quadratum_core::{FormsError, MessageSettings, Settings, ValidationError};

use crate::error_target::ErrorTargetResolver;
use crate::fields::{ControlId, FieldKind};
use crate::form::{FormModel, Scope};
use crate::validators;

/// Outcome of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// `true` if every validated field passed.
    pub ok: bool,
    /// Controls marked invalid, in document order.
    pub invalid: Vec<ControlId>,
    /// The control that received focus in this pass.
    pub focused: Option<ControlId>,
}

/// Validates a form model against its wrapper flags and control kinds.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    messages: MessageSettings,
    resolver: ErrorTargetResolver,
}

impl FieldValidator {
    /// Creates a validator with the given messages and slot resolver.
    pub const fn new(messages: MessageSettings, resolver: ErrorTargetResolver) -> Self {
        Self { messages, resolver }
    }

    /// Creates a validator from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, FormsError> {
        Ok(Self::new(
            settings.messages.clone(),
            ErrorTargetResolver::from_settings(settings)?,
        ))
    }

    /// The messages this validator emits.
    pub const fn messages(&self) -> &MessageSettings {
        &self.messages
    }

    /// Runs one validation pass over `scope`.
    pub fn validate(&self, model: &mut FormModel, scope: Scope) -> ValidationReport {
        let mut report = ValidationReport {
            ok: true,
            ..ValidationReport::default()
        };
        let mut seen_radio_groups: HashSet<String> = HashSet::new();

        for gid in 0..model.groups().len() {
            let group = &model.groups()[gid];
            if !scope.contains(group) || group.is_hidden() {
                continue;
            }
            let Some(field) = group.field else {
                continue;
            };
            let group_required = group.required;
            let Some(control) = model.control(field) else {
                continue;
            };
            let required = group_required || control.native_required;
            let kind = control.kind;

            let (target, outcome) = if kind == FieldKind::Radio {
                let name = control.name.clone();
                if !seen_radio_groups.insert(name.clone()) {
                    continue;
                }
                let members = model.radio_group(&name);
                let any_checked = members
                    .iter()
                    .any(|&m| model.control(m).is_some_and(|c| c.checked));
                let target = members.first().copied().unwrap_or(field);
                for &member in &members {
                    self.clear(model, member);
                }
                let outcome = if required && !any_checked {
                    Err(ValidationError::new(&self.messages.required, "required"))
                } else {
                    Ok(())
                };
                (target, outcome)
            } else {
                self.clear(model, field);
                (field, self.check_control(model, field, required))
            };

            if let Err(err) = outcome {
                self.annotate(model, target, &err);
                report.ok = false;
                report.invalid.push(target);
                if report.focused.is_none() {
                    report.focused = Some(target);
                    model.focus(target);
                }
            }
        }

        if model.missing_email() {
            report.ok = false;
            model.set_live_message(self.messages.missing_email.clone());
        }

        tracing::debug!(
            ok = report.ok,
            invalid = report.invalid.len(),
            ?scope,
            "validation pass finished"
        );
        report
    }

    fn check_control(
        &self,
        model: &FormModel,
        field: ControlId,
        required: bool,
    ) -> Result<(), ValidationError> {
        let Some(control) = model.control(field) else {
            return Ok(());
        };
        match control.kind {
            FieldKind::Checkbox => {
                if required && !control.checked {
                    return Err(ValidationError::new(&self.messages.required, "required"));
                }
                Ok(())
            }
            FieldKind::Select => validators::check_required(&control.value, required, &self.messages),
            // Handled as a group in `validate`.
            FieldKind::Radio => Ok(()),
            kind => {
                let value = control.value.trim();
                validators::check_required(value, required, &self.messages)?;
                if value.is_empty() {
                    return Ok(());
                }
                match kind {
                    FieldKind::Email => validators::check_email(value, &self.messages),
                    FieldKind::Tel => validators::check_phone(value, &self.messages),
                    FieldKind::Url => validators::check_url(value, &self.messages),
                    _ => Ok(()),
                }
            }
        }
    }

    fn clear(&self, model: &mut FormModel, control: ControlId) {
        let slot = self.resolver.resolve(model, control);
        if let Some(c) = model.control_mut(control) {
            c.mark_valid();
        }
        if let Some(slot) = slot.and_then(|s| model.slot_mut(s)) {
            slot.text.clear();
        }
    }

    fn annotate(&self, model: &mut FormModel, control: ControlId, err: &ValidationError) {
        let slot = self.resolver.resolve(model, control);
        if let Some(c) = model.control_mut(control) {
            c.mark_invalid(&err.message);
        }
        if let Some(slot) = slot.and_then(|s| model.slot_mut(s)) {
            // The generic required message never replaces a specific one.
            if !err.is_required() || slot.text.is_empty() {
                slot.text.clone_from(&err.message);
            }
        }
    }
}

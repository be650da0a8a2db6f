//! Conditional visibility.
//!
//! A field wrapper carrying a [`ConditionalRule`] is shown or hidden based on
//! the current value of the controls named by the rule. Hidden wrappers are
//! exempt from validation. Rules are re-evaluated at init and after every
//! input, change and checkable click.

use serde::Serialize;

use crate::definition::ConditionDefinition;
use crate::form::{FormModel, Visibility};

/// Comparison used by a conditional rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Current value equals the rule value.
    Equals,
    /// Current value contains the rule value.
    Contains,
    /// Current value is `on`, `yes` or `true`.
    Checked,
}

impl Operator {
    /// Parses an operator attribute. An empty attribute means `equals`;
    /// anything unrecognized yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "equals" => Some(Self::Equals),
            "contains" => Some(Self::Contains),
            "checked" => Some(Self::Checked),
            _ => None,
        }
    }
}

/// A show/hide rule attached to a field wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalRule {
    /// Name of the watched control(s). Empty means always visible.
    pub field: String,
    /// Parsed operator; `None` for an unknown operator (always visible).
    pub operator: Option<Operator>,
    /// Lowercased comparison value.
    pub value: String,
}

impl ConditionalRule {
    /// Builds a rule from its definition.
    pub fn from_definition(def: &ConditionDefinition) -> Self {
        Self {
            field: def.field.clone(),
            operator: Operator::parse(&def.operator),
            value: def.value.to_lowercase(),
        }
    }

    /// Decides visibility given the lowercased current value.
    pub fn shows(&self, current: &str) -> bool {
        match self.operator {
            Some(Operator::Equals) => current == self.value,
            Some(Operator::Contains) => current.contains(self.value.as_str()),
            Some(Operator::Checked) => matches!(current, "on" | "yes" | "true"),
            None => true,
        }
    }
}

/// The current value of the controls called `name`, lowercased.
///
/// The last contributing control in document order wins: checked radios and
/// checkboxes, any select, and any other non-checkable control. Returns
/// `None` when no control carries the name.
pub fn current_value(model: &FormModel, name: &str) -> Option<String> {
    let controls = model.controls_named(name);
    if controls.is_empty() {
        return None;
    }
    let current = controls
        .iter()
        .filter_map(|&id| model.control(id))
        .filter_map(|c| c.displayed_value())
        .last()
        .unwrap_or("");
    Some(current.to_lowercase())
}

/// Re-evaluates every conditional wrapper. Returns the number of wrappers
/// whose visibility changed.
pub fn evaluate_all(model: &mut FormModel) -> usize {
    let decisions: Vec<(usize, Visibility)> = model
        .groups()
        .iter()
        .enumerate()
        .filter_map(|(gid, group)| {
            let rule = group.rule.as_ref()?;
            let show = if rule.field.is_empty() {
                true
            } else {
                current_value(model, &rule.field).map_or(true, |current| rule.shows(&current))
            };
            let visibility = if show {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
            Some((gid, visibility))
        })
        .collect();

    let mut changed = 0;
    let groups = model.groups_mut();
    for (gid, visibility) in decisions {
        if groups[gid].visibility != visibility {
            groups[gid].visibility = visibility;
            changed += 1;
        }
    }
    if changed > 0 {
        tracing::trace!(changed, "conditional visibility updated");
    }
    changed
}

//! The `validate` command.
//!
//! Initializes a definition the way a page would, applies submitted values
//! through the input and click handlers (so conditional rules run exactly as
//! they do in the browser), validates one scope and prints a JSON report.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use quadratum_core::{FormsError, Settings, ValidationError};
use quadratum_forms::attribution::PageContext;
use quadratum_forms::captcha::ChallengeProviders;
use quadratum_forms::fields::FieldKind;
use quadratum_forms::{FormDefinition, FormInstance, FormRegistry, Scope};

use super::{definition_arg, load_definition};
use crate::command::ManagementCommand;

/// Validates submitted values against a definition.
pub struct ValidateCommand;

/// One invalid control in a [`ValidateReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidField {
    /// HTML id.
    pub id: String,
    /// HTML name.
    pub name: String,
    /// The message shown to the visitor.
    pub message: String,
}

/// The JSON document printed by `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidateReport {
    /// Form id.
    pub form: String,
    /// The validated scope.
    pub scope: Scope,
    /// `true` if every validated field passed.
    pub ok: bool,
    /// Invalid controls in document order.
    pub invalid: Vec<InvalidField>,
    /// HTML id of the control that would receive focus.
    pub focused: Option<String>,
    /// Wrappers hidden by their conditional rule.
    pub hidden: Vec<String>,
    /// The live-region message, if one was set.
    pub live_message: Option<String>,
}

/// Parses a values document: a JSON object mapping control names to a
/// string, a number, a boolean (checkboxes) or an array of checked values.
pub fn parse_values(json: &str) -> Result<BTreeMap<String, Value>, FormsError> {
    serde_json::from_str(json).map_err(|e| FormsError::SerializationError(e.to_string()))
}

/// Resolves a 1-based `--step` into a scope.
pub fn scope_for(definition: &FormDefinition, step: Option<usize>) -> Result<Scope, FormsError> {
    let Some(step) = step else {
        return Ok(Scope::Form);
    };
    if !definition.is_step_form() {
        return Err(FormsError::ConfigurationError(format!(
            "form '{}' is not a step form",
            definition.id
        )));
    }
    if step == 0 || step > definition.steps.len() {
        return Err(FormsError::ConfigurationError(format!(
            "step {step} is out of range (1..={})",
            definition.steps.len()
        )));
    }
    Ok(Scope::Step(step - 1))
}

fn apply_value(instance: &FormInstance, name: &str, value: &Value) {
    let targets = instance.with_model(|model| {
        model
            .controls_named(name)
            .into_iter()
            .filter_map(|id| model.control(id).map(|c| (id, c.kind, c.checked, c.value.clone())))
            .collect::<Vec<_>>()
    });
    if targets.is_empty() {
        tracing::warn!(control = name, "no control with this name");
        return;
    }

    for (id, kind, checked, own_value) in targets {
        if kind.is_checkable() {
            let wanted = match value {
                Value::Bool(b) => *b,
                Value::String(s) => *s == own_value,
                Value::Array(items) => items.iter().any(|v| v.as_str() == Some(own_value.as_str())),
                _ => false,
            };
            // A radio can only be unchecked by checking a sibling.
            if wanted != checked && (wanted || kind == FieldKind::Checkbox) {
                instance.on_click(id);
            }
        } else {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            instance.on_input(id, &text);
        }
    }
}

/// Applies `values` to a fresh instance of `definition` and validates `scope`.
pub fn validate_definition(
    definition: &FormDefinition,
    values: &BTreeMap<String, Value>,
    scope: Scope,
    settings: &Settings,
) -> Result<ValidateReport, FormsError> {
    let registry = FormRegistry::new(settings.clone(), ChallengeProviders::new());
    let instance = registry.init(definition, &PageContext::from_url("about:blank"))?;

    for (name, value) in values {
        apply_value(&instance, name, value);
    }

    let report = instance.validate(scope);
    Ok(instance.with_model(|model| ValidateReport {
        form: model.id().to_string(),
        scope,
        ok: report.ok,
        invalid: report
            .invalid
            .iter()
            .filter_map(|&id| model.control(id))
            .map(|c| InvalidField {
                id: c.id.clone(),
                name: c.name.clone(),
                message: c.validity.message().unwrap_or_default().to_string(),
            })
            .collect(),
        focused: report
            .focused
            .and_then(|id| model.control(id))
            .map(|c| c.id.clone()),
        hidden: model
            .groups()
            .iter()
            .filter(|g| g.is_hidden())
            .filter_map(|g| g.id.clone())
            .collect(),
        live_message: model.live_message().map(str::to_string),
    }))
}

#[async_trait]
impl ManagementCommand for ValidateCommand {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn about(&self) -> &'static str {
        "Validate values against a form definition and print a JSON report"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(definition_arg())
            .arg(
                clap::Arg::new("step")
                    .long("step")
                    .value_name("N")
                    .value_parser(clap::value_parser!(usize))
                    .help("Validate only step N (1-based) of a step form"),
            )
            .arg(
                clap::Arg::new("values")
                    .long("values")
                    .value_name("FILE")
                    .help("JSON object mapping control names to values"),
            )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), FormsError> {
        let definition = load_definition(matches)?;
        let scope = scope_for(&definition, matches.get_one::<usize>("step").copied())?;
        let values = match matches.get_one::<String>("values") {
            Some(path) => parse_values(&std::fs::read_to_string(Path::new(path))?)?,
            None => BTreeMap::new(),
        };

        let report = validate_definition(&definition, &values, scope, settings)?;
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| FormsError::SerializationError(e.to_string()))?;
        println!("{json}");

        if report.ok {
            Ok(())
        } else {
            Err(ValidationError::new(
                format!("{} invalid field(s)", report.invalid.len()),
                "invalid",
            )
            .into())
        }
    }
}

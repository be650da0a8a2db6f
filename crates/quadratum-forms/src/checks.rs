//! Definition checks.
//!
//! Static diagnostics over a [`FormDefinition`], run by the `check` command
//! before a definition ships. Checks are registered with tags and can be run
//! all at once or filtered by tag.
//!
//! ```
//! use quadratum_forms::checks::{CheckLevel, CheckRegistry};
//! use quadratum_forms::definition::FormDefinition;
//!
//! let def = FormDefinition {
//!     id: "quote".to_string(),
//!     template: Some("steps".to_string()),
//!     ..FormDefinition::default()
//! };
//! let messages = CheckRegistry::with_builtins().run_checks(None, &def);
//! assert!(messages.iter().any(|m| m.level == CheckLevel::Error));
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::captcha::ChallengeMode;
use crate::conditions::Operator;
use crate::definition::FormDefinition;
use crate::form::FormModel;

/// Severity of a check message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckLevel {
    /// Informational.
    Info,
    /// Works, but probably not as intended.
    Warning,
    /// Broken at runtime.
    Error,
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A diagnostic produced by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckMessage {
    /// Severity.
    pub level: CheckLevel,
    /// Identifier such as `forms.E001`.
    pub id: &'static str,
    /// What is wrong.
    pub msg: String,
    /// How to fix it.
    pub hint: Option<String>,
    /// The offending element (form, wrapper or control id).
    pub obj: Option<String>,
}

impl CheckMessage {
    fn new(level: CheckLevel, id: &'static str, msg: impl Into<String>) -> Self {
        Self {
            level,
            id,
            msg: msg.into(),
            hint: None,
            obj: None,
        }
    }

    /// A warning.
    pub fn warning(id: &'static str, msg: impl Into<String>) -> Self {
        Self::new(CheckLevel::Warning, id, msg)
    }

    /// An error.
    pub fn error(id: &'static str, msg: impl Into<String>) -> Self {
        Self::new(CheckLevel::Error, id, msg)
    }

    /// Attaches a hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attaches the offending element.
    #[must_use]
    pub fn with_obj(mut self, obj: impl Into<String>) -> Self {
        self.obj = Some(obj.into());
        self
    }

    /// Returns `true` for errors.
    pub fn is_error(&self) -> bool {
        self.level >= CheckLevel::Error
    }
}

impl fmt::Display for CheckMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}: {}", self.id, self.level, self.msg)?;
        if let Some(ref hint) = self.hint {
            write!(f, "\n\tHINT: {hint}")?;
        }
        if let Some(ref obj) = self.obj {
            write!(f, "\n\tObject: {obj}")?;
        }
        Ok(())
    }
}

/// A check over one definition.
pub type CheckFn = fn(&FormDefinition) -> Vec<CheckMessage>;

struct RegisteredCheck {
    func: CheckFn,
    tags: Vec<String>,
}

/// Registry of definition checks with tag filtering.
pub struct CheckRegistry {
    checks: Vec<RegisteredCheck>,
}

impl CheckRegistry {
    /// An empty registry.
    pub const fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// A registry loaded with the built-in checks.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(check_steps, &["steps"]);
        registry.register(check_conditions, &["conditions"]);
        registry.register(check_missing_email, &["submission"]);
        registry.register(check_captcha_key, &["submission"]);
        registry.register(check_duplicate_ids, &["markup"]);
        registry
    }

    /// Registers `func` under `tags`.
    pub fn register(&mut self, func: CheckFn, tags: &[&str]) {
        self.checks.push(RegisteredCheck {
            func,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        });
    }

    /// Runs every check, or only those carrying one of `tags`.
    pub fn run_checks(&self, tags: Option<&[&str]>, definition: &FormDefinition) -> Vec<CheckMessage> {
        self.checks
            .iter()
            .filter(|check| {
                tags.map_or(true, |wanted| {
                    wanted.iter().any(|t| check.tags.iter().any(|own| own == t))
                })
            })
            .flat_map(|check| (check.func)(definition))
            .collect()
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns `true` if no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Built-in checks
// ============================================================

/// `forms.E001`: step template with no steps.
fn check_steps(def: &FormDefinition) -> Vec<CheckMessage> {
    if def.is_step_form() && def.steps.is_empty() {
        return vec![CheckMessage::error("forms.E001", "Form uses the steps template but defines no steps.")
            .with_hint("Add at least one step, or remove the steps template.")
            .with_obj(&def.id)];
    }
    Vec::new()
}

/// `forms.E002`/`forms.E003`: conditions naming unknown fields or operators.
fn check_conditions(def: &FormDefinition) -> Vec<CheckMessage> {
    let names: HashSet<&str> = def.all_controls().map(|c| c.name.as_str()).collect();
    let mut messages = Vec::new();
    for (index, group) in def.all_groups().enumerate() {
        let Some(cond) = &group.condition else {
            continue;
        };
        let obj = group.id.clone().unwrap_or_else(|| format!("group #{index}"));
        if !cond.field.is_empty() && !names.contains(cond.field.as_str()) {
            messages.push(
                CheckMessage::error(
                    "forms.E002",
                    format!("Condition watches '{}', which no control is named.", cond.field),
                )
                .with_hint("The wrapper will always be shown.")
                .with_obj(obj.clone()),
            );
        }
        if Operator::parse(&cond.operator).is_none() {
            messages.push(
                CheckMessage::error(
                    "forms.E003",
                    format!("Unknown condition operator '{}'.", cond.operator),
                )
                .with_hint("Use equals, contains or checked.")
                .with_obj(obj),
            );
        }
    }
    messages
}

/// `forms.W001`: customer form without an email input.
fn check_missing_email(def: &FormDefinition) -> Vec<CheckMessage> {
    if FormModel::from_definition(def).lacks_required_email() {
        return vec![CheckMessage::warning(
            "forms.W001",
            "Form looks like a newsletter/customer form but has no email input.",
        )
        .with_hint("Add an Email field block. Every submission will be blocked until then.")
        .with_obj(&def.id)];
    }
    Vec::new()
}

/// `forms.W002`: challenge mode without a site key.
fn check_captcha_key(def: &FormDefinition) -> Vec<CheckMessage> {
    let mode = def
        .captcha
        .as_deref()
        .map_or(ChallengeMode::None, ChallengeMode::from_attr);
    let has_key = def.captcha_key.as_deref().is_some_and(|k| !k.is_empty());
    if mode != ChallengeMode::None && !has_key {
        return vec![CheckMessage::warning(
            "forms.W002",
            format!("Challenge mode '{mode}' is set without a site key."),
        )
        .with_hint("Submissions will go through without a challenge token.")
        .with_obj(&def.id)];
    }
    Vec::new()
}

/// `forms.W003`: duplicate control ids.
fn check_duplicate_ids(def: &FormDefinition) -> Vec<CheckMessage> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut messages = Vec::new();
    for control in def.all_controls() {
        if control.id.is_empty() {
            continue;
        }
        if !seen.insert(control.id.as_str()) && reported.insert(control.id.as_str()) {
            messages.push(
                CheckMessage::warning("forms.W003", format!("Control id '{}' is used more than once.", control.id))
                    .with_hint("Error slots are looked up by id; duplicates receive the wrong message.")
                    .with_obj(&control.id),
            );
        }
    }
    messages
}

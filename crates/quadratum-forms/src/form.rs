//! The runtime form model.
//!
//! [`FormModel`] is built once from a [`FormDefinition`] and then mutated in
//! place by the conditional engine, the validator, the step navigator and the
//! submission coordinator. It is the typed stand-in for the live DOM: every
//! lookup returns an `Option`, and a missing element is always a valid state.

use serde::Serialize;

use crate::captcha::ChallengeMode;
use crate::conditions::ConditionalRule;
use crate::definition::{ControlDefinition, ErrorSlotDefinition, FormDefinition, GroupDefinition};
use crate::fields::{Control, ControlId, FieldKind};
use crate::steps::StepNavigator;

/// Index of a field wrapper in document order.
pub type GroupId = usize;

/// Index of an error slot.
pub type SlotId = usize;

/// Whether a field wrapper is currently shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Shown; subject to validation.
    #[default]
    Visible,
    /// Hidden by a conditional rule; exempt from validation.
    Hidden,
}

/// A field wrapper (`data-q-field`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    /// Wrapper id, if any.
    pub id: Option<String>,
    /// The wrapper's field: its first control.
    pub field: Option<ControlId>,
    /// Every control inside the wrapper.
    pub controls: Vec<ControlId>,
    /// `data-required="true"`.
    pub required: bool,
    /// Current visibility.
    pub visibility: Visibility,
    /// Conditional rule, if the wrapper is a conditional block.
    pub rule: Option<ConditionalRule>,
    /// Owning step, if any.
    pub step: Option<usize>,
    /// The wrapper's generic error slot.
    pub error_slot: Option<SlotId>,
}

impl FieldGroup {
    /// Returns `true` if a conditional rule currently hides this wrapper.
    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }
}

/// An element receiving error text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSlot {
    /// HTML id, if any.
    pub id: Option<String>,
    /// Owning wrapper, for generic slots.
    pub group: Option<GroupId>,
    /// Current error text.
    pub text: String,
}

/// A `.q-step` partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// Optional label.
    pub title: Option<String>,
    /// Wrappers inside this step, in document order.
    pub groups: Vec<GroupId>,
    /// `is-active` class.
    pub active: bool,
}

/// The portion of the form a validation pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every wrapper.
    Form,
    /// Only the wrappers of one step.
    Step(usize),
}

impl Scope {
    /// Returns `true` if `group` falls inside this scope.
    pub fn contains(self, group: &FieldGroup) -> bool {
        match self {
            Self::Form => true,
            Self::Step(index) => group.step == Some(index),
        }
    }
}

/// State of the native submit button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmitControl {
    /// Whether the form has a submit button at all.
    pub present: bool,
    /// `disabled` attribute.
    pub disabled: bool,
    /// `aria-busy="true"`.
    pub aria_busy: bool,
    /// Hidden while a "Next" button replaces it.
    pub visible: bool,
}

impl SubmitControl {
    pub(crate) fn engage(&mut self) {
        if self.present {
            self.disabled = true;
            self.aria_busy = true;
        }
    }

    pub(crate) fn release(&mut self) {
        self.disabled = false;
        self.aria_busy = false;
    }
}

/// Kind of a generated navigation button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavKind {
    /// Goes to the previous step without validating.
    Back,
    /// Validates the current step, then advances.
    Next,
}

/// A generated navigation button inside the steps actions bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavControl {
    /// Back or Next.
    pub kind: NavKind,
    /// Button text.
    pub label: String,
    /// Button classes.
    pub class: String,
}

/// Wrapper-level configuration read from the definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    /// Challenge mode.
    pub captcha: ChallengeMode,
    /// Challenge site key (may be empty).
    pub captcha_key: String,
    /// Custom summary message.
    pub msg_error: Option<String>,
    /// Class for the "Next" button.
    pub btn_variant: String,
    /// Create missing attribution inputs.
    pub attrib_create: bool,
    /// Pack attribution into tags.
    pub pack_tags: bool,
}

/// The runtime model of one form instance.
#[derive(Debug, Clone)]
pub struct FormModel {
    id: String,
    config: FormConfig,
    controls: Vec<Control>,
    groups: Vec<FieldGroup>,
    steps: Vec<Step>,
    slots: Vec<ErrorSlot>,
    navigator: Option<StepNavigator>,
    focused: Option<ControlId>,
    live_message: Option<String>,
    submit: SubmitControl,
    progress_width: Option<String>,
    progress_counter: Option<String>,
    actions_bar: Option<Vec<NavControl>>,
    challenge_mount: Option<String>,
    missing_email: bool,
}

impl FormModel {
    /// Builds the model from a definition, in document order.
    pub fn from_definition(def: &FormDefinition) -> Self {
        let mut model = Self {
            id: def.id.clone(),
            config: FormConfig {
                captcha: def
                    .captcha
                    .as_deref()
                    .map_or(ChallengeMode::None, ChallengeMode::from_attr),
                captcha_key: def.captcha_key.clone().unwrap_or_default(),
                msg_error: def.msg_error.clone().filter(|m| !m.is_empty()),
                btn_variant: def
                    .btn_variant
                    .clone()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "q-btn--solid".to_string()),
                attrib_create: def.attrib_create,
                pack_tags: def.pack_tags.unwrap_or(true),
            },
            controls: Vec::new(),
            groups: Vec::new(),
            steps: Vec::new(),
            slots: Vec::new(),
            navigator: None,
            focused: None,
            live_message: None,
            submit: SubmitControl {
                present: def.submit_button.unwrap_or(true),
                disabled: false,
                aria_busy: false,
                visible: true,
            },
            progress_width: None,
            progress_counter: None,
            actions_bar: None,
            challenge_mount: None,
            missing_email: false,
        };

        for (index, step_def) in def.steps.iter().enumerate() {
            let groups = step_def
                .groups
                .iter()
                .map(|g| model.push_group(g, Some(index)))
                .collect();
            model.steps.push(Step {
                title: step_def.title.clone(),
                groups,
                active: false,
            });
        }
        for group_def in &def.groups {
            model.push_group(group_def, None);
        }
        for control_def in &def.controls {
            model.push_control(control_def, None);
        }
        for slot_def in &def.error_slots {
            model.push_slot(slot_def, None);
        }

        if def.is_step_form() {
            model.navigator = Some(StepNavigator::new(model.steps.len()));
        }
        model
    }

    fn push_group(&mut self, def: &GroupDefinition, step: Option<usize>) -> GroupId {
        let gid = self.groups.len();
        let controls: Vec<ControlId> = def
            .controls
            .iter()
            .map(|c| self.push_control(c, Some(gid)))
            .collect();
        let error_slot = def.error_slot.as_ref().map(|s| self.push_slot(s, Some(gid)));
        self.groups.push(FieldGroup {
            id: def.id.clone(),
            field: controls.first().copied(),
            controls,
            required: def.required,
            visibility: Visibility::Visible,
            rule: def.condition.as_ref().map(ConditionalRule::from_definition),
            step,
            error_slot,
        });
        gid
    }

    fn push_control(&mut self, def: &ControlDefinition, group: Option<GroupId>) -> ControlId {
        let mut control = Control::new(def.id.clone(), def.name.clone(), def.kind)
            .with_checked(def.checked)
            .with_required(def.required);
        if let Some(value) = &def.value {
            control.value.clone_from(value);
        }
        control.group = group;
        self.controls.push(control);
        self.controls.len() - 1
    }

    fn push_slot(&mut self, def: &ErrorSlotDefinition, group: Option<GroupId>) -> SlotId {
        self.slots.push(ErrorSlot {
            id: def.id.clone().filter(|id| !id.is_empty()),
            group,
            text: String::new(),
        });
        self.slots.len() - 1
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The form id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wrapper-level configuration.
    pub const fn config(&self) -> &FormConfig {
        &self.config
    }

    /// All controls in document order.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// A control by index.
    pub fn control(&self, id: ControlId) -> Option<&Control> {
        self.controls.get(id)
    }

    pub(crate) fn control_mut(&mut self, id: ControlId) -> Option<&mut Control> {
        self.controls.get_mut(id)
    }

    /// Finds a control by its HTML id.
    pub fn control_by_html_id(&self, html_id: &str) -> Option<ControlId> {
        if html_id.is_empty() {
            return None;
        }
        self.controls.iter().position(|c| c.id == html_id)
    }

    /// Every control sharing `name`, in document order.
    pub fn controls_named(&self, name: &str) -> Vec<ControlId> {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// The members of the radio group called `name`, form-wide.
    pub fn radio_group(&self, name: &str) -> Vec<ControlId> {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == FieldKind::Radio && c.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// The value of the first control called `name`.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.controls
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// All field wrappers in document order.
    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut [FieldGroup] {
        &mut self.groups
    }

    /// All steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// All error slots.
    pub fn slots(&self) -> &[ErrorSlot] {
        &self.slots
    }

    /// An error slot by index.
    pub fn slot(&self, id: SlotId) -> Option<&ErrorSlot> {
        self.slots.get(id)
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> Option<&mut ErrorSlot> {
        self.slots.get_mut(id)
    }

    /// The control that received focus in the last validation pass.
    pub const fn focused(&self) -> Option<ControlId> {
        self.focused
    }

    pub(crate) fn focus(&mut self, id: ControlId) {
        self.focused = Some(id);
    }

    /// The `.q-live` region text.
    pub fn live_message(&self) -> Option<&str> {
        self.live_message.as_deref()
    }

    pub(crate) fn set_live_message(&mut self, message: impl Into<String>) {
        self.live_message = Some(message.into());
    }

    /// The native submit button.
    pub const fn submit(&self) -> &SubmitControl {
        &self.submit
    }

    pub(crate) fn submit_mut(&mut self) -> &mut SubmitControl {
        &mut self.submit
    }

    /// `true` when the wrapper declared the step template.
    pub const fn is_step_form(&self) -> bool {
        self.navigator.is_some()
    }

    /// The step navigator, for step forms.
    pub const fn navigator(&self) -> Option<StepNavigator> {
        self.navigator
    }

    pub(crate) fn set_navigator(&mut self, navigator: StepNavigator) {
        self.navigator = Some(navigator);
    }

    /// The active validation scope: the current step for step forms with at
    /// least one step, otherwise the whole form.
    pub fn active_scope(&self) -> Scope {
        self.navigator
            .filter(|nav| nav.count() > 0)
            .map_or(Scope::Form, |nav| Scope::Step(nav.index()))
    }

    /// Width of the progress fill, e.g. `"66.7%"`.
    pub fn progress_width(&self) -> Option<&str> {
        self.progress_width.as_deref()
    }

    /// The `n / total` counter text.
    pub fn progress_counter(&self) -> Option<&str> {
        self.progress_counter.as_deref()
    }

    /// The generated navigation buttons, once the actions bar exists.
    pub fn actions_bar(&self) -> Option<&[NavControl]> {
        self.actions_bar.as_deref()
    }

    pub(crate) fn paint_steps(
        &mut self,
        active: usize,
        progress_width: String,
        counter: String,
        nav: Vec<NavControl>,
        submit_visible: bool,
    ) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.active = index == active;
        }
        self.progress_width = Some(progress_width);
        self.progress_counter = Some(counter);
        // The bar is created on first paint and only refilled afterwards.
        let bar = self.actions_bar.get_or_insert_with(Vec::new);
        bar.clear();
        bar.extend(nav);
        self.submit.visible = submit_visible;
    }

    /// `true` if the form was flagged as a customer form without an email.
    pub const fn missing_email(&self) -> bool {
        self.missing_email
    }

    pub(crate) fn flag_missing_email(&mut self) {
        self.missing_email = true;
    }

    // ── Mutation from host events ────────────────────────────────────

    /// Sets the value of a control. Returns `false` if it does not exist.
    pub fn set_value(&mut self, id: ControlId, value: &str) -> bool {
        self.control_mut(id).map_or(false, |control| {
            control.value = value.to_string();
            true
        })
    }

    /// Sets the checked state of a control. Checking a radio unchecks the
    /// other members of its group.
    pub fn set_checked(&mut self, id: ControlId, checked: bool) -> bool {
        let Some(control) = self.controls.get(id) else {
            return false;
        };
        if control.kind == FieldKind::Radio && checked {
            let name = control.name.clone();
            for member in self.radio_group(&name) {
                self.controls[member].checked = member == id;
            }
        } else if let Some(control) = self.control_mut(id) {
            control.checked = checked;
        }
        true
    }

    /// Returns the first input called `name`, creating a hidden one at the
    /// end of the form when `create` is set.
    pub fn ensure_hidden(&mut self, name: &str, create: bool) -> Option<ControlId> {
        if let Some(id) = self.controls.iter().position(|c| c.name == name) {
            return Some(id);
        }
        if !create {
            return None;
        }
        self.controls
            .push(Control::new(String::new(), name, FieldKind::Hidden));
        Some(self.controls.len() - 1)
    }

    /// Sets the value of the input called `name` if present (or created).
    pub fn set_hidden(&mut self, name: &str, value: &str, create: bool) -> bool {
        self.ensure_hidden(name, create)
            .map_or(false, |id| self.set_value(id, value))
    }

    /// Returns the id of the off-screen element the Turnstile widget
    /// renders into, creating it on first use.
    pub fn ensure_challenge_mount(&mut self) -> String {
        let id = &self.id;
        self.challenge_mount
            .get_or_insert_with(|| format!("{id}-turnstile-mount"))
            .clone()
    }

    /// The Turnstile mount, once created.
    pub fn challenge_mount(&self) -> Option<&str> {
        self.challenge_mount.as_deref()
    }

    /// `true` if this looks like a newsletter/customer form (hidden
    /// `form_type=customer` or a `contact[tags]` input) that has no email
    /// input.
    pub fn lacks_required_email(&self) -> bool {
        let is_customer_form = self
            .controls
            .iter()
            .any(|c| (c.name == "form_type" && c.value == "customer") || c.name == "contact[tags]");
        if !is_customer_form {
            return false;
        }
        let has_email = self.controls.iter().any(|c| {
            c.name == "contact[email]" || (c.kind == FieldKind::Email && c.name == "email")
        });
        !has_email
    }
}

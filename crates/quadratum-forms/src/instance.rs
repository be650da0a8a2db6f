//! Form instances and the page registry.
//!
//! A [`FormInstance`] ties one [`FormModel`] to its validator, submission
//! coordinator and event signal, and exposes the host-event entry points
//! (input, change, click, Next, Back, submit). [`FormRegistry::init`] is
//! idempotent per form id, so running initialization twice on the same page
//! never duplicates listeners or navigation controls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::Instrument;

use quadratum_core::logging::form_span;
use quadratum_core::{FormsResult, Settings};
use quadratum_signals::Signal;

use crate::attribution::{capture_attribution, PageContext};
use crate::captcha::ChallengeProviders;
use crate::conditions;
use crate::definition::FormDefinition;
use crate::events::{FormEvent, PAGE_EVENTS};
use crate::fields::{ControlId, FieldKind};
use crate::form::{FormModel, Scope};
use crate::steps::{self, StepMove, StepView};
use crate::submission::{lock_model, SubmissionCoordinator, SubmitOutcome};
use crate::validation::{FieldValidator, ValidationReport};

/// One initialized form.
#[derive(Debug)]
pub struct FormInstance {
    id: String,
    model: Arc<Mutex<FormModel>>,
    validator: FieldValidator,
    coordinator: SubmissionCoordinator,
    events: Arc<Signal<FormEvent>>,
}

impl FormInstance {
    /// Builds and initializes an instance whose events bubble to `page_events`.
    ///
    /// Initialization evaluates the conditional rules, paints the step chrome,
    /// captures attribution once and runs the missing-email guard. The
    /// `Viewed` event is sent before returning.
    pub fn new(
        definition: &FormDefinition,
        settings: &Settings,
        providers: ChallengeProviders,
        page_events: Arc<Signal<FormEvent>>,
        ctx: &PageContext,
    ) -> FormsResult<Self> {
        let instance = Self::build(definition, settings, providers, page_events, ctx)?;
        instance.announce_view();
        Ok(instance)
    }

    fn build(
        definition: &FormDefinition,
        settings: &Settings,
        providers: ChallengeProviders,
        page_events: Arc<Signal<FormEvent>>,
        ctx: &PageContext,
    ) -> FormsResult<Self> {
        let span = form_span(&definition.id);
        let _guard = span.enter();

        let validator = FieldValidator::from_settings(settings)?;
        let mut model = FormModel::from_definition(definition);
        conditions::evaluate_all(&mut model);
        steps::render(&mut model);
        capture_attribution(&mut model, ctx);
        if model.lacks_required_email() {
            tracing::warn!(
                "form looks like a newsletter/customer form but has no email input; add an Email field block"
            );
            model.flag_missing_email();
        }

        tracing::info!(steps = definition.steps.len(), "form initialized");
        Ok(Self {
            id: definition.id.clone(),
            model: Arc::new(Mutex::new(model)),
            validator,
            coordinator: SubmissionCoordinator::new(settings, providers),
            events: Arc::new(Signal::child_of(page_events)),
        })
    }

    fn announce_view(&self) {
        self.events.send(&FormEvent::Viewed {
            form_id: self.id.clone(),
        });
    }

    /// The form id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The instance's event signal.
    pub const fn events(&self) -> &Arc<Signal<FormEvent>> {
        &self.events
    }

    /// Runs `f` with shared access to the model.
    pub fn with_model<R>(&self, f: impl FnOnce(&FormModel) -> R) -> R {
        f(&lock_model(&self.model))
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.coordinator.is_busy()
    }

    /// A text-like control's value changed.
    pub fn on_input(&self, control: ControlId, value: &str) -> bool {
        let mut model = lock_model(&self.model);
        let changed = model.set_value(control, value);
        conditions::evaluate_all(&mut model);
        changed
    }

    /// A select (or any control) committed a new value.
    pub fn on_change(&self, control: ControlId, value: &str) -> bool {
        self.on_input(control, value)
    }

    /// A radio or checkbox was clicked. Other controls are ignored.
    pub fn on_click(&self, control: ControlId) -> bool {
        let mut model = lock_model(&self.model);
        let Some(target) = model.control(control) else {
            return false;
        };
        let checked = match target.kind {
            FieldKind::Radio => true,
            FieldKind::Checkbox => !target.checked,
            _ => return false,
        };
        model.set_checked(control, checked);
        conditions::evaluate_all(&mut model);
        true
    }

    /// Validates `scope` outside of navigation or submission.
    pub fn validate(&self, scope: Scope) -> ValidationReport {
        let mut model = lock_model(&self.model);
        self.validator.validate(&mut model, scope)
    }

    /// Handles a Next click.
    pub fn next(&self) -> StepMove {
        let span = form_span(&self.id);
        let _guard = span.enter();
        let outcome = {
            let mut model = lock_model(&self.model);
            steps::next(&mut model, &self.validator)
        };
        self.announce(&outcome);
        outcome
    }

    /// Handles a Back click.
    pub fn back(&self) -> StepMove {
        let outcome = steps::back(&mut lock_model(&self.model));
        self.announce(&outcome);
        outcome
    }

    /// Re-clamps the step index after a layout change.
    pub fn relayout(&self) -> Option<StepView> {
        steps::relayout(&mut lock_model(&self.model))
    }

    /// Handles a submit event.
    pub async fn submit(&self, ctx: &PageContext) -> SubmitOutcome {
        self.coordinator
            .submit(&self.model, &self.validator, &self.events, ctx)
            .instrument(form_span(&self.id))
            .await
    }

    fn announce(&self, outcome: &StepMove) {
        match outcome {
            StepMove::Moved { from, to } => {
                self.events.send(&FormEvent::StepChanged {
                    form_id: self.id.clone(),
                    from: *from,
                    to: *to,
                });
            }
            StepMove::Blocked(report) => {
                let scope = self.with_model(FormModel::active_scope);
                self.events.send(&FormEvent::ValidationFailed {
                    form_id: self.id.clone(),
                    scope,
                    invalid: report.invalid.len(),
                });
            }
            StepMove::Stayed => {}
        }
    }
}

/// Every form initialized on a page, keyed by id.
#[derive(Debug)]
pub struct FormRegistry {
    instances: RwLock<HashMap<String, Arc<FormInstance>>>,
    settings: Settings,
    providers: ChallengeProviders,
    page_events: Arc<Signal<FormEvent>>,
}

impl FormRegistry {
    /// A registry bubbling to the global [`PAGE_EVENTS`] signal.
    pub fn new(settings: Settings, providers: ChallengeProviders) -> Self {
        Self::with_page_events(settings, providers, Arc::clone(&PAGE_EVENTS))
    }

    /// A registry bubbling to a caller-provided page signal.
    pub fn with_page_events(
        settings: Settings,
        providers: ChallengeProviders,
        page_events: Arc<Signal<FormEvent>>,
    ) -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            settings,
            providers,
            page_events,
        }
    }

    /// Initializes `definition`, or returns the existing instance with the
    /// same id untouched.
    ///
    /// No lock is held while the instance is built or while `Viewed` is
    /// dispatched, so page receivers may call back into the registry.
    pub fn init(&self, definition: &FormDefinition, ctx: &PageContext) -> FormsResult<Arc<FormInstance>> {
        if let Some(existing) = self.get(&definition.id) {
            tracing::debug!(form = %definition.id, "form already initialized");
            return Ok(existing);
        }

        let built = Arc::new(FormInstance::build(
            definition,
            &self.settings,
            self.providers.clone(),
            Arc::clone(&self.page_events),
            ctx,
        )?);

        let instance = {
            let mut instances = self
                .instances
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(existing) = instances.get(&definition.id) {
                tracing::debug!(form = %definition.id, "form initialized concurrently");
                return Ok(Arc::clone(existing));
            }
            instances.insert(definition.id.clone(), Arc::clone(&built));
            built
        };

        instance.announce_view();
        Ok(instance)
    }

    /// The instance for `id`, if initialized.
    pub fn get(&self, id: &str) -> Option<Arc<FormInstance>> {
        self.instances
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of initialized forms.
    pub fn len(&self) -> usize {
        self.instances
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no form has been initialized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The page-level event signal.
    pub const fn page_events(&self) -> &Arc<Signal<FormEvent>> {
        &self.page_events
    }
}

//! Guarded submission.
//!
//! The coordinator runs, in order: attribution refresh, validation of the
//! active scope, the busy guard, and the optional challenge exchange. A
//! safety timer armed on every accepted attempt clears the busy flag and
//! re-enables the submit control after `submit_timeout_ms`, whatever the
//! challenge did.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use quadratum_core::{FormsError, Settings};
use quadratum_signals::Signal;

use crate::attribution::{capture_attribution, pack_tags, PageContext};
use crate::captcha::{ChallengeMode, ChallengeProviders, ChallengeRequest, RECAPTCHA_FIELD, TURNSTILE_FIELD};
use crate::events::FormEvent;
use crate::form::FormModel;
use crate::validation::{FieldValidator, ValidationReport};

/// What the host should do with a submit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Validation failed; cancel the submit.
    Blocked {
        /// The failing pass.
        report: ValidationReport,
    },
    /// A submission is already running; cancel silently.
    InFlight,
    /// Let the native submit proceed.
    Native,
    /// The challenge produced a token; submit the form programmatically.
    Resubmit {
        /// Hidden input that received the token.
        field: &'static str,
        /// The token.
        token: String,
    },
    /// The challenge failed or timed out; the submit control comes back when
    /// the safety timer fires.
    ChallengeAbandoned,
}

impl SubmitOutcome {
    /// Returns `true` when the native submit event must be cancelled.
    pub const fn prevents_default(&self) -> bool {
        !matches!(self, Self::Native)
    }
}

pub(crate) fn lock_model(model: &Mutex<FormModel>) -> MutexGuard<'_, FormModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs submissions for one form instance.
#[derive(Debug)]
pub struct SubmissionCoordinator {
    busy: Arc<AtomicBool>,
    timeout: Duration,
    providers: ChallengeProviders,
    recaptcha_action: String,
    tag_max_len: usize,
}

impl SubmissionCoordinator {
    /// Creates a coordinator using the timing and tag settings.
    pub fn new(settings: &Settings, providers: ChallengeProviders) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            timeout: Duration::from_millis(settings.submit_timeout_ms),
            providers,
            recaptcha_action: settings.recaptcha_action.clone(),
            tag_max_len: settings.tag_max_len,
        }
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The safety window.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handles one submit event.
    pub async fn submit(
        &self,
        model: &Arc<Mutex<FormModel>>,
        validator: &FieldValidator,
        events: &Arc<Signal<FormEvent>>,
        ctx: &PageContext,
    ) -> SubmitOutcome {
        let (form_id, mode, site_key) = {
            let mut guard = lock_model(model);
            capture_attribution(&mut guard, ctx);
            pack_tags(&mut guard, ctx, self.tag_max_len);

            let scope = guard.active_scope();
            let report = validator.validate(&mut guard, scope);
            if !report.ok {
                if !guard.missing_email() {
                    let summary = guard
                        .config()
                        .msg_error
                        .clone()
                        .unwrap_or_else(|| validator.messages().summary.clone());
                    guard.set_live_message(summary);
                }
                let form_id = guard.id().to_string();
                drop(guard);
                tracing::info!(invalid = report.invalid.len(), "submission blocked by validation");
                events.send(&FormEvent::ValidationFailed {
                    form_id,
                    scope,
                    invalid: report.invalid.len(),
                });
                return SubmitOutcome::Blocked { report };
            }

            if self
                .busy
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                tracing::debug!("submission already in flight");
                return SubmitOutcome::InFlight;
            }
            guard.submit_mut().engage();

            let config = guard.config();
            (guard.id().to_string(), config.captcha, config.captcha_key.clone())
        };

        self.arm_safety_timer(Arc::clone(model), Arc::clone(events), form_id.clone());
        events.send(&FormEvent::SubmitAttempt {
            form_id,
            challenge: mode.to_string(),
        });

        let Some(field) = mode.token_field() else {
            return SubmitOutcome::Native;
        };
        if site_key.is_empty() {
            tracing::debug!(%mode, "no site key configured, submitting natively");
            return SubmitOutcome::Native;
        }
        let Some(provider) = self.providers.for_mode(mode).filter(|p| p.is_available()) else {
            tracing::debug!(%mode, "challenge sdk not loaded, submitting natively");
            return SubmitOutcome::Native;
        };

        let mount = {
            let mut guard = lock_model(model);
            guard.ensure_hidden(TURNSTILE_FIELD, true);
            guard.ensure_hidden(RECAPTCHA_FIELD, true);
            if mode == ChallengeMode::Turnstile {
                guard.ensure_challenge_mount()
            } else {
                String::new()
            }
        };

        let request = ChallengeRequest {
            site_key,
            mount,
            action: self.recaptcha_action.clone(),
        };
        let result = tokio::time::timeout(self.timeout, provider.obtain_token(&request))
            .await
            .unwrap_or_else(|_| {
                Err(FormsError::ChallengeTimeout(
                    u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            });

        match result {
            Ok(token) => {
                lock_model(model).set_hidden(field, &token, true);
                tracing::info!(%mode, "challenge token obtained");
                SubmitOutcome::Resubmit { field, token }
            }
            Err(err) => {
                tracing::warn!(%mode, error = %err, "challenge abandoned");
                SubmitOutcome::ChallengeAbandoned
            }
        }
    }

    fn arm_safety_timer(
        &self,
        model: Arc<Mutex<FormModel>>,
        events: Arc<Signal<FormEvent>>,
        form_id: String,
    ) {
        let busy = Arc::clone(&self.busy);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            busy.store(false, Ordering::SeqCst);
            lock_model(&model).submit_mut().release();
            tracing::debug!("submit control released");
            events.send(&FormEvent::SubmitReleased { form_id });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ControlDefinition, FormDefinition, GroupDefinition};
    use crate::fields::FieldKind;

    fn setup(def: &FormDefinition) -> (Arc<Mutex<FormModel>>, FieldValidator, Arc<Signal<FormEvent>>) {
        let settings = Settings::default();
        (
            Arc::new(Mutex::new(FormModel::from_definition(def))),
            FieldValidator::from_settings(&settings).unwrap(),
            Arc::new(Signal::new()),
        )
    }

    fn required_name() -> FormDefinition {
        FormDefinition {
            id: "contact".to_string(),
            msg_error: Some("Fix it".to_string()),
            groups: vec![GroupDefinition {
                required: true,
                controls: vec![ControlDefinition {
                    id: "n".to_string(),
                    name: "name".to_string(),
                    kind: FieldKind::Text,
                    ..ControlDefinition::default()
                }],
                ..GroupDefinition::default()
            }],
            ..FormDefinition::default()
        }
    }

    #[test]
    fn test_prevents_default() {
        assert!(!SubmitOutcome::Native.prevents_default());
        assert!(SubmitOutcome::InFlight.prevents_default());
        assert!(SubmitOutcome::ChallengeAbandoned.prevents_default());
    }

    #[tokio::test]
    async fn test_blocked_uses_custom_summary_and_keeps_idle() {
        let (model, validator, events) = setup(&required_name());
        let coordinator = SubmissionCoordinator::new(&Settings::default(), ChallengeProviders::new());
        let ctx = PageContext::from_url("https://shop.example/contact");

        let outcome = coordinator.submit(&model, &validator, &events, &ctx).await;
        assert!(matches!(outcome, SubmitOutcome::Blocked { .. }));
        assert!(!coordinator.is_busy());
        let guard = lock_model(&model);
        assert_eq!(guard.live_message(), Some("Fix it"));
        assert!(!guard.submit().disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_submit_engages_then_releases() {
        let (model, validator, events) = setup(&required_name());
        lock_model(&model).set_value(0, "Ada");
        let coordinator = SubmissionCoordinator::new(&Settings::default(), ChallengeProviders::new());
        let ctx = PageContext::from_url("https://shop.example/contact");

        let outcome = coordinator.submit(&model, &validator, &events, &ctx).await;
        assert_eq!(outcome, SubmitOutcome::Native);
        assert!(coordinator.is_busy());
        assert!(lock_model(&model).submit().aria_busy);

        assert_eq!(
            coordinator.submit(&model, &validator, &events, &ctx).await,
            SubmitOutcome::InFlight
        );

        tokio::time::sleep(Duration::from_millis(5001)).await;
        assert!(!coordinator.is_busy());
        let guard = lock_model(&model);
        assert!(!guard.submit().disabled);
        assert!(!guard.submit().aria_busy);
    }

    #[tokio::test]
    async fn test_captcha_without_key_is_native() {
        let mut def = required_name();
        def.groups.clear();
        def.captcha = Some("turnstile".to_string());
        let (model, validator, events) = setup(&def);
        let coordinator = SubmissionCoordinator::new(&Settings::default(), ChallengeProviders::new());
        let outcome = coordinator
            .submit(&model, &validator, &events, &PageContext::from_url("https://s.example/"))
            .await;
        assert_eq!(outcome, SubmitOutcome::Native);
        // Nothing challenge-related is added when the challenge is skipped.
        let guard = lock_model(&model);
        assert_eq!(guard.value_of(TURNSTILE_FIELD), None);
        assert_eq!(guard.challenge_mount(), None);
    }
}

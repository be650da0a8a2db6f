//! Integration tests for the form pipeline.
//!
//! These tests drive form instances the way a host page would, covering:
//! 1. Validation, focus and error annotation
//! 2. Conditional visibility and step navigation
//! 3. Initialization idempotence and event bubbling
//! 4. Guarded submission, challenges and the safety timer
//! 5. Attribution capture and tag packing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quadratum_core::{FormsError, Settings};
use quadratum_forms::attribution::{PageContext, TAGS_FIELD};
use quadratum_forms::captcha::{
    ChallengeMode, ChallengeProvider, ChallengeProviders, ChallengeRequest, RecaptchaSdk,
    RecaptchaV3Provider, TokenCallback, TurnstileOptions, TurnstileProvider, TurnstileSdk,
    RECAPTCHA_FIELD, TURNSTILE_FIELD,
};
use quadratum_forms::definition::FormDefinition;
use quadratum_forms::form::{NavKind, Scope};
use quadratum_forms::instance::FormRegistry;
use quadratum_forms::steps::StepMove;
use quadratum_forms::{FormEvent, SubmitOutcome};
use quadratum_signals::Signal;

// ============================================================================
// Shared helpers
// ============================================================================

const CONTACT: &str = r#"{
    "id": "contact",
    "groups": [
        {"required": true, "controls": [{"id": "qf-1", "name": "contact[name]"}],
         "error_slot": {}},
        {"required": true, "controls": [{"id": "qf-2", "name": "contact[email]", "kind": "email"}],
         "error_slot": {}},
        {"required": true, "controls": [
            {"id": "qf-3-1", "name": "interest", "kind": "radio", "value": "sales"},
            {"id": "qf-3-2", "name": "interest", "kind": "radio", "value": "other"}
        ]},
        {"required": true, "controls": [{"id": "qf-4", "name": "contact[details]", "kind": "textarea"}],
         "condition": {"field": "interest", "operator": "equals", "value": "Other"}},
        {"required": true, "controls": [
            {"id": "qf-3-3", "name": "interest", "kind": "radio", "value": "support"}
        ]}
    ],
    "controls": [{"name": "contact[tags]", "kind": "hidden", "value": "newsletter"}],
    "error_slots": [{"id": "qf-3-err"}]
}"#;

const QUOTE: &str = r#"{
    "id": "quote",
    "template": "steps",
    "steps": [
        {"groups": [{"required": true, "controls": [{"id": "s1", "name": "contact[name]"}]}]},
        {"groups": [{"required": true, "controls": [{"id": "s2", "name": "contact[email]", "kind": "email"}]}]},
        {"groups": [{"controls": [{"id": "s3", "name": "contact[body]", "kind": "textarea"}]}]}
    ]
}"#;

fn page() -> (Arc<Signal<FormEvent>>, Arc<Mutex<Vec<FormEvent>>>) {
    let signal = Arc::new(Signal::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    signal.connect(
        "recorder",
        Arc::new(move |event: &FormEvent| sink.lock().unwrap().push(event.clone())),
    );
    (signal, seen)
}

fn registry_with(providers: ChallengeProviders) -> (FormRegistry, Arc<Mutex<Vec<FormEvent>>>) {
    let (signal, seen) = page();
    (
        FormRegistry::with_page_events(Settings::default(), providers, signal),
        seen,
    )
}

fn ctx() -> PageContext {
    PageContext::from_url("https://shop.example/pages/contact?utm_source=ig&utm_campaign=launch")
        .with_referrer("https://www.instagram.com/p/xyz")
}

fn challenge_form(mode: &str) -> FormDefinition {
    let mut def = FormDefinition::from_json_str(CONTACT).unwrap();
    def.id = format!("challenge-{mode}");
    def.groups.truncate(2);
    def.captcha = Some(mode.to_string());
    def.captcha_key = Some("0xSITEKEY".to_string());
    def
}

fn fill_contact(form: &quadratum_forms::FormInstance) {
    form.on_input(0, "Ada Lovelace");
    form.on_input(1, "ada@example.com");
}

/// Counts token exchanges and answers after a short delay.
struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl ChallengeProvider for CountingProvider {
    fn mode(&self) -> ChallengeMode {
        ChallengeMode::Turnstile
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn obtain_token(&self, request: &ChallengeRequest) -> Result<String, FormsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(format!("token-for-{}", request.site_key))
    }
}

/// A Turnstile SDK that keeps the callback but never calls it.
#[derive(Default)]
struct StalledTurnstile {
    pending: Mutex<Vec<TokenCallback>>,
}

impl TurnstileSdk for StalledTurnstile {
    fn render(&self, _mount: &str, options: TurnstileOptions) -> Result<(), FormsError> {
        self.pending.lock().unwrap().push(options.callback);
        Ok(())
    }
}

struct FakeRecaptcha {
    actions: Mutex<Vec<String>>,
}

#[async_trait]
impl RecaptchaSdk for FakeRecaptcha {
    async fn ready(&self) {}

    async fn execute(&self, _site_key: &str, action: &str) -> Result<String, FormsError> {
        self.actions.lock().unwrap().push(action.to_string());
        Ok("recaptcha-token".to_string())
    }
}

// ============================================================================
// 1. Validation
// ============================================================================

#[test]
fn test_empty_required_fields_focus_first() {
    let (registry, _) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(CONTACT).unwrap(), &ctx())
        .unwrap();
    form.on_input(1, "   ");

    let report = form.validate(Scope::Form);
    assert!(!report.ok);
    assert_eq!(report.invalid, vec![0, 1, 2]);
    assert_eq!(report.focused, Some(0));
    form.with_model(|m| {
        assert_eq!(m.focused(), Some(0));
        assert_eq!(m.slot(0).unwrap().text, "This field is required.");
        assert!(m.control(1).unwrap().aria_invalid);
    });
}

#[test]
fn test_radio_group_annotated_once() {
    let (registry, _) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(CONTACT).unwrap(), &ctx())
        .unwrap();
    fill_contact(&form);

    let report = form.validate(Scope::Form);
    // Two wrappers reference the `interest` group; one annotation.
    assert_eq!(report.invalid, vec![2]);
    form.with_model(|m| {
        assert_eq!(m.slots().iter().filter(|s| !s.text.is_empty()).count(), 1);
        assert_eq!(m.slot(2).unwrap().id.as_deref(), Some("qf-3-err"));
        assert!(!m.control(5).unwrap().aria_invalid);
    });
}

#[test]
fn test_fixing_field_clears_annotation_without_refocus() {
    let (registry, _) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(CONTACT).unwrap(), &ctx())
        .unwrap();
    form.on_click(2);
    form.on_input(0, "Ada");
    form.on_input(1, "not-an-email");

    let report = form.validate(Scope::Form);
    assert_eq!(report.invalid, vec![1]);
    form.with_model(|m| assert_eq!(m.slot(1).unwrap().text, "Enter a valid email"));

    form.on_input(1, "ada@example.com");
    let report = form.validate(Scope::Form);
    assert!(report.ok);
    assert_eq!(report.focused, None);
    form.with_model(|m| {
        assert_eq!(m.slot(1).unwrap().text, "");
        assert!(!m.control(1).unwrap().aria_invalid);
    });
}

// ============================================================================
// 2. Conditions and steps
// ============================================================================

#[test]
fn test_conditional_block_follows_radio() {
    let (registry, _) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(CONTACT).unwrap(), &ctx())
        .unwrap();
    fill_contact(&form);
    assert!(form.with_model(|m| m.groups()[3].is_hidden()));

    // "other" shows the details block, which is now required.
    form.on_click(3);
    assert!(!form.with_model(|m| m.groups()[3].is_hidden()));
    assert_eq!(form.validate(Scope::Form).invalid, vec![4]);

    // Any other value hides it again and it stops counting.
    form.on_click(2);
    assert!(form.with_model(|m| m.groups()[3].is_hidden()));
    assert!(form.validate(Scope::Form).ok);
}

#[test]
fn test_step_gating() {
    let (registry, seen) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(QUOTE).unwrap(), &ctx())
        .unwrap();
    assert_eq!(form.with_model(|m| m.progress_counter().map(String::from)), Some("1 / 3".to_string()));

    let blocked = form.next();
    assert!(matches!(blocked, StepMove::Blocked(ref report) if report.invalid == vec![0]));
    assert_eq!(form.with_model(|m| m.navigator().unwrap().index()), 0);

    form.on_input(0, "Ada");
    assert_eq!(form.next(), StepMove::Moved { from: 0, to: 1 });
    form.with_model(|m| {
        assert_eq!(m.progress_counter(), Some("2 / 3"));
        assert_eq!(m.progress_width(), Some("66.7%"));
        let kinds: Vec<NavKind> = m.actions_bar().unwrap().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NavKind::Back, NavKind::Next]);
        assert!(!m.submit().visible);
        assert!(m.steps()[1].active);
    });

    let events = seen.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, FormEvent::ValidationFailed { scope: Scope::Step(0), .. })));
    assert!(events.iter().any(|e| matches!(e, FormEvent::StepChanged { from: 0, to: 1, .. })));
}

#[tokio::test]
async fn test_step_submit_validates_active_step_only() {
    let (registry, _) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(QUOTE).unwrap(), &ctx())
        .unwrap();
    form.on_input(0, "Ada");

    // Step 2 is untouched while step 1 is active.
    let outcome = form.submit(&ctx()).await;
    assert_eq!(outcome, SubmitOutcome::Native);
    assert!(!form.with_model(|m| m.control(1).unwrap().aria_invalid));
}

// ============================================================================
// 3. Lifecycle
// ============================================================================

#[test]
fn test_init_twice_has_no_effect() {
    let (registry, seen) = registry_with(ChallengeProviders::new());
    let def = FormDefinition::from_json_str(QUOTE).unwrap();
    let first = registry.init(&def, &ctx()).unwrap();
    first.on_input(0, "Ada");
    first.next();

    let second = registry.init(&def, &ctx()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.with_model(|m| m.navigator().unwrap().index()), 1);
    assert_eq!(second.with_model(|m| m.actions_bar().unwrap().len()), 2);
    let views = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, FormEvent::Viewed { .. }))
        .count();
    assert_eq!(views, 1);
}

// ============================================================================
// 4. Submission
// ============================================================================

#[tokio::test]
async fn test_blocked_submit_sets_summary() {
    let (registry, seen) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(CONTACT).unwrap(), &ctx())
        .unwrap();
    let outcome = form.submit(&ctx()).await;
    assert!(matches!(outcome, SubmitOutcome::Blocked { .. }));
    assert!(outcome.prevents_default());
    assert!(!form.is_busy());
    assert_eq!(
        form.with_model(|m| m.live_message().map(String::from)),
        Some("Please fix the highlighted fields and try again.".to_string())
    );
    assert!(seen
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, FormEvent::ValidationFailed { scope: Scope::Form, invalid: 3, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_double_click_single_token_exchange() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicUsize::new(0),
    });
    let (registry, _) = registry_with(ChallengeProviders::new().with_turnstile(provider.clone()));
    let form = registry.init(&challenge_form("turnstile"), &ctx()).unwrap();
    fill_contact(&form);

    let page = ctx();
    let (first, second) = tokio::join!(form.submit(&page), form.submit(&page));
    assert_eq!(
        first,
        SubmitOutcome::Resubmit {
            field: TURNSTILE_FIELD,
            token: "token-for-0xSITEKEY".to_string(),
        }
    );
    assert_eq!(second, SubmitOutcome::InFlight);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    form.with_model(|m| {
        assert_eq!(m.value_of(TURNSTILE_FIELD), Some("token-for-0xSITEKEY"));
        assert_eq!(m.value_of(RECAPTCHA_FIELD), Some(""));
        assert!(m.challenge_mount().is_some());
        assert!(m.submit().disabled);
    });
}

#[tokio::test(start_paused = true)]
async fn test_stalled_challenge_released_by_safety_timer() {
    let sdk = Arc::new(StalledTurnstile::default());
    let provider = Arc::new(TurnstileProvider::new(sdk.clone()));
    let (registry, seen) = registry_with(ChallengeProviders::new().with_turnstile(provider));
    let form = registry.init(&challenge_form("turnstile"), &ctx()).unwrap();
    fill_contact(&form);

    let running = Arc::clone(&form);
    let attempt = tokio::spawn(async move { running.submit(&ctx()).await });

    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert!(form.is_busy());
    assert!(form.with_model(|m| m.submit().disabled));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!form.is_busy());
    assert!(!form.with_model(|m| m.submit().disabled || m.submit().aria_busy));
    assert_eq!(attempt.await.unwrap(), SubmitOutcome::ChallengeAbandoned);
    assert!(seen
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, FormEvent::SubmitReleased { .. })));

    // A second attempt goes through the challenge again.
    let retry = Arc::clone(&form);
    let second = tokio::spawn(async move { retry.submit(&ctx()).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(form.is_busy());
    assert_eq!(sdk.pending.lock().unwrap().len(), 2);
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(second.await.unwrap(), SubmitOutcome::ChallengeAbandoned);
}

#[tokio::test]
async fn test_recaptcha_uses_submit_action() {
    let sdk = Arc::new(FakeRecaptcha {
        actions: Mutex::new(Vec::new()),
    });
    let provider = Arc::new(RecaptchaV3Provider::new(sdk.clone()));
    let (registry, _) = registry_with(ChallengeProviders::new().with_recaptcha(provider));
    let form = registry.init(&challenge_form("recaptcha_v3"), &ctx()).unwrap();
    fill_contact(&form);

    let outcome = form.submit(&ctx()).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Resubmit {
            field: RECAPTCHA_FIELD,
            token: "recaptcha-token".to_string(),
        }
    );
    assert_eq!(*sdk.actions.lock().unwrap(), vec!["submit".to_string()]);
    assert!(form.with_model(|m| m.challenge_mount().is_none()));
}

#[tokio::test]
async fn test_missing_sdk_degrades_to_native() {
    let (registry, seen) = registry_with(ChallengeProviders::new());
    let form = registry.init(&challenge_form("turnstile"), &ctx()).unwrap();
    fill_contact(&form);

    assert_eq!(form.submit(&ctx()).await, SubmitOutcome::Native);
    assert!(form.is_busy());
    assert!(form.with_model(|m| m.challenge_mount().is_none()));
    assert!(seen.lock().unwrap().iter().any(|e| matches!(
        e,
        FormEvent::SubmitAttempt { challenge, .. } if challenge == "turnstile"
    )));
}

#[tokio::test]
async fn test_missing_email_blocks_with_guard_message() {
    let (registry, _) = registry_with(ChallengeProviders::new());
    let def = FormDefinition::from_json_str(
        r#"{"id": "newsletter", "controls": [{"name": "form_type", "kind": "hidden", "value": "customer"}]}"#,
    )
    .unwrap();
    let form = registry.init(&def, &ctx()).unwrap();
    assert!(matches!(form.submit(&ctx()).await, SubmitOutcome::Blocked { .. }));
    assert_eq!(
        form.with_model(|m| m.live_message().map(String::from)),
        Some("This form is missing an Email field. Add an Email block and try again.".to_string())
    );
}

// ============================================================================
// 5. Attribution
// ============================================================================

#[tokio::test]
async fn test_submit_packs_tags_once() {
    let (registry, _) = registry_with(ChallengeProviders::new());
    let form = registry
        .init(&FormDefinition::from_json_str(CONTACT).unwrap(), &ctx())
        .unwrap();

    // Blocked submissions still refresh attribution first.
    form.submit(&ctx()).await;
    form.submit(&ctx()).await;

    let tags = form.with_model(|m| m.value_of(TAGS_FIELD).map(String::from)).unwrap();
    assert_eq!(
        tags,
        "newsletter, utm_source=ig, utm_campaign=launch, ref=www.instagram.com, page=/pages/contact"
    );
    assert_eq!(tags.matches("utm_source=ig").count(), 1);
}

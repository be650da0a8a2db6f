//! Invisible challenge providers.
//!
//! A form may require a token from Cloudflare Turnstile or reCAPTCHA v3
//! before the native submit goes through. The page SDKs are modeled as the
//! [`TurnstileSdk`] and [`RecaptchaSdk`] capabilities; a provider holding no
//! SDK reports itself unavailable and the submission falls back to a plain
//! native submit.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use quadratum_core::FormsError;

/// Hidden input receiving the Turnstile token.
pub const TURNSTILE_FIELD: &str = "cf-turnstile-response";

/// Hidden input receiving the reCAPTCHA token.
pub const RECAPTCHA_FIELD: &str = "g-recaptcha-response";

/// Which challenge, if any, gates submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeMode {
    /// Submit natively.
    #[default]
    None,
    /// Cloudflare Turnstile, invisible widget.
    Turnstile,
    /// Google reCAPTCHA v3.
    RecaptchaV3,
}

impl ChallengeMode {
    /// Parses the `data-captcha` attribute. Unknown values mean `None`.
    pub fn from_attr(raw: &str) -> Self {
        match raw.trim() {
            "turnstile" => Self::Turnstile,
            "recaptcha_v3" => Self::RecaptchaV3,
            _ => Self::None,
        }
    }

    /// The hidden input the mode's token is written to.
    pub const fn token_field(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Turnstile => Some(TURNSTILE_FIELD),
            Self::RecaptchaV3 => Some(RECAPTCHA_FIELD),
        }
    }
}

impl fmt::Display for ChallengeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Turnstile => "turnstile",
            Self::RecaptchaV3 => "recaptcha_v3",
        };
        f.write_str(name)
    }
}

/// Everything a provider needs to produce a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    /// Public site key.
    pub site_key: String,
    /// Off-screen element the widget renders into.
    pub mount: String,
    /// reCAPTCHA action name.
    pub action: String,
}

/// A source of challenge tokens.
#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    /// The mode this provider serves.
    fn mode(&self) -> ChallengeMode;

    /// Returns `true` if the provider's SDK is loaded.
    fn is_available(&self) -> bool;

    /// Runs the challenge and resolves to a token.
    async fn obtain_token(&self, request: &ChallengeRequest) -> Result<String, FormsError>;
}

/// Callback invoked by the Turnstile widget with its token.
pub type TokenCallback = Box<dyn FnOnce(String) + Send>;

/// Options passed to [`TurnstileSdk::render`].
pub struct TurnstileOptions {
    /// Public site key.
    pub sitekey: String,
    /// Always `"invisible"`.
    pub size: &'static str,
    /// Receives the token once the widget completes.
    pub callback: TokenCallback,
}

impl fmt::Debug for TurnstileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnstileOptions")
            .field("sitekey", &self.sitekey)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// The Turnstile page SDK: render a widget into a mount.
pub trait TurnstileSdk: Send + Sync {
    /// Renders the widget. The SDK calls `options.callback` at most once.
    fn render(&self, mount: &str, options: TurnstileOptions) -> Result<(), FormsError>;
}

/// The reCAPTCHA v3 page SDK.
#[async_trait]
pub trait RecaptchaSdk: Send + Sync {
    /// Resolves once the SDK is ready.
    async fn ready(&self);

    /// Executes the challenge for `action`.
    async fn execute(&self, site_key: &str, action: &str) -> Result<String, FormsError>;
}

/// Turnstile provider over an optional SDK.
#[derive(Clone, Default)]
pub struct TurnstileProvider {
    sdk: Option<Arc<dyn TurnstileSdk>>,
}

impl TurnstileProvider {
    /// A provider backed by a loaded SDK.
    pub fn new(sdk: Arc<dyn TurnstileSdk>) -> Self {
        Self { sdk: Some(sdk) }
    }

    /// A provider whose SDK is not on the page.
    pub const fn unavailable() -> Self {
        Self { sdk: None }
    }
}

impl fmt::Debug for TurnstileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnstileProvider")
            .field("available", &self.sdk.is_some())
            .finish()
    }
}

#[async_trait]
impl ChallengeProvider for TurnstileProvider {
    fn mode(&self) -> ChallengeMode {
        ChallengeMode::Turnstile
    }

    fn is_available(&self) -> bool {
        self.sdk.is_some()
    }

    async fn obtain_token(&self, request: &ChallengeRequest) -> Result<String, FormsError> {
        let sdk = self
            .sdk
            .as_ref()
            .ok_or_else(|| FormsError::ChallengeUnavailable("turnstile".to_string()))?;
        let (tx, rx) = oneshot::channel();
        sdk.render(
            &request.mount,
            TurnstileOptions {
                sitekey: request.site_key.clone(),
                size: "invisible",
                callback: Box::new(move |token| {
                    let _ = tx.send(token);
                }),
            },
        )?;
        rx.await.map_err(|_| {
            FormsError::ChallengeFailed("turnstile widget dropped its callback".to_string())
        })
    }
}

/// reCAPTCHA v3 provider over an optional SDK.
#[derive(Clone, Default)]
pub struct RecaptchaV3Provider {
    sdk: Option<Arc<dyn RecaptchaSdk>>,
}

impl RecaptchaV3Provider {
    /// A provider backed by a loaded SDK.
    pub fn new(sdk: Arc<dyn RecaptchaSdk>) -> Self {
        Self { sdk: Some(sdk) }
    }

    /// A provider whose SDK is not on the page.
    pub const fn unavailable() -> Self {
        Self { sdk: None }
    }
}

impl fmt::Debug for RecaptchaV3Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecaptchaV3Provider")
            .field("available", &self.sdk.is_some())
            .finish()
    }
}

#[async_trait]
impl ChallengeProvider for RecaptchaV3Provider {
    fn mode(&self) -> ChallengeMode {
        ChallengeMode::RecaptchaV3
    }

    fn is_available(&self) -> bool {
        self.sdk.is_some()
    }

    async fn obtain_token(&self, request: &ChallengeRequest) -> Result<String, FormsError> {
        let sdk = self
            .sdk
            .as_ref()
            .ok_or_else(|| FormsError::ChallengeUnavailable("recaptcha_v3".to_string()))?;
        sdk.ready().await;
        sdk.execute(&request.site_key, &request.action).await
    }
}

/// The providers available on a page, one per mode.
#[derive(Clone, Default)]
pub struct ChallengeProviders {
    turnstile: Option<Arc<dyn ChallengeProvider>>,
    recaptcha: Option<Arc<dyn ChallengeProvider>>,
}

impl ChallengeProviders {
    /// No providers: every challenge mode degrades to a native submit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the Turnstile provider.
    #[must_use]
    pub fn with_turnstile(mut self, provider: Arc<dyn ChallengeProvider>) -> Self {
        self.turnstile = Some(provider);
        self
    }

    /// Registers the reCAPTCHA v3 provider.
    #[must_use]
    pub fn with_recaptcha(mut self, provider: Arc<dyn ChallengeProvider>) -> Self {
        self.recaptcha = Some(provider);
        self
    }

    /// The provider for `mode`, if registered.
    pub fn for_mode(&self, mode: ChallengeMode) -> Option<Arc<dyn ChallengeProvider>> {
        match mode {
            ChallengeMode::None => None,
            ChallengeMode::Turnstile => self.turnstile.clone(),
            ChallengeMode::RecaptchaV3 => self.recaptcha.clone(),
        }
    }
}

impl fmt::Debug for ChallengeProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeProviders")
            .field("turnstile", &self.turnstile.is_some())
            .field("recaptcha", &self.recaptcha.is_some())
            .finish()
    }
}

use std::env;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::request::{ReasoningEffort, Verbosity};
use crate::secret::Secret;
use crate::token::ProviderKind;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-5";

/// Model every fallback request is rewritten to
pub const FALLBACK_MODEL: &str = "grok-4-latest";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_FALLBACK_BASE_URL: &str = "https://api.x.ai/v1";

/// Connect and request timeout for both providers
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(360);

pub const BASE_URL_ENV: &str = "QUIETENABLE_BASE_URL";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const FALLBACK_BASE_URL_ENV: &str = "GROK_BASE_URL";
pub const FALLBACK_API_KEY_ENV: &str = "GROK_API_KEY";

/// Endpoint settings for a single provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: Url,
    pub api_key: Secret<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Settings with the default timeout
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `base_url` does not parse.
    pub fn new(
        kind: ProviderKind,
        base_url: &str,
        api_key: impl Into<Secret<String>>,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            base_url: parse_base_url(base_url)?,
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

/// Configuration for [`QuietClient`](crate::QuietClient)
///
/// Fields left unset fall back to the environment when
/// [`resolve_env`](Self::resolve_env) is called, then to the built-in
/// defaults when the client is built.
///
/// # Examples
///
/// ```
/// use quietenable_core::{ClientConfig, Verbosity};
///
/// let config = ClientConfig::new("sk-primary")
///     .with_model("gpt-5-mini")
///     .with_fallback_api_key("xai-key")
///     .with_verbosity(Verbosity::Low);
///
/// assert_eq!(config.model(), "gpt-5-mini");
/// assert!(config.fallback().unwrap().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: Secret<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub fallback_api_key: Option<Secret<String>>,
    pub fallback_base_url: Option<String>,
    pub verbosity: Option<Verbosity>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub timeout: Duration,
    /// Set by [`without_fallback`](Self::without_fallback); wins over any key
    pub fallback_disabled: bool,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<Secret<String>>) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            fallback_api_key: None,
            fallback_base_url: None,
            verbosity: None,
            reasoning_effort: None,
            timeout: DEFAULT_TIMEOUT,
            fallback_disabled: false,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_fallback_api_key(mut self, key: impl Into<Secret<String>>) -> Self {
        self.fallback_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_fallback_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.fallback_base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    #[must_use]
    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Never build a fallback provider, even if `GROK_API_KEY` is set
    #[must_use]
    pub fn without_fallback(mut self) -> Self {
        self.fallback_disabled = true;
        self.fallback_api_key = None;
        self
    }

    /// Fills unset fields from the process environment
    #[must_use]
    pub fn resolve_env(self) -> Self {
        self.resolve_with(|key| env::var(key).ok())
    }

    /// Fills unset fields using `lookup` in place of the environment
    ///
    /// Empty values count as unset.
    #[must_use]
    pub fn resolve_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.base_url.is_none() {
            self.base_url = get(BASE_URL_ENV).or_else(|| get(OPENAI_BASE_URL_ENV));
        }
        if self.fallback_base_url.is_none() {
            self.fallback_base_url = get(FALLBACK_BASE_URL_ENV);
        }
        if self.fallback_api_key.is_none() && !self.fallback_disabled {
            self.fallback_api_key = get(FALLBACK_API_KEY_ENV).map(Secret::new);
        }

        debug!("Primary base URL set: {}", self.base_url.is_some());
        debug!("Fallback base URL set: {}", self.fallback_base_url.is_some());
        debug!("Fallback key set: {}", self.fallback_api_key.is_some());
        self
    }

    /// Starting model, [`DEFAULT_MODEL`] unless overridden
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    /// Settings for the primary provider
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the base URL does not parse.
    pub fn primary(&self) -> Result<ProviderConfig> {
        Ok(ProviderConfig {
            kind: ProviderKind::OpenAi,
            base_url: parse_base_url(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?,
            api_key: self.api_key.clone(),
            timeout: self.timeout,
        })
    }

    /// Settings for the fallback provider, `None` when no fallback key is known
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the base URL does not parse.
    pub fn fallback(&self) -> Result<Option<ProviderConfig>> {
        if self.fallback_disabled {
            return Ok(None);
        }
        let Some(api_key) = self.fallback_api_key.as_ref().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };

        Ok(Some(ProviderConfig {
            kind: ProviderKind::Grok,
            base_url: parse_base_url(
                self.fallback_base_url
                    .as_deref()
                    .unwrap_or(DEFAULT_FALLBACK_BASE_URL),
            )?,
            api_key: api_key.clone(),
            timeout: self.timeout,
        }))
    }
}

/// Parses a base URL, dropping any trailing slash so paths can be appended
fn parse_base_url(raw: &str) -> Result<Url> {
    Ok(Url::parse(raw.trim().trim_end_matches('/'))?)
}

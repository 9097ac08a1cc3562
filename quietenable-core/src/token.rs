//! Output-token limit normalization.
//!
//! OpenAI's newer models only accept `max_completion_tokens`, while xAI only
//! accepts `max_tokens`. Requests are built with one of the two and rewritten
//! for the provider they are about to be sent to.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

pub const MAX_TOKENS: &str = "max_tokens";
pub const MAX_COMPLETION_TOKENS: &str = "max_completion_tokens";

/// The provider a request is addressed to, as far as request shape goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Grok,
    Xai,
}

impl ProviderKind {
    /// Maps a provider tag to a kind
    ///
    /// `grok` and `xai` (any case) are xAI; every other tag is treated as
    /// OpenAI-style.
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::from_tag("XAI"), ProviderKind::Xai);
    /// assert_eq!(ProviderKind::from_tag("azure"), ProviderKind::OpenAi);
    /// ```
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "grok" => ProviderKind::Grok,
            "xai" => ProviderKind::Xai,
            _ => ProviderKind::OpenAi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Grok => "grok",
            ProviderKind::Xai => "xai",
        }
    }

    /// Name of the token-limit field this provider accepts
    pub fn token_field(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => MAX_COMPLETION_TOKENS,
            ProviderKind::Grok | ProviderKind::Xai => MAX_TOKENS,
        }
    }

    fn source_field(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => MAX_TOKENS,
            ProviderKind::Grok | ProviderKind::Xai => MAX_COMPLETION_TOKENS,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

/// Access to the two token-limit fields of a payload
pub trait TokenLimitFields {
    /// How the payload stores a limit
    type Limit;

    /// Removes the named field, returning its value if it was set
    fn take_limit(&mut self, field: &'static str) -> Option<Self::Limit>;

    fn set_limit(&mut self, field: &'static str, value: Self::Limit);

    fn has_limit(&self, field: &'static str) -> bool;
}

impl TokenLimitFields for Map<String, Value> {
    type Limit = Value;

    fn take_limit(&mut self, field: &'static str) -> Option<Value> {
        self.remove(field)
    }

    fn set_limit(&mut self, field: &'static str, value: Value) {
        self.insert(field.to_string(), value);
    }

    fn has_limit(&self, field: &'static str) -> bool {
        self.contains_key(field)
    }
}

/// Rewrites the token-limit field into the name `provider` expects
///
/// The result never carries the other field. A value is only moved when the
/// target field was absent; an existing target value wins. Everything else in
/// the payload is left alone, and applying this twice is the same as once.
///
/// # Examples
///
/// ```
/// use quietenable_core::{normalize_token_param, ProviderKind};
/// use serde_json::{json, Map, Value};
///
/// let payload: Map<String, Value> = json!({"model": "gpt-5", "max_tokens": 4000})
///     .as_object()
///     .cloned()
///     .unwrap();
///
/// let openai = normalize_token_param(payload, ProviderKind::OpenAi);
/// assert_eq!(openai.get("max_completion_tokens"), Some(&json!(4000)));
/// assert!(!openai.contains_key("max_tokens"));
/// ```
pub fn normalize_token_param<T: TokenLimitFields>(mut payload: T, provider: ProviderKind) -> T {
    let target = provider.token_field();
    let source = provider.source_field();

    if let Some(value) = payload.take_limit(source) {
        if !payload.has_limit(target) {
            payload.set_limit(target, value);
        }
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use parameterized::parameterized;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[parameterized(
        input = {
            json!({"model": "m", "max_tokens": 10}),
            json!({"model": "m", "max_completion_tokens": 10}),
            json!({"model": "m", "max_tokens": 10, "max_completion_tokens": 20}),
            json!({"model": "m"})
        },
        expected = {
            json!({"model": "m", "max_completion_tokens": 10}),
            json!({"model": "m", "max_completion_tokens": 10}),
            json!({"model": "m", "max_completion_tokens": 20}),
            json!({"model": "m"})
        }
    )]
    fn openai_normalization(input: Value, expected: Value) {
        let out = normalize_token_param(object(input), ProviderKind::OpenAi);
        assert_eq!(Value::Object(out), expected);
    }

    #[parameterized(
        input = {
            json!({"temperature": 0.7, "max_completion_tokens": 10}),
            json!({"temperature": 0.7, "max_tokens": 10}),
            json!({"temperature": 0.7, "max_tokens": 5, "max_completion_tokens": 20}),
            json!({"temperature": 0.7})
        },
        expected = {
            json!({"temperature": 0.7, "max_tokens": 10}),
            json!({"temperature": 0.7, "max_tokens": 10}),
            json!({"temperature": 0.7, "max_tokens": 5}),
            json!({"temperature": 0.7})
        }
    )]
    fn grok_normalization(input: Value, expected: Value) {
        let out = normalize_token_param(object(input), ProviderKind::Grok);
        assert_eq!(Value::Object(out), expected);
    }

    #[test]
    fn xai_behaves_like_grok() {
        let input = object(json!({"max_completion_tokens": 7}));
        let out = normalize_token_param(input, ProviderKind::Xai);
        assert_eq!(out.get(MAX_TOKENS), Some(&json!(7)));
    }

    #[test]
    fn normalization_is_idempotent() {
        for provider in [ProviderKind::OpenAi, ProviderKind::Grok] {
            let input = object(json!({"model": "m", "max_tokens": 4000, "stream": true}));
            let once = normalize_token_param(input, provider);
            let twice = normalize_token_param(once.clone(), provider);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn unknown_tags_default_to_openai() {
        assert_eq!(ProviderKind::from_tag("openai"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_tag("mistral"), ProviderKind::OpenAi);
        assert_eq!(" Grok ".parse::<ProviderKind>().unwrap(), ProviderKind::Grok);
    }
}

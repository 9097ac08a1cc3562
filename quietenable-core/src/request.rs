use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::message::Message;
use crate::search::SearchParameters;
use crate::token::{MAX_COMPLETION_TOKENS, MAX_TOKENS, TokenLimitFields};
use crate::tool::{ToolChoice, ToolDeclaration};

/// Sampling temperature used for every call
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Output-token cap used for every call
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// How much prose the model should produce (OpenAI GPT-5 family)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    Medium,
    High,
}

/// How hard reasoning models think before answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl FromStr for Verbosity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Verbosity::Low),
            "medium" => Ok(Verbosity::Medium),
            "high" => Ok(Verbosity::High),
            other => Err(Error::Config(format!("unknown verbosity '{other}'"))),
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(ReasoningEffort::Minimal),
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(Error::Config(format!("unknown reasoning effort '{other}'"))),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verbosity::Low => "low",
            Verbosity::Medium => "medium",
            Verbosity::High => "high",
        })
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        })
    }
}

/// A chat-completion request body
///
/// Optional fields are left out of the serialized JSON entirely when unset.
/// Build one with [`ChatRequest::builder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_parameters: Option<SearchParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<Verbosity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl ChatRequest {
    /// Starts a request for `model` with the default temperature and token cap
    pub fn builder(model: impl Into<String>) -> ChatRequestBuilder {
        ChatRequestBuilder::new(model)
    }

    /// Same request addressed to another model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Adds the provider-specific generation knobs
    #[must_use]
    pub fn with_extensions(
        mut self,
        verbosity: Option<Verbosity>,
        reasoning_effort: Option<ReasoningEffort>,
    ) -> Self {
        if verbosity.is_some() {
            self.verbosity = verbosity;
        }
        if reasoning_effort.is_some() {
            self.reasoning_effort = reasoning_effort;
        }
        self
    }

    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

impl TokenLimitFields for ChatRequest {
    type Limit = u32;

    fn take_limit(&mut self, field: &'static str) -> Option<u32> {
        match field {
            MAX_TOKENS => self.max_tokens.take(),
            MAX_COMPLETION_TOKENS => self.max_completion_tokens.take(),
            _ => None,
        }
    }

    fn set_limit(&mut self, field: &'static str, value: u32) {
        match field {
            MAX_TOKENS => self.max_tokens = Some(value),
            MAX_COMPLETION_TOKENS => self.max_completion_tokens = Some(value),
            _ => {}
        }
    }

    fn has_limit(&self, field: &'static str) -> bool {
        match field {
            MAX_TOKENS => self.max_tokens.is_some(),
            MAX_COMPLETION_TOKENS => self.max_completion_tokens.is_some(),
            _ => false,
        }
    }
}

/// Builder for [`ChatRequest`]
///
/// # Examples
///
/// ```
/// use quietenable_core::{ChatRequest, Message};
///
/// let request = ChatRequest::builder("gpt-5")
///     .messages(vec![Message::user("hello")])
///     .build();
///
/// assert_eq!(request.max_tokens, Some(4000));
/// assert!(request.tool_choice.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ChatRequestBuilder {
    request: ChatRequest,
}

impl ChatRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            request: ChatRequest {
                model: model.into(),
                messages: Vec::new(),
                tools: Vec::new(),
                tool_choice: None,
                temperature: DEFAULT_TEMPERATURE,
                max_tokens: Some(DEFAULT_MAX_TOKENS),
                max_completion_tokens: None,
                stream: None,
                search_parameters: None,
                verbosity: None,
                reasoning_effort: None,
            },
        }
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.request.messages = messages;
        self
    }

    /// Sets the declared tools; `tool_choice` becomes `auto` when there is at
    /// least one and stays unset otherwise
    pub fn tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.request.tool_choice = if tools.is_empty() {
            None
        } else {
            Some(ToolChoice::Auto)
        };
        self.request.tools = tools;
        self
    }

    /// Overrides the tool choice set by [`tools`](Self::tools)
    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.request.tool_choice = Some(choice);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.request.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = Some(max_tokens);
        self.request.max_completion_tokens = None;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.request.stream = stream.then_some(true);
        self
    }

    pub fn search_parameters(mut self, params: Option<SearchParameters>) -> Self {
        self.request.search_parameters = params;
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.request.verbosity = Some(verbosity);
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.request.reasoning_effort = Some(effort);
        self
    }

    pub fn build(self) -> ChatRequest {
        self.request
    }
}

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use futures::{Stream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ClientConfig, FALLBACK_MODEL};
use crate::error::{Error, ProviderError, Result};
use crate::message::{Message, Role, ToolCall};
use crate::provider::Provider;
use crate::request::{ChatRequest, ReasoningEffort, Verbosity};
use crate::response::{ChatChunk, ChatResponse, Choice, Usage};
use crate::search::{SearchOptions, SearchParameters};
use crate::token::normalize_token_param;
use crate::tool::ToolDeclaration;

/// Stream of chunks returned by [`QuietClient::chat_stream`]
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Per-call options for [`QuietClient::chat`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Overrides the current model for this call only
    pub model: Option<String>,
    pub search: Option<SearchOptions>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<SearchOptions>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// Chat-completion client with an optional fallback provider
///
/// Every call goes to the primary provider first. When it fails and a
/// fallback is configured, the same conversation is resent to the fallback
/// with its model set to [`FALLBACK_MODEL`].
///
/// # Examples
///
/// ```no_run
/// use quietenable_core::{ChatOptions, Message, QuietClient};
///
/// #[tokio::main]
/// async fn main() -> quietenable_core::Result<()> {
///     let client = QuietClient::from_env("sk-...")?;
///     let response = client
///         .chat(vec![Message::user("Hello!")], Vec::new(), ChatOptions::new())
///         .await?;
///     println!("{}", response.text().unwrap_or_default());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct QuietClient {
    primary: Provider,
    fallback: Option<Provider>,
    current_model: RwLock<String>,
    verbosity: Option<Verbosity>,
    reasoning_effort: Option<ReasoningEffort>,
}

impl QuietClient {
    /// Builds the providers described by `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a base URL is invalid or an HTTP client
    /// cannot be built.
    #[instrument(skip(config), level = "debug")]
    pub fn new(config: ClientConfig) -> Result<Self> {
        let primary = Provider::new(config.primary()?)?;
        let fallback = config.fallback()?.map(Provider::new).transpose()?;
        info!(
            "Creating client with model {} (fallback: {})",
            config.model(),
            fallback.is_some()
        );

        Ok(Self {
            primary,
            fallback,
            current_model: RwLock::new(config.model().to_string()),
            verbosity: config.verbosity,
            reasoning_effort: config.reasoning_effort,
        })
    }

    /// Builds a client for `api_key`, taking everything else from the environment
    ///
    /// # Errors
    ///
    /// See [`QuietClient::new`].
    pub fn from_env(api_key: impl Into<crate::secret::Secret<String>>) -> Result<Self> {
        Self::new(ClientConfig::new(api_key).resolve_env())
    }

    /// Builds a client around ready-made providers
    pub fn with_providers(primary: Provider, fallback: Option<Provider>) -> Self {
        Self {
            primary,
            fallback,
            current_model: RwLock::new(crate::config::DEFAULT_MODEL.to_string()),
            verbosity: None,
            reasoning_effort: None,
        }
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

    /// Replaces the model used by calls without an explicit override
    pub fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        debug!("Switching model to {}", model);
        *self
            .current_model
            .write()
            .unwrap_or_else(PoisonError::into_inner) = model;
    }

    pub fn current_model(&self) -> String {
        self.current_model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    fn base_request(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDeclaration>,
        options: ChatOptions,
        stream: bool,
    ) -> ChatRequest {
        let model = options
            .model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.current_model());
        let search = options.search.and_then(|s| s.search_parameters);

        ChatRequest::builder(model)
            .messages(messages)
            .tools(tools)
            .search_parameters(search)
            .stream(stream)
            .build()
    }

    /// The base request as sent to the primary
    fn primary_request(&self, base: &ChatRequest) -> ChatRequest {
        normalize_token_param(base.clone(), self.primary.kind())
            .with_extensions(self.verbosity, self.reasoning_effort)
    }

    /// Picks the fallback after a primary failure, or gives the failure back
    fn fallback_for(&self, primary_err: ProviderError) -> Result<&Provider> {
        match &self.fallback {
            Some(provider) => {
                warn!(
                    "Primary provider failed, falling back to {}: {}",
                    FALLBACK_MODEL, primary_err
                );
                Ok(provider)
            }
            None => {
                error!("Primary provider failed and no fallback is configured: {}", primary_err);
                Err(Error::Api(primary_err))
            }
        }
    }

    /// Sends a conversation and returns the full response
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the primary's failure when there is no
    /// fallback, or with the fallback's failure when both providers fail.
    #[instrument(skip_all, fields(messages = messages.len(), tools = tools.len()))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDeclaration>,
        options: ChatOptions,
    ) -> Result<ChatResponse> {
        let base = self.base_request(messages, tools, options, false);

        let primary_err = match self.primary.complete(&self.primary_request(&base)).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        let provider = self.fallback_for(primary_err)?;
        provider.complete(&fallback_request(base, provider)).await.map_err(|err| {
            error!("Fallback provider failed as well: {}", err);
            Error::Api(err)
        })
    }

    /// Like [`chat`](Self::chat) but streams the answer
    ///
    /// The fallback is only tried if the primary fails to open the stream.
    /// Errors after the first chunk end up in the stream.
    ///
    /// # Errors
    ///
    /// Same as [`chat`](Self::chat), for opening the stream.
    #[instrument(skip_all, fields(messages = messages.len(), tools = tools.len()))]
    pub async fn chat_stream(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDeclaration>,
        options: ChatOptions,
    ) -> Result<ChatStream> {
        let base = self.base_request(messages, tools, options, true);

        let stream = match self.primary.stream(&self.primary_request(&base)).await {
            Ok(stream) => stream,
            Err(primary_err) => {
                let provider = self.fallback_for(primary_err)?;
                provider.stream(&fallback_request(base, provider)).await.map_err(|err| {
                    error!("Fallback provider failed as well: {}", err);
                    Error::Api(err)
                })?
            }
        };

        Ok(Box::pin(stream.map(|item| item.map_err(Error::Api))))
    }

    /// Asks a single question with provider-side web search
    ///
    /// `params` defaults to search mode `on`.
    ///
    /// # Errors
    ///
    /// Same as [`chat`](Self::chat).
    pub async fn search(
        &self,
        query: impl Into<String>,
        params: Option<SearchParameters>,
    ) -> Result<ChatResponse> {
        let params = params.unwrap_or_else(SearchParameters::on);
        self.chat(
            vec![Message::user(query)],
            Vec::new(),
            ChatOptions::new().with_search(params),
        )
        .await
    }
}

/// The base request rewritten for the fallback model
///
/// Primary-only generation knobs are left out.
fn fallback_request(base: ChatRequest, fallback: &Provider) -> ChatRequest {
    normalize_token_param(base.with_model(FALLBACK_MODEL), fallback.kind())
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    call_type: Option<String>,
    name: String,
    arguments: String,
}

/// Drains a stream into a single response
///
/// Content deltas are concatenated and tool-call fragments merged by index.
/// The last finish reason and usage seen win.
///
/// # Errors
///
/// Returns the first error the stream yields.
pub async fn collect_stream(mut stream: ChatStream) -> Result<ChatResponse> {
    let mut id = None;
    let mut model = None;
    let mut content = String::new();
    let mut saw_content = false;
    let mut tool_calls: BTreeMap<u32, PartialToolCall> = BTreeMap::new();
    let mut finish_reason = None;
    let mut usage: Option<Usage> = None;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        id = chunk.id.or(id);
        model = chunk.model.or(model);
        usage = chunk.usage.or(usage);

        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            if let Some(text) = choice.delta.content {
                saw_content = true;
                content.push_str(&text);
            }
            for delta in choice.delta.tool_calls {
                let call = tool_calls.entry(delta.index).or_default();
                if let Some(call_id) = delta.id {
                    call.id = call_id;
                }
                if delta.call_type.is_some() {
                    call.call_type = delta.call_type;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        call.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        call.arguments.push_str(&arguments);
                    }
                }
            }
            if choice.finish_reason.is_some() {
                finish_reason = choice.finish_reason;
            }
        }
    }

    let tool_calls = tool_calls
        .into_values()
        .map(|partial| {
            let mut call = ToolCall::new(partial.id, partial.name, partial.arguments);
            if let Some(call_type) = partial.call_type {
                call.call_type = call_type;
            }
            call
        })
        .collect();

    let message = Message {
        role: Role::Assistant,
        content: saw_content.then_some(content),
        name: None,
        tool_calls,
        tool_call_id: None,
    };

    Ok(ChatResponse {
        id,
        model,
        created: None,
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason,
        }],
        usage,
    })
}

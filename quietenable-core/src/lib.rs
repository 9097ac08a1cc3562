// This is the main library file that re-exports the public API
// and defines the module structure.

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod provider;
pub mod request;
pub mod response;
pub mod search;
pub mod secret;
pub mod token;
pub mod tool;
pub mod transport;

// Re-export the main types for convenient usage
pub use client::{ChatOptions, ChatStream, QuietClient, collect_stream};
pub use config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_FALLBACK_BASE_URL, DEFAULT_MODEL, FALLBACK_MODEL,
    ProviderConfig,
};
pub use error::{Error, ProviderError, Result};
pub use message::{FunctionCall, Message, Role, ToolCall};
pub use provider::Provider;
pub use request::{ChatRequest, ChatRequestBuilder, ReasoningEffort, Verbosity};
pub use response::{ChatChunk, ChatResponse, Choice, Usage};
pub use search::{SearchMode, SearchOptions, SearchParameters};
pub use secret::Secret;
pub use token::{ProviderKind, TokenLimitFields, normalize_token_param};
pub use tool::{ToolChoice, ToolDeclaration, ToolParameters};

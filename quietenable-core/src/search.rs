use serde::{Deserialize, Serialize};

/// Whether the provider augments the answer with live web retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Provider decides
    Auto,
    On,
    Off,
}

/// Provider-side search settings, sent as `search_parameters`
///
/// Sources are left to the provider's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SearchMode>,
}

impl SearchParameters {
    pub fn with_mode(mode: SearchMode) -> Self {
        Self { mode: Some(mode) }
    }

    /// Search forced on, the default for [`QuietClient::search`](crate::QuietClient::search)
    pub fn on() -> Self {
        Self::with_mode(SearchMode::On)
    }
}

/// Optional search settings for a chat call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub search_parameters: Option<SearchParameters>,
}

impl From<SearchParameters> for SearchOptions {
    fn from(params: SearchParameters) -> Self {
        Self {
            search_parameters: Some(params),
        }
    }
}

//! Transport configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the event and favourites endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the tracking API, e.g. "https://api.hearth.example".
    pub api_url: String,
    /// API key, sent as the `x-api-key` header (or an `api_key` query
    /// parameter on the beacon path, which cannot carry custom headers).
    pub api_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TransportConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Whether both the URL and the key are present. When this is false
    /// every send degrades to a logged no-op.
    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_key.is_empty()
    }

    /// Joins an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub board: BoardConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Default: http://localhost:5000
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Raw `Cookie` header value of an authenticated session
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            session_cookie: None,
            bearer_token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub consistency: ConsistencyPolicy,
    /// Project used when the CLI is not given one
    #[serde(default)]
    pub default_project: Option<String>,
}

/// When deadline/completion consistency across the whole tree is re-checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyPolicy {
    /// Only at mutation time for the node being changed; the next reload
    /// is the correction point for everything else
    #[default]
    Eventual,
    /// After every committed mutation, report inconsistencies across the tree
    Eager,
}

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{path::{Path, PathBuf}, time::Duration};
use tracing::debug;

/// Default MCP endpoint of the analysis service
pub const DEFAULT_ENDPOINT: &str = "https://mcp.deepwiki.com/mcp";

/// Host used to build "open analysis page" hint URLs
pub const DEFAULT_HINT_BASE_URL: &str = "https://deepwiki.com";

/// MCP protocol revision announced during the handshake
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MCP endpoint of the analysis service
    pub endpoint: String,

    /// Protocol version sent in the handshake
    pub protocol_version: String,

    /// Bounded wait for the session handshake
    pub handshake_timeout_secs: u64,

    /// Bounded wait for a single analysis query
    pub query_timeout_secs: u64,

    /// Wall-clock budget for a whole generation request
    pub request_budget_secs: u64,

    /// Base URL for repository analysis pages
    pub hint_base_url: String,

    /// Queries allowed in flight on the shared session
    pub max_concurrent_queries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            handshake_timeout_secs: 30,
            query_timeout_secs: 60,
            request_budget_secs: 90,
            hint_base_url: DEFAULT_HINT_BASE_URL.to_string(),
            max_concurrent_queries: 1,
        }
    }
}

impl Config {
    /// Initialize configuration from defaults, an optional file and the environment
    pub async fn init(explicit_path: Option<&Path>) -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = Self::default();

        match explicit_path {
            Some(path) => {
                let file_config = Self::load_file(path).await?;
                config.merge_with(file_config);
            }
            None => {
                if let Ok(file_config) = Self::load_from_file().await {
                    config.merge_with(file_config);
                }
            }
        }

        // Environment wins over files
        config.load_from_env();

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        self.apply_vars(std::env::vars());
    }

    fn apply_vars<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "SIDEKICK_ENDPOINT" => self.endpoint = value,
                "SIDEKICK_HINT_BASE_URL" => self.hint_base_url = value,
                "SIDEKICK_HANDSHAKE_TIMEOUT_SECS" => {
                    if let Ok(secs) = value.parse() {
                        self.handshake_timeout_secs = secs;
                    }
                }
                "SIDEKICK_QUERY_TIMEOUT_SECS" => {
                    if let Ok(secs) = value.parse() {
                        self.query_timeout_secs = secs;
                    }
                }
                "SIDEKICK_REQUEST_BUDGET_SECS" => {
                    if let Ok(secs) = value.parse() {
                        self.request_budget_secs = secs;
                    }
                }
                "SIDEKICK_MAX_CONCURRENT_QUERIES" => {
                    if let Ok(limit) = value.parse() {
                        self.max_concurrent_queries = limit;
                    }
                }
                _ => {}
            }
        }
    }

    /// Load configuration from sidekick.json files
    pub async fn load_from_file() -> Result<Self> {
        // Priority:
        // 1. ./.sidekick.json
        // 2. ./sidekick.json
        // 3. $CONFIG_DIR/sidekick/sidekick.json
        let mut config_paths = vec![
            PathBuf::from("./.sidekick.json"),
            PathBuf::from("./sidekick.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            config_paths.push(config_dir.join("sidekick").join("sidekick.json"));
        }

        for path in config_paths {
            if path.exists() {
                return Self::load_file(&path).await;
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    async fn load_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Invalid configuration in {}: {}", path.display(), e))
    }

    /// Merge another configuration into this one; only non-default values override
    pub fn merge_with(&mut self, other: Self) {
        let defaults = Self::default();

        if other.endpoint != defaults.endpoint {
            self.endpoint = other.endpoint;
        }
        if other.protocol_version != defaults.protocol_version {
            self.protocol_version = other.protocol_version;
        }
        if other.handshake_timeout_secs != defaults.handshake_timeout_secs {
            self.handshake_timeout_secs = other.handshake_timeout_secs;
        }
        if other.query_timeout_secs != defaults.query_timeout_secs {
            self.query_timeout_secs = other.query_timeout_secs;
        }
        if other.request_budget_secs != defaults.request_budget_secs {
            self.request_budget_secs = other.request_budget_secs;
        }
        if other.hint_base_url != defaults.hint_base_url {
            self.hint_base_url = other.hint_base_url;
        }
        if other.max_concurrent_queries != defaults.max_concurrent_queries {
            self.max_concurrent_queries = other.max_concurrent_queries;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(anyhow!("Endpoint must be an http(s) URL, got '{}'", self.endpoint));
        }

        if self.handshake_timeout_secs == 0 || self.query_timeout_secs == 0 {
            return Err(anyhow!("Timeouts must be greater than zero"));
        }

        if self.request_budget_secs < self.query_timeout_secs {
            return Err(anyhow!(
                "Request budget ({}s) must cover the query timeout ({}s)",
                self.request_budget_secs,
                self.query_timeout_secs
            ));
        }

        if self.max_concurrent_queries == 0 {
            return Err(anyhow!("max_concurrent_queries must be at least 1"));
        }

        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn request_budget(&self) -> Duration {
        Duration::from_secs(self.request_budget_secs)
    }
}

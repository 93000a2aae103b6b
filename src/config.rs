//! Configuration module for the transaction client
//!
//! This module handles all configuration loading from TOML files,
//! environment variables, and provides structured configuration types.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcConfig,

    /// Wallet configuration
    pub wallet: WalletConfig,

    /// Backend API configuration
    pub backend: BackendConfig,

    /// Submission pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Transport-level resend attempts for a broadcast
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Skip preflight simulation on broadcast
    #[serde(default = "default_true")]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    pub keypair_path: String,

    /// Whether the wallet accepts the versioned wire format
    #[serde(default = "default_true")]
    pub supports_versioned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the trade backend
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Program the submitted transactions are expected to invoke, used
    /// by signature recovery (base58)
    #[serde(default)]
    pub expected_program: Option<String>,

    /// Cluster name appended to explorer links
    #[serde(default = "default_explorer_cluster")]
    pub explorer_cluster: String,

    /// How long to wait for confirmation before giving up, in seconds
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,
}

// Default value functions
fn default_rpc_timeout() -> u64 {
    30
}
fn default_max_retries() -> usize {
    5
}
fn default_backend_timeout() -> u64 {
    30
}
fn default_explorer_cluster() -> String {
    "devnet".to_string()
}
fn default_confirm_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        if let Ok(url) = std::env::var("RPC_URL") {
            config.rpc.url = url;
        }
        if let Ok(url) = std::env::var("BACKEND_URL") {
            config.backend.base_url = url;
        }
        if let Ok(path) = std::env::var("KEYPAIR_PATH") {
            config.wallet.keypair_path = path;
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                url: "https://api.devnet.solana.com".to_string(),
                timeout_secs: default_rpc_timeout(),
                max_retries: default_max_retries(),
                skip_preflight: default_true(),
            },
            wallet: WalletConfig {
                keypair_path: "~/.config/solana/id.json".to_string(),
                supports_versioned: default_true(),
            },
            backend: BackendConfig {
                base_url: "https://api.example-dex.io".to_string(),
                request_timeout_secs: default_backend_timeout(),
            },
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_program: None,
            explorer_cluster: default_explorer_cluster(),
            confirm_timeout_secs: default_confirm_timeout(),
        }
    }
}

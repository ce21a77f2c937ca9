//! # Node Configuration
//!
//! Unified configuration for the claim node: HTTP listener, record store,
//! chain access, metadata publishing and the workflow itself.
//!
//! Values come from an optional TOML file and are then overridden by
//! `CLAIM_*` environment variables.
//!
//! ## Security Requirements
//!
//! - `chain.private_key` MUST be set before serving claims
//! - The key is never logged; `Debug` redacts it

use claim_workflow::{MetadataTemplate, WorkflowConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// One gwei in wei.
const GWEI: u64 = 1_000_000_000;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP listener.
    pub http: HttpConfig,
    /// Record store backend.
    pub storage: StorageConfig,
    /// Chain node and signing account.
    pub chain: ChainConfig,
    /// IPFS pinning endpoint.
    pub ipfs: IpfsConfig,
    /// Claim workflow timeouts and lease.
    pub workflow: WorkflowConfig,
    /// Token metadata template.
    pub metadata: MetadataTemplate,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file {path}: {reason}")]
    Read {
        /// File path
        path: String,
        /// Underlying error
        reason: String,
    },

    /// Config file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// An environment override did not parse.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// No signing key configured.
    #[error("chain.private_key is not set. Set CLAIM_PRIVATE_KEY or provide it in the config file")]
    MissingPrivateKey,

    /// No contract address configured.
    #[error("chain.contract_address is not set. Set CLAIM_CONTRACT_ADDRESS")]
    MissingContract,

    /// Workflow section rejected.
    #[error("Invalid workflow config: {0}")]
    Workflow(String),

    /// Storage backend not compiled in.
    #[error("Storage backend '{0}' is not available in this build")]
    UnsupportedBackend(String),
}

impl NodeConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&raw)
    }

    /// Parse TOML text.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `CLAIM_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CLAIM_CONTRACT_ADDRESS") {
            self.chain.contract_address = v;
        }
        if let Some(v) = lookup("CLAIM_PRIVATE_KEY") {
            self.chain.private_key = v;
        }
        if let Some(v) = lookup("CLAIM_ETHEREUM_CLIENT") {
            self.chain.rpc_url = v;
        }
        if let Some(v) = lookup("CLAIM_GAS_LIMIT") {
            self.chain.gas_limit = Some(parse_number("CLAIM_GAS_LIMIT", &v)?);
        }
        if let Some(v) = lookup("CLAIM_GAS_PRICE") {
            self.chain.gas_price_gwei = Some(parse_number("CLAIM_GAS_PRICE", &v)?);
        }
        if let Some(v) = lookup("CLAIM_INFURA_PROJECT_ID") {
            self.ipfs.project_id = v;
        }
        if let Some(v) = lookup("CLAIM_INFURA_PROJECT_SECRET") {
            self.ipfs.project_secret = v;
        }
        if let Some(v) = lookup("CLAIM_STORAGE_PATH") {
            self.storage.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PORT") {
            self.http.port = parse_number("PORT", &v)?;
        }
        Ok(())
    }

    /// Workflow configuration with the chain section's gas overrides applied.
    pub fn workflow_config(&self) -> WorkflowConfig {
        let mut workflow = self.workflow.clone();
        if let Some(limit) = self.chain.gas_limit {
            workflow.gas.gas_limit = limit;
        }
        if let Some(gwei) = self.chain.gas_price_gwei {
            workflow.gas.gas_price_wei = gwei.saturating_mul(GWEI);
        }
        workflow
    }

    /// Validate only what the record store needs.
    ///
    /// Used by `provision`, which never touches the chain.
    pub fn validate_storage(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::UnsupportedBackend("rocksdb".to_string()));
        }
        Ok(())
    }

    /// Validate configuration for serving claims.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_storage()?;
        if self.chain.private_key.trim().is_empty() {
            return Err(ConfigError::MissingPrivateKey);
        }
        if self.chain.contract_address.trim().is_empty() {
            return Err(ConfigError::MissingContract);
        }
        self.workflow_config()
            .validate()
            .map_err(ConfigError::Workflow)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl HttpConfig {
    /// Socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                key: "http.host".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Record store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map; lost on restart.
    #[default]
    Memory,
    /// RocksDB database under `storage.path`.
    RocksDb,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend.
    pub backend: StorageBackend,
    /// Data directory for the RocksDB backend.
    pub path: PathBuf,
    /// Fsync every write.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("./data/claims"),
            sync_writes: true,
        }
    }
}

/// Chain access configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the chain node.
    pub rpc_url: String,
    /// Collection contract address.
    pub contract_address: String,
    /// Hex-encoded secp256k1 key of the minting account.
    pub private_key: String,
    /// Gas limit override (units).
    pub gas_limit: Option<u64>,
    /// Gas price override (gwei).
    pub gas_price_gwei: Option<u64>,
    /// HTTP client timeout for RPC calls.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: String::new(),
            private_key: String::new(),
            gas_limit: None,
            gas_price_gwei: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &"<redacted>")
            .field("gas_limit", &self.gas_limit)
            .field("gas_price_gwei", &self.gas_price_gwei)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// IPFS configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// `add` endpoint.
    pub api_url: String,
    /// Basic-auth user (Infura project id).
    pub project_id: String,
    /// Basic-auth password (Infura project secret).
    pub project_secret: String,
    /// HTTP client timeout for uploads.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://ipfs.infura.io:5001/api/v0/add".to_string(),
            project_id: String::new(),
            project_secret: String::new(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl std::fmt::Debug for IpfsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsConfig")
            .field("api_url", &self.api_url)
            .field("project_id", &self.project_id)
            .field("project_secret", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

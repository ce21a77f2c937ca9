//! # Claim Container
//!
//! Builds the claim controller and its production adapters from a
//! `NodeConfig`.
//!
//! ## Initialization Order
//!
//! ```text
//! 1. Record store   (memory | rocksdb)
//! 2. Signer         (private key -> minting account)
//! 3. Submitter      (JSON-RPC client)
//! 4. Publisher      (IPFS client)
//! 5. Controller     (workflow config + metadata template)
//! ```

pub mod config;

pub use config::{ConfigError, NodeConfig, StorageBackend, StorageConfig};

use claim_workflow::{
    ClaimPorts, ClaimWorkflowController, InMemoryStore, IntentSigner, PublishError, RecordStore,
    SignError, StoreError, SubmitError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::adapters::{IpfsPublisher, JsonRpcSubmitter, LocalSigner};

/// Errors raised while wiring the node.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Record store could not be opened.
    #[error("Record store: {0}")]
    Store(#[from] StoreError),

    /// Signing key or contract address unusable.
    #[error("Signer: {0}")]
    Signer(#[from] SignError),

    /// Chain client could not be built.
    #[error("Chain client: {0}")]
    Submitter(#[from] SubmitError),

    /// IPFS client could not be built.
    #[error("IPFS client: {0}")]
    Publisher(#[from] PublishError),
}

/// Open the configured record store.
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>, ContainerError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("[claim] using in-memory record store; records are lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb => {
            use crate::adapters::storage::{RocksDbConfig, RocksDbRecordStore};
            let store = RocksDbRecordStore::open(RocksDbConfig {
                path: config.path.to_string_lossy().to_string(),
                sync_writes: config.sync_writes,
                ..Default::default()
            })?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb => Err(ConfigError::UnsupportedBackend("rocksdb".to_string()).into()),
    }
}

/// Fully wired node.
pub struct ClaimContainer {
    /// Record store shared with provisioning.
    pub store: Arc<dyn RecordStore>,
    /// Claim controller.
    pub controller: ClaimWorkflowController,
    /// Node configuration (immutable after initialization).
    pub config: NodeConfig,
}

impl ClaimContainer {
    /// Validate `config` and build every adapter.
    #[instrument(name = "container_init", skip(config))]
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        let store = build_store(&config.storage)?;
        Self::with_store(config, store)
    }

    /// Build around an existing store.
    pub fn with_store(
        config: NodeConfig,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, ContainerError> {
        let signer = LocalSigner::new(&config.chain.private_key, &config.chain.contract_address)?;
        info!(
            account = %signer.account(),
            contract = %signer.contract(),
            "[claim] signer ready"
        );

        let submitter = JsonRpcSubmitter::new(
            config.chain.rpc_url.clone(),
            signer.contract(),
            config.chain.request_timeout,
        )?;
        let publisher = IpfsPublisher::new(
            config.ipfs.api_url.clone(),
            config.ipfs.project_id.clone(),
            config.ipfs.project_secret.clone(),
            config.ipfs.request_timeout,
        )?;

        let ports = ClaimPorts {
            store: Arc::clone(&store),
            publisher: Arc::new(publisher),
            submitter: Arc::new(submitter),
            signer: Arc::new(signer),
        };
        let controller = ClaimWorkflowController::new(
            ports,
            config.workflow_config(),
            config.metadata.clone(),
        );

        info!(rpc = %config.chain.rpc_url, "[claim] container initialized");
        Ok(Self {
            store,
            controller,
            config,
        })
    }
}

//! Workflow configuration injected into the controller at construction.

use super::entities::{GasParams, MetadataAttribute};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Budget for one record store call.
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
    /// Budget for the metadata upload.
    #[serde(with = "humantime_serde")]
    pub publish_timeout: Duration,
    /// Budget for the transaction broadcast.
    #[serde(with = "humantime_serde")]
    pub submit_timeout: Duration,
    /// Budget for nonce, network and status queries.
    #[serde(with = "humantime_serde")]
    pub chain_query_timeout: Duration,
    /// Lease held by a running workflow, renewed every third of it.
    #[serde(with = "humantime_serde")]
    pub lease_duration: Duration,
    /// Reconcile every `Pending` record at startup, not only expired ones.
    pub reconcile_all_on_startup: bool,
    /// Gas parameters for mint transactions.
    pub gas: GasParams,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(30),
            submit_timeout: Duration::from_secs(30),
            chain_query_timeout: Duration::from_secs(10),
            lease_duration: Duration::from_secs(120),
            reconcile_all_on_startup: true,
            gas: GasParams::default(),
        }
    }
}

impl WorkflowConfig {
    /// Fast settings for tests.
    pub fn for_testing() -> Self {
        Self {
            store_timeout: Duration::from_millis(500),
            publish_timeout: Duration::from_millis(500),
            submit_timeout: Duration::from_millis(500),
            chain_query_timeout: Duration::from_millis(500),
            lease_duration: Duration::from_secs(3),
            reconcile_all_on_startup: true,
            gas: GasParams::default(),
        }
    }

    /// Longest single step budget.
    pub fn slowest_step(&self) -> Duration {
        [
            self.store_timeout,
            self.publish_timeout,
            self.submit_timeout,
            self.chain_query_timeout,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
    }

    /// Interval between lease renewals.
    pub fn heartbeat_interval(&self) -> Duration {
        self.lease_duration / 3
    }

    /// Lease duration in milliseconds.
    pub fn lease_ms(&self) -> u64 {
        self.lease_duration.as_millis() as u64
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("store_timeout", self.store_timeout),
            ("publish_timeout", self.publish_timeout),
            ("submit_timeout", self.submit_timeout),
            ("chain_query_timeout", self.chain_query_timeout),
            ("lease_duration", self.lease_duration),
        ] {
            if value.is_zero() {
                return Err(format!("{} cannot be 0", name));
            }
        }
        if self.lease_duration <= self.slowest_step() {
            return Err(format!(
                "lease_duration ({:?}) must exceed the slowest step timeout ({:?})",
                self.lease_duration,
                self.slowest_step()
            ));
        }
        if self.gas.gas_limit == 0 {
            return Err("gas_limit cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Provenance metadata template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataTemplate {
    /// Collection name; the token name is `"<collection> #<token id>"`.
    pub collection: String,
    /// Token description; empty means the token name.
    pub description: String,
    /// Image URI.
    pub image: String,
    /// Fixed attributes copied into every token.
    pub attributes: Vec<MetadataAttribute>,
}

impl Default for MetadataTemplate {
    fn default() -> Self {
        let attr = |trait_type: &str, value: &str| MetadataAttribute {
            trait_type: trait_type.to_string(),
            display_type: None,
            value: value.to_string(),
        };
        Self {
            collection: "Ma'hai".to_string(),
            description: String::new(),
            image: "ipfs://QmWCsTr7EiVFpDsWkogrm7qidu2t7jHkiYVueCWCwD7ZA5".to_string(),
            attributes: vec![
                attr("Producto", "London Dry Gin"),
                attr("Lote", "202112R"),
                attr("Partida", "840 botellas"),
                attr("Fabricado en", "Coronel Vidal, Buenos Aires, Argentina"),
                MetadataAttribute {
                    trait_type: "Fecha de produccion".to_string(),
                    display_type: Some("date".to_string()),
                    value: "1638421200".to_string(),
                },
            ],
        }
    }
}

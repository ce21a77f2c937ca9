//! # Adapters
//!
//! Production implementations of the claim workflow's outbound ports.
//!
//! | Port | Adapter |
//! |------|---------|
//! | `RecordStore` | `storage::RocksDbRecordStore` (feature `rocksdb`), `InMemoryStore` |
//! | `MetadataPublisher` | `IpfsPublisher` |
//! | `TransactionSubmitter` | `JsonRpcSubmitter` |
//! | `IntentSigner` | `LocalSigner` |

pub mod abi;
pub mod eth_rpc;
pub mod ipfs;
pub mod signer;
pub mod storage;

pub use eth_rpc::JsonRpcSubmitter;
pub use ipfs::IpfsPublisher;
pub use signer::LocalSigner;

//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports. Each one carries fault
//! hooks so tests can fail, delay or crash any external system.

mod memory_chain;
mod memory_publisher;
mod memory_store;
mod static_signer;

pub use memory_chain::InMemoryChain;
pub use memory_publisher::InMemoryPublisher;
pub use memory_store::InMemoryStore;
pub use static_signer::StaticSigner;

//! Integration scenarios.

#[cfg(test)]
pub mod support;

pub mod concurrency;
pub mod node_e2e;
pub mod recovery;
pub mod scenarios;

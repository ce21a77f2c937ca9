//! In-memory metadata publisher.

use crate::domain::{ContentRef, PublishError};
use crate::ports::MetadataPublisher;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Publisher that keeps documents in memory, addressed by their SHA-256.
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    documents: RwLock<HashMap<String, Vec<u8>>>,
    should_fail: AtomicBool,
    uploads: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryPublisher {
    /// Create an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every upload.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Delay every upload.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Upload attempts so far, failed ones included.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Fetch a published document.
    pub fn document(&self, content: &ContentRef) -> Option<Vec<u8>> {
        self.documents.read().get(&content.0).cloned()
    }
}

#[async_trait]
impl MetadataPublisher for InMemoryPublisher {
    async fn publish(&self, bytes: Vec<u8>) -> Result<ContentRef, PublishError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(PublishError::Network("Mock failure".to_string()));
        }

        let digest = Sha256::digest(&bytes);
        let content = ContentRef(format!("Qm{}", &hex::encode(digest)[..44]));
        self.documents.write().insert(content.0.clone(), bytes);
        Ok(content)
    }
}

//! # RocksDB Record Store
//!
//! Durable implementation of the `RecordStore` port.
//!
//! ## Layout
//!
//! - Column family `claims`: redeem code -> JSON-encoded `ClaimRecord`
//!
//! ## Atomicity
//!
//! Compare-and-set holds the database write lock across read, compare and
//! write, so concurrent claims within this process serialize on it. The
//! database directory is locked by RocksDB itself, so a second process
//! cannot open it.
//!
//! Calls run on the blocking thread pool.

use async_trait::async_trait;
use claim_workflow::{ClaimRecord, ClaimState, RecordStore, StateGuard, StoreError};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::sync::Arc;
use tracing::info;

/// Column family holding claim records.
pub const CF_CLAIMS: &str = "claims";

/// All column families used by the store.
pub const COLUMN_FAMILIES: &[&str] = &[CF_CLAIMS];

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 32MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 2)
    pub max_write_buffer_number: i32,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/claims".to_string(),
            block_cache_size: 32 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

struct Inner {
    db: RwLock<DB>,
    config: RocksDbConfig,
}

/// RocksDB-backed record store.
#[derive(Clone)]
pub struct RocksDbRecordStore {
    inner: Arc<Inner>,
}

impl RocksDbRecordStore {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| StoreError::Io(format!("Failed to open RocksDB: {}", e)))?;

        info!(path = %config.path, "[claim] RocksDB record store opened");

        Ok(Self {
            inner: Arc::new(Inner {
                db: RwLock::new(db),
                config,
            }),
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StoreError::Io(format!("store task failed: {}", e)))?
    }
}

fn encode(record: &ClaimRecord) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| StoreError::Corrupted {
        code: record.code.clone(),
        reason: e.to_string(),
    })
}

fn decode(code: &str, bytes: &[u8]) -> Result<ClaimRecord, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupted {
        code: code.to_string(),
        reason: e.to_string(),
    })
}

impl Inner {
    fn read(db: &DB, code: &str) -> Result<Option<ClaimRecord>, StoreError> {
        let cf = db
            .cf_handle(CF_CLAIMS)
            .ok_or_else(|| StoreError::Unavailable("missing column family".to_string()))?;
        let raw = db
            .get_cf(&cf, code.as_bytes())
            .map_err(|e| StoreError::Io(format!("RocksDB get failed: {}", e)))?;
        raw.map(|bytes| decode(code, &bytes)).transpose()
    }

    fn write(&self, db: &DB, record: &ClaimRecord) -> Result<(), StoreError> {
        let cf = db
            .cf_handle(CF_CLAIMS)
            .ok_or_else(|| StoreError::Unavailable("missing column family".to_string()))?;
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        db.put_cf_opt(&cf, record.code.as_bytes(), encode(record)?, &write_opts)
            .map_err(|e| StoreError::Io(format!("RocksDB put failed: {}", e)))
    }

    fn get(&self, code: &str) -> Result<Option<ClaimRecord>, StoreError> {
        let db = self.db.read();
        Self::read(&db, code)
    }

    fn compare_and_set(
        &self,
        code: &str,
        expected: StateGuard,
        new: &ClaimRecord,
    ) -> Result<bool, StoreError> {
        let db = self.db.write();
        match Self::read(&db, code)? {
            Some(current) if expected.matches(&current) => {
                self.write(&db, new)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_if_absent(&self, record: &ClaimRecord) -> Result<bool, StoreError> {
        let db = self.db.write();
        if Self::read(&db, &record.code)?.is_some() {
            return Ok(false);
        }
        self.write(&db, record)?;
        Ok(true)
    }

    fn list_by_state(&self, state: ClaimState) -> Result<Vec<ClaimRecord>, StoreError> {
        let db = self.db.read();
        let cf = db
            .cf_handle(CF_CLAIMS)
            .ok_or_else(|| StoreError::Unavailable("missing column family".to_string()))?;

        let mut out = Vec::new();
        for item in db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) =
                item.map_err(|e| StoreError::Io(format!("RocksDB iteration failed: {}", e)))?;
            let record = decode(&String::from_utf8_lossy(&key), &value)?;
            if record.state == state {
                out.push(record);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordStore for RocksDbRecordStore {
    async fn get(&self, code: &str) -> Result<Option<ClaimRecord>, StoreError> {
        let code = code.to_string();
        self.blocking(move |inner| inner.get(&code)).await
    }

    async fn compare_and_set(
        &self,
        code: &str,
        expected: StateGuard,
        new: ClaimRecord,
    ) -> Result<bool, StoreError> {
        let code = code.to_string();
        self.blocking(move |inner| inner.compare_and_set(&code, expected, &new))
            .await
    }

    async fn insert_if_absent(&self, record: ClaimRecord) -> Result<bool, StoreError> {
        self.blocking(move |inner| inner.insert_if_absent(&record))
            .await
    }

    async fn list_by_state(&self, state: ClaimState) -> Result<Vec<ClaimRecord>, StoreError> {
        self.blocking(move |inner| inner.list_by_state(state)).await
    }
}

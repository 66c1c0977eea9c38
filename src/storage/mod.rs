use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{StaticConfig, StorageBackend};
use crate::errors::{Result, ShortenerError};

pub mod backend;
pub mod deletion;
pub mod file;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use deletion::{DeleteBatch, SoftDeleter};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use models::{OwnerId, UrlRecord};

/// 存储契约
///
/// 三种后端（内存、追加日志文件、关系数据库）都实现这一组操作。
/// 写入以 `original_url` 去重：重复写入返回 `Conflict { key }`，携带已存在的 key。
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert one record, recording `owner` when present.
    async fn insert(&self, owner: Option<OwnerId>, record: &UrlRecord) -> Result<()>;

    /// Insert a list of records.
    ///
    /// Transactional backends abort the whole batch on the first failing element.
    /// The others apply it best-effort and skip URLs that are already stored.
    async fn insert_batch(&self, owner: Option<OwnerId>, records: &[UrlRecord]) -> Result<()>;

    /// Original URL for `key`, `NotFound` if it never existed, `Gone` if soft-deleted.
    async fn get(&self, key: &str) -> Result<String>;

    /// Every record owned by `owner`, soft-deleted ones included.
    async fn get_owner_urls(&self, owner: OwnerId) -> Result<Vec<UrlRecord>>;

    /// Open an asynchronous soft-delete batch scoped to `owner`.
    fn delete_batch_for_owner(&self, owner: OwnerId) -> Result<DeleteBatch>;

    async fn create_owner(&self) -> Result<OwnerId>;

    async fn ping(&self) -> Result<()>;

    async fn count_urls(&self) -> Result<u64>;

    async fn count_owners(&self) -> Result<u64>;

    fn backend_name(&self) -> &'static str;

    async fn save(&self, record: &UrlRecord) -> Result<()> {
        self.insert(None, record).await
    }

    async fn save_with_owner(&self, owner: OwnerId, record: &UrlRecord) -> Result<()> {
        self.insert(Some(owner), record).await
    }

    async fn save_batch(&self, records: &[UrlRecord]) -> Result<()> {
        self.insert_batch(None, records).await
    }

    async fn save_batch_with_owner(&self, owner: OwnerId, records: &[UrlRecord]) -> Result<()> {
        self.insert_batch(Some(owner), records).await
    }
}

pub struct StorageFactory;

impl StorageFactory {
    /// Build the backend selected by the `[storage]` configuration section.
    pub async fn create(config: &StaticConfig) -> Result<Arc<dyn Storage>> {
        let capacity = config.deletion.queue_capacity;

        let storage: Arc<dyn Storage> = match config.resolved_backend() {
            StorageBackend::Database => {
                let database_url = config.storage.database_url.as_deref().unwrap_or_default();
                let backend_type = backend::infer_backend_from_url(database_url)?;
                Arc::new(
                    SeaOrmStorage::new(database_url, &backend_type, &config.storage)
                        .await?
                        .with_queue_capacity(capacity),
                )
            }
            StorageBackend::File => {
                let path = config.storage.file_path.as_deref().unwrap_or_default();
                if path.is_empty() {
                    return Err(ShortenerError::validation(
                        "storage.file_path must be set for the file backend",
                    ));
                }
                Arc::new(FileStorage::new(path).await?)
            }
            StorageBackend::Memory | StorageBackend::Auto => {
                Arc::new(MemoryStorage::new().with_queue_capacity(capacity))
            }
        };

        info!("Storage backend selected: {}", storage.backend_name());
        Ok(storage)
    }
}

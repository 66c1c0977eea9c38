//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod converters;
pub mod deadline;
mod deleter;
mod mutations;
mod query;

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::{Result, ShortenerError};
use crate::storage::deletion::{DEFAULT_QUEUE_CAPACITY, DeleteBatch};
use crate::storage::models::{OwnerId, UrlRecord};
use crate::storage::Storage;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_record, record_to_active_model};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(ShortenerError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite:, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: &'static str,
    /// 每个查询的截止时间
    query_timeout: Duration,
    queue_capacity: usize,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_type: &str, config: &StorageConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(ShortenerError::database_config(
                "storage.database_url 未设置".to_string(),
            ));
        }

        let db = if backend_type == "sqlite" {
            connect_sqlite(database_url, config.pool_size).await?
        } else {
            connect_generic(database_url, backend_type, config.pool_size).await?
        };

        let storage = Self::from_connection(db, Duration::from_millis(config.query_timeout_ms.max(1)));

        run_migrations(&storage.db).await?;

        info!("{} Storage initialized.", storage.backend_name.to_uppercase());
        Ok(storage)
    }

    /// Wrap an existing connection. Migrations are not run.
    pub fn from_connection(db: DatabaseConnection, query_timeout: Duration) -> Self {
        let backend_name = match db.get_database_backend() {
            sea_orm::DatabaseBackend::MySql => "mysql",
            sea_orm::DatabaseBackend::Postgres => "postgres",
            _ => "sqlite",
        };
        Self {
            db,
            backend_name,
            query_timeout,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl Storage for SeaOrmStorage {
    async fn insert(&self, owner: Option<OwnerId>, record: &UrlRecord) -> Result<()> {
        self.insert_or_conflict(owner, record).await
    }

    async fn insert_batch(&self, owner: Option<OwnerId>, records: &[UrlRecord]) -> Result<()> {
        self.insert_all_or_nothing(owner, records).await
    }

    async fn get(&self, key: &str) -> Result<String> {
        self.find_original_url(key).await
    }

    async fn get_owner_urls(&self, owner: OwnerId) -> Result<Vec<UrlRecord>> {
        self.find_owner_records(owner).await
    }

    fn delete_batch_for_owner(&self, owner: OwnerId) -> Result<DeleteBatch> {
        let deleter = deleter::SqlDeleter::new(self.db.clone(), self.query_timeout);
        Ok(DeleteBatch::spawn(owner, self.queue_capacity, deleter))
    }

    async fn create_owner(&self) -> Result<OwnerId> {
        self.insert_owner().await
    }

    async fn ping(&self) -> Result<()> {
        self.ping_db().await
    }

    async fn count_urls(&self) -> Result<u64> {
        self.count_url_rows().await
    }

    async fn count_owners(&self) -> Result<u64> {
        self.count_owner_rows().await
    }

    fn backend_name(&self) -> &'static str {
        self.backend_name
    }
}

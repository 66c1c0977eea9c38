//! Transactional soft deleter for the relational backend

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tracing::warn;

use super::deadline::{db_error, with_deadline};
use crate::errors::Result;
use crate::storage::deletion::SoftDeleter;
use crate::storage::models::OwnerId;

use migration::entities::short_url;

/// 一个删除批次共享一个事务，队列关闭后处理首个 key 时才开启
pub(super) struct SqlDeleter {
    db: DatabaseConnection,
    txn: Option<DatabaseTransaction>,
    query_timeout: Duration,
}

impl SqlDeleter {
    pub(super) fn new(db: DatabaseConnection, query_timeout: Duration) -> Self {
        Self {
            db,
            txn: None,
            query_timeout,
        }
    }
}

#[async_trait]
impl SoftDeleter for SqlDeleter {
    async fn soft_delete(&mut self, owner: OwnerId, key: &str) -> Result<bool> {
        let txn = match self.txn.take() {
            Some(txn) => txn,
            None => {
                let db = &self.db;
                with_deadline("begin_delete", self.query_timeout, async {
                    db.begin().await.map_err(db_error)
                })
                .await?
            }
        };

        // 单条条件 UPDATE，owner 与 key 同时匹配才生效
        let result = with_deadline("soft_delete", self.query_timeout, async {
            short_url::Entity::update_many()
                .col_expr(short_url::Column::Deleted, Expr::value(true))
                .filter(short_url::Column::OwnerId.eq(owner))
                .filter(short_url::Column::ShortKey.eq(key))
                .exec(&txn)
                .await
                .map_err(db_error)
        })
        .await;

        self.txn = Some(txn);
        Ok(result?.rows_affected > 0)
    }

    fn aborts_on_failure(&self) -> bool {
        true
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(txn) = self.txn.take() {
            with_deadline("commit_delete", self.query_timeout, async {
                txn.commit().await.map_err(db_error)
            })
            .await?;
        }
        Ok(())
    }

    async fn abort(&mut self) {
        if let Some(txn) = self.txn.take()
            && let Err(e) = txn.rollback().await
        {
            warn!("Rollback of deletion batch failed: {}", e);
        }
    }
}

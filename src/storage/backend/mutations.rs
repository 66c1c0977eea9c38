//! Mutation operations for SeaOrmStorage
//!
//! This module contains all write database operations.

use std::collections::HashSet;

use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, TransactionTrait, sea_query::OnConflict};
use tracing::{debug, trace, warn};

use super::SeaOrmStorage;
use super::converters::record_to_active_model;
use super::deadline::{db_error, is_unique_violation, with_deadline};
use crate::errors::{Result, ShortenerError};
use crate::storage::models::{OwnerId, UrlRecord};

use migration::entities::{owner, short_url};

impl SeaOrmStorage {
    /// insert-or-ignore on `original_url`; when nothing was inserted, report the stored key.
    pub(super) async fn insert_or_conflict(
        &self,
        owner: Option<OwnerId>,
        record: &UrlRecord,
    ) -> Result<()> {
        let db = &self.db;
        let active_model = record_to_active_model(record, owner);

        let inserted = with_deadline("insert", self.query_timeout, async {
            let result = short_url::Entity::insert(active_model)
                .on_conflict(
                    OnConflict::column(short_url::Column::OriginalUrl)
                        .do_nothing()
                        .to_owned(),
                )
                .exec(db)
                .await;

            match result {
                Ok(_) => Ok(true),
                Err(DbErr::RecordNotInserted) => Ok(false),
                // 某些数据库后端在 do_nothing 时返回的是普通错误
                Err(e) if e.to_string().to_lowercase().contains("no rows") => Ok(false),
                Err(e) => Err(db_error(e)),
            }
        })
        .await?;

        if inserted {
            trace!("Inserted {}", record.short_key);
            return Ok(());
        }

        self.conflict_for(record).await
    }

    /// 唯一约束冲突后查出已存在的 key；查不到说明撞上的是 short_key
    async fn conflict_for(&self, record: &UrlRecord) -> Result<()> {
        match self.find_key_by_url(&record.original_url).await? {
            Some(existing) => Err(ShortenerError::conflict(existing)),
            None => Err(ShortenerError::validation(format!(
                "key {} already maps to a different URL",
                record.short_key
            ))),
        }
    }

    /// 批量写入（单个事务，任一失败整体回滚）
    pub(super) async fn insert_all_or_nothing(
        &self,
        owner: Option<OwnerId>,
        records: &[UrlRecord],
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // 批内重复的 URL 只写第一条
        let mut seen: HashSet<&str> = HashSet::new();
        let unique: Vec<&UrlRecord> = records
            .iter()
            .filter(|r| seen.insert(r.original_url.as_str()))
            .collect();

        let db = &self.db;
        let failed = with_deadline("insert_batch", self.query_timeout, async {
            let txn = db.begin().await.map_err(db_error)?;

            for record in unique.iter().copied() {
                let result = short_url::Entity::insert(record_to_active_model(record, owner))
                    .exec(&txn)
                    .await;

                if let Err(e) = result {
                    txn.rollback().await.map_err(db_error)?;
                    return Ok(Some((record, e)));
                }
            }

            txn.commit().await.map_err(db_error)?;
            Ok(None)
        })
        .await?;

        let Some((record, err)) = failed else {
            debug!(
                "Batch inserted {} records ({} repeated in batch)",
                unique.len(),
                records.len() - unique.len()
            );
            return Ok(());
        };

        warn!(
            "Batch of {} records rolled back at {}: {}",
            records.len(),
            record.short_key,
            err
        );
        if is_unique_violation(&err) {
            return self.conflict_for(record).await;
        }
        Err(db_error(err))
    }

    pub(super) async fn insert_owner(&self) -> Result<OwnerId> {
        let db = &self.db;
        let inserted = with_deadline("create_owner", self.query_timeout, async {
            <owner::ActiveModel as Default>::default()
                .insert(db)
                .await
                .map_err(db_error)
        })
        .await?;

        debug!("Created owner {}", inserted.id);
        Ok(OwnerId::from(inserted.id))
    }
}

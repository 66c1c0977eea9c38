//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use super::SeaOrmStorage;
use super::converters::model_to_record;
use super::deadline::{db_error, with_deadline};
use crate::errors::{Result, ShortenerError};
use crate::storage::models::{OwnerId, UrlRecord};

use migration::entities::{owner, short_url};

impl SeaOrmStorage {
    pub(super) async fn find_original_url(&self, key: &str) -> Result<String> {
        let db = &self.db;
        let model = with_deadline("get", self.query_timeout, async {
            short_url::Entity::find()
                .filter(short_url::Column::ShortKey.eq(key))
                .order_by_asc(short_url::Column::Id)
                .one(db)
                .await
                .map_err(db_error)
        })
        .await?;

        match model {
            Some(model) if model.deleted => Err(ShortenerError::gone(key)),
            Some(model) => Ok(model.original_url),
            None => Err(ShortenerError::not_found(key)),
        }
    }

    /// 按原始 URL 查找已存储的 key
    pub(super) async fn find_key_by_url(&self, original_url: &str) -> Result<Option<String>> {
        let db = &self.db;
        with_deadline("find_key_by_url", self.query_timeout, async {
            short_url::Entity::find()
                .select_only()
                .column(short_url::Column::ShortKey)
                .filter(short_url::Column::OriginalUrl.eq(original_url))
                .into_tuple::<String>()
                .one(db)
                .await
                .map_err(db_error)
        })
        .await
    }

    pub(super) async fn find_owner_records(&self, owner: OwnerId) -> Result<Vec<UrlRecord>> {
        if owner <= 0 {
            return Ok(Vec::new());
        }
        let db = &self.db;
        let models = with_deadline("get_owner_urls", self.query_timeout, async {
            short_url::Entity::find()
                .filter(short_url::Column::OwnerId.eq(owner))
                .order_by_asc(short_url::Column::Id)
                .all(db)
                .await
                .map_err(db_error)
        })
        .await?;

        Ok(models.into_iter().map(model_to_record).collect())
    }

    pub(super) async fn ping_db(&self) -> Result<()> {
        let db = &self.db;
        with_deadline("ping", self.query_timeout, async {
            db.ping().await.map_err(db_error)
        })
        .await
    }

    pub(super) async fn count_url_rows(&self) -> Result<u64> {
        let db = &self.db;
        with_deadline("count_urls", self.query_timeout, async {
            short_url::Entity::find().count(db).await.map_err(db_error)
        })
        .await
    }

    pub(super) async fn count_owner_rows(&self) -> Result<u64> {
        let db = &self.db;
        with_deadline("count_owners", self.query_timeout, async {
            owner::Entity::find().count(db).await.map_err(db_error)
        })
        .await
    }
}

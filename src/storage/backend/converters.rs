use crate::storage::UrlRecord;
use crate::storage::models::{OwnerId, normalize_owner};
use migration::entities::short_url;

/// 将 Sea-ORM Model 转换为 UrlRecord
pub fn model_to_record(model: short_url::Model) -> UrlRecord {
    UrlRecord {
        short_key: model.short_key,
        original_url: model.original_url,
        owner_id: normalize_owner(model.owner_id),
        deleted: model.deleted,
    }
}

/// 将 UrlRecord 转换为插入用的 ActiveModel（id 由数据库分配，deleted 总是 false）
pub fn record_to_active_model(
    record: &UrlRecord,
    owner: Option<OwnerId>,
) -> short_url::ActiveModel {
    use sea_orm::ActiveValue::*;

    short_url::ActiveModel {
        id: NotSet,
        original_url: Set(record.original_url.clone()),
        short_key: Set(record.short_key.clone()),
        owner_id: Set(normalize_owner(owner.or(record.owner_id))),
        deleted: Set(false),
    }
}

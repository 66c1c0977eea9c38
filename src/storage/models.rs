use serde::{Deserialize, Serialize};

use crate::utils::derive_key;

/// Owner 标识，0 / None 表示匿名
pub type OwnerId = i64;

/// 短链接记录
///
/// `short_key` 由 `original_url` 的字节派生，`original_url` 在存储中唯一。
/// 写入后只有 `deleted` 可以从 false 变为 true。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub short_key: String,
    pub original_url: String,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    #[serde(default)]
    pub deleted: bool,
}

impl UrlRecord {
    /// Build a live, unowned record whose key is derived from `original_url`.
    pub fn new(original_url: impl Into<String>) -> Self {
        let original_url = original_url.into();
        Self {
            short_key: derive_key(original_url.as_bytes()),
            original_url,
            owner_id: None,
            deleted: false,
        }
    }

    pub fn with_owner(mut self, owner: Option<OwnerId>) -> Self {
        self.owner_id = owner.filter(|id| *id > 0);
        self
    }
}

/// Normalize an owner argument: non-positive ids mean anonymous.
pub(crate) fn normalize_owner(owner: Option<OwnerId>) -> Option<OwnerId> {
    owner.filter(|id| *id > 0)
}

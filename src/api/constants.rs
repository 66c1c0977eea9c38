//! API 模块常量定义

/// 纯文本响应的 Content-Type
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Batch endpoints reject bodies with more entries than this.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Request body limit for JSON endpoints (bytes)
pub const JSON_BODY_LIMIT: usize = 1024 * 1024;

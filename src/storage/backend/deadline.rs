//! 数据库操作超时控制
//!
//! 每个查询都带一个截止时间，失败不在这里重试，由调用方决定

use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use tracing::warn;

use crate::errors::{Result, ShortenerError};

/// 将 DbErr 归类为连接错误或操作错误
pub fn db_error(err: DbErr) -> ShortenerError {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => {
            ShortenerError::database_connection(err.to_string())
        }
        other => ShortenerError::database_operation(other.to_string()),
    }
}

/// Whether the error is a violation of a unique constraint.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

/// 带截止时间执行一次数据库操作
pub async fn with_deadline<T, Fut>(operation_name: &str, timeout: Duration, operation: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_elapsed) => {
            warn!(
                "Operation '{}' timed out after {}ms",
                operation_name,
                timeout.as_millis()
            );
            Err(ShortenerError::timeout(format!(
                "Operation '{}' timed out after {}ms",
                operation_name,
                timeout.as_millis()
            )))
        }
    }
}

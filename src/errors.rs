use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortenerError {
    /// The URL is already stored; carries the key it was stored under.
    Conflict { key: String },
    NotFound(String),
    /// The key exists but was soft-deleted.
    Gone(String),
    Unsupported(String),
    LimitReached(String),
    Validation(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    Timeout(String),
    Internal(String),
}

impl ShortenerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::Conflict { .. } => "E001",
            ShortenerError::NotFound(_) => "E002",
            ShortenerError::Gone(_) => "E003",
            ShortenerError::Unsupported(_) => "E004",
            ShortenerError::LimitReached(_) => "E005",
            ShortenerError::Validation(_) => "E006",
            ShortenerError::DatabaseConfig(_) => "E007",
            ShortenerError::DatabaseConnection(_) => "E008",
            ShortenerError::DatabaseOperation(_) => "E009",
            ShortenerError::FileOperation(_) => "E010",
            ShortenerError::Serialization(_) => "E011",
            ShortenerError::Timeout(_) => "E012",
            ShortenerError::Internal(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortenerError::Conflict { .. } => "URL Already Exists",
            ShortenerError::NotFound(_) => "Resource Not Found",
            ShortenerError::Gone(_) => "Resource Deleted",
            ShortenerError::Unsupported(_) => "Operation Not Supported",
            ShortenerError::LimitReached(_) => "Limit Reached",
            ShortenerError::Validation(_) => "Validation Error",
            ShortenerError::DatabaseConfig(_) => "Database Configuration Error",
            ShortenerError::DatabaseConnection(_) => "Database Connection Error",
            ShortenerError::DatabaseOperation(_) => "Database Operation Error",
            ShortenerError::FileOperation(_) => "File Operation Error",
            ShortenerError::Serialization(_) => "Serialization Error",
            ShortenerError::Timeout(_) => "Timeout",
            ShortenerError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortenerError::Conflict { key } => key,
            ShortenerError::NotFound(msg) => msg,
            ShortenerError::Gone(msg) => msg,
            ShortenerError::Unsupported(msg) => msg,
            ShortenerError::LimitReached(msg) => msg,
            ShortenerError::Validation(msg) => msg,
            ShortenerError::DatabaseConfig(msg) => msg,
            ShortenerError::DatabaseConnection(msg) => msg,
            ShortenerError::DatabaseOperation(msg) => msg,
            ShortenerError::FileOperation(msg) => msg,
            ShortenerError::Serialization(msg) => msg,
            ShortenerError::Timeout(msg) => msg,
            ShortenerError::Internal(msg) => msg,
        }
    }

    /// Key of the already stored record, if this is a conflict.
    pub fn conflict_key(&self) -> Option<&str> {
        match self {
            ShortenerError::Conflict { key } => Some(key),
            _ => None,
        }
    }

    /// I/O, network and lock failures. These are never retried internally.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ShortenerError::DatabaseConnection(_)
                | ShortenerError::DatabaseOperation(_)
                | ShortenerError::FileOperation(_)
                | ShortenerError::Serialization(_)
                | ShortenerError::Timeout(_)
        )
    }

    /// 格式化为彩色输出（用于启动失败时的终端输出）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn conflict<T: Into<String>>(key: T) -> Self {
        ShortenerError::Conflict { key: key.into() }
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortenerError::NotFound(msg.into())
    }

    pub fn gone<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Gone(msg.into())
    }

    pub fn unsupported<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Unsupported(msg.into())
    }

    pub fn limit_reached<T: Into<String>>(msg: T) -> Self {
        ShortenerError::LimitReached(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Validation(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Serialization(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Timeout(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortenerError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortenerError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ShortenerError {
    fn from(err: serde_json::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_carries_key() {
        let err = ShortenerError::conflict("abcdefghijklmnop");
        assert_eq!(err.conflict_key(), Some("abcdefghijklmnop"));
        assert_eq!(err.code(), "E001");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_conflict_key_absent_for_other_variants() {
        assert_eq!(ShortenerError::not_found("x").conflict_key(), None);
        assert_eq!(ShortenerError::gone("x").conflict_key(), None);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ShortenerError::file_operation("disk full").is_transient());
        assert!(ShortenerError::database_operation("broken pipe").is_transient());
        assert!(ShortenerError::timeout("query").is_transient());
        assert!(!ShortenerError::unsupported("count_owners").is_transient());
        assert!(!ShortenerError::limit_reached("busy").is_transient());
        assert!(!ShortenerError::gone("k").is_transient());
    }

    #[test]
    fn test_format_simple() {
        let err = ShortenerError::unsupported("deletion is not supported by the file backend");
        assert_eq!(
            err.format_simple(),
            "Operation Not Supported: deletion is not supported by the file backend"
        );
        assert_eq!(err.to_string(), err.format_simple());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ShortenerError = io.into();
        assert!(matches!(err, ShortenerError::FileOperation(_)));
    }

    #[test]
    fn test_from_serde_error() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: ShortenerError = parse.into();
        assert!(matches!(err, ShortenerError::Serialization(_)));
    }
}

use serde::{Deserialize, Serialize};

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Database if a URL is configured, else file if a path is configured, else memory
    #[default]
    Auto,
    Memory,
    File,
    Database,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
            Self::Database => write!(f, "database"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "database" | "db" => Ok(Self::Database),
            _ => Err(format!(
                "Invalid storage backend: '{}'. Valid: auto, memory, file, database",
                s
            )),
        }
    }
}

/// 静态配置（从 TOML 和环境变量加载，启动时使用）
///
/// - server: 监听地址、短链接前缀
/// - storage: 存储后端选择与连接参数
/// - deletion: 异步删除队列
/// - limiter: 全局准入限流
/// - session: owner 会话 cookie
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub deletion: DeletionConfig,
    #[serde(default)]
    pub limiter: LimiterConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config file > 默认值
    /// ENV 前缀：SHORTENER，分隔符：__
    /// 示例：SHORTENER__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SHORTENER")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Backend actually used once `auto` has been resolved.
    pub fn resolved_backend(&self) -> StorageBackend {
        match self.storage.backend {
            StorageBackend::Auto => {
                if self.storage.database_url.as_deref().is_some_and(|u| !u.is_empty()) {
                    StorageBackend::Database
                } else if self.storage.file_path.as_deref().is_some_and(|p| !p.is_empty()) {
                    StorageBackend::File
                } else {
                    StorageBackend::Memory
                }
            }
            explicit => explicit,
        }
    }
}

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Prefix of every returned short URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    /// Deadline applied to every relational query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

/// 异步删除配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// 全局准入限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    #[serde(default = "default_limiter_enabled")]
    pub enabled: bool,
    #[serde(default = "default_limiter_capacity")]
    pub capacity: usize,
    #[serde(default = "default_limiter_window_secs")]
    pub window_secs: u64,
}

/// Owner 会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 为空时启动时随机生成（重启后旧 cookie 失效）
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_hours")]
    pub token_hours: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "localhost".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_queue_capacity() -> usize {
    128
}

fn default_limiter_enabled() -> bool {
    true
}

fn default_limiter_capacity() -> usize {
    1000
}

fn default_limiter_window_secs() -> u64 {
    1
}

fn default_token_hours() -> u64 {
    5
}

fn default_cookie_name() -> String {
    "JWT".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            base_url: default_base_url(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            file_path: None,
            database_url: None,
            pool_size: default_database_pool_size(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: default_limiter_enabled(),
            capacity: default_limiter_capacity(),
            window_secs: default_limiter_window_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_hours: default_token_hours(),
            cookie_name: default_cookie_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

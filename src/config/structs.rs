use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{Result, ShorturlError};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Prefix for environment overrides, e.g. `SU__STORAGE__BACKEND=relational`.
pub const ENV_PREFIX: &str = "SU";

/// 存储后端类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageKind {
    /// Process-local key-value store, made durable by snapshots.
    #[default]
    Memory,
    /// SQLite or PostgreSQL through sea-orm.
    Relational,
}

/// 应用配置（从 TOML 和环境变量加载）
///
/// - storage: 后端选择、数据库连接、批处理与快照参数
/// - engine: 短标识长度、默认操作超时
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// 显式传入的路径必须存在；未传入时 `config.toml` 可选
    pub fn load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let (path, required) = match path {
            Some(p) => (p, true),
            None => (DEFAULT_CONFIG_PATH, false),
        };

        let settings = Config::builder()
            .add_source(File::with_name(path).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        super::validators::validate_app_config(self).map_err(ShorturlError::config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("# Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ShorturlError::config(format!("serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Snapshot file used by the memory backend.
    #[serde(default = "default_file_storage_path")]
    pub file_storage_path: String,
    /// Rows per relational round trip in batch create/delete.
    #[serde(default = "default_batch_chunk_size")]
    pub batch_chunk_size: usize,
    /// Snapshot lines per `batch_create` during restore.
    #[serde(default = "default_restore_batch_size")]
    pub restore_batch_size: usize,
    /// Concurrent chunk workers for relational batches.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_short_id_length")]
    pub short_id_length: usize,
    /// Deadline applied to each operator command.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
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
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
}

// ============================================================
// Default value functions
// ============================================================

fn default_database_url() -> String {
    "sqlite://shorturl.db?mode=rwc".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_file_storage_path() -> String {
    "backup.json".to_string()
}

fn default_batch_chunk_size() -> usize {
    100
}

fn default_restore_batch_size() -> usize {
    1000
}

fn default_max_workers() -> usize {
    4
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_short_id_length() -> usize {
    8
}

fn default_operation_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_enable_rotation() -> bool {
    true
}

fn default_max_backups() -> u32 {
    5
}

// ============================================================
// Default implementations
// ============================================================

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::default(),
            database_url: default_database_url(),
            pool_size: default_pool_size(),
            file_storage_path: default_file_storage_path(),
            batch_chunk_size: default_batch_chunk_size(),
            restore_batch_size: default_restore_batch_size(),
            max_workers: default_max_workers(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            short_id_length: default_short_id_length(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: default_enable_rotation(),
            max_backups: default_max_backups(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageKind::Memory);
        assert_eq!(config.storage.batch_chunk_size, 100);
        assert_eq!(config.storage.restore_batch_size, 1000);
        assert_eq!(config.engine.short_id_length, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_kind_parse() {
        assert_eq!(StorageKind::from_str("memory").unwrap(), StorageKind::Memory);
        assert_eq!(
            StorageKind::from_str("Relational").unwrap(),
            StorageKind::Relational
        );
        assert!(StorageKind::from_str("redis").is_err());
        assert_eq!(StorageKind::Relational.to_string(), "relational");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [storage]
            backend = "relational"
            database_url = "postgres://localhost/shorturl"

            [engine]
            short_id_length = 10
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.backend, StorageKind::Relational);
        assert_eq!(config.storage.pool_size, 10);
        assert_eq!(config.engine.short_id_length, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sample_config_roundtrips() {
        let sample = AppConfig::generate_sample_config();
        let parsed: AppConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.storage.file_storage_path, "backup.json");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shorturl.toml");
        std::fs::write(
            &path,
            "[storage]\nfile_storage_path = \"/tmp/snap.json\"\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.storage.file_storage_path, "/tmp/snap.json");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = AppConfig::load(Some("/definitely/not/here.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[engine]\nshort_id_length = 0\n").unwrap();

        let err = AppConfig::load(path.to_str()).unwrap_err();
        assert_eq!(err.code(), "A001");
    }
}

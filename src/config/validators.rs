//! 配置值验证模块

use super::AppConfig;
use crate::utils::MAX_SHORT_ID_LENGTH;

/// 校验加载后的配置，返回第一条不合法项的说明
pub fn validate_app_config(config: &AppConfig) -> Result<(), String> {
    let len = config.engine.short_id_length;
    if len == 0 || len > MAX_SHORT_ID_LENGTH {
        return Err(format!(
            "engine.short_id_length must be within 1..={}, got {}",
            MAX_SHORT_ID_LENGTH, len
        ));
    }

    let storage = &config.storage;
    if storage.batch_chunk_size == 0 {
        return Err("storage.batch_chunk_size must be greater than 0".to_string());
    }
    if storage.restore_batch_size == 0 {
        return Err("storage.restore_batch_size must be greater than 0".to_string());
    }
    if storage.max_workers == 0 {
        return Err("storage.max_workers must be greater than 0".to_string());
    }
    if storage.file_storage_path.trim().is_empty() {
        return Err("storage.file_storage_path cannot be empty".to_string());
    }

    match config.logging.format.as_str() {
        "text" | "json" => Ok(()),
        other => Err(format!(
            "logging.format must be 'text' or 'json', got '{}'",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_app_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_short_id_length_bounds() {
        let mut config = AppConfig::default();
        config.engine.short_id_length = 23;
        assert!(validate_app_config(&config).is_err());

        config.engine.short_id_length = 22;
        assert!(validate_app_config(&config).is_ok());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let mut config = AppConfig::default();
        config.storage.max_workers = 0;
        let err = validate_app_config(&config).unwrap_err();
        assert!(err.contains("max_workers"));
    }

    #[test]
    fn test_unknown_log_format() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(validate_app_config(&config).is_err());
    }
}

//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VISPECT_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VISPECT_SERVICE__BASE_URL=https://inspect.example.ngrok.app`
/// - `VISPECT_SERVICE__REQUEST_TIMEOUT_SECS=60`
/// - `VISPECT_LOG__LEVEL=debug`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("service.base_url", "http://localhost:8000")?
        .set_default("service.probe_timeout_secs", 5)?
        .set_default("service.request_timeout_secs", 120)?
        .set_default("service.tunnel_bypass", true)?
        .set_default("upload.max_image_bytes", 10 * 1024 * 1024)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: VISPECT_
    // 层级分隔符: __ (双下划线)
    builder = builder.add_source(
        Environment::with_prefix("VISPECT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.service.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Service base URL cannot be empty".to_string(),
        ));
    }

    if config.service.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Probe timeout cannot be 0".to_string(),
        ));
    }

    if config.service.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Request timeout cannot be 0".to_string(),
        ));
    }

    if config.upload.max_image_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "Upload limit cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Service URL: {}", config.service.base_url);
    tracing::info!("Probe Timeout: {}s", config.service.probe_timeout_secs);
    tracing::info!("Request Timeout: {}s", config.service.request_timeout_secs);
    tracing::info!("Tunnel Bypass Header: {}", config.service.tunnel_bypass);
    tracing::info!("Upload Limit: {} bytes", config.upload.max_image_bytes);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_base_url() {
        let mut config = AppConfig::default();
        config.service.base_url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_probe_timeout() {
        let mut config = AppConfig::default();
        config.service.probe_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_upload_limit() {
        let mut config = AppConfig::default();
        config.upload.max_image_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[service]\nbase_url = \"https://inspect.example.ngrok.app\"\nrequest_timeout_secs = 45\n"
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.service.base_url, "https://inspect.example.ngrok.app");
        assert_eq!(config.service.request_timeout_secs, 45);
        // 未覆盖的键保持默认值
        assert_eq!(config.service.probe_timeout_secs, 5);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[service]\nbase_url = \"\"\n").unwrap();

        let result = load_config_from_path(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}

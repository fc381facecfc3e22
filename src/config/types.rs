//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 推理服务配置
    #[serde(default)]
    pub service: ServiceConfig,

    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            upload: UploadConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// 推理服务配置
///
/// 服务位置只来自配置，代码里不内置任何部署身份
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// 推理服务基础 URL
    #[serde(default = "default_service_url")]
    pub base_url: String,

    /// 探活超时（秒）
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// 提交超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// 是否附带隧道放行头（ngrok 等代理需要）
    #[serde(default = "default_tunnel_bypass")]
    pub tunnel_bypass: bool,
}

fn default_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    120
}

fn default_tunnel_bypass() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            probe_timeout_secs: default_probe_timeout(),
            request_timeout_secs: default_request_timeout(),
            tunnel_bypass: default_tunnel_bypass(),
        }
    }
}

/// 上传配置
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// 上传图像最大字节数
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024 // 10 MB
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

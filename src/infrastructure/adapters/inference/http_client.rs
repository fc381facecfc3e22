//! HTTP Inference Client - 调用外部视觉推理 HTTP 服务
//!
//! 实现 InferenceEnginePort trait，通过 HTTP 调用外部推理服务
//!
//! 外部推理 API:
//! HEAD {base}/        — 可达性探活
//! POST {base}/{route} — multipart，单个二进制图像字段
//! Response: {"status": "...", "analysis": "...", "image": "data:...;base64,..."}  (JSON)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};

use crate::application::ports::{
    AnalysisRequest, AnalysisResponse, InferenceEnginePort, InferenceError,
};
use crate::domain::category::RemoteRoute;

/// 隧道代理的放行标记头（跳过 ngrok 等隧道的浏览器警告页）
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// multipart 图像字段名
const IMAGE_FIELD: &str = "image";

/// HTTP 推理客户端配置
#[derive(Debug, Clone)]
pub struct HttpInferenceClientConfig {
    /// 推理服务基础 URL
    pub base_url: String,
    /// 探活超时（秒）
    pub probe_timeout_secs: u64,
    /// 提交超时（秒）
    pub request_timeout_secs: u64,
    /// 是否附带隧道放行头
    pub tunnel_bypass: bool,
}

impl Default for HttpInferenceClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            probe_timeout_secs: 5,
            request_timeout_secs: 120,
            tunnel_bypass: true,
        }
    }
}

impl HttpInferenceClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_probe_timeout(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn without_tunnel_bypass(mut self) -> Self {
        self.tunnel_bypass = false;
        self
    }
}

/// HTTP 推理客户端
///
/// 两个网络操作严格串行：探活失败即短路，不再提交图像负载
pub struct HttpInferenceClient {
    client: Client,
    config: HttpInferenceClientConfig,
}

impl HttpInferenceClient {
    /// 创建新的 HTTP 推理客户端
    pub fn new(config: HttpInferenceClientConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::Unreachable(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 使用默认配置创建客户端
    pub fn with_default_config() -> Result<Self, InferenceError> {
        Self::new(HttpInferenceClientConfig::default())
    }

    /// 探活 URL（服务根路径）
    fn probe_url(&self) -> String {
        format!("{}/", self.config.base_url.trim_end_matches('/'))
    }

    /// 提交 URL
    fn submit_url(&self, route: &RemoteRoute) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            route.path()
        )
    }

    fn apply_headers(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.tunnel_bypass {
            request.header(TUNNEL_BYPASS_HEADER, "true")
        } else {
            request
        }
    }

    fn classify(err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout
        } else if err.is_connect() {
            InferenceError::Unreachable(format!("Cannot connect to inference service: {}", err))
        } else {
            InferenceError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl InferenceEnginePort for HttpInferenceClient {
    async fn probe(&self) -> Result<(), InferenceError> {
        let url = self.probe_url();
        tracing::debug!(url = %url, "Probing inference service");

        // 探活失败统一归为不可达，保留底层传输错误作为上下文
        let response = self
            .apply_headers(self.client.head(&url))
            .timeout(Duration::from_secs(self.config.probe_timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Unreachable(format!("probe timed out: {}", e))
                } else {
                    InferenceError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Unreachable(format!(
                "probe returned HTTP {}",
                status
            )));
        }
        Ok(())
    }

    async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisResponse, InferenceError> {
        let url = self.submit_url(&request.route);
        tracing::debug!(
            url = %url,
            media_type = request.image.media_type(),
            image_bytes = request.image.len(),
            "Submitting image for analysis"
        );

        let part = Part::bytes(request.image.bytes().to_vec())
            .file_name("upload")
            .mime_str(request.image.media_type())
            .map_err(|e| InferenceError::InvalidRequest(format!("invalid media type: {}", e)))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let response = self
            .apply_headers(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            InferenceError::InvalidResponse(format!("Failed to read response body: {}", e))
        })?;
        let analysis: AnalysisResponse = serde_json::from_str(&body).map_err(|e| {
            InferenceError::InvalidResponse(format!("Failed to parse analysis response: {}", e))
        })?;

        tracing::info!(
            status_token = %analysis.status,
            has_image = analysis.image.is_some(),
            "Analysis response received"
        );
        Ok(analysis)
    }
}

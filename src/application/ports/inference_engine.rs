//! Inference Engine Port - 远端视觉推理引擎抽象
//!
//! 定义推理调用的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::category::RemoteRoute;
use crate::domain::image::ImageData;

/// 推理错误
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Cannot reach inference service: {0}")]
    Unreachable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service rejected request: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

/// 推理请求 - 目标路由 + 待分析图像
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub route: RemoteRoute,
    pub image: ImageData,
}

/// 推理响应（wire 原样，未归一化）
///
/// status 为服务端原话术，成功哨兵之外的取值都视为未通过；
/// 归一化在编排器的 Decoding 阶段完成
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisResponse {
    /// 状态话术
    pub status: String,

    /// 自由文本分析
    #[serde(default)]
    pub analysis: String,

    /// 标注后的结果图像（data URL 文本形式）
    #[serde(default)]
    pub image: Option<String>,

    /// 置信度（0-100，可缺省）
    #[serde(default)]
    pub confidence: Option<u8>,
}

/// Inference Engine Port
///
/// 外部视觉推理服务的抽象接口
#[async_trait]
pub trait InferenceEnginePort: Send + Sync {
    /// 可达性探活
    ///
    /// 在提交图像负载之前确认服务可达；
    /// 失败时调用方不得发起提交
    async fn probe(&self) -> Result<(), InferenceError>;

    /// 提交图像到指定路由并返回结构化响应
    async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisResponse, InferenceError>;
}

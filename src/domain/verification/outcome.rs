//! Verification Context - 验证结果

use serde::Serialize;

use crate::domain::image::ImageData;

use super::value_objects::{AttemptId, Confidence, Verdict};

/// 在途尝试所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    /// 可达性探活
    Probing,
    /// 图像提交
    Submitting,
    /// 响应归一化与内嵌图像解码
    Decoding,
}

impl AttemptPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptPhase::Probing => "probing",
            AttemptPhase::Submitting => "submitting",
            AttemptPhase::Decoding => "decoding",
        }
    }
}

/// 失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FailureKind {
    /// 探活失败或超时，服务不可达
    Unreachable,
    /// 提交超出等待上限
    Timeout,
    /// 服务可达但返回非成功状态码
    RequestFailed { status: u16 },
    /// 响应体或内嵌图像无法解析
    MalformedResponse,
    /// 本地图像转码失败，未发起任何网络调用
    Decode,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::Timeout => "timeout",
            FailureKind::RequestFailed { .. } => "request_failed",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::Decode => "decode",
        }
    }
}

/// 验证失败 - 分类 + 可读信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl VerificationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 验证成功报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    pub confidence: Confidence,
    pub analysis: String,
    /// 服务端标注后的结果图像
    pub result_image: Option<ImageData>,
}

/// 验证结果 - 暴露给展示层的标签联合
///
/// 不变量:
/// - 任一时刻只有一个活动变体
/// - Settled 后不可变；新的尝试发布新对象而不是修改旧值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// 尚未发起请求
    Idle,
    /// 请求在途
    Pending {
        attempt_id: AttemptId,
        phase: AttemptPhase,
    },
    /// 本次尝试已定论
    Settled {
        attempt_id: AttemptId,
        result: Result<VerificationReport, VerificationFailure>,
    },
}

impl VerificationOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, VerificationOutcome::Pending { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, VerificationOutcome::Settled { .. })
    }

    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            VerificationOutcome::Settled { result: Ok(r), .. } => Some(r),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&VerificationFailure> {
        match self {
            VerificationOutcome::Settled { result: Err(f), .. } => Some(f),
            _ => None,
        }
    }
}

//! Verification Context - Value Objects

use serde::Serialize;
use uuid::Uuid;

use crate::domain::category::CategoryId;
use crate::domain::image::{data_url, DataUrlError, ImageData};

/// 验证尝试唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 置信度 (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Confidence(u8);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);
    pub const FULL: Confidence = Confidence(100);

    pub fn new(value: u8) -> Result<Self, &'static str> {
        if value > 100 {
            return Err("置信度必须在 0 到 100 之间");
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// 验证结论
///
/// 服务端话术归一化后的二元结论；原话术不出应用层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Passed => "passed",
            Verdict::Failed => "failed",
        }
    }

    /// 响应未携带置信度时按结论取默认值
    pub fn default_confidence(&self) -> Confidence {
        match self {
            Verdict::Passed => Confidence::FULL,
            Verdict::Failed => Confidence::ZERO,
        }
    }
}

/// 验证请求 - 类别 + 待检图像
///
/// 不变量:
/// - 构造后不可变
/// - 重试复用同一请求，字节不变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    category_id: CategoryId,
    image: ImageData,
}

impl VerificationRequest {
    pub fn new(category_id: CategoryId, image: ImageData) -> Self {
        Self { category_id, image }
    }

    /// 从 data URL 构造（展示层入站形状）
    ///
    /// 本地转码失败在任何网络调用之前返回
    pub fn from_data_url(category_id: CategoryId, input: &str) -> Result<Self, DataUrlError> {
        Ok(Self::new(category_id, data_url::decode(input)?))
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    /// 本地预览用 data URL
    pub fn preview_data_url(&self) -> String {
        data_url::encode(&self.image)
    }
}

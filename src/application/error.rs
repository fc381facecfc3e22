//! 应用层错误定义

use thiserror::Error;

use crate::domain::image::DataUrlError;

/// 编排器控制面错误
///
/// 区别于 Settled(Failure)：这里是调用方用法错误或本地拒绝，
/// 不是一次已发起尝试的终态
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// 已有尝试在途，需先取消
    #[error("A verification attempt is already in flight")]
    AttemptInFlight,

    /// 当前状态不允许该操作
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// 本地图像编码无效
    #[error("Invalid image encoding: {0}")]
    InvalidImage(#[from] DataUrlError),

    /// 图像超出上传上限
    #[error("Image size {size} exceeds upload limit {limit} bytes")]
    ImageTooLarge { size: usize, limit: usize },
}

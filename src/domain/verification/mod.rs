//! Verification Context - 验证限界上下文
//!
//! 职责:
//! - 验证请求（类别 + 图像，构造后不可变）
//! - 验证结果联合（Idle / Pending / Settled）
//! - 失败分类

mod outcome;
mod value_objects;

pub use outcome::{
    AttemptPhase, FailureKind, VerificationFailure, VerificationOutcome, VerificationReport,
};
pub use value_objects::{AttemptId, Confidence, Verdict, VerificationRequest};

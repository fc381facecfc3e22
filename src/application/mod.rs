//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（InferenceEngine）
//! - orchestrator: 验证编排器（状态机、取消、重试、观察者）
//! - error: 应用层错误定义

pub mod error;
pub mod orchestrator;
pub mod ports;

pub use error::OrchestratorError;
pub use orchestrator::{OrchestratorConfig, VerificationOrchestrator};
pub use ports::{AnalysisRequest, AnalysisResponse, InferenceEnginePort, InferenceError};

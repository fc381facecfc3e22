//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod inference_engine;

pub use inference_engine::{
    AnalysisRequest, AnalysisResponse, InferenceEnginePort, InferenceError,
};

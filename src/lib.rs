//! Vispect - AI 视觉检测验证系统
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Category Context: 检测类别目录与路由解析
//! - Image Context: 图像值对象与 data URL 编解码
//! - Verification Context: 验证请求、结果与失败分类
//!
//! 应用层 (application/):
//! - Ports: 推理引擎端口定义
//! - Orchestrator: 验证编排器（状态机、取消、重试、观察者）
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP 推理客户端 + Fake 推理客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};

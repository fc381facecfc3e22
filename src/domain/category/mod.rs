//! Category Context - 检测类别限界上下文
//!
//! 职责:
//! - 类别目录（稳定 ID + 展示文案）
//! - 类别到远端路由的解析

mod catalog;
mod value_objects;

pub use catalog::{catalog, Category};
pub use value_objects::{CategoryId, RemoteRoute};

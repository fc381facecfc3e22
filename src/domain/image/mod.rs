//! Image Context - 图像限界上下文
//!
//! 职责:
//! - 图像值对象（媒体类型 + 原始字节）
//! - data URL 编解码（文本自描述形式 <-> 原始字节）

pub mod data_url;
mod value_objects;

pub use data_url::DataUrlError;
pub use value_objects::{media_type_for_extension, ImageData, DEFAULT_MEDIA_TYPE};

//! Image Context - Value Objects

use serde::{Serialize, Serializer};

/// 无法识别媒体类型时的回退值
///
/// 原始上传管线把所有图像按 JPEG 处理；这里仅在类型未知时回退，
/// 已知类型全程保留
pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// 图像数据 - 媒体类型 + 原始字节
///
/// 不变量:
/// - media_type 非空
/// - bytes 构造后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    media_type: String,
    bytes: Vec<u8>,
}

impl ImageData {
    /// 创建图像数据；空媒体类型回退为 [`DEFAULT_MEDIA_TYPE`]
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let media_type = media_type.into();
        let media_type = if media_type.is_empty() {
            DEFAULT_MEDIA_TYPE.to_string()
        } else {
            media_type
        };
        Self { media_type, bytes }
    }

    /// 使用回退媒体类型构造
    pub fn with_default_type(bytes: Vec<u8>) -> Self {
        Self::new(DEFAULT_MEDIA_TYPE, bytes)
    }

    /// 从文件扩展名推断媒体类型
    pub fn from_extension(ext: &str, bytes: Vec<u8>) -> Self {
        Self::new(
            media_type_for_extension(ext).unwrap_or(DEFAULT_MEDIA_TYPE),
            bytes,
        )
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 常见图像扩展名到 MIME 类型的映射
pub fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

// 以 data URL 文本形式序列化，供展示层直接内联使用
impl Serialize for ImageData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::data_url::encode(self))
    }
}

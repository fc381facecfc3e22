//! Data URL 编解码
//!
//! 图像的文本自描述形式与原始字节之间的精确互转，
//! 两个方向互为逆运算。只校验编码本身，不校验图像语义。

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use super::value_objects::ImageData;

/// data URL scheme 前缀
const SCHEME: &str = "data:";

/// base64 负载标记
const BASE64_MARKER: &str = ";base64,";

/// 编解码错误
///
/// 格式不合法时报错，绝不产生截断或补零的字节
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    #[error("Missing data URL scheme")]
    MissingScheme,

    #[error("Missing base64 marker")]
    MissingBase64Marker,

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// 编码为 data URL
///
/// 形如 `data:<media_type>;base64,<payload>`，可直接用于内联展示
/// 与本地预览
pub fn encode(image: &ImageData) -> String {
    format!(
        "{}{}{}{}",
        SCHEME,
        image.media_type(),
        BASE64_MARKER,
        STANDARD.encode(image.bytes())
    )
}

/// 从 data URL 解码为图像数据
///
/// 与 [`encode`] 精确互逆；空媒体类型按 [`ImageData::new`] 的规则回退
pub fn decode(input: &str) -> Result<ImageData, DataUrlError> {
    let rest = input
        .strip_prefix(SCHEME)
        .ok_or(DataUrlError::MissingScheme)?;

    let (media_type, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or(DataUrlError::MissingBase64Marker)?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| DataUrlError::InvalidBase64(e.to_string()))?;

    Ok(ImageData::new(media_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::DEFAULT_MEDIA_TYPE;

    #[test]
    fn test_round_trip() {
        let image = ImageData::new("image/png", vec![0, 1, 2, 250, 251, 255]);
        let decoded = decode(&encode(&image)).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let image = ImageData::new("image/png", Vec::new());
        let decoded = decode(&encode(&image)).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.media_type(), "image/png");
    }

    #[test]
    fn test_round_trip_all_byte_values() {
        let bytes: Vec<u8> = (0..=255).collect();
        let image = ImageData::new("application/octet-stream", bytes.clone());
        let decoded = decode(&encode(&image)).unwrap();
        assert_eq!(decoded.bytes(), bytes.as_slice());
    }

    #[test]
    fn test_decode_known_encoding() {
        // "hello" 的标准 base64
        let decoded = decode("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded.bytes(), b"hello");
        assert_eq!(decoded.media_type(), "image/jpeg");
    }

    #[test]
    fn test_decode_empty_media_type_falls_back() {
        let decoded = decode("data:;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded.media_type(), DEFAULT_MEDIA_TYPE);
    }

    #[test]
    fn test_decode_rejects_missing_scheme() {
        assert_eq!(
            decode("image/png;base64,aGVsbG8="),
            Err(DataUrlError::MissingScheme)
        );
    }

    #[test]
    fn test_decode_rejects_missing_marker() {
        assert_eq!(
            decode("data:image/png,aGVsbG8="),
            Err(DataUrlError::MissingBase64Marker)
        );
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = decode("data:image/png;base64,not-valid-encoding!!");
        assert!(matches!(result, Err(DataUrlError::InvalidBase64(_))));
    }

    #[test]
    fn test_decode_rejects_bad_padding() {
        // 长度不合法的 base64 不得解码为截断字节
        let result = decode("data:image/png;base64,aGVsbG8");
        assert!(matches!(result, Err(DataUrlError::InvalidBase64(_))));
    }
}

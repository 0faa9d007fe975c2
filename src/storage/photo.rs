//! Photo payload decoding
//!
//! The browser client sends each capture as a data URL
//! (`data:image/png;base64,...`). The payload is decoded and re-encoded
//! as JPEG so every stored pose has the same format regardless of what
//! the camera canvas produced.

use crate::types::{AppError, AppResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Extract the raw bytes from a `data:<mime>;base64,<payload>` URL
pub fn decode_data_url(data_url: &str) -> AppResult<Vec<u8>> {
    let (_, payload) = data_url
        .split_once(',')
        .ok_or_else(|| AppError::PhotoData("expected a data URL".to_string()))?;

    BASE64
        .decode(payload.trim())
        .map_err(|e| AppError::PhotoData(format!("invalid base64 payload: {}", e)))
}

/// Decode any supported image format and re-encode it as JPEG.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_jpeg(image_bytes: &[u8]) -> AppResult<Vec<u8>> {
    let img = image::load_from_memory(image_bytes)?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 6, Rgba([10, 200, 30, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_data_url() {
        let url = format!("data:image/png;base64,{}", BASE64.encode(b"hello"));
        assert_eq!(decode_data_url(&url).unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_missing_prefix() {
        let err = decode_data_url("aGVsbG8=").unwrap_err();
        assert!(matches!(err, AppError::PhotoData(_)));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_data_url("data:image/png;base64,%%%").unwrap_err();
        assert!(matches!(err, AppError::PhotoData(_)));
    }

    #[test]
    fn test_encode_jpeg_flattens_alpha() {
        let jpeg = encode_jpeg(&png_bytes()).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_encode_rejects_garbage() {
        let err = encode_jpeg(b"not an image").unwrap_err();
        assert!(matches!(err, AppError::Image(_)));
    }
}

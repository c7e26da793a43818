use image::RgbImage;

use crate::error::{DashScopeError, Result};

/// Decodes any format the `image` crate recognizes and flattens it to 8-bit RGB.
pub fn decode_rgb(url: &str, bytes: &[u8]) -> Result<RgbImage> {
    image::load_from_memory(bytes)
        .map(|decoded| decoded.to_rgb8())
        .map_err(|e| DashScopeError::DecodeError {
            url: url.to_string(),
            cause: e.to_string(),
        })
}

#[cfg(test)]
pub(crate) fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, LumaA, Rgb};

    #[test]
    fn test_decode_png() {
        let source = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let decoded = decode_rgb("https://x/1.png", &encode_png(&source)).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_converts_to_rgb() {
        let gray = GrayAlphaImage::from_pixel(1, 1, LumaA([128, 255]));
        let mut bytes = Vec::new();
        gray.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let decoded = decode_rgb("u", &bytes).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_decode_garbage_names_url() {
        let err = decode_rgb("https://x/broken.png", b"not an image").unwrap_err();
        match err {
            DashScopeError::DecodeError { url, .. } => assert_eq!(url, "https://x/broken.png"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

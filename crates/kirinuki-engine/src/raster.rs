//! Raster image decoding and PNG export.
//!
//! The engine takes its two input layers as encoded bytes (PNG, JPEG,
//! BMP, or WebP -- whatever the host hands over) and exports the
//! preview as RGBA PNG, alpha channel intact.

use image::{ImageEncoder, RgbaImage};

use crate::types::EngineError;

/// Decode encoded image bytes into an RGBA buffer.
///
/// Format is sniffed from the bytes; images without an alpha channel
/// come back fully opaque.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] for an empty byte slice and
/// [`EngineError::ImageDecode`] when the bytes are not a decodable
/// image.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let decoded = image::load_from_memory(bytes)?;
    Ok(decoded.to_rgba8())
}

/// Encode an RGBA buffer as PNG bytes.
///
/// # Errors
///
/// Returns [`EngineError::EmptyExport`] for a zero-area buffer (PNG
/// has no representation for it) and [`EngineError::PngEncode`] if
/// encoding fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, EngineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EngineError::EmptyExport);
    }
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|err| EngineError::PngEncode(err.to_string()))?;
    Ok(png_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(decode_rgba(&[]), Err(EngineError::EmptyInput)));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = decode_rgba(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(EngineError::ImageDecode(_))));
    }

    #[test]
    fn zero_area_buffer_cannot_be_exported() {
        assert!(matches!(
            encode_png(&RgbaImage::new(0, 0)),
            Err(EngineError::EmptyExport)
        ));
        assert!(matches!(
            encode_png(&RgbaImage::new(4, 0)),
            Err(EngineError::EmptyExport)
        ));
    }

    #[test]
    fn png_round_trip_preserves_pixels_and_alpha() {
        let mut source = RgbaImage::from_pixel(6, 4, Rgba([10, 200, 30, 255]));
        source.put_pixel(2, 1, Rgba([0, 0, 0, 0]));
        source.put_pixel(5, 3, Rgba([255, 128, 64, 77]));

        let bytes = encode_png(&source).unwrap();
        let decoded = decode_rgba(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.as_raw(), source.as_raw());
    }
}

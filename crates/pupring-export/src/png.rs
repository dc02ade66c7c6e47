//! PNG serializer for binary masks and cutouts.
//!
//! Masks are written as 8-bit single-channel PNG, which is lossless, so
//! decoding the bytes again yields the identical mask. Background
//! cutouts are written as 8-bit RGBA.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};

use pupring_pipeline::BinaryMask;

use crate::ExportError;

/// Media type prefix of a PNG data URI.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Encode a mask as grayscale PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::Png`] if the encoder fails.
pub fn encode_png(mask: &BinaryMask) -> Result<Vec<u8>, ExportError> {
    let gray = mask.as_gray();
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        gray.as_raw(),
        gray.width(),
        gray.height(),
        ExtendedColorType::L8,
    )?;
    tracing::debug!(
        width = gray.width(),
        height = gray.height(),
        bytes = buf.len(),
        "encoded mask as png"
    );
    Ok(buf)
}

/// Encode an RGBA image (such as a background cutout) as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::Png`] if the encoder fails.
pub fn encode_rgba_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Decode PNG bytes back into a mask.
///
/// # Errors
///
/// Returns [`ExportError::Png`] if the bytes are not a PNG and
/// [`ExportError::NotAMask`] if any pixel is neither 0 nor 255.
pub fn decode_png(bytes: &[u8]) -> Result<BinaryMask, ExportError> {
    let gray = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_luma8();
    BinaryMask::try_from_gray(gray).map_err(ExportError::NotAMask)
}

/// Wrap PNG bytes in a `data:image/png;base64,` URI.
#[must_use]
pub fn to_data_uri(png: &[u8]) -> String {
    format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png))
}

/// [`encode_png`] followed by [`to_data_uri`].
///
/// # Errors
///
/// Propagates [`encode_png`].
pub fn png_data_uri(mask: &BinaryMask) -> Result<String, ExportError> {
    encode_png(mask).map(|png| to_data_uri(&png))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn checker_mask() -> BinaryMask {
        BinaryMask::try_from_gray(GrayImage::from_fn(9, 7, |x, y| {
            Luma([if (x + y) % 2 == 0 { 0 } else { 255 }])
        }))
        .unwrap()
    }

    #[test]
    fn png_round_trip_is_pixel_identical() {
        let mask = checker_mask();
        let png = encode_png(&mask).unwrap();
        assert_eq!(decode_png(&png).unwrap(), mask);
    }

    #[test]
    fn png_has_signature() {
        let png = encode_png(&checker_mask()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn data_uri_has_prefix_and_decodes() {
        let uri = png_data_uri(&checker_mask()).unwrap();
        let payload = uri.strip_prefix(PNG_DATA_URI_PREFIX).unwrap();
        let png = STANDARD.decode(payload).unwrap();
        assert_eq!(decode_png(&png).unwrap(), checker_mask());
    }

    #[test]
    fn decode_rejects_gray_values() {
        let gray = GrayImage::from_pixel(3, 3, Luma([128]));
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(gray.as_raw(), 3, 3, ExtendedColorType::L8)
            .unwrap();
        assert!(matches!(decode_png(&buf), Err(ExportError::NotAMask(_))));
    }

    #[test]
    fn rgba_png_keeps_alpha() {
        let cutout = RgbaImage::from_fn(4, 2, |x, _| {
            image::Rgba([10, 20, 30, if x < 2 { 0 } else { 255 }])
        });
        let png = encode_rgba_png(&cutout).unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded, cutout);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_png(b"not a png"), Err(ExportError::Png(_))));
    }
}

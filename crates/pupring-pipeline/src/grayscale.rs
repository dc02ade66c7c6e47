//! Image decoding, alpha flattening, cropping and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a
//! single-channel grayscale image suitable for every style recipe.
//!
//! Transparent pixels are composited onto white before conversion, so
//! an image whose background was removed upstream comes out with a
//! white (background) surround rather than black.

use image::{GrayImage, RgbaImage};

use crate::types::{CropRect, Dimensions, EngraveError};

/// Decode raw image bytes into RGBA.
///
/// # Errors
///
/// Returns [`EngraveError::EmptyInput`] if `bytes` is empty.
/// Returns [`EngraveError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`EngraveError::ZeroDimensions`] if the decoded image has no
/// pixels.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, EngraveError> {
    if bytes.is_empty() {
        return Err(EngraveError::EmptyInput);
    }

    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(EngraveError::ZeroDimensions {
            width: rgba.width(),
            height: rgba.height(),
        });
    }
    Ok(rgba)
}

/// Composite an RGBA image over a white background, leaving every
/// pixel fully opaque.
#[must_use = "returns the flattened image"]
pub fn flatten_onto_white(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let alpha = u32::from(pixel.0[3]);
        if alpha == 255 {
            continue;
        }
        for c in 0..3 {
            let value = u32::from(pixel.0[c]);
            let blended = (value * alpha + 255 * (255 - alpha) + 127) / 255;
            pixel.0[c] = u8::try_from(blended).unwrap_or(u8::MAX);
        }
        pixel.0[3] = 255;
    }
    out
}

/// Convert to single-channel luminance.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbaImage) -> GrayImage {
    image::DynamicImage::ImageRgba8(image.clone()).to_luma8()
}

/// Crop a grayscale image to `rect`, clamped to the image bounds.
///
/// # Errors
///
/// Returns [`EngraveError::Processing`] if the rectangle lies entirely
/// outside the image.
pub fn crop(image: &GrayImage, rect: CropRect) -> Result<GrayImage, EngraveError> {
    let dims = Dimensions::of(image);
    let clamped = rect.clamp_to(dims).ok_or_else(|| {
        EngraveError::Processing(format!(
            "crop rectangle {}x{}+{}+{} does not intersect {}x{} image",
            rect.width, rect.height, rect.x, rect.y, dims.width, dims.height
        ))
    })?;
    if clamped != rect {
        tracing::warn!(
            requested = ?rect,
            applied = ?clamped,
            "crop rectangle clamped to image bounds"
        );
    }
    Ok(
        image::imageops::crop_imm(image, clamped.x, clamped.y, clamped.width, clamped.height)
            .to_image(),
    )
}

/// Decode raw bytes, flatten alpha, convert to grayscale and apply the
/// optional crop.
///
/// This is the entry step shared by every style.
///
/// # Errors
///
/// Propagates the errors of [`decode_rgba`] and [`crop`].
pub fn decode_and_grayscale(
    bytes: &[u8],
    crop_rect: Option<CropRect>,
) -> Result<GrayImage, EngraveError> {
    let rgba = decode_rgba(bytes)?;
    let gray = to_grayscale(&flatten_onto_white(&rgba));
    tracing::debug!(
        width = gray.width(),
        height = gray.height(),
        "decoded input image"
    );
    match crop_rect {
        Some(rect) => crop(&gray, rect),
        None => Ok(gray),
    }
}

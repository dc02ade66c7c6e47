//! Ink coverage of a mask. Informational only; nothing in the pipeline
//! reads these values back.

use serde::{Deserialize, Serialize};

use crate::types::BinaryMask;

/// Pixel counts and ratios of a [`BinaryMask`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskMetrics {
    /// Background pixels (255).
    pub white_pixels: u64,
    /// Ink pixels (0).
    pub black_pixels: u64,
    /// All pixels.
    pub total_pixels: u64,
    /// `white_pixels / total_pixels`, 0.0 for an empty mask.
    pub white_ratio: f64,
    /// `black_pixels / total_pixels`, 0.0 for an empty mask.
    pub black_ratio: f64,
}

/// Count ink and background pixels.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_metrics(mask: &BinaryMask) -> MaskMetrics {
    let total_pixels = mask.dimensions().pixel_count();
    let white_pixels = mask
        .as_gray()
        .pixels()
        .filter(|p| p.0[0] == BinaryMask::BACKGROUND)
        .count() as u64;
    let black_pixels = total_pixels - white_pixels;
    let ratio = |count: u64| {
        if total_pixels == 0 {
            0.0
        } else {
            count as f64 / total_pixels as f64
        }
    };
    MaskMetrics {
        white_pixels,
        black_pixels,
        total_pixels,
        white_ratio: ratio(white_pixels),
        black_ratio: ratio(black_pixels),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::types::Dimensions;

    #[test]
    fn blank_mask_is_all_white() {
        let m = compute_metrics(&BinaryMask::blank(Dimensions { width: 10, height: 4 }));
        assert_eq!(m.total_pixels, 40);
        assert_eq!(m.white_pixels, 40);
        assert_eq!(m.black_pixels, 0);
        assert!((m.white_ratio - 1.0).abs() < f64::EPSILON);
        assert!(m.black_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn quarter_ink() {
        let img = GrayImage::from_fn(4, 4, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        let m = compute_metrics(&BinaryMask::try_from_gray(img).unwrap());
        assert_eq!(m.black_pixels, 4);
        assert!((m.black_ratio - 0.25).abs() < 1e-12);
        assert!((m.white_ratio + m.black_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_mask_has_zero_ratios() {
        let m = compute_metrics(&BinaryMask::blank(Dimensions { width: 0, height: 0 }));
        assert_eq!(m.total_pixels, 0);
        assert!(m.white_ratio.abs() < f64::EPSILON);
        assert!(m.black_ratio.abs() < f64::EPSILON);
    }
}

//! Adaptive (local) and global thresholding.
//!
//! Adaptive thresholding compares each pixel against a statistic of
//! its own neighborhood instead of one global cutoff, which keeps fur
//! texture readable under uneven lighting. The global variants use a
//! fixed level or the Otsu level of the whole image.

use image::GrayImage;
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use serde::{Deserialize, Serialize};

use crate::blur;
use crate::types::KernelSize;

/// Neighborhood statistic used as the local threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveMethod {
    /// Unweighted mean of the block.
    Mean,
    /// Gaussian-weighted mean of the block.
    Gaussian,
}

/// Adaptive threshold parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParams {
    /// Neighborhood statistic.
    pub method: AdaptiveMethod,
    /// Side length of the square neighborhood.
    pub block: KernelSize,
    /// Constant subtracted from the local statistic.
    pub offset: f32,
    /// When set, pixels above the local threshold become 0 instead of 255.
    pub inverted: bool,
}

impl AdaptiveParams {
    /// Non-inverted parameters.
    #[must_use]
    pub const fn new(method: AdaptiveMethod, block: u32, offset: f32) -> Self {
        Self {
            method,
            block: KernelSize::new(block),
            offset,
            inverted: false,
        }
    }

    /// Same parameters with inverted polarity.
    #[must_use]
    pub const fn inverted(self) -> Self {
        Self {
            inverted: true,
            ..self
        }
    }
}

/// Local mean (or Gaussian-weighted mean) of every pixel's block.
#[must_use = "returns the local statistic image"]
pub fn local_statistic(image: &GrayImage, method: AdaptiveMethod, block: KernelSize) -> GrayImage {
    match method {
        AdaptiveMethod::Mean => {
            let radius = block.radius();
            imageproc::filter::box_filter(image, radius, radius)
        }
        AdaptiveMethod::Gaussian => blur::gaussian_blur(image, block),
    }
}

/// Binarize against the local statistic.
///
/// A pixel is foreground (255) when `value > statistic - offset`;
/// [`AdaptiveParams::inverted`] swaps the two output values.
#[must_use = "returns the binary image"]
pub fn adaptive_threshold(image: &GrayImage, params: AdaptiveParams) -> GrayImage {
    let statistic = local_statistic(image, params.method, params.block);
    let (above, below) = if params.inverted { (0, 255) } else { (255, 0) };
    let mut out = image.clone();
    for (pixel, local) in out.pixels_mut().zip(statistic.pixels()) {
        let threshold = f32::from(local.0[0]) - params.offset;
        pixel.0[0] = if f32::from(pixel.0[0]) > threshold {
            above
        } else {
            below
        };
    }
    out
}

/// Global binarization: values strictly above `level` become 255.
#[must_use = "returns the binary image"]
pub fn binarize(image: &GrayImage, level: u8) -> GrayImage {
    threshold(image, level, ThresholdType::Binary)
}

/// Global binarization at the Otsu level: the cutoff that best
/// separates the histogram into two classes. Values strictly above it
/// become 255.
#[must_use = "returns the binary image"]
pub fn otsu_binarize(image: &GrayImage) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let level = otsu_level(image);
    tracing::debug!(level, "otsu threshold");
    binarize(image, level)
}

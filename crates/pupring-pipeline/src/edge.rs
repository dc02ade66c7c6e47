//! Edge and threshold extraction.
//!
//! Every algorithm turns a grayscale image into a binary map and is
//! selected through [`EdgeAlgorithm`]. Edge detectors mark edges as 255
//! on a 0 background; the adaptive variants mark pixels brighter than
//! their neighborhood as 255. Flipping to black-lines-on-white is left
//! to the style that owns the output, since some recipes composite the
//! raw maps first.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;
use serde::{Deserialize, Serialize};

use crate::canny;
use crate::morphology::{self, KernelShape};
use crate::threshold::{self, AdaptiveParams};

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero lets every pixel with any gradient join an
/// edge, which floods the map and the contour tracer behind it.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Low/high hysteresis thresholds for the two-threshold detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    /// Candidate threshold.
    pub low: f32,
    /// Seed threshold.
    pub high: f32,
}

impl ThresholdPair {
    /// High-sensitivity pair.
    pub const FINE: Self = Self::new(50.0, 150.0);
    /// Low-sensitivity pair.
    pub const COARSE: Self = Self::new(100.0, 200.0);

    /// Build a pair.
    #[must_use]
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

/// How gaps in a multi-scale union are bridged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFill {
    /// Leave the union as is.
    None,
    /// One dilation.
    Dilate(KernelShape),
    /// Morphological close.
    Close(KernelShape),
}

/// Image the edge map of a combined algorithm is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSource {
    /// The grayscale input.
    Gray,
    /// The adaptive threshold result.
    Adaptive,
}

/// Edge map that is subtracted from an adaptive threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeMask {
    /// Detector thresholds.
    pub thresholds: ThresholdPair,
    /// Detector input.
    pub source: EdgeSource,
    /// Optional thickening: element and iteration count.
    pub dilation: Option<(KernelShape, u32)>,
}

/// A selectable edge/threshold algorithm with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeAlgorithm {
    /// Euclidean Sobel magnitude, binarized, optionally thinned with one
    /// cross-shaped erosion.
    GradientMagnitude {
        /// Magnitude cutoff (strictly greater is an edge).
        threshold: u8,
        /// Apply the thinning erosion.
        thin: bool,
    },
    /// Single two-threshold detector.
    Canny(ThresholdPair),
    /// Union of two detector passes.
    MultiScale {
        /// Threshold pairs, typically fine and coarse.
        pairs: [ThresholdPair; 2],
        /// Gap bridging after the union.
        gap_fill: GapFill,
    },
    /// Local threshold.
    Adaptive(AdaptiveParams),
    /// Global threshold at the Otsu level.
    Otsu,
    /// Adaptive threshold with strong edges removed.
    Combined {
        /// Threshold part.
        adaptive: AdaptiveParams,
        /// Edge part.
        edges: EdgeMask,
    },
}

/// Run `algorithm` on a grayscale image.
#[must_use = "returns the binary map"]
pub fn extract_edges(image: &GrayImage, algorithm: &EdgeAlgorithm) -> GrayImage {
    let out = match *algorithm {
        EdgeAlgorithm::GradientMagnitude { threshold, thin } => {
            gradient_threshold(image, threshold, thin)
        }
        EdgeAlgorithm::Canny(pair) => canny(image, pair),
        EdgeAlgorithm::MultiScale { pairs, gap_fill } => multi_scale_edges(image, &pairs, gap_fill),
        EdgeAlgorithm::Adaptive(params) => threshold::adaptive_threshold(image, params),
        EdgeAlgorithm::Otsu => threshold::otsu_binarize(image),
        EdgeAlgorithm::Combined { adaptive, edges } => combined_adaptive_edges(image, adaptive, edges),
    };
    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!(
            ?algorithm,
            foreground = out.pixels().filter(|p| p.0[0] == 255).count(),
            "extracted edge map"
        );
    }
    out
}

/// Euclidean magnitude of the 3×3 Sobel gradients, saturated to 255.
#[must_use = "returns the gradient magnitude image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gradient_magnitude(image: &GrayImage) -> GrayImage {
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let mut out = GrayImage::new(image.width(), image.height());
    for ((pixel, dx), dy) in out.pixels_mut().zip(gx.pixels()).zip(gy.pixels()) {
        let magnitude = f32::from(dx.0[0]).hypot(f32::from(dy.0[0]));
        pixel.0[0] = magnitude.min(255.0) as u8;
    }
    out
}

/// Gradient-magnitude edges: magnitude above `threshold` is an edge.
///
/// With `thin`, a single erosion by a 3×3 cross strips the two-pixel
/// band a step edge produces, leaving only the strongest structure.
#[must_use = "returns the binary edge map"]
pub fn gradient_threshold(image: &GrayImage, threshold: u8, thin: bool) -> GrayImage {
    let edges = threshold::binarize(&gradient_magnitude(image), threshold);
    if thin {
        morphology::erode(&edges, KernelShape::Cross, 1)
    } else {
        edges
    }
}

/// Two-threshold edge detection with clamped thresholds.
///
/// Both thresholds are clamped to at least [`MIN_THRESHOLD`] and `low`
/// is clamped to be at most `high`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, pair: ThresholdPair) -> GrayImage {
    let high = pair.high.max(MIN_THRESHOLD);
    let low = pair.low.max(MIN_THRESHOLD).min(high);
    canny::canny(image, low, high)
}

/// Union of several detector passes, then gap bridging.
#[must_use = "returns the binary edge map"]
pub fn multi_scale_edges(image: &GrayImage, pairs: &[ThresholdPair], gap_fill: GapFill) -> GrayImage {
    let union = pairs
        .iter()
        .map(|&pair| canny(image, pair))
        .reduce(|acc, edges| morphology::union(&acc, &edges))
        .unwrap_or_else(|| GrayImage::new(image.width(), image.height()));
    match gap_fill {
        GapFill::None => union,
        GapFill::Dilate(shape) => morphology::dilate(&union, shape, 1),
        GapFill::Close(shape) => morphology::close(&union, shape),
    }
}

/// Adaptive threshold AND NOT an edge map.
///
/// Keeps threshold pixels that are not on a strong edge, which removes
/// speckle along boundaries while keeping both region and outline
/// information.
#[must_use = "returns the combined map"]
pub fn combined_adaptive_edges(
    image: &GrayImage,
    adaptive: AdaptiveParams,
    edges: EdgeMask,
) -> GrayImage {
    let thresholded = threshold::adaptive_threshold(image, adaptive);
    let source = match edges.source {
        EdgeSource::Gray => image,
        EdgeSource::Adaptive => &thresholded,
    };
    let mut edge_map = canny(source, edges.thresholds);
    if let Some((shape, iterations)) = edges.dilation {
        edge_map = morphology::dilate(&edge_map, shape, iterations);
    }
    morphology::subtract(&thresholded, &edge_map)
}

/// Bitwise NOT of every pixel.
#[must_use = "returns the inverted image"]
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = !pixel.0[0];
    }
    out
}

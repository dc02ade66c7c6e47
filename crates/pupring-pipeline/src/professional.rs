//! Professional pendant pipeline: a fixed sequence of stages tuned for
//! pet faces.
//!
//! The stages are modelled as distinct types so they can only run in
//! order, and every intermediate can be inspected before advancing:
//!
//! ```rust
//! # use pupring_pipeline::professional::{Professional, ProfessionalParams};
//! # use pupring_pipeline::{EngraveError, GrayImage};
//! # fn run(gray: GrayImage) -> Result<(), EngraveError> {
//! let _mask = Professional::new(gray, ProfessionalParams::default())
//!     .pre_blur()
//!     .enhance()
//!     .detect_edges()
//!     .adjust_contrast()
//!     .threshold()
//!     .blend()
//!     .finalize()
//!     .composite(10)
//!     .into_mask()?;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state. There
//! is no branching apart from the odd-size normalization that
//! [`KernelSize`] performs on construction.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::denoise::BilateralParams;
use crate::edge::{self, GapFill, ThresholdPair};
use crate::morphology::{self, KernelShape};
use crate::preprocess::{self, ClaheParams};
use crate::threshold::{self, AdaptiveMethod, AdaptiveParams};
use crate::types::{BinaryMask, EngraveError, KernelSize};
use crate::{blur, pendant};

/// Parameter record of the professional pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalParams {
    /// Light noise-suppression blur before anything else.
    pub pre_blur: KernelSize,
    /// Local-contrast enhancement.
    pub clahe: ClaheParams,
    /// Edge-preserving denoise after enhancement.
    pub denoise: BilateralParams,
    /// Threshold pairs unioned into the facial edge map.
    pub edge_pairs: [ThresholdPair; 2],
    /// Element closing gaps in the edge map.
    pub edge_close: KernelShape,
    /// Linear contrast factor.
    pub contrast: f32,
    /// Inverted adaptive threshold on the contrast-adjusted image.
    pub adaptive: AdaptiveParams,
    /// Share of the edge map in the blend (`0.0..=1.0`).
    pub edge_weight: f32,
    /// Speckle-removal element.
    pub open: KernelShape,
    /// Smoothing blur before the final re-binarization.
    pub post_blur: KernelSize,
    /// Final binarization level.
    pub final_threshold: u8,
}

impl ProfessionalParams {
    /// Default parameter record.
    pub const DEFAULT: Self = Self {
        pre_blur: KernelSize::new(3),
        clahe: ClaheParams {
            clip_limit: ClaheParams::DEFAULT_CLIP_LIMIT,
            tiles: ClaheParams::TILE_GRID,
        },
        denoise: BilateralParams::GENTLE,
        edge_pairs: [ThresholdPair::FINE, ThresholdPair::COARSE],
        edge_close: KernelShape::SQUARE_2,
        contrast: 1.2,
        adaptive: AdaptiveParams::new(AdaptiveMethod::Gaussian, 15, 2.5).inverted(),
        edge_weight: 0.3,
        open: KernelShape::SQUARE_2,
        post_blur: KernelSize::new(5),
        final_threshold: 127,
    };
}

impl Default for ProfessionalParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ───────────────────────── Stage 1: Grayscale ────────────────────────

/// Pipeline state holding the grayscale input.
#[must_use = "pipeline stages are consumed by advancing — call .pre_blur() to continue"]
pub struct Professional {
    params: ProfessionalParams,
    gray: GrayImage,
}

impl Professional {
    /// Start the pipeline from a grayscale image.
    pub const fn new(gray: GrayImage, params: ProfessionalParams) -> Self {
        Self { params, gray }
    }

    /// The grayscale input.
    #[must_use]
    pub const fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Light Gaussian blur.
    pub fn pre_blur(self) -> PreBlurred {
        let blurred = blur::gaussian_blur(&self.gray, self.params.pre_blur);
        PreBlurred {
            params: self.params,
            blurred,
        }
    }
}

// ───────────────────────── Stage 2: PreBlurred ───────────────────────

/// Pipeline state after the light pre-blur.
#[must_use = "pipeline stages are consumed by advancing — call .enhance() to continue"]
pub struct PreBlurred {
    params: ProfessionalParams,
    blurred: GrayImage,
}

impl PreBlurred {
    /// The blurred image.
    #[must_use]
    pub const fn blurred(&self) -> &GrayImage {
        &self.blurred
    }

    /// Local-contrast enhancement followed by edge-preserving denoise.
    pub fn enhance(self) -> Enhanced {
        let equalized = preprocess::clahe(&self.blurred, self.params.clahe);
        let enhanced = crate::denoise::bilateral_filter(&equalized, self.params.denoise);
        Enhanced {
            params: self.params,
            enhanced,
        }
    }
}

// ───────────────────────── Stage 3: Enhanced ─────────────────────────

/// Pipeline state after facial-feature enhancement.
#[must_use = "pipeline stages are consumed by advancing — call .detect_edges() to continue"]
pub struct Enhanced {
    params: ProfessionalParams,
    enhanced: GrayImage,
}

impl Enhanced {
    /// The enhanced image.
    #[must_use]
    pub const fn enhanced(&self) -> &GrayImage {
        &self.enhanced
    }

    /// Union of two edge passes, closed to bridge small gaps.
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = edge::multi_scale_edges(
            &self.enhanced,
            &self.params.edge_pairs,
            GapFill::Close(self.params.edge_close),
        );
        EdgesDetected {
            params: self.params,
            enhanced: self.enhanced,
            edges,
        }
    }
}

// ───────────────────────── Stage 4: EdgesDetected ────────────────────

/// Pipeline state after facial edge detection.
#[must_use = "pipeline stages are consumed by advancing — call .adjust_contrast() to continue"]
pub struct EdgesDetected {
    params: ProfessionalParams,
    enhanced: GrayImage,
    edges: GrayImage,
}

impl EdgesDetected {
    /// The closed edge map (255 = edge).
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Linear contrast on the enhanced image (not the edge map).
    pub fn adjust_contrast(self) -> ContrastAdjusted {
        let adjusted = preprocess::linear_contrast(&self.enhanced, self.params.contrast);
        ContrastAdjusted {
            params: self.params,
            edges: self.edges,
            adjusted,
        }
    }
}

// ───────────────────────── Stage 5: ContrastAdjusted ─────────────────

/// Pipeline state after the contrast curve.
#[must_use = "pipeline stages are consumed by advancing — call .threshold() to continue"]
pub struct ContrastAdjusted {
    params: ProfessionalParams,
    edges: GrayImage,
    adjusted: GrayImage,
}

impl ContrastAdjusted {
    /// The contrast-adjusted image.
    #[must_use]
    pub const fn adjusted(&self) -> &GrayImage {
        &self.adjusted
    }

    /// Inverted adaptive Gaussian threshold.
    pub fn threshold(self) -> Thresholded {
        let binary = threshold::adaptive_threshold(&self.adjusted, self.params.adaptive);
        Thresholded {
            params: self.params,
            edges: self.edges,
            binary,
        }
    }
}

// ───────────────────────── Stage 6: Thresholded ──────────────────────

/// Pipeline state after adaptive thresholding.
#[must_use = "pipeline stages are consumed by advancing — call .blend() to continue"]
pub struct Thresholded {
    params: ProfessionalParams,
    edges: GrayImage,
    binary: GrayImage,
}

impl Thresholded {
    /// The thresholded image (255 = darker than its neighborhood).
    #[must_use]
    pub const fn binary(&self) -> &GrayImage {
        &self.binary
    }

    /// `binary * (1 - w) + edges * w`, rounded and saturated.
    pub fn blend(self) -> Blended {
        let blended = weighted_blend(&self.binary, &self.edges, self.params.edge_weight);
        Blended {
            params: self.params,
            blended,
        }
    }
}

// ───────────────────────── Stage 7: Blended ──────────────────────────

/// Pipeline state after blending threshold and edge maps.
///
/// The image holds up to four levels (0, edge-only, threshold-only,
/// 255) and is not binary yet.
#[must_use = "pipeline stages are consumed by advancing — call .finalize() to continue"]
pub struct Blended {
    params: ProfessionalParams,
    blended: GrayImage,
}

impl Blended {
    /// The blended image.
    #[must_use]
    pub const fn blended(&self) -> &GrayImage {
        &self.blended
    }

    /// Open, blur, re-binarize and invert to black lines on white.
    pub fn finalize(self) -> Finalized {
        let cleaned = morphology::open(&self.blended, self.params.open);
        let smoothed = blur::gaussian_blur(&cleaned, self.params.post_blur);
        let binary = threshold::binarize(&smoothed, self.params.final_threshold);
        Finalized {
            engraving: edge::invert(&binary),
        }
    }
}

// ───────────────────────── Stage 8: Finalized ────────────────────────

/// Pipeline state holding the binary engraving before masking.
#[must_use = "pipeline stages are consumed by advancing — call .composite() to continue"]
pub struct Finalized {
    engraving: GrayImage,
}

impl Finalized {
    /// The binary engraving (0 = line, 255 = background).
    #[must_use]
    pub const fn engraving(&self) -> &GrayImage {
        &self.engraving
    }

    /// Mask everything outside the pendant circle to white.
    pub fn composite(self, margin: u32) -> Composited {
        Composited {
            pendant: pendant::apply_pendant(&self.engraving, margin),
        }
    }
}

// ───────────────────────── Stage 9: Composited ───────────────────────

/// Final pipeline state.
#[must_use = "call .into_mask() to obtain the result"]
pub struct Composited {
    pendant: GrayImage,
}

impl Composited {
    /// The pendant-shaped engraving.
    #[must_use]
    pub const fn pendant(&self) -> &GrayImage {
        &self.pendant
    }

    /// Consume the pipeline and return the verified mask.
    ///
    /// # Errors
    ///
    /// Returns [`EngraveError::Processing`] if the result is not binary.
    pub fn into_mask(self) -> Result<BinaryMask, EngraveError> {
        BinaryMask::try_from_gray(self.pendant)
    }
}

/// Run every stage in order.
///
/// # Errors
///
/// Propagates [`Composited::into_mask`].
pub fn run(
    gray: GrayImage,
    params: ProfessionalParams,
    margin: u32,
) -> Result<BinaryMask, EngraveError> {
    Professional::new(gray, params)
        .pre_blur()
        .enhance()
        .detect_edges()
        .adjust_contrast()
        .threshold()
        .blend()
        .finalize()
        .composite(margin)
        .into_mask()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn weighted_blend(a: &GrayImage, b: &GrayImage, weight: f32) -> GrayImage {
    let weight = weight.clamp(0.0, 1.0);
    let mut out = a.clone();
    for (pa, pb) in out.pixels_mut().zip(b.pixels()) {
        let mixed = f32::from(pa.0[0]).mul_add(1.0 - weight, f32::from(pb.0[0]) * weight);
        pa.0[0] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pendant::PendantCircle;
    use crate::types::Dimensions;

    /// Dark disc (a "face") with two bright "eyes" on a light background.
    fn face(size: u32) -> GrayImage {
        let c = f64::from(size) / 2.0;
        GrayImage::from_fn(size, size, |x, y| {
            let (fx, fy) = (f64::from(x), f64::from(y));
            let r = (fx - c).hypot(fy - c);
            let eye = (fx - c * 0.8).hypot(fy - c * 0.8) < 4.0
                || (fx - c * 1.2).hypot(fy - c * 0.8) < 4.0;
            let value = if eye {
                240
            } else if r < c * 0.6 {
                60
            } else {
                200
            };
            image::Luma([value])
        })
    }

    #[test]
    fn blend_levels() {
        let a = GrayImage::from_fn(4, 1, |x, _| image::Luma([if x % 2 == 0 { 0 } else { 255 }]));
        let b = GrayImage::from_fn(4, 1, |x, _| image::Luma([if x < 2 { 0 } else { 255 }]));
        let out = weighted_blend(&a, &b, 0.3);
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values[0], 0);
        assert!((178..=179).contains(&values[1]), "got {}", values[1]);
        assert!((76..=77).contains(&values[2]), "got {}", values[2]);
        assert_eq!(values[3], 255);
    }

    #[test]
    fn stages_preserve_dimensions() {
        let gray = face(64);
        let stage = Professional::new(gray, ProfessionalParams::default()).pre_blur();
        assert_eq!(stage.blurred().dimensions(), (64, 64));
        let stage = stage.enhance();
        assert_eq!(stage.enhanced().dimensions(), (64, 64));
        let stage = stage.detect_edges();
        assert_eq!(stage.edges().dimensions(), (64, 64));
        let stage = stage.adjust_contrast();
        assert_eq!(stage.adjusted().dimensions(), (64, 64));
        let stage = stage.threshold();
        assert_eq!(stage.binary().dimensions(), (64, 64));
        let stage = stage.blend();
        assert_eq!(stage.blended().dimensions(), (64, 64));
        let stage = stage.finalize();
        assert_eq!(stage.engraving().dimensions(), (64, 64));
        let stage = stage.composite(10);
        assert_eq!(stage.pendant().dimensions(), (64, 64));
    }

    #[test]
    fn output_is_binary_with_white_exterior() {
        let mask = run(face(96), ProfessionalParams::default(), 10).unwrap();
        let circle = PendantCircle::for_canvas(Dimensions { width: 96, height: 96 }, 10);
        for (x, y, p) in mask.as_gray().enumerate_pixels() {
            assert!(p.0[0] == 0 || p.0[0] == 255);
            if !circle.contains(x, y) {
                assert_eq!(p.0[0], 255, "exterior pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn non_square_input_keeps_canvas() {
        let gray = GrayImage::from_fn(80, 50, |x, _| image::Luma([if x < 40 { 50 } else { 210 }]));
        let mask = run(gray, ProfessionalParams::default(), 10).unwrap();
        assert_eq!(mask.dimensions(), Dimensions { width: 80, height: 50 });
    }

    #[test]
    fn run_is_deterministic() {
        let a = run(face(64), ProfessionalParams::default(), 10).unwrap();
        let b = run(face(64), ProfessionalParams::default(), 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn edge_map_is_binary() {
        let stage = Professional::new(face(64), ProfessionalParams::default())
            .pre_blur()
            .enhance()
            .detect_edges();
        assert!(stage.edges().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}

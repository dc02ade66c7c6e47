//! Shared types for the pupring engraving pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::MaskMetrics;
use crate::style::{Style, StyleSelection};
use crate::vectorize::VectorDocument;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference decoded
/// color input without depending on `image` directly.
pub use image::RgbaImage;

/// A window size for a filter that needs a center pixel.
///
/// Always a positive odd number. [`KernelSize::new`] bumps even values
/// up by one (and maps 0 to 1), so a configured size of 16 behaves
/// exactly like 17. Every blur kernel, threshold block and smoothing
/// window in the pipeline is typed as `KernelSize`, which keeps the
/// normalization in this one constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct KernelSize(u32);

impl KernelSize {
    /// Normalize `size` to the nearest odd value at or above it.
    #[must_use]
    pub const fn new(size: u32) -> Self {
        if size == 0 {
            Self(1)
        } else if size % 2 == 0 {
            Self(size + 1)
        } else {
            Self(size)
        }
    }

    /// The normalized (odd) size.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Half-width of the window, excluding the center pixel.
    #[must_use]
    pub const fn radius(self) -> u32 {
        self.0 / 2
    }

    /// Gaussian sigma implied by this kernel size when none is given
    /// explicitly: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn implied_sigma(self) -> f32 {
        let size = self.0 as f32;
        0.3f32.mul_add((size - 1.0).mul_add(0.5, -1.0), 0.8)
    }
}

impl From<u32> for KernelSize {
    fn from(size: u32) -> Self {
        Self::new(size)
    }
}

impl From<KernelSize> for u32 {
    fn from(size: KernelSize) -> Self {
        size.0
    }
}

/// A 2D point on the pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of a grayscale raster.
    #[must_use]
    pub fn of(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A black/white raster: every pixel is exactly 0 (ink) or 255
/// (background).
///
/// The only ways to build one are [`BinaryMask::try_from_gray`], which
/// rejects any intermediate gray value, and [`BinaryMask::threshold`],
/// which re-binarizes explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Pixel value for engraved lines.
    pub const INK: u8 = 0;
    /// Pixel value for untouched background.
    pub const BACKGROUND: u8 = 255;

    /// Wrap an image that is already binary.
    ///
    /// # Errors
    ///
    /// Returns [`EngraveError::Processing`] if any pixel is neither 0
    /// nor 255.
    pub fn try_from_gray(image: GrayImage) -> Result<Self, EngraveError> {
        if let Some((x, y, pixel)) = image
            .enumerate_pixels()
            .find(|(_, _, p)| p.0[0] != Self::INK && p.0[0] != Self::BACKGROUND)
        {
            return Err(EngraveError::Processing(format!(
                "non-binary value {} at ({x}, {y})",
                pixel.0[0]
            )));
        }
        Ok(Self(image))
    }

    /// Binarize: values strictly above `level` become 255, the rest 0.
    #[must_use]
    pub fn threshold(image: &GrayImage, level: u8) -> Self {
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > level {
                Self::BACKGROUND
            } else {
                Self::INK
            };
        }
        Self(out)
    }

    /// A mask of the given size filled with background.
    #[must_use]
    pub fn blank(dimensions: Dimensions) -> Self {
        Self(GrayImage::from_pixel(
            dimensions.width,
            dimensions.height,
            image::Luma([Self::BACKGROUND]),
        ))
    }

    /// Swap ink and background.
    #[must_use]
    pub fn inverted(&self) -> Self {
        let mut out = self.0.clone();
        for pixel in out.pixels_mut() {
            pixel.0[0] = !pixel.0[0];
        }
        Self(out)
    }

    /// Borrow the underlying raster.
    #[must_use]
    pub const fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    /// Consume the mask and return the underlying raster.
    #[must_use]
    pub fn into_gray(self) -> GrayImage {
        self.0
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.0)
    }

    /// Mean pixel value, or 0.0 for an empty mask.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        let total = self.dimensions().pixel_count();
        if total == 0 {
            return 0.0;
        }
        let sum: u64 = self.0.pixels().map(|p| u64::from(p.0[0])).sum();
        sum as f64 / total as f64
    }
}

/// Region-of-interest supplied by an external face detector.
///
/// Applied before any style runs. When absent the full image is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CropRect {
    /// Padding fraction the pet flow applies around a detected face.
    pub const FACE_PADDING: f64 = 0.2;

    /// Grow the rectangle by `fraction * max(width, height)` on every
    /// side. The left/top edges saturate at zero; the far edges are
    /// trimmed later by [`clamp_to`](Self::clamp_to).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn padded(self, fraction: f64) -> Self {
        let longer = self.width.max(self.height);
        let pad = (f64::from(longer) * fraction.max(0.0)) as u32;
        Self {
            x: self.x.saturating_sub(pad),
            y: self.y.saturating_sub(pad),
            width: self.width.saturating_add(pad.saturating_mul(2)),
            height: self.height.saturating_add(pad.saturating_mul(2)),
        }
    }

    /// Intersect with the image bounds. Returns `None` if nothing of
    /// the rectangle lies inside the image.
    #[must_use]
    pub fn clamp_to(self, dimensions: Dimensions) -> Option<Self> {
        if self.x >= dimensions.width || self.y >= dimensions.height {
            return None;
        }
        let width = self.width.min(dimensions.width - self.x);
        let height = self.height.min(dimensions.height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width,
            height,
        })
    }
}

/// Process-wide knobs that are not part of any style recipe.
///
/// Style parameters themselves are fixed per style (see
/// [`crate::style::StyleProfile`]); this record only covers the
/// vectorizer and the request-level pendant compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngraveConfig {
    /// Polygon simplification tolerance in pixels.
    pub simplify_tolerance: f64,

    /// Stroke width of emitted vector paths.
    pub stroke_width: f64,

    /// Distance in pixels between the pendant circle and the shorter
    /// image edge.
    pub pendant_margin: u32,

    /// Re-binarization level applied before contour tracing.
    pub vectorize_threshold: u8,
}

impl EngraveConfig {
    /// Default simplification tolerance.
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 2.0;
    /// Default stroke width.
    pub const DEFAULT_STROKE_WIDTH: f64 = 3.0;
    /// Default pendant margin.
    pub const DEFAULT_PENDANT_MARGIN: u32 = 10;
    /// Default vectorizer threshold.
    pub const DEFAULT_VECTORIZE_THRESHOLD: u8 = 127;

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EngraveError::InvalidConfig`] if the tolerance is
    /// negative or not finite, or the stroke width is not positive.
    pub fn validate(&self) -> Result<(), EngraveError> {
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(EngraveError::InvalidConfig(format!(
                "simplify_tolerance must be finite and >= 0, got {}",
                self.simplify_tolerance
            )));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(EngraveError::InvalidConfig(format!(
                "stroke_width must be finite and > 0, got {}",
                self.stroke_width
            )));
        }
        Ok(())
    }
}

impl Default for EngraveConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            pendant_margin: Self::DEFAULT_PENDANT_MARGIN,
            vectorize_threshold: Self::DEFAULT_VECTORIZE_THRESHOLD,
        }
    }
}

/// What one engraving request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngraveOptions {
    /// `All` or one named style.
    pub selection: StyleSelection,
    /// Narrows `All` to these styles (plus the baseline). Ignored for a
    /// single style.
    pub filter: Vec<Style>,
    /// Pass every produced mask through the pendant compositor.
    pub pendant: bool,
    /// Region to crop to before any style runs.
    pub crop: Option<CropRect>,
    /// Vectorize the primary style.
    pub vectorize: bool,
}

impl Default for EngraveOptions {
    fn default() -> Self {
        Self {
            selection: StyleSelection::All,
            filter: Vec::new(),
            pendant: false,
            crop: None,
            vectorize: true,
        }
    }
}

/// Everything produced for one request.
///
/// Either every requested style is present or the request failed as a
/// whole.
#[derive(Debug, Clone, PartialEq)]
pub struct EngravingResult {
    /// Size of the processed (possibly cropped) image.
    pub dimensions: Dimensions,
    /// One mask per produced style, in style order.
    pub masks: BTreeMap<Style, BinaryMask>,
    /// Coverage of each mask.
    pub metrics: BTreeMap<Style, MaskMetrics>,
    /// The style that was vectorized.
    pub primary: Style,
    /// Vector rendering of the primary style, if requested.
    pub vector: Option<VectorDocument>,
}

impl EngravingResult {
    /// The mask of the primary style.
    #[must_use]
    pub fn primary_mask(&self) -> Option<&BinaryMask> {
        self.masks.get(&self.primary)
    }
}

/// Coarse error category reported at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input could not be interpreted as an image.
    Decode,
    /// Requested style is not in the closed set.
    UnknownStyle,
    /// A stage failed on an otherwise valid image.
    Processing,
    /// The result could not be serialized.
    Encoding,
}

/// Errors that can occur while producing an engraving.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum EngraveError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The decoded image has no pixels.
    #[error("image has zero size ({width}x{height})")]
    ZeroDimensions {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },

    /// The transport payload (base64 / data URI) was malformed.
    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    /// The requested style name is not recognized.
    #[error("unknown style: {0:?}")]
    UnknownStyle(String),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline stage failed.
    #[error("processing failed: {0}")]
    Processing(String),

    /// The result could not be serialized to the output format.
    #[error("failed to encode result: {0}")]
    Encoding(String),
}

impl EngraveError {
    /// The boundary-level category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageDecode(_)
            | Self::EmptyInput
            | Self::ZeroDimensions { .. }
            | Self::InvalidPayload(_) => ErrorKind::Decode,
            Self::UnknownStyle(_) => ErrorKind::UnknownStyle,
            Self::InvalidConfig(_) | Self::Processing(_) => ErrorKind::Processing,
            Self::Encoding(_) => ErrorKind::Encoding,
        }
    }
}

/// Serde-compatible proxy for `EngraveError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead. A deserialized
/// `ImageDecode` comes back as [`EngraveError::InvalidPayload`] with the
/// original message preserved; its kind is still `Decode`.
#[derive(Serialize, Deserialize)]
enum EngraveErrorProxy {
    ImageDecode(String),
    EmptyInput,
    ZeroDimensions { width: u32, height: u32 },
    InvalidPayload(String),
    UnknownStyle(String),
    InvalidConfig(String),
    Processing(String),
    Encoding(String),
}

impl Serialize for EngraveError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => EngraveErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => EngraveErrorProxy::EmptyInput,
            Self::ZeroDimensions { width, height } => EngraveErrorProxy::ZeroDimensions {
                width: *width,
                height: *height,
            },
            Self::InvalidPayload(s) => EngraveErrorProxy::InvalidPayload(s.clone()),
            Self::UnknownStyle(s) => EngraveErrorProxy::UnknownStyle(s.clone()),
            Self::InvalidConfig(s) => EngraveErrorProxy::InvalidConfig(s.clone()),
            Self::Processing(s) => EngraveErrorProxy::Processing(s.clone()),
            Self::Encoding(s) => EngraveErrorProxy::Encoding(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EngraveError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = EngraveErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            EngraveErrorProxy::ImageDecode(msg) => {
                Self::InvalidPayload(format!("image decode error: {msg}"))
            }
            EngraveErrorProxy::EmptyInput => Self::EmptyInput,
            EngraveErrorProxy::ZeroDimensions { width, height } => {
                Self::ZeroDimensions { width, height }
            }
            EngraveErrorProxy::InvalidPayload(s) => Self::InvalidPayload(s),
            EngraveErrorProxy::UnknownStyle(s) => Self::UnknownStyle(s),
            EngraveErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            EngraveErrorProxy::Processing(s) => Self::Processing(s),
            EngraveErrorProxy::Encoding(s) => Self::Encoding(s),
        })
    }
}

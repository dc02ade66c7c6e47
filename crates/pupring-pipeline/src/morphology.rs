//! Grayscale morphology: erosion, dilation, opening and closing.
//!
//! Erosion and dilation run through [`imageproc::morphology`] with an
//! arbitrary [`Mask`]. A [`KernelShape`] is rasterized into an element
//! image and anchored at `(width / 2, height / 2)`, the same anchor
//! OpenCV picks for its default `(-1, -1)`. For even rectangles that
//! puts the active offsets at `-1..=0` on each axis. Samples that fall
//! outside the image are ignored, so borders neither erode nor grow
//! spuriously. Images without pixels pass through unchanged.
//!
//! Opening and closing apply both passes with the same anchor. For the
//! even-sized rectangles used by several styles this shifts features by
//! at most one pixel, which is part of the recipes' look.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};
use serde::{Deserialize, Serialize};

/// Shape of a structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    /// Filled rectangle anchored at `(width / 2, height / 2)`.
    Rect {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// 3×3 plus sign.
    Cross,
    /// 3×3 main diagonal (top-left to bottom-right).
    Diagonal,
    /// 3×3 anti-diagonal (top-right to bottom-left).
    AntiDiagonal,
}

impl KernelShape {
    /// 2×2 square.
    pub const SQUARE_2: Self = Self::Rect {
        width: 2,
        height: 2,
    };

    /// 3×3 square.
    pub const SQUARE_3: Self = Self::Rect {
        width: 3,
        height: 3,
    };

    /// Largest rectangle side; the anchor must fit in a `u8`.
    pub const MAX_RECT_SIDE: u32 = 255;

    /// The imageproc mask for this element.
    ///
    /// Rectangle sides are clamped to `1..=MAX_RECT_SIDE`.
    #[must_use]
    pub fn mask(self) -> Mask {
        let (element, anchor) = match self {
            Self::Rect { width, height } => {
                let width = width.clamp(1, Self::MAX_RECT_SIDE);
                let height = height.clamp(1, Self::MAX_RECT_SIDE);
                (
                    GrayImage::from_pixel(width, height, Luma([255])),
                    (width / 2, height / 2),
                )
            }
            Self::Cross => (three_by_three(|x, y| x == 1 || y == 1), (1, 1)),
            Self::Diagonal => (three_by_three(|x, y| x == y), (1, 1)),
            Self::AntiDiagonal => (three_by_three(|x, y| x + y == 2), (1, 1)),
        };
        let ax = u8::try_from(anchor.0).unwrap_or(u8::MAX);
        let ay = u8::try_from(anchor.1).unwrap_or(u8::MAX);
        Mask::from_image(&element, ax, ay)
    }
}

fn three_by_three(active: impl Fn(u32, u32) -> bool) -> GrayImage {
    GrayImage::from_fn(3, 3, |x, y| Luma([if active(x, y) { 255 } else { 0 }]))
}

fn is_empty(image: &GrayImage) -> bool {
    image.width() == 0 || image.height() == 0
}

fn repeat(
    image: &GrayImage,
    shape: KernelShape,
    iterations: u32,
    op: fn(&GrayImage, &Mask) -> GrayImage,
) -> GrayImage {
    let mut out = image.clone();
    if is_empty(image) {
        return out;
    }
    let mask = shape.mask();
    for _ in 0..iterations {
        out = op(&out, &mask);
    }
    out
}

/// Shrink bright regions: each pixel becomes the minimum under the
/// element, repeated `iterations` times.
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, shape: KernelShape, iterations: u32) -> GrayImage {
    repeat(image, shape, iterations, grayscale_erode)
}

/// Grow bright regions: each pixel becomes the maximum under the
/// element, repeated `iterations` times.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, shape: KernelShape, iterations: u32) -> GrayImage {
    repeat(image, shape, iterations, grayscale_dilate)
}

/// Erosion followed by dilation: removes bright specks smaller than
/// the element.
#[must_use = "returns the opened image"]
pub fn open(image: &GrayImage, shape: KernelShape) -> GrayImage {
    if is_empty(image) {
        return image.clone();
    }
    imageproc::morphology::grayscale_open(image, &shape.mask())
}

/// Dilation followed by erosion: fills dark gaps smaller than the
/// element.
#[must_use = "returns the closed image"]
pub fn close(image: &GrayImage, shape: KernelShape) -> GrayImage {
    if is_empty(image) {
        return image.clone();
    }
    imageproc::morphology::grayscale_close(image, &shape.mask())
}

/// Pixelwise maximum (bitwise OR for binary images).
///
/// Both images must have the same dimensions; extra pixels of the
/// larger image are ignored.
#[must_use = "returns the combined image"]
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    zip_with(a, b, u8::max)
}

/// Pixelwise minimum (bitwise AND for binary images).
#[must_use = "returns the combined image"]
pub fn intersection(a: &GrayImage, b: &GrayImage) -> GrayImage {
    zip_with(a, b, u8::min)
}

/// Keep `a` where `b` is dark: `a AND NOT b` for binary images.
#[must_use = "returns the masked image"]
pub fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    zip_with(a, b, |pa, pb| pa & !pb)
}

fn zip_with(a: &GrayImage, b: &GrayImage, f: impl Fn(u8, u8) -> u8) -> GrayImage {
    let mut out = a.clone();
    for (pa, pb) in out.pixels_mut().zip(b.pixels()) {
        pa.0[0] = f(pa.0[0], pb.0[0]);
    }
    out
}

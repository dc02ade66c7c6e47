//! Raster preprocessing: blur, local contrast, denoise and linear contrast.
//!
//! Every style starts from a grayscale image and optionally runs some
//! of these steps before edge or threshold extraction. The order is
//! fixed: intensity gain, pre-blur, tile-based histogram equalization
//! (CLAHE), edge-preserving denoise, then the linear contrast curve.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::blur;
use crate::denoise::{self, BilateralParams};
use crate::types::KernelSize;

/// Parameters for contrast-limited adaptive histogram equalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClaheParams {
    /// Histogram clip limit, relative to a flat histogram.
    pub clip_limit: f32,
    /// Number of tiles along each axis.
    pub tiles: u32,
}

impl ClaheParams {
    /// Clip limit used for pet-face enhancement.
    pub const DEFAULT_CLIP_LIMIT: f32 = 2.0;
    /// Tile grid is fixed at 8×8.
    pub const TILE_GRID: u32 = 8;
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: Self::DEFAULT_CLIP_LIMIT,
            tiles: Self::TILE_GRID,
        }
    }
}

/// Which preprocessing steps a style runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Multiplicative gain applied first, saturating at 255 (1.0 is the
    /// identity).
    pub gain: f32,
    /// Gaussian pre-blur window.
    pub blur: Option<KernelSize>,
    /// Local-contrast enhancement.
    pub clahe: Option<ClaheParams>,
    /// Edge-preserving denoise.
    pub denoise: Option<BilateralParams>,
    /// Linear contrast factor around mid-gray (1.0 is the identity).
    pub contrast: f32,
}

impl PreprocessParams {
    /// No preprocessing at all.
    pub const NONE: Self = Self {
        gain: 1.0,
        blur: None,
        clahe: None,
        denoise: None,
        contrast: 1.0,
    };
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self::NONE
    }
}

/// Run the configured preprocessing steps in order.
#[must_use = "returns the preprocessed image"]
pub fn preprocess(image: &GrayImage, params: &PreprocessParams) -> GrayImage {
    let gained;
    let source = if (params.gain - 1.0).abs() > f32::EPSILON {
        gained = scale_abs(image, params.gain);
        &gained
    } else {
        image
    };
    let mut out = match params.blur {
        Some(size) => blur::gaussian_blur(source, size),
        None => source.clone(),
    };
    if let Some(clahe_params) = params.clahe {
        out = clahe(&out, clahe_params);
    }
    if let Some(bilateral) = params.denoise {
        out = denoise::bilateral_filter(&out, bilateral);
    }
    if (params.contrast - 1.0).abs() > f32::EPSILON {
        out = linear_contrast(&out, params.contrast);
    }
    out
}

/// Scale every intensity by `gain`: `out = min(round(|in * gain|), 255)`.
#[must_use = "returns the scaled image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scale_abs(image: &GrayImage, gain: f32) -> GrayImage {
    let lut: [u8; 256] = std::array::from_fn(|i| {
        let value = f32::from(u8::try_from(i).unwrap_or(u8::MAX));
        (value * gain).abs().round().min(255.0) as u8
    });
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[usize::from(pixel.0[0])];
    }
    out
}

/// Stretch or compress intensities around mid-gray:
/// `out = clip((in/255 - 0.5) * factor + 0.5, 0, 1) * 255`.
///
/// Values saturate at 0 and 255; the final scale truncates.
#[must_use = "returns the contrast-adjusted image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn linear_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let lut: [u8; 256] = std::array::from_fn(|i| {
        let normalized = f32::from(u8::try_from(i).unwrap_or(u8::MAX)) / 255.0;
        let adjusted = (normalized - 0.5).mul_add(factor, 0.5).clamp(0.0, 1.0);
        (adjusted * 255.0) as u8
    });
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[usize::from(pixel.0[0])];
    }
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles × tiles` grid; each tile gets its
/// own clipped histogram and equalization table, and each pixel is
/// mapped by bilinear interpolation between the four nearest tile
/// tables. Images smaller than the grid are returned unchanged.
#[must_use = "returns the equalized image"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
pub fn clahe(image: &GrayImage, params: ClaheParams) -> GrayImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let tiles = params.tiles as usize;
    if tiles == 0 || w < tiles || h < tiles {
        return image.clone();
    }
    let tile_w = w / tiles;
    let tile_h = h / tiles;
    let raw = image.as_raw();

    let mut tables = vec![[0u8; 256]; tiles * tiles];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = if tx == tiles - 1 { w } else { x0 + tile_w };
            let y1 = if ty == tiles - 1 { h } else { y0 + tile_h };
            let tile_pixels = (x1 - x0) * (y1 - y0);

            let mut hist = [0u32; 256];
            for row in y0..y1 {
                for &value in &raw[row * w + x0..row * w + x1] {
                    hist[usize::from(value)] += 1;
                }
            }

            let clip = ((params.clip_limit * tile_pixels as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in &mut hist {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let per_bin = excess / 256;
            let remainder = (excess % 256) as usize;
            for (i, bin) in hist.iter_mut().enumerate() {
                *bin += per_bin + u32::from(i < remainder);
            }

            let scale = 255.0 / tile_pixels as f32;
            let table = &mut tables[ty * tiles + tx];
            let mut cdf = 0u32;
            for (entry, &count) in table.iter_mut().zip(hist.iter()) {
                cdf += count;
                *entry = (cdf as f32 * scale).round().min(255.0) as u8;
            }
        }
    }

    let last = tiles as i32 - 1;
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let value = usize::from(pixel.0[0]);
        let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let tx0 = (fx.floor() as i32).clamp(0, last) as usize;
        let tx1 = (fx.floor() as i32 + 1).clamp(0, last) as usize;
        let ty0 = (fy.floor() as i32).clamp(0, last) as usize;
        let ty1 = (fy.floor() as i32 + 1).clamp(0, last) as usize;
        let ax = (fx - fx.floor()).clamp(0.0, 1.0);
        let ay = (fy - fy.floor()).clamp(0.0, 1.0);

        let v00 = f32::from(tables[ty0 * tiles + tx0][value]);
        let v10 = f32::from(tables[ty0 * tiles + tx1][value]);
        let v01 = f32::from(tables[ty1 * tiles + tx0][value]);
        let v11 = f32::from(tables[ty1 * tiles + tx1][value]);
        let top = (v10 - v00).mul_add(ax, v00);
        let bottom = (v11 - v01).mul_add(ax, v01);
        pixel.0[0] = (bottom - top).mul_add(ay, top).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal_ramp(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            image::Luma([u8::try_from(x * 255 / (width - 1)).unwrap_or(255)])
        })
    }

    // ─────── linear_contrast ─────────────────────────────────────

    #[test]
    fn contrast_identity_keeps_values() {
        let img = horizontal_ramp(256, 1);
        let out = linear_contrast(&img, 1.0);
        for (a, b) in img.pixels().zip(out.pixels()) {
            assert!(a.0[0].abs_diff(b.0[0]) <= 1);
        }
    }

    #[test]
    fn contrast_saturates_instead_of_wrapping() {
        let img = GrayImage::from_fn(2, 1, |x, _| image::Luma([if x == 0 { 10 } else { 245 }]));
        let out = linear_contrast(&img, 3.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn contrast_below_one_pulls_toward_mid_gray() {
        let img = GrayImage::from_fn(2, 1, |x, _| image::Luma([if x == 0 { 0 } else { 255 }]));
        let out = linear_contrast(&img, 0.8);
        // (0 - 0.5) * 0.8 + 0.5 = 0.1 -> 25; (1 - 0.5) * 0.8 + 0.5 = 0.9 -> 229
        assert_eq!(out.get_pixel(0, 0).0[0], 25);
        assert_eq!(out.get_pixel(1, 0).0[0], 229);
    }

    // ─────── clahe ───────────────────────────────────────────────

    #[test]
    fn clahe_preserves_dimensions() {
        let img = horizontal_ramp(80, 60);
        let out = clahe(&img, ClaheParams::default());
        assert_eq!(out.dimensions(), (80, 60));
    }

    #[test]
    fn clahe_uniform_image_stays_uniform() {
        let img = GrayImage::from_pixel(64, 64, image::Luma([128]));
        let out = clahe(&img, ClaheParams::default());
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn clahe_small_image_returns_copy() {
        let img = horizontal_ramp(5, 5);
        assert_eq!(clahe(&img, ClaheParams::default()), img);
    }

    #[test]
    fn clahe_stretches_low_contrast_region() {
        let img = GrayImage::from_fn(64, 64, |x, _| image::Luma([if x % 2 == 0 { 10 } else { 20 }]));
        let params = ClaheParams {
            clip_limit: 40.0,
            tiles: 8,
        };
        let out = clahe(&img, params);
        let spread = out.get_pixel(1, 10).0[0].abs_diff(out.get_pixel(0, 10).0[0]);
        assert!(spread > 20, "expected spread well above input's 10, got {spread}");
    }

    // ─────── preprocess ──────────────────────────────────────────

    #[test]
    fn preprocess_none_is_identity() {
        let img = horizontal_ramp(20, 20);
        assert_eq!(preprocess(&img, &PreprocessParams::NONE), img);
    }

    #[test]
    fn preprocess_applies_contrast() {
        let img = horizontal_ramp(20, 20);
        let params = PreprocessParams {
            contrast: 0.8,
            ..PreprocessParams::NONE
        };
        assert_eq!(preprocess(&img, &params), linear_contrast(&img, 0.8));
    }

    #[test]
    fn gain_doubles_and_saturates() {
        let img = GrayImage::from_fn(3, 1, |x, _| image::Luma([[10, 127, 200][x as usize]]));
        let out = scale_abs(&img, 2.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 20);
        assert_eq!(out.get_pixel(1, 0).0[0], 254);
        assert_eq!(out.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn gain_runs_before_denoise() {
        let img = horizontal_ramp(20, 20);
        let params = PreprocessParams {
            gain: 2.0,
            denoise: Some(BilateralParams::SMOOTH),
            ..PreprocessParams::NONE
        };
        let expected = crate::denoise::bilateral_filter(&scale_abs(&img, 2.0), BilateralParams::SMOOTH);
        assert_eq!(preprocess(&img, &params), expected);
    }

    #[test]
    fn preprocess_is_deterministic() {
        let img = horizontal_ramp(40, 40);
        let params = PreprocessParams {
            gain: 1.5,
            blur: Some(KernelSize::new(3)),
            clahe: Some(ClaheParams::default()),
            denoise: Some(BilateralParams::SMOOTH),
            contrast: 1.2,
        };
        assert_eq!(preprocess(&img, &params), preprocess(&img, &params));
    }
}

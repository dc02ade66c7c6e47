//! Edge-preserving smoothing (bilateral filter).
//!
//! Wraps [`imageproc::filter::bilateral_filter`]. Each output pixel is a
//! weighted mean of its square neighborhood, where the weight falls off
//! with both spatial distance and intensity difference. Flat regions
//! are smoothed while strong boundaries stay sharp for the edge
//! detectors that follow.

use image::GrayImage;
use imageproc::filter::bilateral::GaussianEuclideanColorDistance;
use serde::{Deserialize, Serialize};

use crate::types::KernelSize;

/// Bilateral filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilateralParams {
    /// Neighborhood diameter.
    pub diameter: KernelSize,
    /// Intensity falloff: larger values mix more dissimilar pixels.
    pub sigma_color: f32,
    /// Spatial falloff in pixels.
    pub sigma_space: f32,
}

impl BilateralParams {
    /// Light smoothing for line-art styles.
    pub const SMOOTH: Self = Self {
        diameter: KernelSize::new(9),
        sigma_color: 75.0,
        sigma_space: 75.0,
    };

    /// Mild cleanup after local-contrast enhancement.
    pub const GENTLE: Self = Self {
        diameter: KernelSize::new(5),
        sigma_color: 30.0,
        sigma_space: 5.0,
    };

    /// Wider smoothing for relief-like output.
    pub const SOFT: Self = Self {
        diameter: KernelSize::new(15),
        sigma_color: 80.0,
        sigma_space: 80.0,
    };

    /// Window radius in the form imageproc takes it. Radii beyond
    /// `u8::MAX` saturate.
    #[must_use]
    pub fn radius(self) -> u8 {
        u8::try_from(self.diameter.radius()).unwrap_or(u8::MAX)
    }
}

/// Apply a bilateral filter. Samples beyond the border are clamped to
/// the nearest edge pixel; an image without pixels is returned as is.
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(image: &GrayImage, params: BilateralParams) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    imageproc::filter::bilateral_filter(
        image,
        params.radius(),
        params.sigma_space.max(f32::EPSILON),
        GaussianEuclideanColorDistance::new(params.sigma_color.max(f32::EPSILON)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(width: u32) -> GrayImage {
        GrayImage::from_fn(width, 20, |x, _| {
            image::Luma([if x < width / 2 { 0 } else { 255 }])
        })
    }

    #[test]
    fn uniform_image_stays_flat() {
        let img = GrayImage::from_pixel(12, 12, image::Luma([90]));
        let out = bilateral_filter(&img, BilateralParams::SMOOTH);
        assert!(out.pixels().all(|p| p.0[0].abs_diff(90) <= 1));
    }

    #[test]
    fn unit_diameter_is_identity() {
        let img = GrayImage::from_fn(6, 6, |x, y| image::Luma([u8::try_from(x * 40 + y).unwrap_or(0)]));
        let params = BilateralParams {
            diameter: KernelSize::new(1),
            ..BilateralParams::SMOOTH
        };
        assert_eq!(params.radius(), 0);
        assert_eq!(bilateral_filter(&img, params), img);
    }

    #[test]
    fn radius_follows_diameter() {
        assert_eq!(BilateralParams::GENTLE.radius(), 2);
        assert_eq!(BilateralParams::SMOOTH.radius(), 4);
        assert_eq!(BilateralParams::SOFT.radius(), 7);
    }

    #[test]
    fn strong_edge_is_preserved() {
        let params = BilateralParams {
            diameter: KernelSize::new(9),
            sigma_color: 20.0,
            sigma_space: 75.0,
        };
        let out = bilateral_filter(&step(20), params);
        assert!(out.get_pixel(9, 10).0[0] < 5);
        assert!(out.get_pixel(10, 10).0[0] > 250);
    }

    #[test]
    fn soft_preset_keeps_hard_step() {
        let out = bilateral_filter(&step(30), BilateralParams::SOFT);
        let dark = out.get_pixel(14, 10).0[0];
        let bright = out.get_pixel(15, 10).0[0];
        assert!(dark < 10, "dark side drifted to {dark}");
        assert!(bright > 245, "bright side drifted to {bright}");
        assert_eq!(out.get_pixel(0, 10).0[0], 0);
    }

    #[test]
    fn small_noise_is_smoothed() {
        let mut img = GrayImage::from_pixel(15, 15, image::Luma([100]));
        img.put_pixel(7, 7, image::Luma([120]));
        let out = bilateral_filter(&img, BilateralParams::SMOOTH);
        let center = out.get_pixel(7, 7).0[0];
        assert!(center < 110, "expected speck to be pulled toward 100, got {center}");
    }

    #[test]
    fn empty_image_passes_through() {
        let img = GrayImage::new(0, 0);
        assert_eq!(bilateral_filter(&img, BilateralParams::SOFT), img);
    }

    #[test]
    fn dimensions_preserved() {
        let img = GrayImage::new(7, 3);
        assert_eq!(bilateral_filter(&img, BilateralParams::SOFT).dimensions(), (7, 3));
    }
}

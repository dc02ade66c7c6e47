//! Gaussian blur for noise suppression.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. Style recipes specify
//! blurs by window size ([`KernelSize`]); the sigma is derived from the
//! window with [`KernelSize::implied_sigma`], so a size-5 blur is the
//! same everywhere it appears.

use image::GrayImage;

use crate::types::KernelSize;

/// Blur with a window of `size` pixels.
///
/// A window of 1 is the identity.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, size: KernelSize) -> GrayImage {
    if size.get() <= 1 {
        return image.clone();
    }
    gaussian_blur_sigma(image, size.implied_sigma())
}

/// Blur with an explicit sigma.
///
/// Non-positive sigma values (zero or negative) return the image
/// unchanged, since `imageproc`'s underlying function panics on
/// `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_sigma(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

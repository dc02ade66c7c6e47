//! Deterministic background removal for photos shot on a light
//! backdrop.
//!
//! Everything brighter than [`BACKDROP_LEVEL`] counts as backdrop. The
//! remaining pixels are cleaned up morphologically, the largest outer
//! outline is taken as the subject, and its filled interior becomes the
//! alpha channel of the cutout. The edge of that alpha mask is softened
//! with a small blur and hardened again, which rounds off single-pixel
//! steps along the outline.

use geo::Area;
use image::{GrayImage, Luma, RgbaImage};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::drawing::draw_polygon_mut;

use crate::blur;
use crate::contour::{Contour, ContourTracer, ContourTracerKind, Retrieval};
use crate::grayscale;
use crate::morphology::{self, KernelShape};
use crate::types::{EngraveError, KernelSize};

/// Pixels strictly above this level are backdrop.
pub const BACKDROP_LEVEL: u8 = 240;

/// Level at which the blurred alpha edge is re-binarized.
pub const EDGE_LEVEL: u8 = 128;

/// Blur window used to round off the alpha edge.
pub const EDGE_SMOOTHING: KernelSize = KernelSize::new(5);

/// Result of [`remove_background`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cutout {
    /// The photo with the alpha channel set to the subject mask, or the
    /// flattened photo unchanged if no subject was found.
    pub image: RgbaImage,
    /// Whether any pixel was made transparent.
    pub has_transparency: bool,
}

/// Alpha mask of the subject: 255 inside the largest outer outline of
/// the non-backdrop pixels, 0 elsewhere. `None` when the whole image is
/// backdrop.
#[must_use]
pub fn subject_alpha(gray: &GrayImage) -> Option<GrayImage> {
    if gray.width() == 0 || gray.height() == 0 {
        return None;
    }
    let foreground = threshold(gray, BACKDROP_LEVEL, ThresholdType::BinaryInverted);
    let closed = morphology::erode(
        &morphology::dilate(&foreground, KernelShape::SQUARE_3, 2),
        KernelShape::SQUARE_3,
        2,
    );
    let cleaned = morphology::open(&closed, KernelShape::SQUARE_3);

    let contours = ContourTracerKind::BorderFollowing.trace(&cleaned, Retrieval::External);
    let subject = largest(&contours)?;

    let mut filled = GrayImage::new(gray.width(), gray.height());
    let polygon: Vec<imageproc::point::Point<i32>> = subject
        .points
        .iter()
        .map(|p| imageproc::point::Point::new(p.x, p.y))
        .collect();
    draw_polygon_mut(&mut filled, &polygon, Luma([255]));

    let smoothed = blur::gaussian_blur(&filled, EDGE_SMOOTHING);
    let alpha = threshold(&smoothed, EDGE_LEVEL, ThresholdType::Binary);
    tracing::debug!(
        contours = contours.len(),
        outline_points = subject.len(),
        opaque = alpha.pixels().filter(|p| p.0[0] == 255).count(),
        "isolated subject"
    );
    Some(alpha)
}

/// The contour enclosing the largest area; the first one on ties.
fn largest(contours: &[Contour]) -> Option<&Contour> {
    let mut best: Option<(&Contour, f64)> = None;
    for contour in contours.iter().filter(|c| !c.is_empty()) {
        let area = enclosed_area(contour);
        if best.is_none_or(|(_, best_area)| area > best_area) {
            best = Some((contour, area));
        }
    }
    best.map(|(contour, _)| contour)
}

fn enclosed_area(contour: &Contour) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let ring: Vec<(f64, f64)> = contour
        .points
        .iter()
        .map(|p| (f64::from(p.x), f64::from(p.y)))
        .collect();
    geo::Polygon::new(geo::LineString::from(ring), vec![]).unsigned_area()
}

/// Decode a photo and cut its subject out of a light backdrop.
///
/// Alpha in the input is flattened onto white first, so an already
/// transparent surround counts as backdrop.
///
/// # Errors
///
/// Propagates the decode errors of [`grayscale::decode_rgba`].
pub fn remove_background(image_bytes: &[u8]) -> Result<Cutout, EngraveError> {
    let rgba = grayscale::flatten_onto_white(&grayscale::decode_rgba(image_bytes)?);
    let gray = grayscale::to_grayscale(&rgba);
    Ok(cut_out(rgba, &gray))
}

/// [`remove_background`] for an already decoded, opaque image and its
/// grayscale version.
#[must_use]
pub fn cut_out(mut rgba: RgbaImage, gray: &GrayImage) -> Cutout {
    let Some(alpha) = subject_alpha(gray) else {
        tracing::warn!("no subject found against the backdrop; returning the photo unchanged");
        return Cutout {
            image: rgba,
            has_transparency: false,
        };
    };
    for (pixel, a) in rgba.pixels_mut().zip(alpha.pixels()) {
        pixel.0[3] = a.0[0];
    }
    let has_transparency = alpha.pixels().any(|p| p.0[0] == 0);
    Cutout {
        image: rgba,
        has_transparency,
    }
}

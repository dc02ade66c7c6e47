//! Stipple (halftone) rendering from an edge map.
//!
//! Closed edge loops large enough to matter get a solid dot at their
//! centroid; the edges themselves are drawn on top. The result reads as
//! a dotted engraving rather than pure line art.

use geo::{Area, Centroid};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};

use crate::contour::{Contour, ContourTracer, ContourTracerKind, Retrieval};
use crate::edge;
use crate::morphology;

/// Stipple parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StippleParams {
    /// Loops enclosing this many square pixels or fewer get no dot.
    pub min_area: f64,
    /// Dot radius in pixels.
    pub dot_radius: i32,
}

impl StippleParams {
    /// Default area threshold (px²).
    pub const DEFAULT_MIN_AREA: f64 = 20.0;
    /// Default dot radius.
    pub const DEFAULT_DOT_RADIUS: i32 = 3;
}

impl Default for StippleParams {
    fn default() -> Self {
        Self {
            min_area: Self::DEFAULT_MIN_AREA,
            dot_radius: Self::DEFAULT_DOT_RADIUS,
        }
    }
}

/// Render dots for the external loops of `edges` (255 = edge) and merge
/// them with the inverted edges by pixelwise minimum.
///
/// Output polarity is black ink on white.
#[must_use = "returns the stippled image"]
pub fn stipple(edges: &GrayImage, params: StippleParams) -> GrayImage {
    let mut dots = GrayImage::from_pixel(edges.width(), edges.height(), Luma([255]));
    let contours = ContourTracerKind::BorderFollowing.trace(edges, Retrieval::External);
    let mut drawn = 0usize;
    for contour in &contours {
        if let Some((cx, cy)) = dot_center(contour, params.min_area) {
            draw_filled_circle_mut(&mut dots, (cx, cy), params.dot_radius, Luma([0]));
            drawn += 1;
        }
    }
    tracing::debug!(contours = contours.len(), dots = drawn, "stippled edge loops");
    morphology::intersection(&dots, &edge::invert(edges))
}

/// Centroid of a contour's enclosed area, truncated to pixel
/// coordinates, if the area exceeds `min_area`.
#[allow(clippy::cast_possible_truncation)]
fn dot_center(contour: &Contour, min_area: f64) -> Option<(i32, i32)> {
    if contour.len() < 3 {
        return None;
    }
    let ring: Vec<(f64, f64)> = contour
        .points
        .iter()
        .map(|p| (f64::from(p.x), f64::from(p.y)))
        .collect();
    let polygon = geo::Polygon::new(geo::LineString::from(ring), vec![]);
    if polygon.unsigned_area() <= min_area {
        return None;
    }
    let centroid = polygon.centroid()?;
    Some((centroid.x() as i32, centroid.y() as i32))
}

//! Vectorizer: binary mask to closed, stroke-only vector paths.
//!
//! The mask is normalized to light-on-dark polarity so the tracer
//! always follows the engraved strokes, traced with full hierarchy,
//! compressed to its turning points and simplified with
//! Ramer-Douglas-Peucker. Contours that collapse to two points or fewer
//! are dropped rather than emitted as degenerate paths.

use serde::{Deserialize, Serialize};

use crate::contour::{ContourTracer, ContourTracerKind, Retrieval};
use crate::simplify;
use crate::types::{BinaryMask, Dimensions, EngraveConfig, Point};

/// One closed path of the vector document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    /// Vertices; the path closes from the last back to the first.
    pub points: Vec<Point>,
    /// Whether the path is closed.
    pub closed: bool,
    /// Stroke width in canvas units.
    pub stroke_width: f64,
}

/// Counters collected while vectorizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizeStats {
    /// Contours found by the tracer.
    pub contours: usize,
    /// Paths emitted.
    pub paths: usize,
    /// Points entering simplification (after run compression).
    pub points_before: usize,
    /// Points in the emitted paths.
    pub points_after: usize,
}

/// A traced, simplified mask ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Canvas size, equal to the source mask.
    pub dimensions: Dimensions,
    /// Paths in tracer discovery order.
    pub paths: Vec<VectorPath>,
    /// Diagnostic counters.
    pub stats: VectorizeStats,
}

/// Trace and simplify a mask.
#[must_use = "returns the vector document"]
pub fn vectorize(mask: &BinaryMask, config: &EngraveConfig) -> VectorDocument {
    let dimensions = mask.dimensions();

    // Mostly white means dark strokes on a light page; flip so the
    // strokes are foreground.
    let normalized = if mask.mean() > 127.0 {
        mask.inverted()
    } else {
        mask.clone()
    };
    let binary = BinaryMask::threshold(normalized.as_gray(), config.vectorize_threshold);

    let contours = ContourTracerKind::BorderFollowing.trace(binary.as_gray(), Retrieval::Tree);
    let mut stats = VectorizeStats {
        contours: contours.len(),
        ..VectorizeStats::default()
    };

    let mut paths = Vec::new();
    for contour in &contours {
        let compressed = contour.compressed();
        if compressed.len() <= 2 {
            continue;
        }
        stats.points_before += compressed.len();
        let points = simplify::simplify_closed(&compressed.points, config.simplify_tolerance);
        if points.len() < 3 {
            continue;
        }
        stats.points_after += points.len();
        paths.push(VectorPath {
            points,
            closed: true,
            stroke_width: config.stroke_width,
        });
    }
    stats.paths = paths.len();

    tracing::debug!(
        contours = stats.contours,
        paths = stats.paths,
        points_before = stats.points_before,
        points_after = stats.points_after,
        "vectorized mask"
    );

    VectorDocument {
        dimensions,
        paths,
        stats,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn mask_from_fn(w: u32, h: u32, ink: impl Fn(u32, u32) -> bool) -> BinaryMask {
        BinaryMask::try_from_gray(GrayImage::from_fn(w, h, |x, y| {
            Luma([if ink(x, y) { 0 } else { 255 }])
        }))
        .unwrap()
    }

    #[test]
    fn blank_mask_has_no_paths() {
        let doc = vectorize(&BinaryMask::blank(Dimensions { width: 30, height: 20 }), &EngraveConfig::default());
        assert!(doc.paths.is_empty());
        assert_eq!(doc.stats.contours, 0);
        assert_eq!(doc.dimensions, Dimensions { width: 30, height: 20 });
    }

    #[test]
    fn solid_square_becomes_one_quad() {
        let mask = mask_from_fn(50, 50, |x, y| (10..30).contains(&x) && (10..30).contains(&y));
        let doc = vectorize(&mask, &EngraveConfig::default());
        assert_eq!(doc.paths.len(), 1);
        let path = &doc.paths[0];
        assert!(path.closed);
        assert_eq!(path.points.len(), 4);
        assert!((path.stroke_width - EngraveConfig::DEFAULT_STROKE_WIDTH).abs() < f64::EPSILON);
    }

    #[test]
    fn polarity_does_not_change_square_outline() {
        // Dark-on-light and light-on-dark renderings of the same shape
        // both trace the shape itself.
        let dark = mask_from_fn(50, 50, |x, y| (10..30).contains(&x) && (10..30).contains(&y));
        let light = dark.inverted();
        let a = vectorize(&dark, &EngraveConfig::default());
        let b = vectorize(&light, &EngraveConfig::default());
        assert_eq!(a.paths, b.paths);
    }

    #[test]
    fn ring_yields_outer_and_hole_paths() {
        let mask = mask_from_fn(60, 60, |x, y| {
            let outer = (10..50).contains(&x) && (10..50).contains(&y);
            let inner = (20..40).contains(&x) && (20..40).contains(&y);
            outer && !inner
        });
        let doc = vectorize(&mask, &EngraveConfig::default());
        assert_eq!(doc.paths.len(), 2);
        assert_eq!(doc.stats.contours, 2);
    }

    #[test]
    fn specks_are_dropped() {
        let mask = mask_from_fn(20, 20, |x, y| (x, y) == (5, 5) || ((12..14).contains(&x) && y == 12));
        let doc = vectorize(&mask, &EngraveConfig::default());
        assert!(doc.paths.is_empty());
        assert!(doc.stats.paths <= doc.stats.contours);
    }

    #[test]
    fn simplification_never_adds_points() {
        let mask = mask_from_fn(80, 80, |x, y| {
            let dx = f64::from(x) - 40.0;
            let dy = f64::from(y) - 40.0;
            dx.hypot(dy) < 25.0
        });
        let doc = vectorize(&mask, &EngraveConfig::default());
        assert!(doc.stats.points_after <= doc.stats.points_before);
        assert!(doc.paths.iter().all(|p| p.points.len() >= 3));
    }

    #[test]
    fn deterministic() {
        let mask = mask_from_fn(40, 40, |x, y| (x * y) % 7 == 0);
        let config = EngraveConfig::default();
        assert_eq!(vectorize(&mask, &config), vectorize(&mask, &config));
    }
}

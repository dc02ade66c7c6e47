//! Contour tracing: extract boundary chains (with hierarchy) from a
//! binary image.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! Nonzero pixels are foreground. Each traced [`Contour`] records
//! whether it bounds a foreground region from outside
//! ([`BorderKind::Outer`]) or a background hole inside one
//! ([`BorderKind::Hole`]), plus the index of its enclosing contour.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Which side of a foreground region a contour runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderKind {
    /// Outside boundary of a foreground component.
    Outer,
    /// Boundary of a background hole inside a component.
    Hole,
}

/// One traced boundary.
///
/// Never mutated after tracing; simplification produces a new point
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    /// Boundary pixels in tracing order. The chain is implicitly closed.
    pub points: Vec<Point>,
    /// Outer boundary or hole.
    pub border: BorderKind,
    /// Index of the enclosing contour in the same trace, if any.
    pub parent: Option<usize>,
}

impl Contour {
    /// Number of points in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the chain has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether this is a top-level outer boundary.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self.border, BorderKind::Outer) && self.parent.is_none()
    }

    /// Drop interior points of straight horizontal, vertical and
    /// diagonal runs, keeping only the points where the chain turns.
    ///
    /// The starting point is always kept.
    #[must_use]
    pub fn compressed(&self) -> Self {
        let n = self.points.len();
        if n < 3 {
            return self.clone();
        }
        let step = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());
        let points = (0..n)
            .filter(|&i| {
                if i == 0 {
                    return true;
                }
                let prev = self.points[i - 1];
                let here = self.points[i];
                let next = self.points[(i + 1) % n];
                step(prev, here) != step(here, next)
            })
            .map(|i| self.points[i])
            .collect();
        Self {
            points,
            border: self.border,
            parent: self.parent,
        }
    }
}

/// Which contours a trace keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retrieval {
    /// Every contour with its parent/hole hierarchy.
    #[default]
    Tree,
    /// Top-level outer boundaries only.
    External,
}

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    #[default]
    BorderFollowing,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary image (nonzero = foreground).
/// Output: contours in discovery order. Discovery order is a raster
/// scan, so it is stable for identical input.
pub trait ContourTracer {
    /// Trace contours in the given binary image.
    fn trace(&self, image: &GrayImage, retrieval: Retrieval) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, image: &GrayImage, retrieval: Retrieval) -> Vec<Contour> {
        let contours = match *self {
            Self::BorderFollowing => trace_border_following(image),
        };
        match retrieval {
            Retrieval::Tree => contours,
            Retrieval::External => contours
                .into_iter()
                .filter(Contour::is_external)
                .map(|c| Contour { parent: None, ..c })
                .collect(),
        }
    }
}

fn trace_border_following(image: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<i32>(image)
        .into_iter()
        .map(|c| Contour {
            points: c.points.iter().map(|p| Point::new(p.x, p.y)).collect(),
            border: match c.border_type {
                imageproc::contours::BorderType::Outer => BorderKind::Outer,
                imageproc::contours::BorderType::Hole => BorderKind::Hole,
            },
            parent: c.parent,
        })
        .collect()
}

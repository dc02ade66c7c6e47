//! Pendant mask: confine a binary image to a centered circle.
//!
//! Round pendants are engraved inside a circle, so everything outside
//! it is forced to background (255). The canvas keeps its dimensions;
//! the circle is a mask, not a crop.

use image::GrayImage;

use crate::types::{BinaryMask, Dimensions};

/// The engravable circle of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendantCircle {
    /// Center column (`width / 2`).
    pub cx: u32,
    /// Center row (`height / 2`).
    pub cy: u32,
    /// Radius in pixels (`min(width, height) / 2 - margin`).
    ///
    /// A radius of zero still covers the center pixel. `None` when the
    /// margin exceeds half the shorter side, in which case no pixel is
    /// inside.
    pub radius: Option<u32>,
}

impl PendantCircle {
    /// The circle for a canvas of `dimensions` with `margin` pixels
    /// between the circle and the shorter edge.
    #[must_use]
    pub const fn for_canvas(dimensions: Dimensions, margin: u32) -> Self {
        let shorter = if dimensions.width < dimensions.height {
            dimensions.width
        } else {
            dimensions.height
        };
        Self {
            cx: dimensions.width / 2,
            cy: dimensions.height / 2,
            radius: (shorter / 2).checked_sub(margin),
        }
    }

    /// Whether pixel `(x, y)` lies inside or on the circle.
    #[must_use]
    pub fn contains(self, x: u32, y: u32) -> bool {
        let Some(radius) = self.radius else {
            return false;
        };
        let dx = i64::from(x) - i64::from(self.cx);
        let dy = i64::from(y) - i64::from(self.cy);
        let r = i64::from(radius);
        dx * dx + dy * dy <= r * r
    }
}

/// Force every pixel outside the pendant circle to 255.
#[must_use = "returns the masked image"]
pub fn apply_pendant(image: &GrayImage, margin: u32) -> GrayImage {
    let circle = PendantCircle::for_canvas(Dimensions::of(image), margin);
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if !circle.contains(x, y) {
            pixel.0[0] = BinaryMask::BACKGROUND;
        }
    }
    tracing::debug!(
        cx = circle.cx,
        cy = circle.cy,
        radius = ?circle.radius,
        "applied pendant mask"
    );
    out
}

/// [`apply_pendant`] for a mask that is already binary. The result stays
/// binary since only 255 is written.
#[must_use = "returns the masked image"]
pub fn apply_pendant_mask(mask: &BinaryMask, margin: u32) -> BinaryMask {
    BinaryMask::threshold(&apply_pendant(mask.as_gray(), margin), 127)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn circle_geometry() {
        let circle = PendantCircle::for_canvas(dims(400, 300), 10);
        assert_eq!(circle.cx, 200);
        assert_eq!(circle.cy, 150);
        assert_eq!(circle.radius, Some(140));
    }

    #[test]
    fn boundary_pixel_is_inside() {
        let circle = PendantCircle::for_canvas(dims(100, 100), 10);
        assert!(circle.contains(50 + 40, 50));
        assert!(!circle.contains(50 + 41, 50));
    }

    #[test]
    fn zero_radius_keeps_center_pixel() {
        let circle = PendantCircle::for_canvas(dims(20, 20), 10);
        assert_eq!(circle.radius, Some(0));
        assert!(circle.contains(10, 10));
        assert!(!circle.contains(11, 10));
        let out = apply_pendant(&GrayImage::new(20, 20), 10);
        let inside: Vec<(u32, u32)> = out
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(inside, vec![(10, 10)]);
    }

    #[test]
    fn margin_larger_than_half_side_leaves_nothing_inside() {
        let circle = PendantCircle::for_canvas(dims(16, 16), 10);
        assert_eq!(circle.radius, None);
        assert!(!circle.contains(8, 8));
        let img = GrayImage::new(16, 16);
        assert!(apply_pendant(&img, 10).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn exterior_is_exactly_white_interior_untouched() {
        let img = GrayImage::new(60, 40);
        let out = apply_pendant(&img, 10);
        let circle = PendantCircle::for_canvas(dims(60, 40), 10);
        for (x, y, p) in out.enumerate_pixels() {
            if circle.contains(x, y) {
                assert_eq!(p.0[0], 0, "inside pixel ({x}, {y}) changed");
            } else {
                assert_eq!(p.0[0], 255, "outside pixel ({x}, {y}) not white");
            }
        }
    }

    #[test]
    fn dimensions_are_preserved() {
        let img = GrayImage::new(33, 71);
        assert_eq!(apply_pendant(&img, 10).dimensions(), (33, 71));
    }

    #[test]
    fn binary_mask_stays_binary() {
        let mask = BinaryMask::threshold(&GrayImage::new(50, 50), 127);
        let out = apply_pendant_mask(&mask, 10);
        assert!(out.as_gray().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(out.as_gray().get_pixel(0, 0).0[0], 255);
        assert_eq!(out.as_gray().get_pixel(25, 25).0[0], 0);
    }
}

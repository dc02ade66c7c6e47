//! Two-threshold (Canny) edge detection.
//!
//! Unlike `imageproc::edges::canny`, this variant does not blur
//! internally: every style decides its own smoothing, and the detailed
//! and bold recipes run the detector directly on unsmoothed data. The
//! gradient magnitude is the L1 norm `|gx| + |gy|` of the 3×3 Sobel
//! responses, which keeps the 50/150-style thresholds on the familiar
//! scale.
//!
//! Hysteresis uses an explicit stack and bounds-checks all eight
//! neighbors, so edges touching the image border are safe to follow.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// tan(22.5°)
const TAN_22_5: f32 = 0.414_213_57;
/// tan(67.5°)
const TAN_67_5: f32 = 2.414_213_6;

/// Run Canny edge detection.
///
/// Returns a binary image: 255 for edge pixels, 0 elsewhere. Pixels
/// whose suppressed gradient magnitude exceeds `high_threshold` seed
/// edges; pixels above `low_threshold` join an edge if connected
/// (8-neighborhood) to a seed. The thresholds may be given in either
/// order.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (low, high) = if low_threshold <= high_threshold {
        (low_threshold, high_threshold)
    } else {
        (high_threshold, low_threshold)
    };

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let suppressed = non_maximum_suppression(&gx, &gy);
    hysteresis(&suppressed, image.width(), image.height(), low, high)
}

/// Keep only pixels whose L1 gradient magnitude is a local maximum
/// across the edge. The outermost ring of pixels is always zero.
///
/// Ties are broken asymmetrically (strictly greater than the first
/// neighbor, at least the second) so a plateau yields a single line.
fn non_maximum_suppression(gx: &Image<Luma<i16>>, gy: &Image<Luma<i16>>) -> Vec<f32> {
    let (w, h) = (gx.width() as usize, gx.height() as usize);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(dx, dy)| f32::from(dx.0[0].unsigned_abs()) + f32::from(dy.0[0].unsigned_abs()))
        .collect();

    let mut out = vec![0.0f32; w * h];
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let idx = y * w + x;
            let m = magnitude[idx];
            if m <= 0.0 {
                continue;
            }
            let dx = f32::from(gx.as_raw()[idx]);
            let dy = f32::from(gy.as_raw()[idx]);
            let (ax, ay) = (dx.abs(), dy.abs());

            let (a, b) = if ay <= ax * TAN_22_5 {
                (magnitude[idx - 1], magnitude[idx + 1])
            } else if ay >= ax * TAN_67_5 {
                (magnitude[idx - w], magnitude[idx + w])
            } else if (dx > 0.0) == (dy > 0.0) {
                (magnitude[idx - w - 1], magnitude[idx + w + 1])
            } else {
                (magnitude[idx - w + 1], magnitude[idx + w - 1])
            };

            if m > a && m >= b {
                out[idx] = m;
            }
        }
    }
    out
}

/// Link edge pixels with a non-recursive depth-first walk.
fn hysteresis(suppressed: &[f32], width: u32, height: u32, low: f32, high: f32) -> GrayImage {
    let mut out = GrayImage::new(width, height);
    let (w, h) = (width as usize, height as usize);
    let mut stack = Vec::new();

    for start in 0..suppressed.len() {
        if suppressed[start] <= high || out.as_raw()[start] != 0 {
            continue;
        }
        mark(&mut out, start, w);
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            for (nx, ny) in neighbors(x, y, w, h) {
                let n = ny * w + nx;
                if suppressed[n] > low && out.as_raw()[n] == 0 {
                    mark(&mut out, n, w);
                    stack.push(n);
                }
            }
        }
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn mark(out: &mut GrayImage, idx: usize, width: usize) {
    out.put_pixel((idx % width) as u32, (idx / width) as u32, Luma([255]));
}

/// In-bounds 8-neighborhood of `(x, y)`.
fn neighbors(x: usize, y: usize, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    const OFFSETS: [(isize, isize); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];
    OFFSETS.iter().filter_map(move |&(dx, dy)| {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < w && ny < h).then_some((nx, ny))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_count(edges: &GrayImage) -> u32 {
        edges.pixels().map(|p| u32::from(p.0[0] > 0)).sum()
    }

    /// Strong gradient one pixel from the left border: the walk must
    /// not step outside the image.
    #[test]
    fn border_edge_does_not_panic() {
        let img = GrayImage::from_fn(10, 10, |x, _| Luma([if x >= 1 { 255 } else { 0 }]));
        let _edges = canny(&img, 1.0, 2.0);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = GrayImage::new(17, 31);
        let edges = canny(&img, 50.0, 150.0);
        assert_eq!(edges.dimensions(), (17, 31));
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert_eq!(edge_count(&canny(&img, 50.0, 150.0)), 0);
    }

    #[test]
    fn sharp_edge_detected_as_single_line() {
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        let edges = canny(&img, 50.0, 150.0);
        for y in 1..19 {
            let row: u32 = (0..20).map(|x| u32::from(edges.get_pixel(x, y).0[0] > 0)).sum();
            assert_eq!(row, 1, "expected exactly one edge pixel in row {y}");
        }
    }

    #[test]
    fn output_is_binary() {
        let img = GrayImage::from_fn(30, 30, |x, y| Luma([u8::try_from((x * 7 + y * 13) % 256).unwrap_or(0)]));
        let edges = canny(&img, 30.0, 90.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn weak_edge_without_seed_is_dropped() {
        // Step of 20 gives an L1 magnitude of 80: above low, below high.
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 100 } else { 120 }]));
        assert_eq!(edge_count(&canny(&img, 50.0, 150.0)), 0);
        assert!(edge_count(&canny(&img, 50.0, 60.0)) > 0);
    }

    #[test]
    fn threshold_order_does_not_matter() {
        let img = GrayImage::from_fn(20, 20, |x, y| Luma([if x + y < 20 { 0 } else { 200 }]));
        assert_eq!(canny(&img, 150.0, 50.0), canny(&img, 50.0, 150.0));
    }

    #[test]
    fn tiny_image_has_no_edges() {
        let img = GrayImage::from_fn(2, 2, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        assert_eq!(edge_count(&canny(&img, 10.0, 20.0)), 0);
    }
}

//! End-to-end properties of the pipeline on synthetic images.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::{GrayImage, Luma};
use pupring_pipeline::contour::{BorderKind, ContourTracer, ContourTracerKind, Retrieval};
use pupring_pipeline::pendant::PendantCircle;
use pupring_pipeline::style::run_style;
use pupring_pipeline::threshold::{AdaptiveMethod, AdaptiveParams, adaptive_threshold};
use pupring_pipeline::{
    EngraveConfig, EngraveOptions, KernelSize, Style, StyleSelection, compute_metrics, edge,
    engrave_gray, simplify,
};

/// 400×400 white page with a solid black 50×50 square in the middle.
fn black_square() -> GrayImage {
    GrayImage::from_fn(400, 400, |x, y| {
        let inside = (175..225).contains(&x) && (175..225).contains(&y);
        Luma([if inside { 0 } else { 255 }])
    })
}

/// Smooth gradients plus a few shapes, to give every style something
/// to find.
fn busy_scene() -> GrayImage {
    GrayImage::from_fn(96, 80, |x, y| {
        let base = u8::try_from((x * 2 + y) % 256).unwrap_or(0);
        let disk = {
            let dx = f64::from(x) - 30.0;
            let dy = f64::from(y) - 40.0;
            dx.hypot(dy) < 18.0
        };
        let bar = (60..80).contains(&x) && (10..70).contains(&y);
        Luma([if disk { 20 } else if bar { 230 } else { base }])
    })
}

#[test]
fn uniform_white_standard_has_almost_no_ink() {
    let img = GrayImage::from_pixel(400, 400, Luma([255]));
    let mask = run_style(&img, Style::Standard, &EngraveConfig::default()).unwrap();
    let metrics = compute_metrics(&mask);
    assert!(metrics.black_ratio < 0.01, "black ratio {}", metrics.black_ratio);
}

#[test]
fn square_gradient_edges_trace_one_outer_contour() {
    let edges = edge::gradient_threshold(&black_square(), 30, false);
    let contours = ContourTracerKind::BorderFollowing.trace(&edges, Retrieval::Tree);
    let outer: Vec<_> = contours
        .iter()
        .filter(|c| c.border == BorderKind::Outer)
        .collect();
    assert_eq!(outer.len(), 1);

    let compressed = outer[0].compressed();
    let simplified = simplify::simplify_closed(&compressed.points, 2.0);
    assert!(
        (4..=8).contains(&simplified.len()),
        "simplified outline has {} points",
        simplified.len()
    );
}

#[test]
fn every_style_output_is_binary() {
    let img = busy_scene();
    let config = EngraveConfig::default();
    for style in Style::ALL {
        let mask = run_style(&img, style, &config).unwrap();
        assert!(
            mask.as_gray().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255),
            "{style}"
        );
    }
}

#[test]
fn full_request_is_deterministic() {
    let img = busy_scene();
    let options = EngraveOptions::default();
    let config = EngraveConfig::default();
    let a = engrave_gray(&img, &options, &config).unwrap();
    let b = engrave_gray(&img, &options, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn even_block_size_behaves_as_next_odd() {
    assert_eq!(KernelSize::new(16), KernelSize::new(17));
    let img = busy_scene();
    let even = adaptive_threshold(&img, AdaptiveParams::new(AdaptiveMethod::Mean, 16, 2.0));
    let odd = adaptive_threshold(&img, AdaptiveParams::new(AdaptiveMethod::Mean, 17, 2.0));
    assert_eq!(even, odd);
}

#[test]
fn professional_exterior_is_white() {
    let img = busy_scene();
    let config = EngraveConfig::default();
    let mask = run_style(&img, Style::Professional, &config).unwrap();
    let circle = PendantCircle::for_canvas(mask.dimensions(), config.pendant_margin);
    for (x, y, p) in mask.as_gray().enumerate_pixels() {
        if !circle.contains(x, y) {
            assert_eq!(p.0[0], 255, "({x}, {y}) is outside the pendant");
        }
    }
}

#[test]
fn all_with_filter_keeps_baseline() {
    let options = EngraveOptions {
        selection: StyleSelection::All,
        filter: vec![Style::Crosshatch],
        vectorize: false,
        ..EngraveOptions::default()
    };
    let result = engrave_gray(&busy_scene(), &options, &EngraveConfig::default()).unwrap();
    let keys: Vec<Style> = result.masks.keys().copied().collect();
    assert_eq!(
        keys,
        vec![Style::Standard, Style::Detailed, Style::Bold, Style::Crosshatch]
    );
}

#[test]
fn vector_paths_never_exceed_contours() {
    let result = engrave_gray(
        &busy_scene(),
        &EngraveOptions {
            selection: StyleSelection::Single(Style::Canny),
            ..EngraveOptions::default()
        },
        &EngraveConfig::default(),
    )
    .unwrap();
    let doc = result.vector.unwrap();
    assert!(doc.stats.paths <= doc.stats.contours);
    assert!(doc.stats.points_after <= doc.stats.points_before);
    assert!(doc.paths.iter().all(|p| p.points.len() >= 3));
}

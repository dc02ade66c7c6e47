//! pupring-pipeline: Pure photo-to-engraving pipeline (sans-IO).
//!
//! Turns an encoded photo into black-on-white engraving masks through:
//! decode -> flatten alpha -> grayscale -> optional crop -> one fixed
//! recipe per style (preprocess, edge/threshold extraction,
//! postprocess) -> optional pendant mask -> metrics -> vectorization of
//! the primary style.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. PNG/SVG serialization lives
//! in `pupring-export`; transport decoding lives in `pupring-service`.

pub mod background;
pub mod blur;
pub mod canny;
pub mod contour;
pub mod denoise;
pub mod edge;
pub mod grayscale;
pub mod halftone;
pub mod metrics;
pub mod morphology;
pub mod pendant;
pub mod preprocess;
pub mod professional;
pub mod simplify;
pub mod style;
pub mod threshold;
pub mod types;
pub mod vectorize;

use std::time::Instant;

pub use background::{Cutout, remove_background};
pub use contour::{ContourTracer, ContourTracerKind};
pub use metrics::{MaskMetrics, compute_metrics};
pub use style::{Style, StyleProfile, StyleSelection};
pub use types::{
    BinaryMask, CropRect, Dimensions, EngraveConfig, EngraveError, EngraveOptions,
    EngravingResult, ErrorKind, GrayImage, KernelSize, Point,
};
pub use vectorize::{VectorDocument, VectorPath, VectorizeStats, vectorize};

/// Run a full engraving request on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), the request options
/// and a configuration, and produces an [`EngravingResult`] holding one
/// mask per produced style, their metrics and, if requested, the vector
/// document of the primary style.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decode, flatten alpha onto white, convert to grayscale
/// 3. Optional crop
/// 4. Run every selected style
/// 5. Optional pendant mask on every mask
/// 6. Metrics per style
/// 7. Optional vectorization of the primary style
///
/// # Errors
///
/// Returns [`EngraveError::InvalidConfig`] for out-of-range config
/// values, the decode variants of [`EngraveError`] for unreadable
/// input, and [`EngraveError::Processing`] if a stage fails. Nothing
/// partial is returned.
pub fn engrave(
    image_bytes: &[u8],
    options: &EngraveOptions,
    config: &EngraveConfig,
) -> Result<EngravingResult, EngraveError> {
    config.validate()?;
    let gray = grayscale::decode_and_grayscale(image_bytes, options.crop)?;
    engrave_gray(&gray, options, config)
}

/// [`engrave`] for an image that is already decoded to grayscale.
///
/// `options.crop` is not applied here; crop before calling.
///
/// # Errors
///
/// Same as [`engrave`], minus the decode failures.
pub fn engrave_gray(
    gray: &GrayImage,
    options: &EngraveOptions,
    config: &EngraveConfig,
) -> Result<EngravingResult, EngraveError> {
    config.validate()?;
    let start = Instant::now();
    let dimensions = Dimensions::of(gray);
    if dimensions.pixel_count() == 0 {
        return Err(EngraveError::ZeroDimensions {
            width: dimensions.width,
            height: dimensions.height,
        });
    }

    let mut masks = style::run_selection(gray, options.selection, &options.filter, config)?;
    if options.pendant {
        for mask in masks.values_mut() {
            *mask = pendant::apply_pendant_mask(mask, config.pendant_margin);
        }
    }

    let metrics = masks
        .iter()
        .map(|(&style, mask)| (style, compute_metrics(mask)))
        .collect();

    let primary = options.selection.primary();
    let vector = if options.vectorize {
        let mask = masks.get(&primary).ok_or_else(|| {
            EngraveError::Processing(format!("primary style {primary} was not produced"))
        })?;
        Some(vectorize(mask, config))
    } else {
        None
    };

    tracing::info!(
        width = dimensions.width,
        height = dimensions.height,
        styles = masks.len(),
        %primary,
        pendant = options.pendant,
        paths = vector.as_ref().map_or(0, |doc| doc.paths.len()),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "engraving complete"
    );

    Ok(EngravingResult {
        dimensions,
        masks,
        metrics,
        primary,
        vector,
    })
}

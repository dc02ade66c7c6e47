//! Outgoing response shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pupring_export::{SvgMetadata, encode_rgba_png, png_data_uri, to_data_uri, to_svg};
use pupring_pipeline::{
    Cutout, EngraveError, EngravingResult, ErrorKind, MaskMetrics, StyleSelection,
    VectorizeStats,
};

/// Successful engraving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngraveResponse {
    /// Always `true`.
    pub success: bool,
    /// The requested selection (`"all"` or a style name).
    pub style: String,
    /// Style name to `data:image/png;base64,...` mask.
    pub styles: BTreeMap<String, String>,
    /// SVG of the primary style, if vectorization was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
    /// Style name to mask coverage.
    pub metrics: BTreeMap<String, MaskMetrics>,
    /// Vectorizer counters, if vectorization was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_stats: Option<VectorizeStats>,
    /// Processed image width.
    pub width: u32,
    /// Processed image height.
    pub height: u32,
}

impl EngraveResponse {
    /// Serialize a pipeline result.
    ///
    /// # Errors
    ///
    /// Returns [`EngraveError::Encoding`] if a mask cannot be written
    /// as PNG.
    pub fn from_result(
        selection: StyleSelection,
        result: &EngravingResult,
    ) -> Result<Self, EngraveError> {
        let styles = result
            .masks
            .iter()
            .map(|(style, mask)| -> Result<(String, String), EngraveError> {
                Ok((style.to_string(), png_data_uri(mask)?))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let metrics = result
            .metrics
            .iter()
            .map(|(style, m)| (style.to_string(), *m))
            .collect();

        let description = format!("style={}", result.primary);
        let svg = result.vector.as_ref().map(|doc| {
            to_svg(
                doc,
                &SvgMetadata {
                    title: None,
                    description: Some(&description),
                },
            )
        });

        Ok(Self {
            success: true,
            style: selection.to_string(),
            styles,
            svg,
            metrics,
            vector_stats: result.vector.as_ref().map(|doc| doc.stats),
            width: result.dimensions.width,
            height: result.dimensions.height,
        })
    }
}

/// Successful background removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoutResponse {
    /// Always `true`.
    pub success: bool,
    /// `data:image/png;base64,...` RGBA image.
    pub image: String,
    /// Whether the backdrop was made transparent.
    pub has_transparency: bool,
    /// Set when no subject was found and the photo came back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CutoutResponse {
    /// Serialize a cutout.
    ///
    /// # Errors
    ///
    /// Returns [`EngraveError::Encoding`] if the image cannot be written
    /// as PNG.
    pub fn from_cutout(cutout: &Cutout) -> Result<Self, EngraveError> {
        let png = encode_rgba_png(&cutout.image)?;
        Ok(Self {
            success: true,
            image: to_data_uri(&png),
            has_transparency: cutout.has_transparency,
            message: (!cutout.has_transparency)
                .then(|| "no clear subject detected, returning the original".to_owned()),
        })
    }
}

/// Failed request. No partial results are included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub error: String,
}

impl From<&EngraveError> for ErrorResponse {
    fn from(err: &EngraveError) -> Self {
        Self {
            success: false,
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

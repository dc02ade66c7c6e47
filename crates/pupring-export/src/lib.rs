//! pupring-export: Pure serializers for engraving output (sans-IO)
//!
//! Converts [`BinaryMask`](pupring_pipeline::BinaryMask)s and RGBA
//! cutouts into PNG bytes or base64 data URIs, and
//! [`VectorDocument`](pupring_pipeline::VectorDocument)s into SVG
//! markup.

pub mod png;
pub mod svg;

use pupring_pipeline::EngraveError;

pub use png::{decode_png, encode_png, encode_rgba_png, png_data_uri, to_data_uri};
pub use svg::{SvgMetadata, build_path_data, to_svg};

/// Errors produced while serializing results.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The PNG codec failed.
    #[error("png codec error: {0}")]
    Png(#[from] image::ImageError),

    /// Decoded PNG data is not a valid mask.
    #[error("decoded image is not a mask: {0}")]
    NotAMask(#[source] EngraveError),
}

impl From<ExportError> for EngraveError {
    fn from(err: ExportError) -> Self {
        Self::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pupring_pipeline::ErrorKind;

    use super::*;

    #[test]
    fn export_errors_surface_as_encoding() {
        let err = ExportError::NotAMask(EngraveError::Processing("gray".to_owned()));
        let engrave: EngraveError = err.into();
        assert_eq!(engrave.kind(), ErrorKind::Encoding);
        assert!(engrave.to_string().contains("gray"));
    }
}

//! Incoming request shape and transport decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use pupring_pipeline::style::parse_styles;
use pupring_pipeline::{CropRect, EngraveError, EngraveOptions, StyleSelection};

/// One engraving request as received over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngraveRequest {
    /// Base64 image, optionally prefixed with a `data:*;base64,` header.
    pub image: String,

    /// A style name or `"all"`.
    #[serde(default = "default_style")]
    pub style: String,

    /// Style names narrowing `"all"`.
    #[serde(default)]
    pub filter: Vec<String>,

    /// Confine every mask to the pendant circle.
    #[serde(default)]
    pub pendant: bool,

    /// Face region to crop to before engraving.
    #[serde(default)]
    pub crop: Option<CropRect>,

    /// Produce the SVG of the primary style.
    #[serde(default = "default_vectorize")]
    pub vectorize: bool,
}

fn default_style() -> String {
    "all".to_owned()
}

const fn default_vectorize() -> bool {
    true
}

impl EngraveRequest {
    /// A request for `style` with every other field at its default.
    #[must_use]
    pub fn new(image: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            style: style.into(),
            filter: Vec::new(),
            pendant: false,
            crop: None,
            vectorize: default_vectorize(),
        }
    }

    /// Resolve the style names into pipeline options.
    ///
    /// # Errors
    ///
    /// Returns [`EngraveError::UnknownStyle`] if `style` or any `filter`
    /// entry is not a known style.
    pub fn options(&self) -> Result<EngraveOptions, EngraveError> {
        let selection: StyleSelection = self.style.parse()?;
        Ok(EngraveOptions {
            selection,
            filter: parse_styles(&self.filter)?,
            pendant: self.pendant,
            crop: self.crop,
            vectorize: self.vectorize,
        })
    }

    /// Decode the image payload to raw bytes.
    ///
    /// # Errors
    ///
    /// See [`decode_payload`].
    pub fn image_bytes(&self) -> Result<Vec<u8>, EngraveError> {
        decode_payload(&self.image)
    }
}

/// A background-removal request: just the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoutRequest {
    /// Base64 image, optionally prefixed with a `data:*;base64,` header.
    pub image: String,
}

impl CutoutRequest {
    /// Decode the image payload to raw bytes.
    ///
    /// # Errors
    ///
    /// See [`decode_payload`].
    pub fn image_bytes(&self) -> Result<Vec<u8>, EngraveError> {
        decode_payload(&self.image)
    }
}

/// Decode a base64 image payload, stripping a data-URI header if
/// present.
///
/// # Errors
///
/// Returns [`EngraveError::EmptyInput`] for an empty payload and
/// [`EngraveError::InvalidPayload`] for a data URI that is not base64
/// or text that is not valid base64.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, EngraveError> {
    let payload = payload.trim();
    let body = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest.split_once(',').ok_or_else(|| {
                EngraveError::InvalidPayload("data URI has no ',' separator".to_owned())
            })?;
            if !header.ends_with(";base64") {
                return Err(EngraveError::InvalidPayload(format!(
                    "data URI is not base64 encoded: {header:?}"
                )));
            }
            body
        }
        None => payload,
    };

    // Transports sometimes wrap long base64 lines.
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(EngraveError::EmptyInput);
    }
    STANDARD
        .decode(compact)
        .map_err(|e| EngraveError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pupring_pipeline::Style;

    use super::*;

    #[test]
    fn plain_base64_decodes() {
        assert_eq!(decode_payload("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn data_uri_header_is_stripped() {
        assert_eq!(
            decode_payload("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn wrapped_lines_are_accepted() {
        assert_eq!(decode_payload("aGVs\nbG8=\n").unwrap(), b"hello");
    }

    #[test]
    fn non_base64_data_uri_is_rejected() {
        assert!(matches!(
            decode_payload("data:text/plain,hello"),
            Err(EngraveError::InvalidPayload(_))
        ));
    }

    #[test]
    fn garbage_is_invalid_payload() {
        assert!(matches!(
            decode_payload("***not base64***"),
            Err(EngraveError::InvalidPayload(_))
        ));
    }

    #[test]
    fn empty_payload_is_empty_input() {
        assert!(matches!(decode_payload(""), Err(EngraveError::EmptyInput)));
        assert!(matches!(
            decode_payload("data:image/png;base64,"),
            Err(EngraveError::EmptyInput)
        ));
    }

    #[test]
    fn defaults_from_json() {
        let req: EngraveRequest = serde_json::from_str(r#"{"image": "aGVsbG8="}"#).unwrap();
        assert_eq!(req.style, "all");
        assert!(req.filter.is_empty());
        assert!(!req.pendant);
        assert!(req.crop.is_none());
        assert!(req.vectorize);
    }

    #[test]
    fn options_parse_style_and_filter() {
        let mut req = EngraveRequest::new("", "all");
        req.filter = vec!["halftone".to_owned()];
        let options = req.options().unwrap();
        assert_eq!(options.selection, StyleSelection::All);
        assert_eq!(options.filter, vec![Style::Halftone]);
    }

    #[test]
    fn unknown_filter_entry_is_rejected() {
        let mut req = EngraveRequest::new("", "all");
        req.filter = vec!["glitter".to_owned()];
        assert!(matches!(req.options(), Err(EngraveError::UnknownStyle(_))));
    }
}

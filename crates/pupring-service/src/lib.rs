//! pupring-service: the request boundary.
//!
//! Accepts an [`EngraveRequest`] (base64 image plus style options),
//! runs the pipeline and returns an [`EngraveResponse`] with base64 PNG
//! masks, the SVG of the primary style and per-style metrics. Every
//! failure is turned into a typed [`ErrorResponse`]; nothing here
//! panics and nothing partial is returned.
//!
//! A second entry point, [`handle_cutout_json`], cuts the subject of a
//! photo out of a light backdrop and returns it as an RGBA PNG.
//!
//! The crate holds no state between calls. Hosting (HTTP, queues,
//! temp files) belongs to the caller.

pub mod request;
pub mod response;

use pupring_pipeline::{EngraveConfig, EngraveError, ErrorKind};
use serde::Serialize;

pub use request::{CutoutRequest, EngraveRequest, decode_payload};
pub use response::{CutoutResponse, EngraveResponse, ErrorResponse};

/// Handle a parsed request.
///
/// # Errors
///
/// Returns the first failure of option parsing, payload decoding, the
/// pipeline, or PNG encoding.
pub fn handle(
    request: &EngraveRequest,
    config: &EngraveConfig,
) -> Result<EngraveResponse, EngraveError> {
    let options = request.options()?;
    let bytes = request.image_bytes()?;
    let result = pupring_pipeline::engrave(&bytes, &options, config)?;
    EngraveResponse::from_result(options.selection, &result)
}

/// Handle a JSON request body and return a JSON response body.
///
/// Malformed JSON is reported as a `decode` failure.
#[must_use]
pub fn handle_json(body: &str, config: &EngraveConfig) -> String {
    let outcome = serde_json::from_str::<EngraveRequest>(body)
        .map_err(|e| EngraveError::InvalidPayload(format!("malformed request: {e}")))
        .and_then(|request| handle(&request, config));

    respond(&outcome, "engraving request failed")
}

/// Handle a parsed background-removal request.
///
/// # Errors
///
/// Returns payload decoding failures, image decode failures, or a PNG
/// encoding failure. A photo without a detectable subject is not an
/// error.
pub fn handle_cutout(request: &CutoutRequest) -> Result<CutoutResponse, EngraveError> {
    let bytes = request.image_bytes()?;
    let cutout = pupring_pipeline::remove_background(&bytes)?;
    CutoutResponse::from_cutout(&cutout)
}

/// [`handle_cutout`] for a JSON request body.
#[must_use]
pub fn handle_cutout_json(body: &str) -> String {
    let outcome = serde_json::from_str::<CutoutRequest>(body)
        .map_err(|e| EngraveError::InvalidPayload(format!("malformed request: {e}")))
        .and_then(|request| handle_cutout(&request));
    respond(&outcome, "background removal failed")
}

fn respond<T: Serialize>(outcome: &Result<T, EngraveError>, failure: &str) -> String {
    let serialized = match outcome {
        Ok(response) => serde_json::to_string(response),
        Err(err) => {
            tracing::warn!(kind = ?err.kind(), error = %err, "{failure}");
            serde_json::to_string(&ErrorResponse::from(err))
        }
    };

    serialized.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize response");
        let fallback = ErrorResponse {
            success: false,
            kind: ErrorKind::Encoding,
            error: "failed to serialize response".to_owned(),
        };
        serde_json::to_string(&fallback).unwrap_or_else(|_| {
            r#"{"success":false,"kind":"encoding","error":"failed to serialize response"}"#
                .to_owned()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_decode_failure() {
        let out = handle_json("{not json", &EngraveConfig::default());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value["success"], false);
        assert_eq!(value["kind"], "decode");
    }

    #[test]
    fn missing_image_field_is_decode_failure() {
        let out = handle_json(r#"{"style": "bold"}"#, &EngraveConfig::default());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value["kind"], "decode");
    }

    #[test]
    fn cutout_rejects_bad_payload() {
        let out = handle_cutout_json(r#"{"image": "!!not base64!!"}"#);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value["success"], false);
        assert_eq!(value["kind"], "decode");

        let out = handle_cutout_json("[]");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value["kind"], "decode");
    }

    #[test]
    fn unknown_style_checked_before_payload() {
        let request = EngraveRequest::new("***", "nonexistent");
        let err = handle(&request, &EngraveConfig::default()).err();
        assert!(matches!(err, Some(EngraveError::UnknownStyle(_))));
    }
}

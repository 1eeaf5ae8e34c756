//! Error type for the smartscan-auditor service.
//!
//! Every failure in the request pipeline is a variant of [`AuditError`].
//! There is exactly one error per request: each stage returns
//! `Err(AuditError)` at the point of detection and the `?` operator carries
//! it straight to the HTTP boundary, where [`AuditError::status_code`] and
//! the `Display` text become the `(status, detail)` pair sent to the client.
//!
//! Variants are grouped by the stage that raises them so the mapping table
//! in [`AuditError::status_code`] reads top-to-bottom like the pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// All failures produced while analysing a receipt.
#[derive(Debug, Error)]
pub enum AuditError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The upload is missing, has no filename, or the multipart body is bad.
    #[error("{0}")]
    InvalidInput(String),

    /// The upload exceeds the size ceiling.
    #[error("File too large (max {}MB)", .limit / (1024 * 1024))]
    TooLarge { limit: usize },

    /// The declared content type is not one of the accepted types.
    #[error("Invalid file type. Upload JPEG, PNG, WebP, or PDF.")]
    UnsupportedType { content_type: String },

    // ── Normalisation errors ──────────────────────────────────────────────
    /// The PDF could not be rasterised into an image.
    #[error("Could not convert PDF to image{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    ConversionFailed { detail: Option<String> },

    // ── Provider errors ───────────────────────────────────────────────────
    /// No provider credential is configured.
    #[error("{0}")]
    ConfigError(String),

    /// The provider reported quota or rate exhaustion.
    #[error("{provider} quota exceeded. Try again later.")]
    QuotaExceeded { provider: String },

    /// Any other provider-side failure.
    #[error("AI error: {message}")]
    ProviderError { message: String },

    /// The provider answered with no text.
    #[error("Empty AI response")]
    EmptyResponse,

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The model's answer is not a JSON object.
    #[error("Invalid AI JSON response")]
    MalformedResponse { detail: String },

    /// The model answered with an `error` field instead of receipt data.
    #[error("{0}")]
    UnreadableReceipt(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, pdfium unavailable, ...).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// HTTP status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuditError::InvalidInput(_)
            | AuditError::TooLarge { .. }
            | AuditError::UnsupportedType { .. }
            | AuditError::ConversionFailed { .. } => StatusCode::BAD_REQUEST,
            AuditError::UnreadableReceipt(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuditError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuditError::ConfigError(_)
            | AuditError::ProviderError { .. }
            | AuditError::EmptyResponse
            | AuditError::MalformedResponse { .. }
            | AuditError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable detail sent to the client.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "request failed");
        } else {
            warn!(status = status.as_u16(), detail = %self, "request rejected");
        }
        (status, Json(ErrorBody { detail: self.detail() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display() {
        let e = AuditError::TooLarge {
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(e.to_string(), "File too large (max 10MB)");
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unsupported_type_mentions_allowed_types() {
        let e = AuditError::UnsupportedType {
            content_type: "text/plain".into(),
        };
        let msg = e.to_string();
        for t in ["JPEG", "PNG", "WebP", "PDF"] {
            assert!(msg.contains(t), "got: {msg}");
        }
    }

    #[test]
    fn conversion_failed_display() {
        let bare = AuditError::ConversionFailed { detail: None };
        assert_eq!(bare.to_string(), "Could not convert PDF to image");

        let detailed = AuditError::ConversionFailed {
            detail: Some("bad xref".into()),
        };
        assert_eq!(detailed.to_string(), "Could not convert PDF to image: bad xref");
    }

    #[test]
    fn provider_failures_map_to_status() {
        let quota = AuditError::QuotaExceeded {
            provider: "Gemini".into(),
        };
        assert_eq!(quota.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(quota.to_string(), "Gemini quota exceeded. Try again later.");

        let other = AuditError::ProviderError {
            message: "connection reset".into(),
        };
        assert_eq!(other.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(other.to_string(), "AI error: connection reset");
    }

    #[test]
    fn unreadable_is_unprocessable() {
        let e = AuditError::UnreadableReceipt("Could not read receipt.".into());
        assert_eq!(e.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(e.detail(), "Could not read receipt.");
    }

    #[test]
    fn server_side_failures_are_500() {
        for e in [
            AuditError::ConfigError("GEMINI_API_KEY not set".into()),
            AuditError::EmptyResponse,
            AuditError::MalformedResponse {
                detail: "expected value".into(),
            },
            AuditError::Internal("boom".into()),
        ] {
            assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{e:?}");
        }
    }
}

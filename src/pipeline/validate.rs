//! Upload validation: reject empty or oversized uploads before any work.
//!
//! This is the first stage on purpose. Size is checked on the already-read
//! buffer so an oversized file never reaches the rasteriser or the provider.

use crate::error::AuditError;
use tracing::debug;

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A receipt as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-declared filename.
    pub filename: String,
    /// Client-declared MIME type; empty when the client sent none.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Check filename presence and the size ceiling.
pub fn validate_upload(file: &UploadedFile) -> Result<(), AuditError> {
    if file.filename.trim().is_empty() {
        return Err(AuditError::InvalidInput("No file provided".into()));
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AuditError::TooLarge {
            limit: MAX_UPLOAD_BYTES,
        });
    }
    debug!(
        "Upload '{}' accepted: {} bytes, type '{}'",
        file.filename,
        file.bytes.len(),
        file.content_type
    );
    Ok(())
}

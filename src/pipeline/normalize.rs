//! Normalisation: turn an accepted upload into one image the provider reads.
//!
//! Images pass through untouched. A PDF is reduced to its first page,
//! rendered by [`crate::pipeline::render`] and PNG-encoded by
//! [`crate::pipeline::encode`]. Every other content type is rejected here,
//! before any provider call.

use crate::error::AuditError;
use crate::pipeline::{encode, render};
use crate::pipeline::render::RenderOptions;
use std::fmt;
use tracing::debug;

/// Declared type of a PDF upload.
pub const PDF_MIME: &str = "application/pdf";

/// Image types the extraction provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Webp => "image/webp",
        }
    }

    /// Parse an exact (already normalised) MIME string.
    pub fn from_mime(mime: &str) -> Option<ImageMime> {
        match mime {
            "image/jpeg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            "image/webp" => Some(ImageMime::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single image ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
}

/// Strip MIME parameters and lowercase: `"Image/PNG; x=y"` → `"image/png"`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Normalise an upload to one provider-ready image.
pub async fn normalize_upload(
    content_type: &str,
    bytes: Vec<u8>,
    options: &RenderOptions,
) -> Result<NormalizedImage, AuditError> {
    let mime = essence(content_type);

    if let Some(image_mime) = ImageMime::from_mime(&mime) {
        debug!("Passing {} upload through unchanged", image_mime);
        return Ok(NormalizedImage {
            bytes,
            mime: image_mime,
        });
    }

    if mime == PDF_MIME {
        let page = render::render_first_page(bytes, options).await?;
        let png = encode::encode_png(&page).map_err(|e| AuditError::ConversionFailed {
            detail: Some(format!("PNG encoding failed: {}", e)),
        })?;
        return Ok(NormalizedImage {
            bytes: png,
            mime: ImageMime::Png,
        });
    }

    Err(AuditError::UnsupportedType {
        content_type: content_type.to_string(),
    })
}

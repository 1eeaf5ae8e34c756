//! PDF rasterisation: render the first page of an in-memory PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is CPU-bound. The render runs on Tokio's blocking pool so the
//! async workers keep serving other uploads meanwhile.
//!
//! Only page 1 is ever rendered. Multi-page receipts are out of scope; the
//! remaining pages are never touched.

use crate::error::AuditError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings for rasterising a PDF page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Target width in pixels; height is capped at the same value.
    pub target_width: u32,
    /// Where to load libpdfium from. `None` uses the system search path.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_width: 2000,
            pdfium_lib_path: None,
        }
    }
}

/// Rasterise page 1 of `pdf` into an image.
pub async fn render_first_page(
    pdf: Vec<u8>,
    options: &RenderOptions,
) -> Result<DynamicImage, AuditError> {
    let options = options.clone();

    tokio::task::spawn_blocking(move || render_first_page_blocking(&pdf, &options))
        .await
        .map_err(|e| AuditError::Internal(format!("Render task panicked: {}", e)))?
}

/// Bind to libpdfium, preferring an explicit path over the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, AuditError> {
    let bindings = match lib_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| AuditError::Internal(format!("Failed to bind to pdfium library: {:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of first-page rendering.
fn render_first_page_blocking(
    pdf: &[u8],
    options: &RenderOptions,
) -> Result<DynamicImage, AuditError> {
    let pdfium = bind_pdfium(options.pdfium_lib_path.as_deref())?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| AuditError::ConversionFailed {
            detail: Some(format!("{:?}", e)),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages, rendering page 1", pages.len());

    if pages.len() == 0 {
        return Err(AuditError::ConversionFailed { detail: None });
    }

    let page = pages.get(0).map_err(|e| AuditError::ConversionFailed {
        detail: Some(format!("{:?}", e)),
    })?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(options.target_width as i32)
        .set_maximum_height(options.target_width as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| AuditError::ConversionFailed {
            detail: Some(format!("{:?}", e)),
        })?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    Ok(image)
}

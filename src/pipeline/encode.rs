//! Image encoding: rendered page → PNG bytes, and image bytes → `ImageData`.
//!
//! PNG is used for rasterised PDF pages because it is lossless; JPEG
//! artefacts around small printed digits hurt the model's reading of totals.
//! VLM APIs take images as base64 inside the JSON request body, which
//! [`to_image_data`] produces.

use crate::pipeline::normalize::NormalizedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded page → {} bytes PNG", buf.len());
    Ok(buf)
}

/// Wrap a normalised image as a base64 attachment for the provider.
///
/// `detail: "high"` asks tiling models to keep full resolution; receipts
/// are mostly fine print.
pub fn to_image_data(image: &NormalizedImage) -> ImageData {
    let b64 = STANDARD.encode(&image.bytes);
    debug!(
        "Encoded {} image → {} bytes base64",
        image.mime.as_str(),
        b64.len()
    );
    ImageData::new(b64, image.mime.as_str()).with_detail("high")
}

//! # smartscan-auditor
//!
//! Categorise expense receipts with a Vision Language Model.
//!
//! A client uploads a receipt (JPEG, PNG, WebP, or a PDF whose first page
//! is used); the service sends it to a hosted VLM with a fixed instruction
//! prompt and returns merchant, total, tax category and a short
//! justification as JSON.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Validate   filename present, ≤ 10 MiB
//!  ├─ 2. Normalize  image passthrough, or PDF page 1 → PNG (pdfium)
//!  ├─ 3. Extract    one VLM call (skipped in demo mode)
//!  ├─ 4. Parse      strip ```json fences, decode, detect {"error": …}
//!  └─ 5. Respond    default missing fields, canonicalise category
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartscan_auditor::{router, AppState, AuditorConfig, ReceiptAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // DEMO_MODE, GEMINI_API_KEY, SMARTSCAN_MODEL, ...
//!     let config = AuditorConfig::from_env()?;
//!     let state = AppState::new(ReceiptAnalyzer::from_config(config)?);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, router(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `smartscan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod receipt;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::ReceiptAnalyzer;
pub use config::{AuditorConfig, AuditorConfigBuilder};
pub use error::AuditError;
pub use pipeline::llm::{Extractor, VisionExtractor};
pub use pipeline::normalize::{ImageMime, NormalizedImage};
pub use pipeline::validate::{UploadedFile, MAX_UPLOAD_BYTES};
pub use receipt::{Category, ExtractionResult};
pub use server::{router, serve, AppState};

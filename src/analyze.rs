//! Request orchestration: one upload in, one result or one error out.
//!
//! [`ReceiptAnalyzer::analyze`] runs the stages strictly in order:
//!
//! ```text
//! Received ─▶ Validated ─▶ Normalized ─▶ Extracted ─▶ Parsed ─▶ Responded
//!     └──────────┴─────────────┴────────────┴───────────┴──▶ Errored
//! ```
//!
//! Each arrow is one `?`. The first failure ends the request with exactly
//! one [`AuditError`]; nothing is retried and no partial result escapes.
//! Demo mode short-circuits between `Normalized` and `Extracted` with the
//! canned [`ExtractionResult::demo`] and never touches the provider.

use crate::config::AuditorConfig;
use crate::error::AuditError;
use crate::pipeline::llm::{self, Extractor, VisionExtractor};
use crate::pipeline::normalize::normalize_upload;
use crate::pipeline::parse::{parse_model_response, ModelReply};
use crate::pipeline::render::RenderOptions;
use crate::pipeline::validate::{validate_upload, UploadedFile};
use crate::prompts::RECEIPT_PROMPT;
use crate::receipt::ExtractionResult;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stateless receipt analysis pipeline shared by all requests.
#[derive(Clone)]
pub struct ReceiptAnalyzer {
    config: Arc<AuditorConfig>,
    extractor: Option<Arc<dyn Extractor>>,
    /// Reported when a non-demo request arrives and `extractor` is `None`.
    unavailable: String,
    render: RenderOptions,
}

impl fmt::Debug for ReceiptAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiptAnalyzer")
            .field("config", &self.config)
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn Extractor>"))
            .field("unavailable", &self.unavailable)
            .field("render", &self.render)
            .finish()
    }
}

impl ReceiptAnalyzer {
    /// Build an analyzer with an explicit extractor (or none).
    ///
    /// `None` means no credential is configured: every non-demo request
    /// fails with [`AuditError::ConfigError`].
    pub fn new(config: AuditorConfig, extractor: Option<Arc<dyn Extractor>>) -> Self {
        let render = RenderOptions {
            target_width: config.render_width,
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        };
        Self {
            config: Arc::new(config),
            extractor,
            unavailable: format!("{} not set", crate::config::API_KEY_VAR),
            render,
        }
    }

    /// Build an analyzer whose extractor is derived from `config`.
    ///
    /// No provider is constructed in demo mode. A provider whose credential
    /// is missing does not stop startup: its message is kept and returned
    /// as [`AuditError::ConfigError`] by every non-demo request.
    pub fn from_config(config: AuditorConfig) -> Result<Self, AuditError> {
        if config.demo_mode {
            return Ok(Self::new(config, None));
        }
        match VisionExtractor::from_config(&config) {
            Ok(extractor) => Ok(Self::new(config, Some(Arc::new(extractor)))),
            Err(AuditError::ConfigError(reason)) => {
                warn!("Provider '{}' unavailable: {}", config.provider_name, reason);
                let mut analyzer = Self::new(config, None);
                analyzer.unavailable = reason;
                Ok(analyzer)
            }
            Err(e) => Err(e),
        }
    }

    pub fn config(&self) -> &AuditorConfig {
        &self.config
    }

    /// Can non-demo requests reach a provider?
    pub fn provider_ready(&self) -> bool {
        self.extractor.is_some()
    }

    /// Analyse one uploaded receipt.
    pub async fn analyze(&self, upload: UploadedFile) -> Result<ExtractionResult, AuditError> {
        let start = Instant::now();
        info!(
            "Analyzing '{}' ({} bytes, '{}')",
            upload.filename,
            upload.bytes.len(),
            upload.content_type
        );

        // ── Step 1: Validate ─────────────────────────────────────────────
        validate_upload(&upload)?;

        // ── Step 2: Normalize ────────────────────────────────────────────
        let UploadedFile {
            content_type,
            bytes,
            ..
        } = upload;
        let image = normalize_upload(&content_type, bytes, &self.render).await?;
        debug!("Normalized to {} ({} bytes)", image.mime, image.bytes.len());

        // ── Step 3: Extract (or demo) ────────────────────────────────────
        if self.config.demo_mode {
            info!("Demo mode: returning canned result, no provider call");
            return Ok(ExtractionResult::demo());
        }

        let extractor = self
            .extractor
            .as_deref()
            .ok_or_else(|| AuditError::ConfigError(self.unavailable.clone()))?;

        let llm_start = Instant::now();
        let raw = llm::request_extraction(extractor, &image, &RECEIPT_PROMPT).await?;
        debug!(
            "Provider answered in {}ms ({} chars)",
            llm_start.elapsed().as_millis(),
            raw.len()
        );

        // ── Step 4: Parse ────────────────────────────────────────────────
        let fields = match parse_model_response(&raw)? {
            ModelReply::Fields(fields) => fields,
            ModelReply::Unreadable(message) => {
                return Err(AuditError::UnreadableReceipt(message));
            }
        };

        // ── Step 5: Default and respond ──────────────────────────────────
        let result = ExtractionResult::from_fields(&fields);
        info!(
            "Analysis complete: {} / {} in {}ms",
            result.merchant,
            result.category,
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::NormalizedImage;
    use crate::pipeline::validate::MAX_UPLOAD_BYTES;
    use async_trait::async_trait;
    use edgequake_llm::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub provider: answers with a fixed result and counts calls.
    struct Scripted {
        reply: Result<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Extractor for Scripted {
        async fn extract(&self, image: &NormalizedImage, prompt: &str) -> Result<String, AuditError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!image.bytes.is_empty());
            assert_eq!(prompt, RECEIPT_PROMPT.as_str());
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(llm::classify_provider_error(
                    "gemini",
                    &LlmError::ApiError(msg.to_string()),
                )),
            }
        }
    }

    fn analyzer(demo: bool, stub: &Arc<Scripted>) -> ReceiptAnalyzer {
        let config = AuditorConfig::builder().demo_mode(demo).build().unwrap();
        ReceiptAnalyzer::new(config, Some(Arc::clone(stub) as Arc<dyn Extractor>))
    }

    fn jpeg() -> UploadedFile {
        UploadedFile::new("receipt.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    fn run(analyzer: &ReceiptAnalyzer, upload: UploadedFile) -> Result<ExtractionResult, AuditError> {
        tokio_test::block_on(analyzer.analyze(upload))
    }

    #[test]
    fn successful_extraction() {
        let stub = Scripted::ok(
            "```json\n{\"merchant\":\"Staples\",\"total\":\"18.40\",\"category\":\"Office Supplies\",\"justification\":\"Printer paper.\"}\n```",
        );
        let result = run(&analyzer(false, &stub), jpeg()).unwrap();
        assert_eq!(result.merchant, "Staples");
        assert_eq!(result.total, "18.40");
        assert_eq!(result.category, "Office Supplies");
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn demo_mode_skips_provider() {
        let stub = Scripted::ok("{}");
        let result = run(&analyzer(true, &stub), jpeg()).unwrap();
        assert_eq!(result, ExtractionResult::demo());
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn demo_mode_still_validates() {
        let stub = Scripted::ok("{}");
        let upload = UploadedFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let err = run(&analyzer(true, &stub), upload).unwrap_err();
        assert!(matches!(err, AuditError::UnsupportedType { .. }));
    }

    #[test]
    fn missing_credential_is_config_error() {
        let config = AuditorConfig::default();
        let analyzer = ReceiptAnalyzer::from_config(config).unwrap();
        assert!(!analyzer.provider_ready());
        let err = run(&analyzer, jpeg()).unwrap_err();
        assert!(matches!(err, AuditError::ConfigError(_)));
        assert_eq!(err.to_string(), "GEMINI_API_KEY not set");
    }

    #[test]
    fn injected_key_builds_gemini_provider() {
        let config = AuditorConfig::builder()
            .api_key("injected-key")
            .build()
            .unwrap();
        let analyzer = ReceiptAnalyzer::from_config(config).unwrap();
        assert!(analyzer.provider_ready());
    }

    #[test]
    fn non_gemini_provider_needs_no_gemini_key() {
        // "mock" needs no credential; the mock answers with prose.
        let config = AuditorConfig::builder()
            .provider_name("mock")
            .model("mock-model")
            .build()
            .unwrap();
        let analyzer = ReceiptAnalyzer::from_config(config).unwrap();
        assert!(analyzer.provider_ready());
        assert!(matches!(
            run(&analyzer, jpeg()),
            Err(AuditError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn demo_mode_needs_no_credential() {
        let config = AuditorConfig::builder().demo_mode(true).build().unwrap();
        let analyzer = ReceiptAnalyzer::from_config(config).unwrap();
        assert_eq!(run(&analyzer, jpeg()).unwrap(), ExtractionResult::demo());
    }

    #[test]
    fn oversized_upload_never_reaches_provider() {
        let stub = Scripted::ok("{}");
        let upload = UploadedFile::new("big.png", "image/png", vec![0u8; MAX_UPLOAD_BYTES + 1]);
        let err = run(&analyzer(false, &stub), upload).unwrap_err();
        assert!(matches!(err, AuditError::TooLarge { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn unsupported_type_never_reaches_provider() {
        let stub = Scripted::ok("{}");
        let upload = UploadedFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let err = run(&analyzer(false, &stub), upload).unwrap_err();
        assert!(matches!(err, AuditError::UnsupportedType { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn unreadable_receipt() {
        let stub = Scripted::ok(r#"{"error": "Could not read receipt. Please upload a clearer image."}"#);
        let err = run(&analyzer(false, &stub), jpeg()).unwrap_err();
        assert!(matches!(err, AuditError::UnreadableReceipt(ref m) if m.starts_with("Could not read")));
    }

    #[test]
    fn quota_and_provider_failures() {
        let quota = Scripted::failing("429 RESOURCE_EXHAUSTED: quota");
        assert!(matches!(
            run(&analyzer(false, &quota), jpeg()),
            Err(AuditError::QuotaExceeded { .. })
        ));

        let other = Scripted::failing("deadline exceeded");
        assert!(matches!(
            run(&analyzer(false, &other), jpeg()),
            Err(AuditError::ProviderError { .. })
        ));
    }

    #[test]
    fn empty_and_malformed_responses() {
        let empty = Scripted::ok("  ");
        assert!(matches!(
            run(&analyzer(false, &empty), jpeg()),
            Err(AuditError::EmptyResponse)
        ));

        let prose = Scripted::ok("Sorry, I cannot help with that.");
        assert!(matches!(
            run(&analyzer(false, &prose), jpeg()),
            Err(AuditError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let stub = Scripted::ok(r#"{"total":"10.00"}"#);
        let result = run(&analyzer(false, &stub), jpeg()).unwrap();
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"merchant":"Unknown","total":"10.00","category":"Other","justification":""}"#
        );
    }
}

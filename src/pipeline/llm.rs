//! VLM interaction: send the receipt image and prompt, return raw text.
//!
//! The provider sits behind the [`Extractor`] trait so the request handler
//! can be exercised with stubs. [`VisionExtractor`] is the production
//! implementation over an `edgequake_llm::LLMProvider`.
//!
//! Gemini is built directly from the configured key; other providers are
//! created by `ProviderFactory`, which reads their own credential variables
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, ...).
//!
//! There is no retry here. A failed call is classified once (quota vs.
//! everything else) and returned; retry policy, if ever wanted, belongs in a
//! wrapper implementing [`Extractor`].

use crate::config::{AuditorConfig, API_KEY_VAR};
use crate::error::AuditError;
use crate::pipeline::encode::to_image_data;
use crate::pipeline::normalize::NormalizedImage;
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, GeminiProvider, LLMProvider, LlmError, ProviderFactory,
    ProviderType,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Something that can read a receipt image and answer with text.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Send `image` with `prompt` and return the model's raw text.
    async fn extract(&self, image: &NormalizedImage, prompt: &str) -> Result<String, AuditError>;
}

/// Call `extractor` and reject empty answers.
pub async fn request_extraction(
    extractor: &dyn Extractor,
    image: &NormalizedImage,
    prompt: &str,
) -> Result<String, AuditError> {
    let text = extractor.extract(image, prompt).await?;
    if text.trim().is_empty() {
        return Err(AuditError::EmptyResponse);
    }
    Ok(text)
}

/// Does a provider error message indicate quota or rate exhaustion?
///
/// Fallback for providers that report quota only in the message text
/// (Gemini's `RESOURCE_EXHAUSTED` arrives as a plain API error).
pub fn is_quota_error(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("quota") || msg.contains("429") || msg.contains("resource_exhausted")
}

/// Map a provider failure to the matching [`AuditError`].
///
/// `LlmError::RateLimited` is a quota error outright; anything else is
/// checked with [`is_quota_error`].
pub fn classify_provider_error(provider: &str, error: &LlmError) -> AuditError {
    let message = error.to_string();
    if matches!(error, LlmError::RateLimited(_)) || is_quota_error(&message) {
        AuditError::QuotaExceeded {
            provider: display_name(provider),
        }
    } else {
        AuditError::ProviderError { message }
    }
}

/// `"gemini"` → `"Gemini"`.
fn display_name(provider: &str) -> String {
    let mut chars = provider.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// [`Extractor`] backed by an `edgequake_llm` vision provider.
pub struct VisionExtractor {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    options: CompletionOptions,
}

impl VisionExtractor {
    /// Wrap an already constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AuditorConfig) -> Self {
        Self {
            provider,
            provider_name: config.provider_name.clone(),
            options: build_options(config),
        }
    }

    /// Create the provider named in `config`.
    ///
    /// Gemini uses `config.api_key`; a missing key is
    /// `ConfigError("GEMINI_API_KEY not set")`. Other providers go through
    /// `ProviderFactory` and fail with its message when their credential is
    /// absent.
    pub fn from_config(config: &AuditorConfig) -> Result<Self, AuditError> {
        let provider: Arc<dyn LLMProvider> = match ProviderType::from_str(&config.provider_name) {
            Some(ProviderType::Gemini) => {
                let key = config
                    .api_key
                    .as_deref()
                    .ok_or_else(|| AuditError::ConfigError(format!("{} not set", API_KEY_VAR)))?;
                Arc::new(GeminiProvider::new(key).with_model(&config.model))
            }
            _ => ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
                .map_err(|e| {
                    AuditError::ConfigError(format!(
                        "LLM provider '{}' is not configured: {}",
                        config.provider_name, e
                    ))
                })?,
        };
        debug!("Vision provider: {} / {}", provider.name(), provider.model());
        Ok(Self::new(provider, config))
    }
}

/// Build `CompletionOptions` from the service config.
fn build_options(config: &AuditorConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl Extractor for VisionExtractor {
    async fn extract(&self, image: &NormalizedImage, prompt: &str) -> Result<String, AuditError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user_with_images(
            prompt,
            vec![to_image_data(image)],
        )];

        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "Extraction: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!("Provider call failed after {:?}: {}", start.elapsed(), e);
                Err(classify_provider_error(&self.provider_name, &e))
            }
        }
    }
}

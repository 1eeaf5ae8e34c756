//! Service configuration.
//!
//! Everything the request pipeline needs to know about its environment lives
//! in [`AuditorConfig`]. It is built once at startup (usually through
//! [`AuditorConfig::from_env`]) and shared read-only behind an `Arc`, so no
//! request ever observes a configuration change mid-flight.
//!
//! [`AuditorConfig::from_lookup`] takes a closure instead of reading the
//! process environment directly; tests use it to build configurations
//! without touching global state.

use crate::error::AuditError;
use edgequake_llm::ProviderType;
use std::fmt;
use std::path::PathBuf;

/// Environment variable enabling demo mode.
pub const DEMO_MODE_VAR: &str = "DEMO_MODE";
/// Environment variable holding the Gemini credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Configuration for the receipt auditor.
///
/// # Example
/// ```rust
/// use smartscan_auditor::AuditorConfig;
///
/// let config = AuditorConfig::builder()
///     .demo_mode(true)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// assert!(config.demo_mode);
/// ```
#[derive(Clone)]
pub struct AuditorConfig {
    /// Substitute a canned result for every valid upload. Default: false.
    ///
    /// No provider call is made and no credential is required.
    pub demo_mode: bool,

    /// Gemini credential, handed to the provider as-is. With the Gemini
    /// provider, `None` makes every non-demo request fail with
    /// [`AuditError::ConfigError`]. Other providers ignore it.
    pub api_key: Option<String>,

    /// Provider name understood by `edgequake_llm::ProviderType`. Default: "gemini".
    pub provider_name: String,

    /// Vision model identifier. Default: "gemini-3-flash-preview".
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction is transcription, not generation; a low value keeps the
    /// model close to what is printed on the receipt.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1024.
    pub max_tokens: usize,

    /// Target width in pixels for rasterised PDF pages. Default: 2000.
    ///
    /// Height is capped at the same value so tall receipts stay bounded.
    pub render_width: u32,

    /// Path to libpdfium (file or containing directory). Falls back to the
    /// system library search path when `None`.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Directory holding `index.html` and the static assets. Default: "static".
    pub static_dir: PathBuf,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            demo_mode: false,
            api_key: None,
            provider_name: "gemini".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            render_width: 2000,
            pdfium_lib_path: None,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl fmt::Debug for AuditorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditorConfig")
            .field("demo_mode", &self.demo_mode)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("render_width", &self.render_width)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

impl AuditorConfig {
    /// Create a new builder for `AuditorConfig`.
    pub fn builder() -> AuditorConfigBuilder {
        AuditorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, AuditError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuditError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder =
            Self::builder().demo_mode(get(DEMO_MODE_VAR).is_some_and(|v| parse_flag(&v)));

        if let Some(key) = get(API_KEY_VAR) {
            builder = builder.api_key(key);
        }
        if let Some(provider) = get("SMARTSCAN_PROVIDER") {
            builder = builder.provider_name(provider);
        }
        if let Some(model) = get("SMARTSCAN_MODEL") {
            builder = builder.model(model);
        }
        if let Some(width) = get("SMARTSCAN_RENDER_WIDTH") {
            let px = width.trim().parse::<u32>().map_err(|_| {
                AuditError::ConfigError(format!(
                    "SMARTSCAN_RENDER_WIDTH must be a positive integer, got '{width}'"
                ))
            })?;
            builder = builder.render_width(px);
        }
        if let Some(path) = get("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_lib_path(path);
        }
        if let Some(dir) = get("SMARTSCAN_STATIC_DIR") {
            builder = builder.static_dir(dir);
        }

        builder.build()
    }
}

/// Interpret a boolean environment flag: "1", "true" or "yes", any case.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Builder for [`AuditorConfig`].
#[derive(Debug)]
pub struct AuditorConfigBuilder {
    config: AuditorConfig,
}

impl AuditorConfigBuilder {
    pub fn demo_mode(mut self, v: bool) -> Self {
        self.config.demo_mode = v;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn render_width(mut self, px: u32) -> Self {
        self.config.render_width = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AuditorConfig, AuditError> {
        let c = &self.config;
        if c.provider_name.trim().is_empty() {
            return Err(AuditError::ConfigError(
                "Provider name must not be empty".into(),
            ));
        }
        if ProviderType::from_str(&c.provider_name).is_none() {
            return Err(AuditError::ConfigError(format!(
                "Unknown LLM provider: {}",
                c.provider_name
            )));
        }
        if c.model.trim().is_empty() {
            return Err(AuditError::ConfigError("Model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(AuditError::ConfigError("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

//! Configuration types for extraction and classification runs.
//!
//! Each pipeline is controlled through one struct built via its builder:
//! [`ExtractConfig`] / [`ExtractConfigBuilder`] and [`ClassifyConfig`] /
//! [`ClassifyConfigBuilder`]. Builders clamp numeric knobs and `build()`
//! validates the rest.

use crate::error::SiftError;
use crate::pipeline::vision::ImageClassifier;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_CLASSIFY_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Folder meaningful images are routed into when none is given.
pub const DEFAULT_OUTPUT_FOLDER: &str = "imagenes_significativas";

/// Environment variable holding the SambaNova credential.
pub const API_KEY_ENV: &str = "SAMBANOVA_API_KEY";

/// OpenAI-compatible base URL of the SambaNova cloud.
pub const DEFAULT_BASE_URL: &str = "https://api.sambanova.ai/v1";

/// Vision model used by the SambaNova backend.
pub const DEFAULT_MODEL: &str = "Llama-3.2-90B-Vision-Instruct";

/// Model used when an edgequake-llm provider is named without a model.
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

// ── Extraction ───────────────────────────────────────────────────────────

/// Configuration for extracting embedded images from PDFs.
///
/// # Example
/// ```rust
/// use figsift::ExtractConfig;
///
/// let config = ExtractConfig::builder()
///     .output_root("out")
///     .invert_colors(true)
///     .build()
///     .unwrap();
/// assert!(config.invert_colors);
/// ```
#[derive(Clone)]
pub struct ExtractConfig {
    /// Directory under which `<pdf_stem>/` folders are created. Default: `.`.
    pub output_root: PathBuf,

    /// Invert the colours of every extracted image before writing. Default: false.
    ///
    /// Inverting re-encodes the image, so output is no longer byte-identical
    /// to the embedded stream.
    pub invert_colors: bool,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            invert_colors: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("output_root", &self.output_root)
            .field("invert_colors", &self.invert_colors)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SiftProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractConfig {
    /// Create a new builder for `ExtractConfig`.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn output_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_root = dir.into();
        self
    }

    pub fn invert_colors(mut self, v: bool) -> Self {
        self.config.invert_colors = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, SiftError> {
        if self.config.output_root.as_os_str().is_empty() {
            return Err(SiftError::InvalidConfig(
                "output root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Classification ───────────────────────────────────────────────────────

/// Configuration for classifying a folder of images.
///
/// # Example
/// ```rust
/// use figsift::{ClassifyConfig, CollisionPolicy, RouteMode};
///
/// let config = ClassifyConfig::builder()
///     .output_folder("keep")
///     .route_mode(RouteMode::Move)
///     .on_conflict(CollisionPolicy::Rename)
///     .build()
///     .unwrap();
/// assert_eq!(config.route_mode, RouteMode::Move);
/// ```
#[derive(Clone)]
pub struct ClassifyConfig {
    /// Destination for meaningful images. Default: `imagenes_significativas`.
    pub output_folder: PathBuf,

    /// Credential for the SambaNova backend. Required unless `classifier`
    /// or `provider_name` is set.
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Vision model identifier. If None, [`DEFAULT_MODEL`] for SambaNova and
    /// [`DEFAULT_PROVIDER_MODEL`] for edgequake-llm providers.
    pub model: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// When set, requests go through that provider instead of SambaNova.
    pub provider_name: Option<String>,

    /// Pre-constructed classifier. Takes precedence over everything else.
    pub classifier: Option<Arc<dyn ImageClassifier>>,

    /// Custom instruction prompt. If None, uses the built-in default.
    pub prompt: Option<String>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Nucleus-sampling cutoff. Default: 0.1.
    pub top_p: f32,

    /// Maximum tokens the model may answer with. Default: 32.
    pub max_tokens: usize,

    /// Copy or move meaningful images. Default: [`RouteMode::Copy`].
    pub route_mode: RouteMode,

    /// What to do when the destination name already exists. Default: overwrite.
    pub on_conflict: CollisionPolicy,

    /// Abort the run on the first per-image failure. Default: false.
    pub fail_fast: bool,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            provider_name: None,
            classifier: None,
            prompt: None,
            temperature: 0.1,
            top_p: 0.1,
            max_tokens: 32,
            route_mode: RouteMode::default(),
            on_conflict: CollisionPolicy::default(),
            fail_fast: false,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClassifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifyConfig")
            .field("output_folder", &self.output_folder)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("classifier", &self.classifier.as_ref().map(|_| "<dyn ImageClassifier>"))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("route_mode", &self.route_mode)
            .field("on_conflict", &self.on_conflict)
            .field("fail_fast", &self.fail_fast)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ClassifyConfig {
    /// Create a new builder for `ClassifyConfig`.
    pub fn builder() -> ClassifyConfigBuilder {
        ClassifyConfigBuilder {
            config: Self::default(),
        }
    }

    /// The prompt sent with every image.
    pub fn effective_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_CLASSIFY_PROMPT)
    }
}

/// Builder for [`ClassifyConfig`].
#[derive(Debug)]
pub struct ClassifyConfigBuilder {
    config: ClassifyConfig,
}

impl ClassifyConfigBuilder {
    pub fn output_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_folder = dir.into();
        self
    }

    /// Set the credential. Empty strings are treated as absent.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn ImageClassifier>) -> Self {
        self.config.classifier = Some(classifier);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn route_mode(mut self, mode: RouteMode) -> Self {
        self.config.route_mode = mode;
        self
    }

    pub fn on_conflict(mut self, policy: CollisionPolicy) -> Self {
        self.config.on_conflict = policy;
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// The credential is *not* checked here: a config without one is valid
    /// as long as a classifier or provider is supplied, and that is only
    /// known when the run starts.
    pub fn build(self) -> Result<ClassifyConfig, SiftError> {
        let c = &self.config;
        if c.output_folder.as_os_str().is_empty() {
            return Err(SiftError::InvalidConfig(
                "output folder must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(SiftError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(SiftError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a meaningful image reaches the output folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteMode {
    /// Copy; the input folder is left unchanged. (default)
    #[default]
    Copy,
    /// Move; the image leaves the input folder.
    Move,
}

/// What to do when the output folder already holds a file with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Replace the existing file. (default)
    #[default]
    Overwrite,
    /// Keep the existing file; the image is not routed.
    Skip,
    /// Write under the first free name `stem_1.ext`, `stem_2.ext`, …
    Rename,
}

//! Configuration for a batch generation run.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built
//! via its [`PipelineConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share a config across the extraction workers,
//! serialise it for logging, and diff two runs to understand why their
//! outputs differ.

use crate::error::DocGenError;
use crate::inference::InferenceBackend;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_TASK_INSTRUCTION;
use std::fmt;
use std::sync::Arc;

/// Configuration for a document-to-generated-content run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use docgen::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .model("llama3")
///     .max_retries(3)
///     .max_context_blocks(40)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Base URL of the local inference service. Default:
    /// `http://localhost:11434` (Ollama's default bind address).
    pub endpoint: String,

    /// Model name passed to the generation endpoint. Default: "llama3".
    pub model: String,

    /// Instruction template rendered into every prompt. The document's
    /// extracted text is supplied as context above it. Required (the
    /// default asks for a product description).
    pub task_instruction: String,

    /// Maximum tokens the model may generate per document. Default: 1024.
    pub max_tokens: usize,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Low values keep the output faithful to the extracted text, which
    /// is what derived product content wants.
    pub temperature: f32,

    /// Maximum retry attempts after a transient inference failure
    /// (connect error, 5xx, timeout). Default: 3. Malformed response
    /// bodies are never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds; doubles after each attempt
    /// (1 s → 2 s → 4 s with the defaults). Default: 1000.
    pub retry_backoff_ms: u64,

    /// How long to wait for the service to answer its health endpoint
    /// before declaring the run unavailable. Default: 60.
    pub startup_timeout_secs: u64,

    /// Interval between readiness polls in milliseconds. Default: 1000.
    pub poll_interval_ms: u64,

    /// Per-request inference timeout in seconds; a timed-out request
    /// counts as a transient failure subject to the retry policy.
    /// Default: 120.
    pub request_timeout_secs: u64,

    /// Timeout for fetching URL inputs in seconds. Default: 30.
    pub fetch_timeout_secs: u64,

    /// Bounded worker count for parallel extraction. Extraction is
    /// CPU/IO-bound and independent per document; generation stays
    /// sequential regardless. Default: 4.
    pub extract_concurrency: usize,

    /// Maximum characters per text block after normalization; longer
    /// blocks are split at sentence boundaries. Default: 2000.
    pub max_block_chars: usize,

    /// Cap on context blocks per prompt. When exceeded, blocks are
    /// dropped from the end, headings last, and the request is marked
    /// truncated. `None` = no cap.
    pub max_context_blocks: Option<usize>,

    /// Hard ceiling on rendered prompt length in characters (the
    /// service's context limit). A prompt that cannot fit even after
    /// maximal truncation fails that document. `None` = no ceiling.
    pub max_prompt_chars: Option<usize>,

    /// Echo the document identifier into the prompt. Default: false.
    pub include_metadata: bool,

    /// Pre-constructed inference backend. Takes precedence over
    /// `endpoint`; lets tests and embedders inject a mock session.
    pub backend: Option<Arc<dyn InferenceBackend>>,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            task_instruction: DEFAULT_TASK_INSTRUCTION.to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            max_retries: 3,
            retry_backoff_ms: 1000,
            startup_timeout_secs: 60,
            poll_interval_ms: 1000,
            request_timeout_secs: 120,
            fetch_timeout_secs: 30,
            extract_concurrency: 4,
            max_block_chars: 2000,
            max_context_blocks: None,
            max_prompt_chars: None,
            include_metadata: false,
            backend: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("startup_timeout_secs", &self.startup_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("extract_concurrency", &self.extract_concurrency)
            .field("max_block_chars", &self.max_block_chars)
            .field("max_context_blocks", &self.max_context_blocks)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("include_metadata", &self.include_metadata)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn InferenceBackend>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn task_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.task_instruction = instruction.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn startup_timeout_secs(mut self, secs: u64) -> Self {
        self.config.startup_timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn extract_concurrency(mut self, n: usize) -> Self {
        self.config.extract_concurrency = n.max(1);
        self
    }

    pub fn max_block_chars(mut self, n: usize) -> Self {
        self.config.max_block_chars = n.max(1);
        self
    }

    pub fn max_context_blocks(mut self, n: usize) -> Self {
        self.config.max_context_blocks = Some(n.max(1));
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = Some(n.max(1));
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, DocGenError> {
        let c = &self.config;
        if c.endpoint.trim().is_empty() {
            return Err(DocGenError::InvalidConfig(
                "endpoint must not be empty".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(DocGenError::InvalidConfig("model must not be empty".into()));
        }
        if c.task_instruction.trim().is_empty() {
            return Err(DocGenError::InvalidConfig(
                "task_instruction must not be empty".into(),
            ));
        }
        if let (Some(blocks), Some(chars)) = (c.max_context_blocks, c.max_prompt_chars) {
            // A single retained block can never be larger than the block
            // cap, so a prompt ceiling below it is unsatisfiable.
            if chars < c.max_block_chars && blocks > 0 {
                tracing::warn!(
                    max_prompt_chars = chars,
                    max_block_chars = c.max_block_chars,
                    "prompt ceiling is below the block cap; most documents will fail truncation"
                );
            }
        }
        Ok(self.config)
    }
}

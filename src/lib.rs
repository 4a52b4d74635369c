//! # docgen
//!
//! Extract text from heterogeneous product documents and generate
//! derived content (descriptions, summaries) with a locally running
//! LLM inference service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! inputs (paths / dirs / URLs)
//!  │
//!  ├─ 1. Input      expand directories, read files, fetch web pages
//!  ├─ 2. Extract    pdf / pptx / docx / html → ordered text blocks
//!  ├─ 3. Normalize  trim, drop empties, split over-long blocks
//!  ├─ 4. Prompt     render blocks + task instruction, truncate to fit
//!  ├─ 5. Generate   sequential requests to the local service,
//!  │                readiness-gated, retried with backoff
//!  └─ 6. Report     one record per input document, in input order
//! ```
//!
//! One bad document never aborts the batch: extraction and inference
//! failures become failed per-document results. Only an inference
//! service that never answers its health endpoint fails the whole run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docgen::{run_batch, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .model("llama3")
//!         .task_instruction("Provide a short description of the product.")
//!         .build()?;
//!
//!     let inputs = vec!["catalog.pdf".to_string(), "https://example.com/product".to_string()];
//!     let run = run_batch(&inputs, &config).await?;
//!
//!     for result in &run.results {
//!         println!("{}: {:?}", result.identifier, result.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docgen` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docgen = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod inference;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use document::{
    BlockKind, DocumentFormat, GenerationRequest, NormalizedDocument, SourceDocument, TextBlock,
};
pub use error::{DocError, DocGenError, ExtractionError};
pub use inference::{
    BackendError, InferenceBackend, InferenceClient, OllamaBackend, SessionState,
};
pub use output::{DocStatus, GenerationResult, PipelineRun, RunStats};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use run::{run_batch, write_report};

//! Run output types: per-document results and batch statistics.

use crate::error::DocError;
use serde::{Deserialize, Serialize};

/// Terminal status of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Success,
    Failed,
}

/// Terminal outcome for one input document.
///
/// Exactly one of `generated_text` / `error` is present, matching the
/// status. Serialises directly into the report record the CLI emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The input string as the user gave it (path or URL).
    pub identifier: String,
    pub status: DocStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DocError>,
    /// True when the prompt was built from a truncated context.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    /// Dispatch to terminal resolution (success or exhausted retries).
    /// Zero for documents that never reached the service.
    pub latency_ms: u64,
    /// Generation attempts made, including the first. Zero for
    /// documents that failed before dispatch.
    pub attempts: u32,
}

impl GenerationResult {
    /// A successful result carrying generated text.
    pub fn success(
        identifier: impl Into<String>,
        text: String,
        truncated: bool,
        latency_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            status: DocStatus::Success,
            generated_text: Some(text),
            error: None,
            truncated,
            latency_ms,
            attempts,
        }
    }

    /// A failed result carrying the document-level error.
    pub fn failure(
        identifier: impl Into<String>,
        error: DocError,
        latency_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            status: DocStatus::Failed,
            generated_text: None,
            error: Some(error),
            truncated: false,
            latency_ms,
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DocStatus::Success
    }
}

/// Aggregate statistics for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_docs: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wall-clock spent in extraction + normalization + prompt building.
    pub prepare_duration_ms: u64,
    /// Wall-clock spent in sequential generation.
    pub generate_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The outcome of one batch invocation: one result per input document,
/// in input order. Created fresh per run, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub results: Vec<GenerationResult>,
    pub stats: RunStats,
}

impl PipelineRun {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DocError, ExtractionError};

    #[test]
    fn success_serialises_without_error_field() {
        let r = GenerationResult::success("a.pdf", "OK".into(), false, 12, 1);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"generated_text\":\"OK\""));
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"truncated\""));
    }

    #[test]
    fn failure_serialises_error_detail() {
        let r = GenerationResult::failure(
            "bad.pptx",
            DocError::Extraction(ExtractionError::EmptyDocument),
            0,
            0,
        );
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("no extractable text") || json.contains("empty_document"));
        assert!(!json.contains("\"generated_text\""));
    }

    #[test]
    fn run_counts() {
        let run = PipelineRun {
            results: vec![
                GenerationResult::success("a", "x".into(), false, 1, 1),
                GenerationResult::failure(
                    "b",
                    DocError::Extraction(ExtractionError::EmptyDocument),
                    0,
                    0,
                ),
            ],
            stats: RunStats::default(),
        };
        assert_eq!(run.succeeded(), 1);
        assert_eq!(run.failed(), 1);
    }
}

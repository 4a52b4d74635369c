//! Error types for the docgen library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocGenError`] — **Fatal**: the batch run cannot proceed at all
//!   (inference service never became ready, invalid configuration).
//!   Returned as `Err(DocGenError)` from the top-level `run_batch*`
//!   functions.
//!
//! * [`DocError`] — **Non-fatal**: a single document failed (corrupt
//!   bytes, retries exhausted, oversized prompt) but the rest of the
//!   batch is fine. Stored inside [`crate::output::GenerationResult`] so
//!   callers can inspect partial success rather than losing the whole
//!   batch to one bad file.
//!
//! The separation matches the run's exit policy: only a service that
//! never answers its health endpoint aborts the run, everything else is
//! recorded per document and the batch continues.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docgen library.
///
/// Document-level failures use [`DocError`] and are stored in
/// [`crate::output::GenerationResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DocGenError {
    /// The inference service never answered its health endpoint within
    /// the startup window. No document can succeed without the service,
    /// so the whole run fails and zero results are produced.
    #[error(
        "Inference service at '{endpoint}' did not become ready within {waited_secs}s\n\
         Check that the service is running and reachable, or raise --startup-timeout."
    )]
    ServiceUnavailable { endpoint: String, waited_secs: u64 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write the report output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure while turning one document into text blocks.
///
/// Every variant is recorded per document; extraction never aborts the
/// batch and never panics on hostile input.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    /// The bytes could not be parsed as the detected format.
    #[error("corrupt {format} document: {detail}")]
    Corrupt { format: String, detail: String },

    /// The document parsed but yielded no extractable text at all.
    #[error("document contains no extractable text")]
    EmptyDocument,

    /// The input's extension maps to no supported format.
    #[error("unsupported format: '{extension}' (supported: pdf, pptx, docx, html)")]
    UnsupportedFormat { extension: String },

    /// The input could not be read from disk or fetched over HTTP.
    #[error("could not read input: {detail}")]
    Unreadable { detail: String },
}

/// A non-fatal error for a single document in the batch.
///
/// Stored in [`crate::output::GenerationResult`] when a document fails.
/// The overall run continues unless the service itself is down.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum DocError {
    /// Extraction or input resolution failed.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Transient inference failures exhausted the retry budget.
    #[error("generation failed after {attempts} attempts: {detail}")]
    InferenceFailed { attempts: u32, detail: String },

    /// The service answered but the body could not be parsed. Retrying
    /// cannot fix a parsing mismatch, so this is recorded immediately.
    #[error("malformed inference response: {detail}")]
    MalformedResponse { detail: String },

    /// Even maximal truncation could not fit the prompt under the
    /// configured service limit.
    #[error("prompt is {chars} chars, exceeds limit of {limit} even after truncation")]
    PromptTooLarge { chars: usize, limit: usize },

    /// A generation request was issued against a session that is not
    /// ready. The request is refused without touching the service.
    #[error("inference session is not ready")]
    SessionNotReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_unavailable_display() {
        let e = DocGenError::ServiceUnavailable {
            endpoint: "http://localhost:11434".into(),
            waited_secs: 60,
        };
        let msg = e.to_string();
        assert!(msg.contains("60s"), "got: {msg}");
        assert!(msg.contains("http://localhost:11434"));
    }

    #[test]
    fn unsupported_format_display() {
        let e = ExtractionError::UnsupportedFormat {
            extension: "xlsx".into(),
        };
        assert!(e.to_string().contains("xlsx"));
    }

    #[test]
    fn inference_failed_display() {
        let e = DocError::InferenceFailed {
            attempts: 4,
            detail: "connection refused".into(),
        };
        assert!(e.to_string().contains("4 attempts"));
        assert!(e.to_string().contains("connection refused"));
    }

    #[test]
    fn doc_error_serialises_with_stage_tag() {
        let e = DocError::MalformedResponse {
            detail: "missing field `response`".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(
            json.contains("\"stage\":\"malformed_response\""),
            "got: {json}"
        );
    }
}

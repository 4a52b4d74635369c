//! Core document types flowing through the pipeline.
//!
//! Data moves strictly downward: raw bytes ([`SourceDocument`]) become an
//! ordered block sequence ([`NormalizedDocument`]) which is rendered into
//! a [`GenerationRequest`]. No stage hands data back up, and the raw
//! bytes are dropped once extraction has consumed them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Closed set of supported input formats.
///
/// Dispatch over this enum replaces extension string matching everywhere
/// past input resolution; an extension outside the set is rejected at the
/// boundary with `ExtractionError::UnsupportedFormat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Pptx,
    Docx,
    Html,
}

impl DocumentFormat {
    /// Detect the format from a file extension (case-insensitive).
    ///
    /// Returns `None` for anything outside the supported set; the caller
    /// turns that into an `UnsupportedFormat` error carrying the raw
    /// extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "pptx" => Some(DocumentFormat::Pptx),
            "docx" => Some(DocumentFormat::Docx),
            "html" | "htm" => Some(DocumentFormat::Html),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Html => "html",
        };
        f.write_str(s)
    }
}

/// A raw input document scheduled for extraction.
///
/// Immutable once read; owned exclusively by the extraction step. The
/// byte buffer is not retained downstream.
#[derive(Debug)]
pub struct SourceDocument {
    /// The input string as the user gave it (path or URL).
    pub identifier: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

/// Structural role of a [`TextBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Heading,
    TableCell,
    SlideTitle,
    SlideBody,
}

/// One unit of normalized text, the atomic item flowing from extraction
/// to prompt construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub text: String,
}

impl TextBlock {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Headings and slide titles are preserved preferentially when the
    /// prompt builder truncates.
    pub fn is_heading(&self) -> bool {
        matches!(self.kind, BlockKind::Heading | BlockKind::SlideTitle)
    }
}

/// A document reduced to an ordered block sequence.
///
/// Block order equals the source's natural reading order; extractors
/// never emit empty blocks, and the normalizer keeps order stable modulo
/// dropped or split blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub identifier: String,
    pub blocks: Vec<TextBlock>,
}

impl NormalizedDocument {
    pub fn new(identifier: impl Into<String>, blocks: Vec<TextBlock>) -> Self {
        Self {
            identifier: identifier.into(),
            blocks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A fully rendered inference request for one document.
///
/// The prompt text is derived, not independently mutable; one request
/// maps to exactly one [`NormalizedDocument`], which can be discarded
/// once the request exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Identifier inherited from the source document.
    pub identifier: String,
    pub prompt: String,
    /// True when context blocks were dropped to fit the configured
    /// limits; the result derives from a partial document.
    pub truncated: bool,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

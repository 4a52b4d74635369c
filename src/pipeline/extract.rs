//! Format extractors: raw document bytes to an ordered block sequence.
//!
//! Dispatch is a closed match over [`DocumentFormat`]; there is no
//! extension sniffing past this point, and an unsupported input never
//! reaches an extractor. Every extractor is deterministic (same bytes
//! in, same block sequence out) and converts parser failures into
//! [`ExtractionError::Corrupt`] instead of panicking, so one hostile
//! file costs one batch entry, not the run.

use crate::document::{DocumentFormat, NormalizedDocument, SourceDocument};
use crate::error::ExtractionError;
use tracing::debug;

mod docx;
mod html;
mod pdf;
mod pptx;

/// Extract a block sequence from a source document.
///
/// A document that parses but yields no text at all fails with
/// [`ExtractionError::EmptyDocument`]; there is nothing to prompt with.
pub fn extract(doc: &SourceDocument) -> Result<NormalizedDocument, ExtractionError> {
    let blocks = match doc.format {
        DocumentFormat::Pdf => pdf::extract_blocks(&doc.bytes)?,
        DocumentFormat::Pptx => pptx::extract_blocks(&doc.bytes)?,
        DocumentFormat::Docx => docx::extract_blocks(&doc.bytes)?,
        DocumentFormat::Html => html::extract_blocks(&doc.bytes)?,
    };

    if blocks.is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }

    debug!(
        identifier = %doc.identifier,
        format = %doc.format,
        blocks = blocks.len(),
        "extraction complete"
    );
    Ok(NormalizedDocument::new(&doc.identifier, blocks))
}

/// Shorthand used by the per-format modules.
fn corrupt(format: DocumentFormat, detail: impl ToString) -> ExtractionError {
    ExtractionError::Corrupt {
        format: format.to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockKind, DocumentFormat};

    fn doc(format: DocumentFormat, bytes: &[u8]) -> SourceDocument {
        SourceDocument {
            identifier: "test-doc".into(),
            format,
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn garbage_bytes_fail_as_corrupt_for_every_binary_format() {
        for format in [DocumentFormat::Pdf, DocumentFormat::Pptx, DocumentFormat::Docx] {
            let err = extract(&doc(format, b"this is not a real document")).unwrap_err();
            assert!(
                matches!(err, ExtractionError::Corrupt { .. }),
                "{format}: expected Corrupt, got {err:?}"
            );
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = b"<html><body><h1>Widget</h1><p>A fine widget.</p></body></html>";
        let a = extract(&doc(DocumentFormat::Html, html)).unwrap();
        let b = extract(&doc(DocumentFormat::Html, html)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_html_is_empty_document() {
        let err = extract(&doc(DocumentFormat::Html, b"<html><body></body></html>")).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument));
    }

    #[test]
    fn identifier_is_inherited() {
        let html = b"<p>hello</p>";
        let out = extract(&doc(DocumentFormat::Html, html)).unwrap();
        assert_eq!(out.identifier, "test-doc");
        assert_eq!(out.blocks[0].kind, BlockKind::Paragraph);
    }
}

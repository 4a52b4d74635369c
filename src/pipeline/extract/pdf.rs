//! PDF extraction: one paragraph block per page's text content.
//!
//! Uses the pure-Rust `pdf` crate and walks each page's content stream
//! for text-draw operations. Pages with no extractable text (scanned
//! images, vector-only art) are skipped rather than treated as errors;
//! the dispatch layer reports `EmptyDocument` only when every page came
//! up empty.

use crate::document::{BlockKind, DocumentFormat, TextBlock};
use crate::error::ExtractionError;
use pdf::file::FileOptions;

use super::corrupt;

pub fn extract_blocks(bytes: &[u8]) -> Result<Vec<TextBlock>, ExtractionError> {
    let file = FileOptions::cached()
        .load(bytes)
        .map_err(|e| corrupt(DocumentFormat::Pdf, e))?;
    let resolver = file.resolver();

    let mut blocks = Vec::new();
    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| corrupt(DocumentFormat::Pdf, e))?;

        let mut page_text = String::new();
        if let Some(content) = &page.contents {
            let operations = content
                .operations(&resolver)
                .map_err(|e| corrupt(DocumentFormat::Pdf, e))?;
            for op in operations.iter() {
                if let pdf::content::Op::TextDraw { text } = op {
                    if !page_text.is_empty() && !page_text.ends_with(char::is_whitespace) {
                        page_text.push(' ');
                    }
                    page_text.push_str(&text.to_string_lossy());
                }
            }
        }

        let page_text = page_text.trim();
        if !page_text.is_empty() {
            blocks.push(TextBlock::new(BlockKind::Paragraph, page_text));
        }
    }

    Ok(blocks)
}

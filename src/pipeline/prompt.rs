//! Prompt construction: render a normalized document plus the task
//! configuration into one generation request.
//!
//! Rendering is deterministic — the same document and config always
//! produce the same prompt. Two independent limits apply:
//!
//! * `max_context_blocks` caps how many blocks enter the context.
//! * `max_prompt_chars` caps the rendered prompt (the service's
//!   context limit).
//!
//! Both drop blocks from the end of the document, non-headings first,
//! so titles and section headings survive longest. Any drop marks the
//! request `truncated` and is logged; if the prompt still cannot fit
//! with a single remaining block, the document fails with
//! `PromptTooLarge` rather than silently generating from nothing.

use crate::config::PipelineConfig;
use crate::document::{GenerationRequest, NormalizedDocument, TextBlock};
use crate::error::DocError;
use crate::prompts::render_prompt;
use tracing::warn;

/// Render `doc` into a [`GenerationRequest`] under the configured
/// limits.
pub fn build_request(
    doc: &NormalizedDocument,
    config: &PipelineConfig,
) -> Result<GenerationRequest, DocError> {
    let mut selected: Vec<&TextBlock> = doc.blocks.iter().collect();
    let mut truncated = false;

    if let Some(cap) = config.max_context_blocks {
        while selected.len() > cap {
            if !drop_one(&mut selected) {
                break;
            }
            truncated = true;
        }
    }

    let identifier = config.include_metadata.then_some(doc.identifier.as_str());
    let mut prompt = render_prompt(identifier, &render_context(&selected), &config.task_instruction);

    if let Some(limit) = config.max_prompt_chars {
        while prompt.chars().count() > limit {
            if selected.len() <= 1 {
                return Err(DocError::PromptTooLarge {
                    chars: prompt.chars().count(),
                    limit,
                });
            }
            drop_one(&mut selected);
            truncated = true;
            prompt = render_prompt(identifier, &render_context(&selected), &config.task_instruction);
        }
    }

    if truncated {
        warn!(
            identifier = %doc.identifier,
            kept_blocks = selected.len(),
            total_blocks = doc.blocks.len(),
            "context truncated; generation will derive from a partial document"
        );
    }

    Ok(GenerationRequest {
        identifier: doc.identifier.clone(),
        prompt,
        truncated,
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    })
}

/// Drop the last non-heading block, or the last block outright when
/// only headings remain. Returns false on an empty selection.
fn drop_one(selected: &mut Vec<&TextBlock>) -> bool {
    if let Some(pos) = selected.iter().rposition(|b| !b.is_heading()) {
        selected.remove(pos);
        true
    } else if selected.pop().is_some() {
        true
    } else {
        false
    }
}

fn render_context(blocks: &[&TextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockKind;

    fn doc(blocks: Vec<TextBlock>) -> NormalizedDocument {
        NormalizedDocument::new("catalog.pdf", blocks)
    }

    fn heading(text: &str) -> TextBlock {
        TextBlock::new(BlockKind::Heading, text)
    }

    fn para(text: &str) -> TextBlock {
        TextBlock::new(BlockKind::Paragraph, text)
    }

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .task_instruction("Describe the product.")
            .build()
            .unwrap()
    }

    #[test]
    fn uncapped_request_contains_all_blocks_in_order() {
        let d = doc(vec![heading("Widget"), para("Fast."), para("Cheap.")]);
        let req = build_request(&d, &config()).unwrap();

        assert!(!req.truncated);
        assert!(req.prompt.contains("Widget\nFast.\nCheap."));
        assert!(req.prompt.ends_with("Task: Describe the product."));
        assert_eq!(req.identifier, "catalog.pdf");
    }

    #[test]
    fn include_metadata_echoes_identifier() {
        let d = doc(vec![para("x")]);
        let mut cfg = config();
        cfg.include_metadata = true;
        let req = build_request(&d, &cfg).unwrap();
        assert!(req.prompt.starts_with("Source: catalog.pdf"));
    }

    #[test]
    fn block_cap_drops_paragraphs_before_headings() {
        let d = doc(vec![
            heading("Title"),
            para("one"),
            para("two"),
            para("three"),
        ]);
        let mut cfg = config();
        cfg.max_context_blocks = Some(2);

        let req = build_request(&d, &cfg).unwrap();
        assert!(req.truncated);
        // The heading survives; the latest paragraphs go first.
        assert!(req.prompt.contains("Title\none"));
        assert!(!req.prompt.contains("two"));
        assert!(!req.prompt.contains("three"));
    }

    #[test]
    fn headings_are_dropped_only_when_nothing_else_remains() {
        let d = doc(vec![heading("A"), heading("B"), para("p")]);
        let mut cfg = config();
        cfg.max_context_blocks = Some(2);

        let req = build_request(&d, &cfg).unwrap();
        // The single paragraph is the drop candidate, not the headings.
        assert!(req.prompt.contains("A\nB"));
        assert!(!req.prompt.contains("\np"));

        cfg.max_context_blocks = Some(1);
        let req = build_request(&d, &cfg).unwrap();
        assert!(req.prompt.contains('A'));
        assert!(!req.prompt.contains('B'));
    }

    #[test]
    fn prompt_ceiling_truncates_then_fails() {
        let d = doc(vec![para(&"x".repeat(100)), para(&"y".repeat(100))]);
        let mut cfg = config();
        cfg.max_prompt_chars = Some(160);

        // Dropping the second paragraph makes it fit.
        let req = build_request(&d, &cfg).unwrap();
        assert!(req.truncated);
        assert!(req.prompt.chars().count() <= 160);

        // A ceiling no single block can satisfy fails the document.
        cfg.max_prompt_chars = Some(50);
        let err = build_request(&d, &cfg).unwrap_err();
        assert!(matches!(err, DocError::PromptTooLarge { limit: 50, .. }));
    }

    #[test]
    fn rendering_is_deterministic() {
        let d = doc(vec![heading("T"), para("body")]);
        let cfg = config();
        let a = build_request(&d, &cfg).unwrap();
        let b = build_request(&d, &cfg).unwrap();
        assert_eq!(a.prompt, b.prompt);
        assert_eq!(a.truncated, b.truncated);
    }
}

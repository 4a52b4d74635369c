//! Format-independent cleanup of extracted block sequences.
//!
//! Trims whitespace, drops blocks that trim to nothing, and splits
//! blocks longer than the configured cap at sentence boundaries —
//! falling back to the last whitespace before the cap, never cutting
//! mid-word. A single unbreakable token longer than the cap is kept
//! whole; the cap bounds prompt bloat, it is not a hard wire limit.
//!
//! Output order equals input order modulo dropped and split blocks, and
//! the pass is idempotent: normalizing already-normalized blocks is a
//! no-op.

use crate::document::{NormalizedDocument, TextBlock};

/// Apply the cleanup pass. `max_block_chars` is measured in characters,
/// not bytes, so multi-byte text splits at the same visible length.
pub fn normalize(doc: NormalizedDocument, max_block_chars: usize) -> NormalizedDocument {
    let mut out = Vec::with_capacity(doc.blocks.len());

    for block in doc.blocks {
        let trimmed = block.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() <= max_block_chars {
            out.push(TextBlock::new(block.kind, trimmed));
        } else {
            for piece in split_block(trimmed, max_block_chars) {
                out.push(TextBlock::new(block.kind, piece));
            }
        }
    }

    NormalizedDocument {
        identifier: doc.identifier,
        blocks: out,
    }
}

fn split_block(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        match find_split(rest, max_chars) {
            Some(at) if at > 0 => {
                let (head, tail) = rest.split_at(at);
                let head = head.trim_end();
                if !head.is_empty() {
                    pieces.push(head.to_string());
                }
                rest = tail.trim_start();
            }
            // No breakable point inside the window: keep the rest whole.
            _ => break,
        }
    }

    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Byte offset of the best split point within the first `max_chars`
/// characters: after the last sentence terminator followed by
/// whitespace, else at the last whitespace.
fn find_split(text: &str, max_chars: usize) -> Option<usize> {
    let window_end = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let window = &text[..window_end];

    for (i, _) in window.rmatch_indices(['.', '!', '?']) {
        // Sentence terminators are single-byte, so i + 1 is a boundary.
        if text[i + 1..].starts_with(char::is_whitespace) {
            return Some(i + 1);
        }
    }

    window
        .rmatch_indices(char::is_whitespace)
        .next()
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockKind;

    fn doc(blocks: Vec<TextBlock>) -> NormalizedDocument {
        NormalizedDocument::new("test", blocks)
    }

    fn para(text: &str) -> TextBlock {
        TextBlock::new(BlockKind::Paragraph, text)
    }

    #[test]
    fn trims_and_drops_empty_blocks() {
        let out = normalize(
            doc(vec![para("  hello  "), para("   "), para("\n\t"), para("world")]),
            100,
        );
        let texts: Vec<&str> = out.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "world"]);
    }

    #[test]
    fn splits_at_sentence_boundary() {
        let out = normalize(
            doc(vec![para("First sentence. Second sentence goes on.")]),
            30,
        );
        assert_eq!(out.blocks.len(), 2);
        assert_eq!(out.blocks[0].text, "First sentence.");
        assert_eq!(out.blocks[1].text, "Second sentence goes on.");
    }

    #[test]
    fn falls_back_to_whitespace_never_mid_word() {
        let out = normalize(doc(vec![para("alpha beta gamma delta")]), 12);
        assert!(out.blocks.len() >= 2);
        for block in &out.blocks {
            // Every piece is made of whole input words.
            for word in block.text.split_whitespace() {
                assert!(
                    ["alpha", "beta", "gamma", "delta"].contains(&word),
                    "word '{word}' was cut"
                );
            }
        }
    }

    #[test]
    fn unbreakable_token_is_kept_whole() {
        let token = "x".repeat(50);
        let out = normalize(doc(vec![para(&token)]), 10);
        assert_eq!(out.blocks.len(), 1);
        assert_eq!(out.blocks[0].text, token);
    }

    #[test]
    fn split_preserves_block_kind_and_order() {
        let out = normalize(
            doc(vec![
                TextBlock::new(BlockKind::Heading, "Short heading"),
                para("One two three four five six seven eight nine ten."),
                para("tail"),
            ]),
            25,
        );
        assert_eq!(out.blocks[0].kind, BlockKind::Heading);
        assert!(out.blocks[1..out.blocks.len() - 1]
            .iter()
            .all(|b| b.kind == BlockKind::Paragraph));
        assert_eq!(out.blocks.last().unwrap().text, "tail");
    }

    #[test]
    fn normalization_is_idempotent() {
        let input = doc(vec![
            para("  First sentence. Second sentence that is rather longer than the cap. "),
            TextBlock::new(BlockKind::Heading, " Overview "),
            para("   "),
            para("short"),
        ]);
        let once = normalize(input, 30);
        let twice = normalize(once.clone(), 30);
        assert_eq!(once, twice);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "héllo wörld déjà vu encore une fois très bien";
        let out = normalize(doc(vec![para(text)]), 12);
        // Re-joining gives back the original words.
        let rejoined: Vec<String> = out
            .blocks
            .iter()
            .flat_map(|b| b.text.split_whitespace().map(str::to_string))
            .collect();
        let original: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        assert_eq!(rejoined, original);
    }
}

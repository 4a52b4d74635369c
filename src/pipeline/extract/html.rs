//! HTML extraction for scraped web pages.
//!
//! Emits one block per top-level block-level element in document order:
//! `<title>` and `<h1>`–`<h6>` as headings, paragraphs and list items
//! as paragraphs. An element nested inside another emitting element is
//! skipped (its text already belongs to the ancestor's block). Text
//! under `<script>`, `<style>`, and `<noscript>` never appears in any
//! block, and runs of whitespace collapse to single spaces.

use crate::document::{BlockKind, TextBlock};
use crate::error::ExtractionError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title, h1, h2, h3, h4, h5, h6, p, li").unwrap());

const EMITTING_TAGS: [&str; 9] = ["title", "h1", "h2", "h3", "h4", "h5", "h6", "p", "li"];

pub fn extract_blocks(bytes: &[u8]) -> Result<Vec<TextBlock>, ExtractionError> {
    let html = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&html);

    let mut blocks = Vec::new();
    for element in document.select(&BLOCK_SELECTOR) {
        if has_emitting_ancestor(element) {
            continue;
        }

        let mut raw = String::new();
        collect_text(element, &mut raw);
        let text = RE_WHITESPACE.replace_all(raw.trim(), " ").to_string();
        if text.is_empty() {
            continue;
        }

        let kind = match element.value().name() {
            "title" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => BlockKind::Heading,
            _ => BlockKind::Paragraph,
        };
        blocks.push(TextBlock::new(kind, text));
    }

    Ok(blocks)
}

fn has_emitting_ancestor(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| EMITTING_TAGS.contains(&a.value().name()))
}

/// Descend into `element` collecting text nodes, skipping script-like
/// subtrees entirely.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(&text.text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if name != "script" && name != "style" && name != "noscript" {
                collect_text(child_el, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_paragraphs_in_document_order() {
        let html = br#"<html><head><title>Acme Widget</title></head>
<body>
  <h1>Widget 3000</h1>
  <p>The   fastest
     widget.</p>
  <ul><li>Cheap</li><li>Cheerful</li></ul>
</body></html>"#;

        let blocks = extract_blocks(html).unwrap();
        let got: Vec<(BlockKind, &str)> =
            blocks.iter().map(|b| (b.kind, b.text.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (BlockKind::Heading, "Acme Widget"),
                (BlockKind::Heading, "Widget 3000"),
                (BlockKind::Paragraph, "The fastest widget."),
                (BlockKind::Paragraph, "Cheap"),
                (BlockKind::Paragraph, "Cheerful"),
            ]
        );
    }

    #[test]
    fn script_and_style_content_is_stripped() {
        let html = br#"<body>
  <p>visible <script>var hidden = 1;</script>text</p>
  <style>p { color: red }</style>
  <noscript>enable js</noscript>
</body>"#;

        let blocks = extract_blocks(html).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "visible text");
    }

    #[test]
    fn nested_emitting_elements_are_not_duplicated() {
        let html = b"<body><li><p>once only</p></li></body>";
        let blocks = extract_blocks(html).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "once only");
    }

    #[test]
    fn empty_page_yields_no_blocks() {
        let blocks = extract_blocks(b"<html><body><div>no block tags</div></body></html>")
            .unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        // Lossy decoding keeps extraction deterministic on bad bytes.
        let mut html = b"<p>ok".to_vec();
        html.push(0xFF);
        html.extend_from_slice(b"</p>");
        let blocks = extract_blocks(&html).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.starts_with("ok"));
    }
}

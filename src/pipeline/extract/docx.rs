//! DOCX extraction: one block per paragraph, heading styles tagged,
//! tables flattened row-major.

use crate::document::{BlockKind, DocumentFormat, TextBlock};
use crate::error::ExtractionError;
use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use super::corrupt;

pub fn extract_blocks(bytes: &[u8]) -> Result<Vec<TextBlock>, ExtractionError> {
    let docx = read_docx(bytes).map_err(|e| corrupt(DocumentFormat::Docx, e))?;

    let mut blocks = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                let text = paragraph_text(p);
                if !text.is_empty() {
                    let kind = if has_heading_style(p) {
                        BlockKind::Heading
                    } else {
                        BlockKind::Paragraph
                    };
                    blocks.push(TextBlock::new(kind, text));
                }
            }
            DocumentChild::Table(t) => collect_table(t, &mut blocks),
            _ => {}
        }
    }

    Ok(blocks)
}

/// Word's built-in heading styles are "Heading1".."Heading9"; "Title"
/// gets the same treatment since it plays the same structural role.
fn has_heading_style(p: &Paragraph) -> bool {
    p.property
        .style
        .as_ref()
        .map(|s| s.val.starts_with("Heading") || s.val == "Title")
        .unwrap_or(false)
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut out = String::new();
    collect_children(&p.children, &mut out);
    out.trim().to_string()
}

fn collect_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push(' '),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => collect_children(&link.children, out),
            _ => {}
        }
    }
}

/// Flatten table content to `TableCell` blocks in row-major order.
/// Nested tables are rare but legal; their cells follow the enclosing
/// cell's paragraphs.
fn collect_table(table: &Table, blocks: &mut Vec<TextBlock>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            let mut lines: Vec<String> = Vec::new();
            let mut nested: Vec<&Table> = Vec::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => {
                        let text = paragraph_text(p);
                        if !text.is_empty() {
                            lines.push(text);
                        }
                    }
                    TableCellContent::Table(t) => nested.push(t),
                    _ => {}
                }
            }
            if !lines.is_empty() {
                blocks.push(TextBlock::new(BlockKind::TableCell, lines.join("\n")));
            }
            for t in nested {
                collect_table(t, blocks);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph as DocxParagraph, Run, Table as DocxTable, TableCell, TableRow};
    use std::io::Cursor;

    fn pack(docx: Docx) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).expect("pack docx fixture");
        cursor.into_inner()
    }

    #[test]
    fn single_paragraph_round_trip() {
        let bytes = pack(Docx::new().add_paragraph(
            DocxParagraph::new().add_run(Run::new().add_text("Hello from the catalog.")),
        ));

        let blocks = extract_blocks(&bytes).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].text, "Hello from the catalog.");
    }

    #[test]
    fn heading_style_is_tagged() {
        let bytes = pack(
            Docx::new()
                .add_paragraph(
                    DocxParagraph::new()
                        .style("Heading1")
                        .add_run(Run::new().add_text("Overview")),
                )
                .add_paragraph(DocxParagraph::new().add_run(Run::new().add_text("Details."))),
        );

        let blocks = extract_blocks(&bytes).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Heading);
        assert_eq!(blocks[0].text, "Overview");
        assert_eq!(blocks[1].kind, BlockKind::Paragraph);
    }

    #[test]
    fn table_flattens_row_major() {
        let table = DocxTable::new(vec![
            TableRow::new(vec![
                TableCell::new().add_paragraph(
                    DocxParagraph::new().add_run(Run::new().add_text("a1")),
                ),
                TableCell::new().add_paragraph(
                    DocxParagraph::new().add_run(Run::new().add_text("a2")),
                ),
            ]),
            TableRow::new(vec![
                TableCell::new().add_paragraph(
                    DocxParagraph::new().add_run(Run::new().add_text("b1")),
                ),
                TableCell::new().add_paragraph(
                    DocxParagraph::new().add_run(Run::new().add_text("b2")),
                ),
            ]),
        ]);
        let bytes = pack(Docx::new().add_table(table));

        let blocks = extract_blocks(&bytes).unwrap();
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["a1", "a2", "b1", "b2"]);
        assert!(blocks.iter().all(|b| b.kind == BlockKind::TableCell));
    }

    #[test]
    fn empty_paragraphs_are_dropped() {
        let bytes = pack(
            Docx::new()
                .add_paragraph(DocxParagraph::new())
                .add_paragraph(DocxParagraph::new().add_run(Run::new().add_text("only me"))),
        );

        let blocks = extract_blocks(&bytes).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "only me");
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = extract_blocks(b"not a docx at all").unwrap_err();
        assert!(matches!(err, ExtractionError::Corrupt { .. }));
    }
}

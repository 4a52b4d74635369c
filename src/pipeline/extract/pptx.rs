//! PPTX extraction: slides in order, title block first, then one body
//! block per text-bearing shape.
//!
//! A .pptx file is a zip archive; each slide lives at
//! `ppt/slides/slideN.xml` in the DrawingML schema. We stream each
//! slide's XML once: shapes (`<p:sp>`) carry a placeholder element
//! (`<p:ph type="…">`) identifying titles, and their text sits in
//! `<a:t>` runs grouped into `<a:p>` paragraphs. Slide order is the
//! numeric order of N, not the archive's entry order.

use crate::document::{BlockKind, DocumentFormat, TextBlock};
use crate::error::ExtractionError;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::io::{Cursor, Read};

use super::corrupt;

static RE_SLIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

pub fn extract_blocks(bytes: &[u8]) -> Result<Vec<TextBlock>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| corrupt(DocumentFormat::Pptx, e))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let caps = RE_SLIDE.captures(name)?;
            let number = caps[1].parse::<u32>().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_unstable_by_key(|(number, _)| *number);

    let mut blocks = Vec::new();
    for (_, name) in slides {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .map_err(|e| corrupt(DocumentFormat::Pptx, e))?
            .read_to_string(&mut xml)
            .map_err(|e| corrupt(DocumentFormat::Pptx, e))?;
        parse_slide(&xml, &mut blocks)?;
    }

    Ok(blocks)
}

/// Parse one slide's XML, appending its blocks.
///
/// The first title-placeholder shape becomes the slide's `SlideTitle`
/// block and is emitted before the bodies; every other text-bearing
/// shape becomes a `SlideBody` block in shape order.
fn parse_slide(xml: &str, blocks: &mut Vec<TextBlock>) -> Result<(), ExtractionError> {
    let mut reader = Reader::from_str(xml);

    let mut in_shape = false;
    let mut in_text_run = false;
    let mut shape_is_title = false;
    let mut paragraph = String::new();
    let mut shape_lines: Vec<String> = Vec::new();

    let mut title: Option<String> = None;
    let mut bodies: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => {
                    in_shape = true;
                    shape_is_title = false;
                    shape_lines.clear();
                }
                b"ph" if in_shape => shape_is_title |= placeholder_is_title(&e),
                b"p" if in_shape => paragraph.clear(),
                b"t" if in_shape => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if in_shape && e.local_name().as_ref() == b"ph" {
                    shape_is_title |= placeholder_is_title(&e);
                }
            }
            Ok(Event::Text(t)) if in_text_run => {
                let piece = t
                    .unescape()
                    .map_err(|e| corrupt(DocumentFormat::Pptx, e))?;
                paragraph.push_str(&piece);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" if in_shape => {
                    let line = paragraph.trim();
                    if !line.is_empty() {
                        shape_lines.push(line.to_string());
                    }
                    paragraph.clear();
                }
                b"sp" => {
                    if !shape_lines.is_empty() {
                        let text = shape_lines.join("\n");
                        if shape_is_title && title.is_none() {
                            title = Some(text);
                        } else {
                            bodies.push(text);
                        }
                        shape_lines.clear();
                    }
                    in_shape = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(corrupt(DocumentFormat::Pptx, e)),
            _ => {}
        }
    }

    if let Some(text) = title {
        blocks.push(TextBlock::new(BlockKind::SlideTitle, text));
    }
    for text in bodies {
        blocks.push(TextBlock::new(BlockKind::SlideBody, text));
    }
    Ok(())
}

fn placeholder_is_title(e: &BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"type"
            && (attr.value.as_ref() == b"title" || attr.value.as_ref() == b"ctrTitle")
    })
}

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::bytes::Regex;
use tracing::{debug, warn};
use zip::ZipArchive;

use super::progress::ProgressReporter;
use super::sanitize::sanitize_with_limit;
use crate::config::ExtractionConfig;
use crate::error::{ResumeError, Result};
use crate::llm::EnhancementClient;
use crate::models::{ExtractionMethod, UploadedFile};

const DOCUMENT_XML_PATH: &str = "word/document.xml";
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const ZIP_SIGNATURE: &[u8] = b"PK";
/// Below this, UTF-16 runs are assumed to be stream names, not body text.
const LEGACY_MIN_UTF16_CHARS: usize = 20;

/// Converts `.docx` (and, best-effort, legacy `.doc`) uploads to text.
#[derive(Debug, Clone)]
pub struct WordExtractor {
    enhancer: EnhancementClient,
    enhance_min_chars: usize,
    max_chars: usize,
}

impl WordExtractor {
    pub fn new(enhancer: EnhancementClient, config: &ExtractionConfig) -> Self {
        Self {
            enhancer,
            enhance_min_chars: config.word_enhance_min_chars,
            max_chars: config.max_text_chars,
        }
    }

    pub async fn extract(&self, file: &UploadedFile, progress: &ProgressReporter) -> Result<String> {
        progress.step(ExtractionMethod::WordDocument, 0);
        let bytes = file.read_bytes().await?;
        progress.step(ExtractionMethod::WordDocument, 30);

        let raw = tokio::task::spawn_blocking(move || convert_to_text(&bytes))
            .await
            .map_err(|e| ResumeError::Internal(format!("Word conversion task panicked: {e}")))??;
        progress.step(ExtractionMethod::WordDocument, 80);

        let raw_chars = raw.chars().count();
        let text = if raw_chars > self.enhance_min_chars {
            self.enhancer.enhance(&raw).await
        } else {
            raw
        };

        let clean = sanitize_with_limit(&text, self.max_chars);
        progress.step(ExtractionMethod::WordDocument, 100);
        debug!(raw_chars, chars = clean.chars().count(), "Word document converted");
        Ok(clean)
    }
}

/// Structural conversion to raw text: one paragraph per line, table cells
/// separated by tabs.
pub fn convert_to_text(bytes: &[u8]) -> Result<String> {
    let text = if bytes.starts_with(ZIP_SIGNATURE) {
        match docx_rs::read_docx(bytes) {
            Ok(docx) => prefer_fuller_text(docx_text(&docx), bytes),
            Err(e) => {
                warn!(error = %e, "docx parser rejected document, scanning XML directly");
                document_xml_text(bytes)?
            }
        }
    } else if bytes.starts_with(OLE_SIGNATURE) {
        legacy_doc_text(bytes)?
    } else {
        return Err(ResumeError::Conversion(
            "Not a Word document (no ZIP or OLE signature)".to_string(),
        ));
    };

    if text.trim().is_empty() {
        return Err(ResumeError::Conversion(
            "Word document contains no text".to_string(),
        ));
    }
    Ok(text)
}

/// docx-rs skips some markup (paragraph-level content controls among it).
/// When the raw XML scan recovers more visible characters than the parsed
/// walk, the scan wins.
fn prefer_fuller_text(structured: String, bytes: &[u8]) -> String {
    let scanned = match document_xml_text(bytes) {
        Ok(scanned) => scanned,
        Err(e) => {
            debug!(error = %e, "XML scan unavailable, keeping parsed text");
            return structured;
        }
    };

    let structured_chars = visible_chars(&structured);
    let scanned_chars = visible_chars(&scanned);
    if scanned_chars > structured_chars {
        warn!(
            structured_chars,
            scanned_chars, "docx parser missed content, using XML scan"
        );
        scanned
    } else {
        structured
    }
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn docx_text(docx: &docx_rs::Docx) -> String {
    let mut blocks: Vec<String> = Vec::new();

    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                blocks.push(paragraph_text(paragraph));
            }
            docx_rs::DocumentChild::Table(table) => {
                blocks.push(table_text(table));
            }
            docx_rs::DocumentChild::StructuredDataTag(tag) => push_tag_blocks(tag, &mut blocks),
            _ => {}
        }
    }

    blocks.join("\n")
}

/// Content controls wrap whole sections in resume templates.
fn push_tag_blocks(tag: &docx_rs::StructuredDataTag, blocks: &mut Vec<String>) {
    let mut inline = String::new();

    for child in &tag.children {
        match child {
            docx_rs::StructuredDataTagChild::Run(run) => push_run(run, &mut inline),
            docx_rs::StructuredDataTagChild::Paragraph(paragraph) => {
                blocks.push(paragraph_text(paragraph));
            }
            docx_rs::StructuredDataTagChild::Table(table) => blocks.push(table_text(table)),
            docx_rs::StructuredDataTagChild::StructuredDataTag(nested) => {
                push_tag_blocks(nested, blocks);
            }
            _ => {}
        }
    }

    if !inline.is_empty() {
        blocks.push(inline);
    }
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut content = String::new();
    push_paragraph_children(&paragraph.children, &mut content);
    content
}

fn push_paragraph_children(children: &[docx_rs::ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run(run, out),
            docx_rs::ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            docx_rs::ParagraphChild::Insert(insert) => {
                for insert_child in &insert.children {
                    if let docx_rs::InsertChild::Run(run) = insert_child {
                        push_run(run, out);
                    }
                }
            }
            docx_rs::ParagraphChild::StructuredDataTag(tag) => {
                let mut blocks = Vec::new();
                push_tag_blocks(tag, &mut blocks);
                out.push_str(&blocks.join(" "));
            }
            _ => {}
        }
    }
}

fn push_run(run: &docx_rs::Run, out: &mut String) {
    for run_child in &run.children {
        match run_child {
            docx_rs::RunChild::Text(text) => out.push_str(&text.text),
            docx_rs::RunChild::Tab(_) => out.push('\t'),
            docx_rs::RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

fn table_text(table: &docx_rs::Table) -> String {
    let mut rows = Vec::new();

    for table_child in &table.rows {
        let docx_rs::TableChild::TableRow(row) = table_child;
        let mut cells = Vec::new();
        for row_child in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = row_child;
            let cell_text = cell
                .children
                .iter()
                .filter_map(|content| match content {
                    docx_rs::TableCellContent::Paragraph(para) => Some(paragraph_text(para)),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" ");
            cells.push(cell_text.trim().to_string());
        }
        rows.push(cells.join("\t"));
    }

    rows.join("\n")
}

/// Fallback for packages docx-rs refuses: walk `word/document.xml` directly.
fn document_xml_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ResumeError::Conversion(format!("Word archive unreadable: {e}")))?;
    let mut entry = archive
        .by_name(DOCUMENT_XML_PATH)
        .map_err(|e| ResumeError::Conversion(format!("Missing {DOCUMENT_XML_PATH}: {e}")))?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ResumeError::Conversion(format!("Failed to read {DOCUMENT_XML_PATH}: {e}")))?;

    scan_document_xml(&xml)
}

fn scan_document_xml(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_element = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_element = true,
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_element => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(e)) if in_text_element => {
                if let Some(ch) = resolve_entity(&e) {
                    text.push(ch);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_element = false,
                b"w:p" => text.push('\n'),
                b"w:tc" => text.push('\t'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ResumeError::Conversion(format!(
                    "Malformed {DOCUMENT_XML_PATH}: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn resolve_entity(reference: &quick_xml::events::BytesRef<'_>) -> Option<char> {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        return Some(ch);
    }
    match &**reference {
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"apos" => Some('\''),
        b"quot" => Some('"'),
        _ => None,
    }
}

/// Legacy binary `.doc`: pull printable UTF-16LE runs, falling back to
/// 8-bit runs for documents saved without Unicode text.
fn legacy_doc_text(bytes: &[u8]) -> Result<String> {
    let utf16_run = Regex::new(r"(?-u)(?:[\x20-\x7E\t\r\n]\x00){4,}")
        .map_err(|e| ResumeError::Internal(format!("Invalid UTF-16 run pattern: {e}")))?;
    let ascii_run = Regex::new(r"(?-u)[\x20-\x7E\t\r\n]{8,}")
        .map_err(|e| ResumeError::Internal(format!("Invalid ASCII run pattern: {e}")))?;

    let wide: Vec<String> = utf16_run
        .find_iter(bytes)
        .map(|m| {
            let units: Vec<u16> = m
                .as_bytes()
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        })
        .collect();

    let wide_chars: usize = wide.iter().map(|s| s.chars().count()).sum();
    if wide_chars >= LEGACY_MIN_UTF16_CHARS {
        return Ok(wide.join("\n"));
    }

    Ok(ascii_run
        .find_iter(bytes)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
        .collect::<Vec<_>>()
        .join("\n"))
}

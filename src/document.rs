use crate::error::LoadError;
use calamine::Reader as _;
use log::{debug, info, warn};
use mime_guess::from_path;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// A piece of text together with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The actual text content of the document
    pub content: String,
    /// Free-form metadata (source path, start offset, sheet name, ...)
    pub metadata: HashMap<String, Value>,
}

impl Document {
    /// Create a document without metadata
    pub fn new(content: impl Into<String>) -> Self {
        Document {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach one metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Path of the file this document was read from, if known
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }

    /// Character offset of this chunk in its parent document, if it is a chunk
    pub fn start_index(&self) -> Option<u64> {
        self.metadata.get("start_index").and_then(Value::as_u64)
    }
}

/// The closed set of formats the loader knows how to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    PlainText,
    Pdf,
    Word,
    PowerPoint,
    Excel,
    Unsupported,
}

impl FileKind {
    /// Supported kinds, in the order directory groups are loaded
    pub const SUPPORTED: [FileKind; 5] = [
        FileKind::Word,
        FileKind::Pdf,
        FileKind::PlainText,
        FileKind::PowerPoint,
        FileKind::Excel,
    ];

    /// Map a file extension (without the dot, any case) to a kind
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "txt" => FileKind::PlainText,
            "pdf" => FileKind::Pdf,
            "docx" => FileKind::Word,
            "pptx" => FileKind::PowerPoint,
            "xlsx" | "xls" => FileKind::Excel,
            _ => FileKind::Unsupported,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(FileKind::from_extension)
            .unwrap_or(FileKind::Unsupported)
    }

    pub fn name(self) -> &'static str {
        match self {
            FileKind::PlainText => "txt",
            FileKind::Pdf => "pdf",
            FileKind::Word => "docx",
            FileKind::PowerPoint => "pptx",
            FileKind::Excel => "excel",
            FileKind::Unsupported => "unsupported",
        }
    }

    /// Parse one file of this kind into raw (unchunked) documents
    pub fn parse<P: AsRef<Path>>(self, file_path: P) -> Result<Vec<Document>, LoadError> {
        let path = file_path.as_ref();

        // Each text may carry one locating entry (page number, sheet name)
        let texts: Vec<(Option<(&str, Value)>, String)> = match self {
            FileKind::PlainText => vec![(None, read_text(path)?)],
            FileKind::Pdf => read_pdf(path)?
                .into_iter()
                .enumerate()
                .map(|(page, text)| (Some(("page", Value::from(page))), text))
                .collect(),
            FileKind::Word => vec![(None, read_docx(path)?)],
            FileKind::PowerPoint => vec![(None, read_pptx(path)?)],
            FileKind::Excel => read_excel(path)?
                .into_iter()
                .map(|(sheet, text)| (Some(("page_name", Value::from(sheet))), text))
                .collect(),
            FileKind::Unsupported => {
                return Err(LoadError::UnsupportedFormat(extension_of(path)));
            }
        };

        let mime_type = from_path(path).first_or_octet_stream().to_string();
        let source = path.display().to_string();

        let documents: Vec<Document> = texts
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(location, text)| {
                let document = Document::new(text)
                    .with_metadata("source", source.clone())
                    .with_metadata("file_type", self.name())
                    .with_metadata("mime_type", mime_type.clone());
                match location {
                    Some((key, value)) => document.with_metadata(key, value),
                    None => document,
                }
            })
            .collect();

        if documents.is_empty() {
            warn!("No text extracted from {}", path.display());
        }

        Ok(documents)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercased extension with its leading dot, for error messages
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    debug!("Processing text document: {}", path.display());
    fs::read_to_string(path).map_err(|e| LoadError::parse(path, e.to_string()))
}

/// Text of every page, in page order
fn read_pdf(path: &Path) -> Result<Vec<String>, LoadError> {
    info!("Processing PDF document: {}", path.display());
    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| LoadError::parse(path, e.to_string()))?;
    debug!("Extracted {} pages from {}", pages.len(), path.display());

    // PDF extraction can sometimes include excessive whitespace
    Ok(pages.iter().map(|page| normalize_whitespace(page)).collect())
}

fn read_docx(path: &Path) -> Result<String, LoadError> {
    info!("Processing Word document: {}", path.display());
    let data = fs::read(path)?;
    let doc = docx_rs::read_docx(&data).map_err(|e| LoadError::parse(path, e.to_string()))?;

    let mut content = String::new();
    for child in &doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                paragraph_text(&paragraph.children, &mut content);
                content.push('\n');
            }
            docx_rs::DocumentChild::Table(table) => table_text(table, &mut content),
            _ => {}
        }
    }

    Ok(content)
}

/// Append the run text of a paragraph, following hyperlinks
fn paragraph_text(children: &[docx_rs::ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for child in &run.children {
                    if let docx_rs::RunChild::Text(t) = child {
                        out.push_str(&t.text);
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => paragraph_text(&link.children, out),
            _ => {}
        }
    }
}

/// Append a table one line per row, cells separated like spreadsheet rows
fn table_text(table: &docx_rs::Table, out: &mut String) {
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|docx_rs::TableRowChild::TableCell(cell)| {
                let mut text = String::new();
                for content in &cell.children {
                    match content {
                        docx_rs::TableCellContent::Paragraph(paragraph) => {
                            paragraph_text(&paragraph.children, &mut text);
                            text.push('\n');
                        }
                        docx_rs::TableCellContent::Table(nested) => table_text(nested, &mut text),
                        _ => {}
                    }
                }
                text.trim().replace('\n', " ")
            })
            .collect();

        if cells.iter().any(|cell| !cell.is_empty()) {
            out.push_str(&render_rows(&[cells]));
            out.push('\n');
        }
    }
}

fn read_pptx(path: &Path) -> Result<String, LoadError> {
    info!("Processing PowerPoint document: {}", path.display());
    let file = File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| LoadError::parse(path, e.to_string()))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut parts = Vec::with_capacity(slides.len());
    for (number, name) in slides {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .map_err(|e| LoadError::parse(path, e.to_string()))?
            .read_to_string(&mut xml)?;

        let text = slide_text(&xml).map_err(|e| {
            LoadError::parse(path, format!("slide {}: {}", number, e))
        })?;
        if !text.is_empty() {
            parts.push(text);
        }
    }

    Ok(parts.join("\n\n"))
}

/// Collect the `<a:t>` runs of one slide, one line per `<a:p>` paragraph
fn slide_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_str(xml);

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::Text(e) if in_text => line.push_str(&e.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        lines.push(trimmed.to_string());
                    }
                    line.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

/// One `(sheet name, text)` entry per worksheet
fn read_excel(path: &Path) -> Result<Vec<(String, String)>, LoadError> {
    info!("Processing Excel workbook: {}", path.display());
    let mut workbook =
        calamine::open_workbook_auto(path).map_err(|e| LoadError::parse(path, e.to_string()))?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| LoadError::parse(path, format!("sheet {}: {}", sheet_name, e)))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        sheets.push((sheet_name, render_rows(&rows)));
    }

    Ok(sheets)
}

/// Render table rows as ` | `-separated lines, skipping blank rows
fn render_rows(rows: &[Vec<String>]) -> String {
    rows.iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| row.join(" | "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize whitespace in text (collapse repeated spaces, keep at most one blank line)
fn normalize_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut prev_char = ' ';
    let mut newline_count = 0;

    for c in text.chars().filter(|&c| c != '\r') {
        if c == '\n' {
            newline_count += 1;
            continue;
        }

        if newline_count > 0 {
            normalized.push_str(if newline_count >= 2 { "\n\n" } else { "\n" });
            newline_count = 0;
        }

        if !(c == ' ' && prev_char == ' ') {
            normalized.push(c);
        }
        prev_char = c;
    }

    normalized.trim().to_string()
}

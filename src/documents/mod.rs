
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use tracing::debug;

use crate::{RagError, Result};

/// A document read from disk and reduced to plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Identifier stored with every chunk (the path as given)
    pub source: String,
    /// Full plain-text content
    pub text: String,
}

/// Input formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    /// Text is pulled page by page, with a marker before each page
    Pdf,
}

impl DocumentFormat {
    /// Pick a format from the file extension, defaulting to plain text
    #[inline]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("md" | "markdown") => Self::Markdown,
            Some("pdf") => Self::Pdf,
            _ => Self::PlainText,
        }
    }

    /// Reduce raw file content to the text that gets chunked
    #[inline]
    pub fn extract(self, raw: &[u8]) -> Result<String> {
        match self {
            Self::PlainText => decode_utf8(raw),
            Self::Markdown => Ok(markdown_to_text(&decode_utf8(raw)?)),
            Self::Pdf => pdf_to_text(raw),
        }
    }
}

/// Read a document from disk and extract its text
#[inline]
pub fn read_document(path: &Path) -> Result<Document> {
    let format = DocumentFormat::from_path(path);

    let raw = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            RagError::NotFound(format!("Document not found: {}", path.display()))
        }
        _ => RagError::Io(e),
    })?;

    let text = format.extract(&raw).map_err(|e| match e {
        RagError::InvalidInput(reason) => {
            RagError::InvalidInput(format!("{}: {}", path.display(), reason))
        }
        other => other,
    })?;
    debug!(
        "Read {:?} document {} ({} characters)",
        format,
        path.display(),
        text.chars().count()
    );

    Ok(Document {
        source: path.display().to_string(),
        text,
    })
}

fn decode_utf8(raw: &[u8]) -> Result<String> {
    String::from_utf8(raw.to_vec())
        .map_err(|_| RagError::InvalidInput("Document is not valid UTF-8 text".to_string()))
}

/// Extract the text of every non-empty page, each preceded by a
/// `--- Page N ---` line
#[inline]
pub fn pdf_to_text(raw: &[u8]) -> Result<String> {
    let pdf = lopdf::Document::load_mem(raw)
        .map_err(|e| RagError::InvalidInput(format!("Failed to parse PDF: {}", e)))?;

    let mut text = String::new();
    for page_number in pdf.get_pages().into_keys() {
        let page_text = pdf.extract_text(&[page_number]).map_err(|e| {
            RagError::InvalidInput(format!(
                "Failed to extract text from PDF page {}: {}",
                page_number, e
            ))
        })?;

        if page_text.trim().is_empty() {
            debug!("Skipping empty PDF page {}", page_number);
            continue;
        }

        let _ = write!(text, "\n--- Page {} ---\n{}\n", page_number, page_text);
    }

    Ok(text.trim().to_string())
}

/// List loadable documents directly inside `dir`, sorted by path
#[inline]
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "txt" | "text" | "md" | "markdown" | "pdf"
            )
        })
}

/// Flatten Markdown into plain paragraphs.
///
/// Headings and list items become their own lines, code blocks keep their
/// content, and markup characters are dropped.
#[inline]
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Item) => text.push_str("- "),
            Event::End(TagEnd::Heading(_) | TagEnd::Paragraph | TagEnd::CodeBlock) => {
                text.push_str("\n\n");
            }
            Event::End(TagEnd::Item) => text.push('\n'),
            Event::Text(content) | Event::Code(content) => text.push_str(&content),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            _ => {}
        }
    }

    text.trim().to_string()
}

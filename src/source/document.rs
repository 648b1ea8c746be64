//! Uploaded document source.
//!
//! Extracts plain text from `.txt`, `.pdf` and `.docx` files. Files with any
//! other extension are skipped without error.

use super::SourceDocument;
use crate::error::{Result, SporError};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Extensions that can be loaded, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt"];

/// Maximum decompressed bytes read from `word/document.xml`.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Check if path has a supported document extension.
pub fn is_supported_document(path: &Path) -> bool {
    extension(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Identifier of a document set: the file names joined with `-`.
pub fn document_set_id(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| file_name(p))
        .collect::<Vec<_>>()
        .join("-")
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Local document source.
pub struct DocumentSource;

impl DocumentSource {
    pub fn new() -> Self {
        Self
    }

    /// Load every supported document, skipping the rest.
    ///
    /// Fails if none of the paths is a supported document, or if a supported
    /// document cannot be read.
    #[instrument(skip_all, fields(count = paths.len()))]
    pub fn load_all(&self, paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
        let mut documents = Vec::new();

        for path in paths {
            if !is_supported_document(path) {
                debug!("Skipping unsupported file {:?}", path);
                continue;
            }
            documents.push(self.load(path)?);
        }

        if documents.is_empty() {
            return Err(SporError::SourceLoad(format!(
                "no supported documents (expected one of: {})",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        info!("Loaded {} of {} documents", documents.len(), paths.len());
        Ok(documents)
    }

    /// Extract the text of a single supported document.
    pub fn load(&self, path: &Path) -> Result<SourceDocument> {
        let bytes = std::fs::read(path)
            .map_err(|e| SporError::SourceLoad(format!("Failed to read {:?}: {}", path, e)))?;

        let text = match extension(path).as_deref() {
            Some("txt") => String::from_utf8_lossy(&bytes).into_owned(),
            Some("pdf") => extract_pdf(&bytes)
                .map_err(|e| SporError::SourceLoad(format!("{:?}: {}", path, e)))?,
            Some("docx") => extract_docx(&bytes)
                .map_err(|e| SporError::SourceLoad(format!("{:?}: {}", path, e)))?,
            _ => {
                return Err(SporError::InvalidInput(format!(
                    "Unsupported document type: {:?}",
                    path
                )))
            }
        };

        debug!("Extracted {} characters from {:?}", text.chars().count(), path);
        Ok(SourceDocument::new(file_name(path), text))
    }
}

impl Default for DocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| format!("PDF extraction failed: {}", e))
}

fn extract_docx(bytes: &[u8]) -> std::result::Result<String, String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| format!("Invalid DOCX archive: {}", e))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| "word/document.xml not found".to_string())?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| format!("Failed to read DOCX body: {}", e))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err("word/document.xml exceeds size limit".to_string());
    }

    docx_body_text(&xml)
}

/// Collect `w:t` runs, with one line per `w:p` paragraph.
fn docx_body_text(xml: &[u8]) -> std::result::Result<String, String> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| format!("Invalid DOCX text: {}", e))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Invalid DOCX XML: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

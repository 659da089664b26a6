//! PDF loader producing per-page text

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Document, Page};

/// How long the whole-file fallback extractor may run before we give up on it
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Fold typographic characters and ligatures that PDF fonts commonly emit
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}', '\u{201A}'], "'")
        .replace(['\u{201C}', '\u{201D}', '\u{201E}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace(['\u{00A0}', '\u{2002}', '\u{2003}', '\u{2009}'], " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

/// Normalize extracted text: fold glyphs, trim lines, drop blank lines
fn normalize(text: &str) -> String {
    cleanup_pdf_text(text)
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// PDF loader
pub struct PdfLoader;

impl PdfLoader {
    /// Load a PDF from disk. The path becomes the document source.
    pub fn load_path(path: &Path) -> Result<Document> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::check_extension(&filename)?;

        let data = std::fs::read(path)?;
        Self::load(&filename, &path.display().to_string(), &data)
    }

    /// Load a PDF from uploaded bytes. The upload name becomes the document source.
    pub fn load_bytes(filename: &str, data: &[u8]) -> Result<Document> {
        Self::check_extension(filename)?;
        Self::load(filename, filename, data)
    }

    fn check_extension(filename: &str) -> Result<()> {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if extension != "pdf" {
            return Err(Error::UnsupportedFileType(format!(
                "{} - only PDF documents can be indexed",
                filename
            )));
        }
        Ok(())
    }

    fn load(filename: &str, source: &str, data: &[u8]) -> Result<Document> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len() as u32;

        let mut pages = Vec::new();
        for page_number in page_numbers {
            match doc.extract_text(&[page_number]) {
                Ok(text) => {
                    let content = normalize(&text);
                    if content.is_empty() {
                        tracing::debug!("Skipping page {} of {}: no text", page_number, filename);
                        continue;
                    }
                    pages.push(Page {
                        page_number,
                        content,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        "Could not extract page {} of {}: {}",
                        page_number,
                        filename,
                        e
                    );
                }
            }
        }

        if pages.is_empty() {
            tracing::warn!(
                "Per-page extraction produced no text for {}, trying whole-file extraction",
                filename
            );
            let content = normalize(&Self::extract_whole_file(filename, data)?);
            if !content.is_empty() {
                pages.push(Page {
                    page_number: 1,
                    content,
                });
            }
        }

        if pages.is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        tracing::info!(
            "Loaded {}: {} of {} pages with text",
            filename,
            pages.len(),
            total_pages
        );

        Ok(Document::from_pages(
            filename,
            source,
            pages,
            total_pages.max(1),
        ))
    }

    /// Whole-file extraction on a separate thread, since some fonts make pdf-extract hang or panic
    fn extract_whole_file(filename: &str, data: &[u8]) -> Result<String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(FALLBACK_TIMEOUT) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::file_parse(filename, format!("Text extraction failed: {}", e)))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!("PDF extraction timeout after {:?}", FALLBACK_TIMEOUT);
                Err(Error::file_parse(filename, "Text extraction timed out"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed");
                Err(Error::file_parse(filename, "Text extraction crashed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_glyphs_and_drops_blank_lines() {
        let text = "  \u{FB01}rst line \n\n\n\u{201C}quoted\u{201D}\0  \n   ";
        assert_eq!(normalize(text), "first line\n\"quoted\"");
    }

    #[test]
    fn test_rejects_non_pdf_extension() {
        let err = PdfLoader::load_bytes("notes.txt", b"hello").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_malformed_pdf_is_parse_error() {
        let err = PdfLoader::load_bytes("broken.pdf", b"this is not a pdf").unwrap_err();
        match err {
            Error::FileParse { filename, .. } => assert_eq!(filename, "broken.pdf"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

pub mod chunker;
mod html;
mod pdf;
mod txt;

use thiserror::Error;

pub use html::extract_html;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("File '{0}' has no extension to pick an extractor from")]
    MissingExtension(String),
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("HTML extraction failed: {0}")]
    HtmlError(String),
}

/// A page of extracted text.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-based page number (for PDFs). For text and HTML, always 1.
    pub page_number: usize,
    /// The extracted text content.
    pub text: String,
}

/// Result of extracting text from a document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename or URL.
    pub filename: String,
    /// File type: "pdf", "txt", "md", "html"
    pub file_type: String,
    /// Extracted pages.
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// Get all text concatenated.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Total character count across all pages.
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Extract text from file bytes based on file type.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let ext = match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => return Err(ExtractionError::MissingExtension(filename.to_string())),
    };
    let file_type = ext.as_str();

    let pages = match file_type {
        "pdf" => pdf::extract_pdf(bytes)?,
        "txt" | "text" | "md" | "markdown" => txt::extract_txt(bytes)?,
        "html" | "htm" => {
            let html = txt::decode_utf8(bytes);
            vec![PageContent {
                page_number: 1,
                text: html::html_to_text(&html, None)?,
            }]
        }
        other => return Err(ExtractionError::UnsupportedType(other.to_string())),
    };

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        file_type: file_type.to_string(),
        pages,
    })
}

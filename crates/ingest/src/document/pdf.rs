use super::{ExtractionError, PageContent};

pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;

    if text.trim().is_empty() {
        // Scanned/image-only PDF: no text layer. The caller reports it.
        tracing::warn!("PDF has no extractable text layer");
        return Ok(vec![PageContent {
            page_number: 1,
            text: String::new(),
        }]);
    }

    let pages = split_pages(&text);
    tracing::debug!(
        "PDF extracted: {} pages, {} chars",
        pages.len(),
        pages.iter().map(|p| p.text.chars().count()).sum::<usize>()
    );
    Ok(pages)
}

/// pdf-extract returns all text as one string; form feeds separate pages.
/// Blank pages are dropped but keep their place in the numbering.
fn split_pages(text: &str) -> Vec<PageContent> {
    if !text.contains('\x0C') {
        return vec![PageContent {
            page_number: 1,
            text: text.trim().to_string(),
        }];
    }

    text.split('\x0C')
        .enumerate()
        .filter(|(_, page_text)| !page_text.trim().is_empty())
        .map(|(i, page_text)| PageContent {
            page_number: i + 1,
            text: page_text.trim().to_string(),
        })
        .collect()
}

use std::io::Cursor;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{ExtractedDocument, ExtractionError, PageContent};

/// Below this many characters the readability output is treated as a miss
/// and the whole body is stripped instead.
const MIN_READABLE_CHARS: usize = 200;

/// Base used when HTML arrives as an uploaded file rather than from a URL.
const FILE_BASE_URL: &str = "http://localhost/";

static SKIP_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template)[^>]*>.*?</(script|style|noscript|template)>")
        .expect("valid regex")
});
static BLOCK_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|section|article|blockquote)>")
        .expect("valid regex")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\x0C]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Extract the readable text of a fetched web page.
pub fn extract_html(html: &str, url: &str) -> Result<ExtractedDocument, ExtractionError> {
    let text = html_to_text(html, Some(url))?;
    tracing::debug!(url, chars = text.chars().count(), "HTML extracted");

    Ok(ExtractedDocument {
        filename: url.to_string(),
        file_type: "html".to_string(),
        pages: vec![PageContent {
            page_number: 1,
            text,
        }],
    })
}

/// Readability first; when it fails or yields too little, strip the body.
pub(crate) fn html_to_text(html: &str, url: Option<&str>) -> Result<String, ExtractionError> {
    let base = Url::parse(url.unwrap_or(FILE_BASE_URL))
        .map_err(|e| ExtractionError::HtmlError(format!("invalid URL: {e}")))?;

    let mut cursor = Cursor::new(html.as_bytes());
    let readable = match readability::extractor::extract(&mut cursor, &base) {
        Ok(product) => normalize(&product.text),
        Err(e) => {
            tracing::debug!(error = %e, "readability failed, stripping tags");
            String::new()
        }
    };

    if readable.chars().count() >= MIN_READABLE_CHARS {
        return Ok(readable);
    }

    let stripped = strip_tags(body_of(html));
    if stripped.is_empty() {
        Ok(readable)
    } else {
        Ok(stripped)
    }
}

fn body_of(html: &str) -> &str {
    let lower = html.to_ascii_lowercase();
    let start = lower
        .find("<body")
        .and_then(|i| lower[i..].find('>').map(|j| i + j + 1));
    let end = lower.rfind("</body>");
    match (start, end) {
        (Some(start), Some(end)) if start < end => &html[start..end],
        _ => html,
    }
}

fn strip_tags(html: &str) -> String {
    let text = SKIP_BLOCKS.replace_all(html, "");
    let text = BLOCK_BREAKS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);
    normalize(&text)
}

fn normalize(text: &str) -> String {
    let text = INLINE_SPACE.replace_all(text, " ");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_LINES.replace_all(&joined, "\n\n").trim().to_string()
}

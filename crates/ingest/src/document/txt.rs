use super::{ExtractionError, PageContent};

/// Decode as UTF-8, falling back to lossy conversion.
pub(crate) fn decode_utf8(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

pub fn extract_txt(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    Ok(vec![PageContent {
        page_number: 1,
        text: decode_utf8(bytes).trim().to_string(),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_simple_text() {
        let pages = extract_txt(b"Hello, world!\nThis is a test file.").unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert!(pages[0].text.contains("Hello, world!"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let pages = extract_txt(b"ok \xff\xfe end").unwrap();
        assert!(pages[0].text.starts_with("ok "));
        assert!(pages[0].text.ends_with(" end"));
        assert!(pages[0].text.contains('\u{FFFD}'));
    }

    #[test]
    fn extract_empty_text() {
        let pages = extract_txt(b"").unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "");
    }

    #[test]
    fn trims_whitespace() {
        let pages = extract_txt(b"  \n  Hello  \n  ").unwrap();
        assert_eq!(pages[0].text, "Hello");
    }
}

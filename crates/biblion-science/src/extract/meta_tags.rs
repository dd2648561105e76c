use scraper::{Html, Selector};

use biblion_core::RawRecord;

use crate::error::{Result, ScienceError};
use crate::extract::Extractor;

/// `<meta name=... content=...>` scraping. Names are lower-cased and
/// repeated names fold into one multi-valued tag.
///
/// Always yields exactly one record per page, possibly empty: a page
/// without metadata is suppressed later when it cooks to nothing.
#[derive(Debug, Default)]
pub struct MetaTagExtractor {
    record: RawRecord,
}

impl MetaTagExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extractor for MetaTagExtractor {
    fn extract(&mut self, _identifier: &str, text: &str) -> Result<Vec<RawRecord>> {
        let document = Html::parse_document(text);
        let meta = parse_selector("meta[name][content]")?;

        for element in document.select(&meta) {
            let value = element.value();
            let (Some(name), Some(content)) = (value.attr("name"), value.attr("content")) else {
                continue;
            };
            self.record
                .push(&name.trim().to_ascii_lowercase(), normalize_whitespace(content));
        }
        Ok(vec![std::mem::take(&mut self.record)])
    }
}

fn parse_selector(input: &str) -> Result<Selector> {
    Selector::parse(input)
        .map_err(|e| ScienceError::Parse(format!("invalid selector {input}: {e}")))
}

fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta name="citation_title" content="Fish &amp; Chips:
   a study">
<meta name="Citation_Author" content="Smith, J.">
<meta name="citation_author" content="Doe, A.">
<meta name="dc.date" content="2020-01-02">
<meta name="viewport">
<meta property="og:title" content="ignored">
</head><body></body></html>"#;

    #[test]
    fn test_meta_tags_fold_and_decode() {
        let records = MetaTagExtractor::new().extract("/a", PAGE).unwrap();
        assert_eq!(records.len(), 1);
        let raw = &records[0];
        assert_eq!(raw.first("citation_title"), Some("Fish & Chips: a study"));
        assert_eq!(raw.get("citation_author"), ["Smith, J.", "Doe, A."]);
        assert_eq!(raw.first("dc.date"), Some("2020-01-02"));
        assert!(!raw.contains("viewport"));
        assert!(!raw.contains("og:title"));
    }

    #[test]
    fn test_page_without_metadata_yields_empty_record() {
        let records = MetaTagExtractor::new()
            .extract("/404", "<html><body>Page not found</body></html>")
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_empty());
    }
}

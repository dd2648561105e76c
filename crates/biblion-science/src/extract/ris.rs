use once_cell::sync::Lazy;
use regex::Regex;

use biblion_core::RawRecord;

use crate::error::{Result, ScienceError};
use crate::extract::Extractor;

static RIS_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][A-Z0-9])\s{1,2}-\s?(.*)$").expect("valid RIS line regex")
});

/// Reads `TY`…`ER` records. Every record keeps its `TY` value as a raw
/// tag so it can drive type branching.
///
/// Lines that are not tag lines continue the previous value. Anything
/// before the first `TY` is ignored.
#[derive(Debug, Default)]
pub struct RisExtractor {
    records: Vec<RawRecord>,
    current: Option<RawRecord>,
    pending: Option<(String, String)>,
}

impl RisExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_value(&mut self) {
        if let (Some(record), Some((tag, value))) = (self.current.as_mut(), self.pending.take()) {
            record.push(&tag, value.trim().to_string());
        }
    }

    fn close_record(&mut self) {
        self.flush_value();
        if let Some(record) = self.current.take() {
            self.records.push(record);
        }
    }
}

impl Extractor for RisExtractor {
    fn extract(&mut self, identifier: &str, text: &str) -> Result<Vec<RawRecord>> {
        let text = text.trim_start_matches('\u{feff}');

        for raw_line in text.lines() {
            let line = raw_line.trim_end();
            if line.trim().is_empty() {
                continue;
            }

            let Some(caps) = RIS_LINE_RE.captures(line) else {
                if let Some((_, value)) = self.pending.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            };
            let tag = &caps[1];
            let value = caps[2].trim();

            match tag {
                "TY" => {
                    // a TY without ER closes the previous record
                    self.close_record();
                    let mut record = RawRecord::new();
                    record.push("TY", value.to_string());
                    self.current = Some(record);
                }
                "ER" => self.close_record(),
                _ if self.current.is_some() => {
                    self.flush_value();
                    self.pending = Some((tag.to_string(), value.to_string()));
                }
                _ => {}
            }
        }
        self.close_record();

        if self.records.is_empty() {
            return Err(ScienceError::SchemaMismatch {
                resource: identifier.to_string(),
                reason: "no RIS record (TY line) found".to_string(),
            });
        }
        Ok(std::mem::take(&mut self.records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Provider: Example\r\n\
TY  - JOUR\r\n\
T1  - Title of\r\n\
  Article\r\n\
AU  - Smith, J.\r\n\
AU  - Doe, A.\r\n\
DA  - \r\n\
Y1  - 2011/02/18\r\n\
SN  - 1941-9899\r\n\
ER  - \r\n\
TY  - BOOK\r\n\
T1  - X\r\n\
ER  -\r\n";

    #[test]
    fn test_records_and_continuations() {
        let records = RisExtractor::new().extract("/a.ris", SAMPLE).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.first("TY"), Some("JOUR"));
        assert_eq!(first.first("T1"), Some("Title of Article"));
        assert_eq!(first.get("AU"), ["Smith, J.", "Doe, A."]);
        assert!(!first.contains("DA"));
        assert_eq!(first.first("Y1"), Some("2011/02/18"));
        assert!(!first.contains("Provider"));

        assert_eq!(records[1].first("TY"), Some("BOOK"));
        assert_eq!(records[1].first("T1"), Some("X"));
    }

    #[test]
    fn test_missing_er_still_closes_record() {
        let records = RisExtractor::new()
            .extract("/a.ris", "TY  - JOUR\nT1  - A\nTY  - JOUR\nT1  - B\n")
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].first("T1"), Some("B"));
    }

    #[test]
    fn test_no_records_is_schema_mismatch() {
        let err = RisExtractor::new()
            .extract("/a.ris", "<html>not found</html>")
            .unwrap_err();
        assert!(matches!(err, ScienceError::SchemaMismatch { .. }));
    }
}

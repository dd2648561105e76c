//! Cross-checks cooked records against the trusted registry so records
//! reached by over-crawling never leave the pipeline.

use biblion_core::{
    CollectionParams, CookedRecord, MetadataField, PublicationKind, PublicationType, Registry,
    RegistryEntry, ValidationConfig,
};

use crate::identifiers::{Isbn, normalize_id};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(String),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    fn reject(reason: impl Into<String>) -> Self {
        Verdict::Reject(reason.into())
    }
}

/// Validator for one pass: the registry entry for the declared
/// parameters is looked up once, up front.
#[derive(Debug, Clone)]
pub struct RegistryValidator {
    params: CollectionParams,
    entry: Option<RegistryEntry>,
    config: ValidationConfig,
}

impl RegistryValidator {
    pub fn new(params: &CollectionParams, registry: &dyn Registry, config: &ValidationConfig) -> Self {
        Self {
            params: params.clone(),
            entry: registry.lookup(params),
            config: config.clone(),
        }
    }

    pub fn entry(&self) -> Option<&RegistryEntry> {
        self.entry.as_ref()
    }

    pub fn validate(&self, cooked: &CookedRecord) -> Verdict {
        if !self.config.enabled {
            return Verdict::Accept;
        }
        let verdict = match cooked.publication_kind() {
            PublicationKind::Journal { .. } => self.validate_journal(cooked),
            PublicationKind::Book { .. } | PublicationKind::BookChapter { .. } => {
                self.validate_book(cooked)
            }
        };
        if !verdict.is_accept() {
            return verdict;
        }
        if self.config.check_year {
            return self.check_year(cooked);
        }
        Verdict::Accept
    }

    /// Fill publisher and publication title from the registry when unset.
    pub fn complete(&self, cooked: &mut CookedRecord) {
        if !self.config.complete_from_registry {
            return;
        }
        let Some(entry) = &self.entry else {
            return;
        };
        if let Some(publisher) = &entry.publisher {
            cooked.put(MetadataField::Publisher, publisher.as_str());
        }
        if let Some(title) = &entry.publication_title {
            cooked.put(MetadataField::PublicationTitle, title.as_str());
        }
    }

    fn validate_journal(&self, cooked: &CookedRecord) -> Verdict {
        let entry = self.entry.as_ref();
        if let Some(kind) = entry.and_then(|e| e.publication_type)
            && kind.is_book_like()
        {
            return Verdict::reject(format!("registry lists a {kind}, record is a journal article"));
        }

        let found_issn = cooked.get(MetadataField::Issn);
        let found_eissn = cooked.get(MetadataField::Eissn);
        let mut issn_checked = false;
        if let Some(entry) = entry {
            let declared: Vec<String> = [&entry.issn, &entry.eissn]
                .into_iter()
                .flatten()
                .map(|s| normalize_id(s))
                .collect();
            let listed = |found: &str| declared.contains(&normalize_id(found));

            if declared.len() == 2 {
                // electronic ISSN is decisive when the record has one
                if let Some(found) = found_eissn.or(found_issn) {
                    if !listed(found) {
                        return Verdict::reject(format!("ISSN {found} not in registry"));
                    }
                    issn_checked = true;
                }
            } else if declared.len() == 1 {
                for found in [found_issn, found_eissn].into_iter().flatten() {
                    if !listed(found) {
                        return Verdict::reject(format!("ISSN {found} not in registry"));
                    }
                    issn_checked = true;
                }
            }
        }

        let found_volume = cooked.get(MetadataField::Volume);
        let found_title = cooked.get(MetadataField::PublicationTitle);
        if found_volume.is_none() && found_title.is_none() {
            return Verdict::Accept;
        }

        if let (Some(found), Some(declared)) = (found_volume, self.params.volume_name.as_deref())
            && found.trim() != declared.trim()
        {
            return Verdict::reject(format!("volume {found} is not the declared volume {declared}"));
        }
        if issn_checked {
            return Verdict::Accept;
        }

        match (found_title, entry.and_then(|e| e.publication_title.as_deref())) {
            (Some(found), Some(expected)) if !titles_match(found, expected) => {
                Verdict::reject(format!("publication title '{found}' does not match '{expected}'"))
            }
            _ => Verdict::Accept,
        }
    }

    fn validate_book(&self, cooked: &CookedRecord) -> Verdict {
        let Some(entry) = self.entry.as_ref() else {
            return Verdict::Accept;
        };
        let journal_only = entry.isbn.is_none()
            && entry.eisbn.is_none()
            && (entry.issn.is_some() || entry.eissn.is_some());
        if entry.publication_type == Some(PublicationType::Journal)
            || (entry.publication_type.is_none() && journal_only)
        {
            return Verdict::reject("registry lists a journal, record is a book");
        }

        let found: Vec<String> = [MetadataField::Eisbn, MetadataField::Isbn]
            .into_iter()
            .filter_map(|f| cooked.get(f))
            .map(isbn_key)
            .collect();
        if found.is_empty() {
            return Verdict::Accept;
        }

        let expected: Vec<String> = [
            self.params.get("book_eisbn").map(str::to_string),
            entry.eisbn.clone(),
            entry.isbn.clone(),
        ]
        .into_iter()
        .flatten()
        .map(|s| isbn_key(&s))
        .collect();
        if expected.is_empty() || found.iter().any(|f| expected.contains(f)) {
            Verdict::Accept
        } else {
            Verdict::reject(format!("ISBN {} not in registry", found.join("/")))
        }
    }

    fn check_year(&self, cooked: &CookedRecord) -> Verdict {
        let Some(year) = cooked.get(MetadataField::Date).and_then(year_of) else {
            return Verdict::Accept;
        };
        let declared: Vec<&str> = match self.entry.as_ref().map(|e| e.years()) {
            Some(years) if !years.is_empty() => years,
            _ => self
                .params
                .year
                .as_deref()
                .map(|y| y.split(['/', '-', ',']).map(str::trim).collect())
                .unwrap_or_default(),
        };
        if declared.is_empty() || declared.contains(&year) {
            Verdict::Accept
        } else {
            Verdict::reject(format!("year {year} outside {}", declared.join(",")))
        }
    }
}

/// ISBN-13 form of a valid ISBN so both forms of one book compare equal;
/// malformed values compare as written, minus punctuation.
fn isbn_key(value: &str) -> String {
    match Isbn::parse(value) {
        Ok(isbn) => isbn.isbn13,
        Err(_) => normalize_id(value),
    }
}

/// The four-digit year inside a date such as `2020/04/07`, `2020-04` or `April 7, 2020`.
fn year_of(date: &str) -> Option<&str> {
    date.split(['/', '-', ',', ' '])
        .map(str::trim)
        .find(|part| part.len() == 4 && part.chars().all(|c| c.is_ascii_digit()))
}

/// Title comparison tolerant of punctuation and article differences:
/// containment in either direction after normalization, then the same
/// on bare alphanumerics.
pub fn titles_match(found: &str, expected: &str) -> bool {
    let contains_either = |a: &str, b: &str| !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a));
    contains_either(&normalize_title(found), &normalize_title(expected))
        || contains_either(&raw_title(found), &raw_title(expected))
}

pub fn normalize_title(title: &str) -> String {
    let lower = title.trim().to_lowercase();
    let lower = lower.strip_prefix("the ").unwrap_or(&lower);
    let mapped: String = lower
        .replace('&', " and ")
        .chars()
        .filter_map(|c| match c {
            '\u{2013}' | '\u{2014}' => Some('-'),
            '\u{201c}' | '\u{201d}' => Some('"'),
            '\'' | '\u{2018}' | '\u{2019}' => None,
            other => Some(other),
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn raw_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblion_core::{ArticleType, StaticRegistry};

    fn journal_entry() -> RegistryEntry {
        RegistryEntry {
            publication_title: Some("Psychology & Sexuality".to_string()),
            publisher: Some("Taylor & Francis".to_string()),
            publication_type: Some(PublicationType::Journal),
            issn: Some("1941-9899".to_string()),
            eissn: Some("1941-9902".to_string()),
            year: Some("2011".to_string()),
            ..Default::default()
        }
    }

    fn validator(entry: RegistryEntry, config: ValidationConfig) -> RegistryValidator {
        let params = CollectionParams {
            base_url: "http://x.org/".to_string(),
            volume_name: Some("2".to_string()),
            ..Default::default()
        };
        RegistryValidator::new(&params, &StaticRegistry::new(vec![entry]), &config)
    }

    fn journal(issn: &str, title: &str) -> CookedRecord {
        let mut rec = CookedRecord::new();
        rec.put(MetadataField::Issn, issn);
        rec.put(MetadataField::PublicationTitle, title);
        rec.put(MetadataField::ArticleTitle, "Some article");
        rec
    }

    #[test]
    fn test_matching_issn_accepts() {
        let v = validator(journal_entry(), ValidationConfig::default());
        assert!(v.validate(&journal("1941-9899", "Whatever")).is_accept());
        assert!(v.validate(&journal("19419902", "Whatever")).is_accept());
    }

    #[test]
    fn test_foreign_issn_rejects() {
        let v = validator(journal_entry(), ValidationConfig::default());
        assert!(!v.validate(&journal("1800-5555", "Psychology & Sexuality")).is_accept());
    }

    #[test]
    fn test_single_registry_issn_still_rejects_foreign() {
        let entry = RegistryEntry {
            eissn: None,
            ..journal_entry()
        };
        let v = validator(entry, ValidationConfig::default());
        assert!(!v.validate(&journal("1800-5555", "Psychology & Sexuality")).is_accept());
        assert!(v.validate(&journal("1941-9899", "Other")).is_accept());
    }

    #[test]
    fn test_title_fallback_without_issn() {
        let v = validator(journal_entry(), ValidationConfig::default());
        let mut rec = CookedRecord::new();
        rec.put(MetadataField::PublicationTitle, "The Psychology and Sexuality");
        assert!(v.validate(&rec).is_accept());

        let mut rec = CookedRecord::new();
        rec.put(MetadataField::PublicationTitle, "Journal of Something Else");
        assert!(!v.validate(&rec).is_accept());
    }

    #[test]
    fn test_volume_must_match_declared() {
        let v = validator(journal_entry(), ValidationConfig::default());
        let mut rec = journal("1941-9899", "Psychology & Sexuality");
        rec.put(MetadataField::Volume, "3");
        assert!(!v.validate(&rec).is_accept());
        rec.replace(MetadataField::Volume, "2");
        assert!(v.validate(&rec).is_accept());
    }

    #[test]
    fn test_isbn_record_against_journal_registry_rejects() {
        let entry = RegistryEntry {
            publication_type: None,
            eissn: None,
            ..journal_entry()
        };
        let v = validator(entry, ValidationConfig::default());
        let mut rec = CookedRecord::new();
        rec.replace(MetadataField::Isbn, "978-0-000");
        assert!(!v.validate(&rec).is_accept());
    }

    #[test]
    fn test_book_isbn_matching() {
        let entry = RegistryEntry {
            publication_type: Some(PublicationType::Book),
            isbn: Some("978-0-306-40615-7".to_string()),
            ..Default::default()
        };
        let v = validator(entry, ValidationConfig::default());

        let mut rec = CookedRecord::new();
        rec.set_article_type(ArticleType::BookVolume);
        rec.put(MetadataField::Isbn, "9780306406157");
        assert!(v.validate(&rec).is_accept());

        rec.replace(MetadataField::Isbn, "9780000000002");
        assert!(!v.validate(&rec).is_accept());

        let mut journal = journal("1941-9899", "x");
        journal.set_publication_type(PublicationType::Journal);
        assert!(!v.validate(&journal).is_accept());
    }

    #[test]
    fn test_isbn10_and_isbn13_of_one_book_match() {
        let entry = RegistryEntry {
            publication_type: Some(PublicationType::Book),
            isbn: Some("0-306-40615-2".to_string()),
            ..Default::default()
        };
        let v = validator(entry, ValidationConfig::default());

        let mut rec = CookedRecord::new();
        rec.set_article_type(ArticleType::BookVolume);
        rec.put(MetadataField::Isbn, "978-0-306-40615-7");
        assert!(v.validate(&rec).is_accept());

        // a form-valid ISBN with a bad checksum still compares as written
        rec.replace(MetadataField::Isbn, "9780306406158");
        assert!(!v.validate(&rec).is_accept());
    }

    #[test]
    fn test_year_check() {
        let config = ValidationConfig {
            check_year: true,
            ..Default::default()
        };
        let v = validator(
            RegistryEntry {
                year: Some("2019-2020".to_string()),
                ..journal_entry()
            },
            config,
        );
        let mut rec = journal("1941-9899", "x");
        rec.put(MetadataField::Date, "2020/04/07");
        assert!(v.validate(&rec).is_accept());
        rec.replace(MetadataField::Date, "2011/04/07");
        assert!(!v.validate(&rec).is_accept());
    }

    #[test]
    fn test_complete_from_registry() {
        let v = validator(journal_entry(), ValidationConfig::default());
        let mut rec = CookedRecord::new();
        rec.put(MetadataField::Publisher, "Kept");
        v.complete(&mut rec);
        assert_eq!(rec.get(MetadataField::Publisher), Some("Kept"));
        assert_eq!(
            rec.get(MetadataField::PublicationTitle),
            Some("Psychology & Sexuality")
        );
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("The  Journal of Rock & Roll \u{2013} Studies"),
            "journal of rock and roll - studies"
        );
        assert_eq!(normalize_title("Children\u{2019}s Health"), "childrens health");
    }
}

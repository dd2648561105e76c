//! Raw tags → canonical fields.
//!
//! Cooking runs in a fixed order: the cook map, then type branching,
//! then fallback chains, then the schema's post-cook hook. Every step is
//! a pure function of the raw record, so cooking the same record twice
//! gives the same result.

use biblion_core::{
    ArticleType, CookedRecord, MetadataField, PublicationType, RawRecord, TypeBranchConfig,
    TypeRuleConfig,
};

use crate::error::{Result, ScienceError};
use crate::identifiers::{Doi, Isbn, Issn};
use crate::schema::Schema;

// ─── Type branching ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Journal,
    Book,
    Chapter,
}

/// Compiled discriminator rule.
#[derive(Debug, Clone)]
pub struct TypeRule {
    tag: String,
    journal: TypeBranchConfig,
    book: TypeBranchConfig,
    chapter: TypeBranchConfig,
}

impl TypeRule {
    pub fn from_config(config: &TypeRuleConfig) -> Result<Self> {
        if config.tag.trim().is_empty() {
            return Err(ScienceError::Config(
                "type rule needs a discriminator tag".to_string(),
            ));
        }
        Ok(Self {
            tag: config.tag.clone(),
            journal: config.journal.clone(),
            book: config.book.clone(),
            chapter: config.chapter.clone(),
        })
    }

    /// Record type named by the discriminator, compared case-insensitively.
    pub fn classify(&self, raw: &RawRecord) -> Option<RecordType> {
        let value = raw.first(&self.tag)?.trim();
        let listed = |branch: &TypeBranchConfig| {
            branch.values.iter().any(|v| v.eq_ignore_ascii_case(value))
        };
        if listed(&self.chapter) {
            Some(RecordType::Chapter)
        } else if listed(&self.book) {
            Some(RecordType::Book)
        } else if listed(&self.journal) {
            Some(RecordType::Journal)
        } else {
            None
        }
    }

    pub fn branch(&self, kind: RecordType) -> &TypeBranchConfig {
        match kind {
            RecordType::Journal => &self.journal,
            RecordType::Book => &self.book,
            RecordType::Chapter => &self.chapter,
        }
    }
}

// ─── Cooking ───────────────────────────────────────────────

/// The cook map alone: every listed tag feeds its field in map order.
/// Single fields keep the first value that survives validation.
pub fn cook_map(raw: &RawRecord, map: &[(String, MetadataField)]) -> CookedRecord {
    let mut cooked = CookedRecord::new();
    for (tag, field) in map {
        for value in raw.get(tag) {
            put_checked(&mut cooked, *field, value);
        }
    }
    cooked
}

/// Full cook chain for one raw record.
pub fn cook(raw: &RawRecord, schema: &Schema) -> CookedRecord {
    let mut cooked = cook_map(raw, &schema.cook);

    let record_type = schema.type_rule.as_ref().and_then(|rule| {
        let kind = rule.classify(raw)?;
        apply_branch(&mut cooked, raw, kind, rule.branch(kind));
        Some(kind)
    });

    apply_fallbacks(&mut cooked, raw, &schema.fallbacks);

    if let Some(hook) = &schema.post_cook {
        hook(&mut cooked, raw, record_type);
    }
    cooked
}

/// Set `field` from the first raw tag of each chain, only while it is unset.
pub fn apply_fallbacks(
    cooked: &mut CookedRecord,
    raw: &RawRecord,
    fallbacks: &[(MetadataField, Vec<String>)],
) {
    for (field, tags) in fallbacks {
        for tag in tags {
            // multi fields too are only filled from a fallback when empty
            if cooked.has(*field) {
                break;
            }
            for value in raw.get(tag) {
                put_checked(cooked, *field, value);
            }
        }
    }
}

fn apply_branch(
    cooked: &mut CookedRecord,
    raw: &RawRecord,
    kind: RecordType,
    branch: &TypeBranchConfig,
) {
    let redirect = |cooked: &mut CookedRecord, field, tags: &Option<Vec<String>>| {
        if let Some(tags) = tags {
            let value = tags.iter().find_map(|t| raw.first(t)).unwrap_or_default();
            cooked.replace(field, value);
        }
    };
    redirect(cooked, MetadataField::ArticleTitle, &branch.article_title);
    redirect(cooked, MetadataField::PublicationTitle, &branch.publication_title);
    redirect(cooked, MetadataField::SeriesTitle, &branch.series_title);

    let number_field = match kind {
        RecordType::Journal => MetadataField::Issn,
        RecordType::Book | RecordType::Chapter => MetadataField::Isbn,
    };
    for tag in &branch.standard_number {
        for value in raw.get(tag) {
            put_checked(cooked, number_field, value);
        }
    }

    match kind {
        RecordType::Journal => {
            cooked.set_publication_type(PublicationType::Journal);
            cooked.set_article_type(ArticleType::JournalArticle);
        }
        RecordType::Book => {
            cooked.set_publication_type(PublicationType::Book);
            cooked.set_article_type(ArticleType::BookVolume);
            // a whole book is its own publication
            if !cooked.has(MetadataField::PublicationTitle)
                && let Some(title) = cooked.get(MetadataField::ArticleTitle).map(str::to_string)
            {
                cooked.put(MetadataField::PublicationTitle, title);
            }
        }
        RecordType::Chapter => {
            cooked.set_publication_type(PublicationType::Book);
            cooked.set_article_type(ArticleType::BookChapter);
        }
    }
}

/// `put` with the field's form check. Rejected values are recorded on
/// the record instead of being set.
pub fn put_checked(cooked: &mut CookedRecord, field: MetadataField, value: &str) -> bool {
    match check_value(field, value) {
        Ok(value) => cooked.put(field, value),
        Err(e) => {
            cooked.record_error(field, value, e.to_string());
            false
        }
    }
}

fn check_value(field: MetadataField, value: &str) -> Result<String> {
    let value = value.trim();
    match field {
        MetadataField::Doi => Doi::parse(value).map(|doi| doi.value),
        MetadataField::Issn | MetadataField::Eissn => Issn::parse(value).map(|issn| issn.value),
        MetadataField::Isbn | MetadataField::Eisbn => Isbn::check_form(value),
        _ => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        let mut raw = RawRecord::new();
        for (tag, value) in pairs {
            raw.push(tag, *value);
        }
        raw
    }

    #[test]
    fn test_book_copies_title_into_publication_title() {
        let schema = presets::build("ris").unwrap();
        let cooked = cook(&raw(&[("TY", "BOOK"), ("T1", "X")]), &schema);

        assert_eq!(cooked.article_type(), Some(ArticleType::BookVolume));
        assert_eq!(cooked.publication_type(), Some(PublicationType::Book));
        assert_eq!(cooked.get(MetadataField::ArticleTitle), Some("X"));
        assert_eq!(cooked.get(MetadataField::PublicationTitle), Some("X"));
    }

    #[test]
    fn test_date_falls_back_to_y1() {
        let schema = presets::build("ris").unwrap();
        let mut record = raw(&[("TY", "JOUR"), ("T1", "A"), ("Y1", "2020")]);
        record.push("DA", "");
        let cooked = cook(&record, &schema);
        assert_eq!(cooked.get(MetadataField::Date), Some("2020"));
    }

    #[test]
    fn test_primary_tag_beats_fallback() {
        let schema = presets::build("ris").unwrap();
        let cooked = cook(
            &raw(&[("TY", "JOUR"), ("DA", "2019/04/07"), ("Y1", "2020"), ("PY", "2021")]),
            &schema,
        );
        assert_eq!(cooked.get(MetadataField::Date), Some("2019/04/07"));
    }

    #[test]
    fn test_cook_is_idempotent() {
        let schema = presets::build("ris").unwrap();
        let record = raw(&[
            ("TY", "CHAP"),
            ("T1", "Chapter one"),
            ("T2", "The book"),
            ("AU", "Smith, J."),
            ("AU", "Doe, A."),
            ("SN", "978-0-306-40615-7"),
            ("DO", "doi:10.1000/xyz"),
        ]);
        let first = cook(&record, &schema);
        let second = cook(&record, &schema);
        assert_eq!(first, second);
        assert_eq!(first.article_type(), Some(ArticleType::BookChapter));
        assert_eq!(first.get(MetadataField::PublicationTitle), Some("The book"));
        assert_eq!(first.get(MetadataField::Isbn), Some("978-0-306-40615-7"));
        assert_eq!(first.get(MetadataField::Doi), Some("10.1000/xyz"));
        assert_eq!(first.get_all(MetadataField::Author).len(), 2);
    }

    #[test]
    fn test_journal_standard_number_is_issn() {
        let schema = presets::build("ris").unwrap();
        let cooked = cook(
            &raw(&[("TY", "JOUR"), ("JO", "Journal"), ("SN", "1941-9899")]),
            &schema,
        );
        assert_eq!(cooked.get(MetadataField::Issn), Some("1941-9899"));
        assert_eq!(cooked.get(MetadataField::PublicationTitle), Some("Journal"));
        assert!(!cooked.has(MetadataField::Isbn));
    }

    #[test]
    fn test_invalid_identifiers_are_recorded_not_set() {
        let map = vec![
            ("DO".to_string(), MetadataField::Doi),
            ("SN".to_string(), MetadataField::Issn),
        ];
        let cooked = cook_map(&raw(&[("DO", "not a doi"), ("SN", "12345")]), &map);
        assert!(!cooked.has(MetadataField::Doi));
        assert!(!cooked.has(MetadataField::Issn));
        assert_eq!(cooked.errors().len(), 2);
        assert_eq!(cooked.errors()[0].field, MetadataField::Doi);
    }

    #[test]
    fn test_first_tag_in_map_order_wins() {
        let map = vec![
            ("T1".to_string(), MetadataField::ArticleTitle),
            ("TI".to_string(), MetadataField::ArticleTitle),
        ];
        let cooked = cook_map(&raw(&[("TI", "second"), ("T1", "first")]), &map);
        assert_eq!(cooked.get(MetadataField::ArticleTitle), Some("first"));
    }
}

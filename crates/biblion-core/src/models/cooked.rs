use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::BiblionError;
use crate::models::field::MetadataField;

// ─── Type enums ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationType {
    Journal,
    Book,
    BookSeries,
    Proceedings,
}

impl PublicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Book => "book",
            Self::BookSeries => "book_series",
            Self::Proceedings => "proceedings",
        }
    }

    pub fn is_book_like(&self) -> bool {
        matches!(self, Self::Book | Self::BookSeries)
    }
}

impl fmt::Display for PublicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationType {
    type Err = BiblionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "journal" => Ok(Self::Journal),
            "book" => Ok(Self::Book),
            "book_series" | "bookseries" => Ok(Self::BookSeries),
            "proceedings" => Ok(Self::Proceedings),
            other => Err(BiblionError::ConfigError(format!(
                "unknown publication type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleType {
    JournalArticle,
    BookVolume,
    BookChapter,
    ProceedingsArticle,
    File,
}

impl ArticleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JournalArticle => "journal_article",
            Self::BookVolume => "book_volume",
            Self::BookChapter => "book_chapter",
            Self::ProceedingsArticle => "proceedings_article",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ArticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleType {
    type Err = BiblionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "journal_article" => Ok(Self::JournalArticle),
            "book_volume" => Ok(Self::BookVolume),
            "book_chapter" => Ok(Self::BookChapter),
            "proceedings_article" => Ok(Self::ProceedingsArticle),
            "file" => Ok(Self::File),
            other => Err(BiblionError::ConfigError(format!(
                "unknown article type '{other}'"
            ))),
        }
    }
}

// ─── CookedRecord ──────────────────────────────────────────

/// A value rejected while cooking, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: MetadataField,
    pub value: String,
    pub reason: String,
}

/// Canonical bibliographic record produced by cooking a [`RawRecord`].
///
/// Single-valued fields are write-once through [`CookedRecord::put`];
/// only [`CookedRecord::replace`] overwrites an existing value.
///
/// [`RawRecord`]: crate::models::RawRecord
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookedRecord {
    fields: BTreeMap<MetadataField, Vec<String>>,
    errors: Vec<FieldError>,
}

impl CookedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single field if unset, or append to a multi field.
    ///
    /// Returns `false` when nothing changed: blank value, single field
    /// already set, or the multi field already holds this exact value.
    pub fn put(&mut self, field: MetadataField, value: impl Into<String>) -> bool {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return false;
        }
        let values = self.fields.entry(field).or_default();
        if field.is_multi() {
            if values.contains(&value) {
                return false;
            }
            values.push(value);
            return true;
        }
        if !values.is_empty() {
            return false;
        }
        values.push(value);
        true
    }

    /// Overwrite a field. A blank value unsets it.
    pub fn replace(&mut self, field: MetadataField, value: impl Into<String>) {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, vec![value]);
        }
    }

    pub fn remove(&mut self, field: MetadataField) -> Option<Vec<String>> {
        self.fields.remove(&field)
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.fields
            .get(&field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, field: MetadataField) -> &[String] {
        self.fields
            .get(&field)
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn has(&self, field: MetadataField) -> bool {
        !self.get_all(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|values| values.is_empty())
    }

    /// True when at least one field describing the work itself is set.
    pub fn has_bibliographic_fields(&self) -> bool {
        self.fields
            .iter()
            .any(|(field, values)| field.is_bibliographic() && !values.is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = (MetadataField, &[String])> {
        self.fields
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(field, values)| (*field, values.as_slice()))
    }

    pub fn record_error(
        &mut self,
        field: MetadataField,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.errors.push(FieldError {
            field,
            value: value.into(),
            reason: reason.into(),
        });
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    // ─── Typed accessors ───────────────────────────────────

    pub fn publication_type(&self) -> Option<PublicationType> {
        self.get(MetadataField::PublicationType)?.parse().ok()
    }

    pub fn article_type(&self) -> Option<ArticleType> {
        self.get(MetadataField::ArticleType)?.parse().ok()
    }

    pub fn set_publication_type(&mut self, kind: PublicationType) {
        self.replace(MetadataField::PublicationType, kind.as_str());
    }

    pub fn set_article_type(&mut self, kind: ArticleType) {
        self.replace(MetadataField::ArticleType, kind.as_str());
    }

    pub fn publication_kind(&self) -> PublicationKind {
        PublicationKind::from_record(self)
    }
}

/// Flat `field → string | [string]` map, single fields as plain strings.
impl Serialize for CookedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let populated: Vec<_> = self.fields().collect();
        let mut map = serializer.serialize_map(Some(populated.len()))?;
        for (field, values) in populated {
            if field.is_multi() {
                map.serialize_entry(field.key(), values)?;
            } else {
                map.serialize_entry(field.key(), &values[0])?;
            }
        }
        map.end()
    }
}

// ─── PublicationKind ───────────────────────────────────────

/// The record shape relevant to registry matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationKind {
    Journal {
        issn: Option<String>,
        eissn: Option<String>,
        volume: Option<String>,
        issue: Option<String>,
    },
    Book {
        isbn: Option<String>,
        eisbn: Option<String>,
    },
    BookChapter {
        isbn: Option<String>,
        eisbn: Option<String>,
        start_page: Option<String>,
        end_page: Option<String>,
    },
}

impl PublicationKind {
    /// Derive the kind from explicit type fields, falling back to the
    /// identifiers present when the record carries no type at all.
    pub fn from_record(record: &CookedRecord) -> Self {
        let owned = |field| record.get(field).map(str::to_string);
        let book = || PublicationKind::Book {
            isbn: owned(MetadataField::Isbn),
            eisbn: owned(MetadataField::Eisbn),
        };

        match (record.article_type(), record.publication_type()) {
            (Some(ArticleType::BookChapter), _) => PublicationKind::BookChapter {
                isbn: owned(MetadataField::Isbn),
                eisbn: owned(MetadataField::Eisbn),
                start_page: owned(MetadataField::StartPage),
                end_page: owned(MetadataField::EndPage),
            },
            (Some(ArticleType::BookVolume), _) => book(),
            (_, Some(kind)) if kind.is_book_like() => book(),
            (None, None)
                if (record.has(MetadataField::Isbn) || record.has(MetadataField::Eisbn))
                    && !record.has(MetadataField::Issn)
                    && !record.has(MetadataField::Eissn) =>
            {
                book()
            }
            _ => PublicationKind::Journal {
                issn: owned(MetadataField::Issn),
                eissn: owned(MetadataField::Eissn),
                volume: owned(MetadataField::Volume),
                issue: owned(MetadataField::Issue),
            },
        }
    }

    pub fn is_book_like(&self) -> bool {
        !matches!(self, PublicationKind::Journal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_single_is_write_once() {
        let mut rec = CookedRecord::new();
        assert!(rec.put(MetadataField::Date, "2020"));
        assert!(!rec.put(MetadataField::Date, "2021"));
        assert_eq!(rec.get(MetadataField::Date), Some("2020"));

        rec.replace(MetadataField::Date, "2021");
        assert_eq!(rec.get(MetadataField::Date), Some("2021"));
        rec.replace(MetadataField::Date, " ");
        assert!(!rec.has(MetadataField::Date));
    }

    #[test]
    fn test_put_multi_appends() {
        let mut rec = CookedRecord::new();
        assert!(rec.put(MetadataField::Author, "Smith, J."));
        assert!(rec.put(MetadataField::Author, "Doe, A."));
        assert!(!rec.put(MetadataField::Author, "Smith, J."));
        assert_eq!(rec.get_all(MetadataField::Author), ["Smith, J.", "Doe, A."]);
    }

    #[test]
    fn test_bibliographic_fields() {
        let mut rec = CookedRecord::new();
        rec.set_article_type(ArticleType::JournalArticle);
        rec.put(MetadataField::AccessUrl, "http://x.org/a.pdf");
        assert!(!rec.is_empty());
        assert!(!rec.has_bibliographic_fields());

        rec.put(MetadataField::ArticleTitle, "A title");
        assert!(rec.has_bibliographic_fields());
    }

    #[test]
    fn test_serialize_flat_map() {
        let mut rec = CookedRecord::new();
        rec.put(MetadataField::ArticleTitle, "A title");
        rec.put(MetadataField::Author, "Smith, J.");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["article_title"], "A title");
        assert_eq!(json["author"][0], "Smith, J.");
    }

    #[test]
    fn test_publication_kind_from_types() {
        let mut rec = CookedRecord::new();
        rec.put(MetadataField::Issn, "1234-5679");
        rec.put(MetadataField::Volume, "12");
        assert!(matches!(
            rec.publication_kind(),
            PublicationKind::Journal { volume: Some(ref v), .. } if v == "12"
        ));

        rec.set_article_type(ArticleType::BookChapter);
        assert!(matches!(rec.publication_kind(), PublicationKind::BookChapter { .. }));
    }

    #[test]
    fn test_untyped_isbn_record_is_book() {
        let mut rec = CookedRecord::new();
        rec.replace(MetadataField::Isbn, "978-0-000");
        assert_eq!(
            rec.publication_kind(),
            PublicationKind::Book {
                isbn: Some("978-0-000".to_string()),
                eisbn: None
            }
        );
    }
}

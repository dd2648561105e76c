use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BiblionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multi,
}

/// Canonical bibliographic fields a cooked record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    ArticleTitle,
    Author,
    Date,
    Volume,
    Issue,
    StartPage,
    EndPage,
    ItemNumber,
    Issn,
    Eissn,
    Isbn,
    Eisbn,
    Doi,
    PublicationTitle,
    SeriesTitle,
    Publisher,
    Provider,
    PublicationType,
    ArticleType,
    Keywords,
    Abstract,
    Language,
    Format,
    Coverage,
    ProprietaryIdentifier,
    AccessUrl,
    FetchTime,
}

impl MetadataField {
    pub const ALL: [MetadataField; 27] = [
        MetadataField::ArticleTitle,
        MetadataField::Author,
        MetadataField::Date,
        MetadataField::Volume,
        MetadataField::Issue,
        MetadataField::StartPage,
        MetadataField::EndPage,
        MetadataField::ItemNumber,
        MetadataField::Issn,
        MetadataField::Eissn,
        MetadataField::Isbn,
        MetadataField::Eisbn,
        MetadataField::Doi,
        MetadataField::PublicationTitle,
        MetadataField::SeriesTitle,
        MetadataField::Publisher,
        MetadataField::Provider,
        MetadataField::PublicationType,
        MetadataField::ArticleType,
        MetadataField::Keywords,
        MetadataField::Abstract,
        MetadataField::Language,
        MetadataField::Format,
        MetadataField::Coverage,
        MetadataField::ProprietaryIdentifier,
        MetadataField::AccessUrl,
        MetadataField::FetchTime,
    ];

    pub fn key(&self) -> &'static str {
        use MetadataField::*;
        match self {
            ArticleTitle => "article_title",
            Author => "author",
            Date => "date",
            Volume => "volume",
            Issue => "issue",
            StartPage => "start_page",
            EndPage => "end_page",
            ItemNumber => "item_number",
            Issn => "issn",
            Eissn => "eissn",
            Isbn => "isbn",
            Eisbn => "eisbn",
            Doi => "doi",
            PublicationTitle => "publication_title",
            SeriesTitle => "series_title",
            Publisher => "publisher",
            Provider => "provider",
            PublicationType => "publication_type",
            ArticleType => "article_type",
            Keywords => "keywords",
            Abstract => "abstract",
            Language => "language",
            Format => "format",
            Coverage => "coverage",
            ProprietaryIdentifier => "proprietary_identifier",
            AccessUrl => "access_url",
            FetchTime => "fetch_time",
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            MetadataField::Author | MetadataField::Keywords | MetadataField::Format => {
                Cardinality::Multi
            }
            _ => Cardinality::Single,
        }
    }

    pub fn is_multi(&self) -> bool {
        self.cardinality() == Cardinality::Multi
    }

    /// Fields that describe the work itself, as opposed to values the
    /// pipeline fills in on its own (types, access url, fetch time, provider).
    /// A record with none of these set carries nothing worth emitting.
    pub fn is_bibliographic(&self) -> bool {
        !matches!(
            self,
            MetadataField::PublicationType
                | MetadataField::ArticleType
                | MetadataField::AccessUrl
                | MetadataField::FetchTime
                | MetadataField::Provider
        )
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MetadataField {
    type Err = BiblionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['.', '-'], "_");
        MetadataField::ALL
            .into_iter()
            .find(|field| field.key() == wanted)
            .ok_or_else(|| BiblionError::UnknownField(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_keys_roundtrip() {
        for field in MetadataField::ALL {
            assert_eq!(field.key().parse::<MetadataField>().unwrap(), field);
        }
        assert_eq!(
            "publication.title".parse::<MetadataField>().unwrap(),
            MetadataField::PublicationTitle
        );
        assert!("nonsense".parse::<MetadataField>().is_err());
    }

    #[test]
    fn test_cardinality() {
        assert!(MetadataField::Author.is_multi());
        assert!(!MetadataField::Date.is_multi());
        assert!(!MetadataField::AccessUrl.is_bibliographic());
        assert!(MetadataField::Doi.is_bibliographic());
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    /// A rule, template, path expression or schema could not be built.
    #[error("configuration error: {0}")]
    Config(String),

    /// The document parsed but holds no node matching the article path.
    #[error("schema mismatch in {resource}: {reason}")]
    SchemaMismatch { resource: String, reason: String },

    /// The document could not be parsed at all.
    #[error("malformed source {resource}: {reason}")]
    MalformedSource { resource: String, reason: String },

    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("invalid ISSN: {0}")]
    InvalidIssn(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] biblion_core::BiblionError),
}

impl ScienceError {
    /// True for the per-resource failures a pass logs and skips.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. } | Self::MalformedSource { .. } | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;

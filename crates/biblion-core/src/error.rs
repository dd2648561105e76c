use thiserror::Error;

/// All errors that can occur in biblion-core.
#[derive(Debug, Error)]
pub enum BiblionError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unknown metadata field: {0}")]
    UnknownField(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, BiblionError>;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CollectionParams;
use crate::error::Result;
use crate::models::cooked::PublicationType;

/// Trusted bibliographic facts about one collection. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryEntry {
    // Keys matched against the declared parameters; unset keys match anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_type: Option<PublicationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eissn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eisbn: Option<String>,
    /// Year or year range, e.g. `2019`, `2019-2020`, `2019/2020`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl RegistryEntry {
    pub fn matches(&self, params: &CollectionParams) -> bool {
        let same = |expected: &Option<String>, declared: Option<&str>| match expected {
            None => true,
            Some(expected) => declared.is_some_and(|d| trim_url(d) == trim_url(expected)),
        };
        same(&self.base_url, Some(params.base_url.as_str()))
            && same(&self.journal_id, params.journal_id.as_deref())
            && same(&self.volume_name, params.volume_name.as_deref())
    }

    /// Four-digit years listed in `year`.
    pub fn years(&self) -> Vec<&str> {
        self.year
            .as_deref()
            .map(|y| {
                y.split(['/', '-', ','])
                    .map(str::trim)
                    .filter(|part| part.len() == 4 && part.chars().all(|c| c.is_ascii_digit()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn trim_url(s: &str) -> &str {
    s.trim().trim_end_matches('/')
}

/// Lookup contract of the trusted registry.
pub trait Registry: Send + Sync {
    fn lookup(&self, params: &CollectionParams) -> Option<RegistryEntry>;
}

/// On-disk registry: a list of `[[entry]]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default, rename = "entry")]
    pub entries: Vec<RegistryEntry>,
}

impl RegistryFile {
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file: Self = toml::from_str(&contents)?;
        Ok(file)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// In-memory registry; the first entry matching the declared parameters wins.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: Vec<RegistryEntry>,
}

impl StaticRegistry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(RegistryFile::load_from(path)?.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<RegistryFile> for StaticRegistry {
    fn from(file: RegistryFile) -> Self {
        Self::new(file.entries)
    }
}

impl Registry for StaticRegistry {
    fn lookup(&self, params: &CollectionParams) -> Option<RegistryEntry> {
        self.entries.iter().find(|e| e.matches(params)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params(volume: &str) -> CollectionParams {
        CollectionParams {
            base_url: "http://www.example.org/".to_string(),
            journal_id: Some("jot".to_string()),
            volume_name: Some(volume.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_by_declared_params() {
        let registry = StaticRegistry::new(vec![
            RegistryEntry {
                journal_id: Some("jot".to_string()),
                volume_name: Some("11".to_string()),
                issn: Some("1111-1111".to_string()),
                ..Default::default()
            },
            RegistryEntry {
                base_url: Some("http://www.example.org".to_string()),
                journal_id: Some("jot".to_string()),
                volume_name: Some("12".to_string()),
                issn: Some("1234-5679".to_string()),
                ..Default::default()
            },
        ]);

        let entry = registry.lookup(&params("12")).unwrap();
        assert_eq!(entry.issn.as_deref(), Some("1234-5679"));
        assert!(registry.lookup(&params("13")).is_none());
    }

    #[test]
    fn test_year_range() {
        let entry = RegistryEntry {
            year: Some("2019-2020".to_string()),
            ..Default::default()
        };
        assert_eq!(entry.years(), vec!["2019", "2020"]);
        assert!(RegistryEntry::default().years().is_empty());
    }

    #[test]
    fn test_registry_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        let file = RegistryFile {
            entries: vec![RegistryEntry {
                publication_title: Some("Journal of Tests".to_string()),
                publication_type: Some(PublicationType::Journal),
                ..Default::default()
            }],
        };
        file.save_to(&path).unwrap();

        let registry = StaticRegistry::load_from(&path).unwrap();
        assert_eq!(registry.len(), 1);
        let entry = registry.lookup(&params("1")).unwrap();
        assert_eq!(entry.publication_type, Some(PublicationType::Journal));
    }
}

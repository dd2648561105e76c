use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::article::Role;
use crate::models::field::MetadataField;

/// Configuration of one publication (one collection crawled as a unit),
/// loaded from `~/.config/biblion/publication.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationConfig {
    pub name: String,
    pub params: CollectionParams,
    /// Value cooked into `provider` when the metadata carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub aspects: Vec<AspectConfig>,
    /// Identifiers matching this pattern are ignored even when an aspect matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    pub required_roles: Vec<Role>,
    pub full_text: FullTextPreference,
    pub derived_roles: Vec<DerivedRoleConfig>,
    pub assembly: AssemblyMode,
    pub schema: SchemaConfig,
    pub fallbacks: Vec<FallbackConfig>,
    pub companion: CompanionConfig,
    pub validation: ValidationConfig,
    pub workers: usize,
}

/// Declared parameters of a collection. Referenced from templates as
/// `${base_url}`, `${journal_id}`, `${volume_name}`, `${year}` or any
/// key of `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionParams {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl CollectionParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "base_url" => Some(self.base_url.as_str()),
            "journal_id" => self.journal_id.as_deref(),
            "volume_name" => self.volume_name.as_deref(),
            "year" => self.year.as_deref(),
            other => self.extra.get(other).map(String::as_str),
        }
    }
}

/// One classification rule. `root` and `pattern` may reference
/// collection parameters; `replacement` uses `$1` / `${1}` captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectConfig {
    #[serde(default)]
    pub root: String,
    pub pattern: String,
    pub replacement: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullTextPreference {
    HtmlFirst,
    PdfOnly,
    Order(Vec<Role>),
}

impl FullTextPreference {
    pub fn roles(&self) -> Vec<Role> {
        match self {
            Self::HtmlFirst => vec![Role::FullTextHtml, Role::FullTextPdf],
            Self::PdfOnly => vec![Role::FullTextPdf, Role::FullTextHtml],
            Self::Order(roles) => roles.clone(),
        }
    }
}

/// Fill `role` from the first present role of `from` when it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRoleConfig {
    pub role: Role,
    pub from: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyMode {
    /// Yield an article as soon as its required roles are complete and
    /// every role of the full-text preference is present. Other complete
    /// articles are yielded when traversal ends.
    Eager,
    /// Yield complete articles once traversal ends, in first-seen order.
    Deferred,
}

// ─── Schema ────────────────────────────────────────────────

/// Either a built-in preset by name or an inline definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<SchemaDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    MetaTags,
    Ris,
    Xml,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub kind: SchemaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_node: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldPathConfig>,
    /// Paths evaluated once per document and merged into every record.
    #[serde(default)]
    pub global_fields: Vec<FieldPathConfig>,
    #[serde(default)]
    pub cook: Vec<CookEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidation_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_rule: Option<TypeRuleConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    #[default]
    Text,
    Attribute,
    PersonName,
    TitleWithSubtitle,
    IdValue,
    OnixDate,
    /// `year`/`month`/`day` children, as in JATS `pub-date`.
    DateParts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPathConfig {
    pub tag: String,
    pub path: String,
    #[serde(default)]
    pub evaluator: EvaluatorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookEntry {
    pub tag: String,
    pub field: MetadataField,
}

/// Discriminator-driven branching between journal, book and chapter records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeRuleConfig {
    pub tag: String,
    pub journal: TypeBranchConfig,
    pub book: TypeBranchConfig,
    pub chapter: TypeBranchConfig,
}

/// Raw tags redirected into the title fields for one branch.
/// `None` leaves the generic cook result alone; `Some` replaces it
/// with the first non-empty tag listed (or unsets the field).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeBranchConfig {
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_title: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_title: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_title: Option<Vec<String>>,
    /// Tags holding a standard number (ISSN for journals, ISBN for books).
    pub standard_number: Vec<String>,
}

// ─── Cooking, companions, validation ───────────────────────

/// Ordered alternate raw tags consulted when `field` is still unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub field: MetadataField,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanionHeuristic {
    /// Value of the schema's filename key.
    FilenameKey,
    /// DOI with its `10.x/` prefix stripped.
    DoiSuffix,
    /// First author surname followed by the first three title words.
    AuthorTitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub heuristics: Vec<CompanionHeuristic>,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub check_year: bool,
    /// Fill publisher and publication title from the registry when unset.
    pub complete_from_registry: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            name: "publication".to_string(),
            params: CollectionParams::default(),
            provider: None,
            aspects: Vec::new(),
            exclude: None,
            required_roles: vec![Role::ArticleMetadata],
            full_text: FullTextPreference::default(),
            derived_roles: Vec::new(),
            assembly: AssemblyMode::default(),
            schema: SchemaConfig::default(),
            fallbacks: Vec::new(),
            companion: CompanionConfig::default(),
            validation: ValidationConfig::default(),
            workers: 1,
        }
    }
}

impl Default for FullTextPreference {
    fn default() -> Self {
        Self::HtmlFirst
    }
}

impl Default for AssemblyMode {
    fn default() -> Self {
        Self::Eager
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            heuristics: vec![CompanionHeuristic::FilenameKey],
            extensions: vec![".pdf".to_string(), ".epub".to_string()],
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_year: false,
            complete_from_registry: true,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl PublicationConfig {
    /// Standard config file path: `~/.config/biblion/publication.toml`
    pub fn config_path() -> PathBuf {
        // Allow override via env var
        if let Ok(path) = std::env::var("BIBLION_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("biblion")
            .join("publication.toml")
    }

    /// Load config from the standard path.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path, falling back to defaults if the
    /// file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BiblionError;
use crate::models::resource::ResourceRef;

/// The function a resource plays within an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    FullTextHtml,
    FullTextPdf,
    FullTextPdfLandingPage,
    FullTextXml,
    FullTextEpub,
    Abstract,
    ArticleMetadata,
    Citation,
    CitationRis,
    CitationBibtex,
    Figures,
    SupplementaryMaterials,
    References,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::FullTextHtml,
        Role::FullTextPdf,
        Role::FullTextPdfLandingPage,
        Role::FullTextXml,
        Role::FullTextEpub,
        Role::Abstract,
        Role::ArticleMetadata,
        Role::Citation,
        Role::CitationRis,
        Role::CitationBibtex,
        Role::Figures,
        Role::SupplementaryMaterials,
        Role::References,
    ];

    pub fn as_str(&self) -> &'static str {
        use Role::*;
        match self {
            FullTextHtml => "full_text_html",
            FullTextPdf => "full_text_pdf",
            FullTextPdfLandingPage => "full_text_pdf_landing_page",
            FullTextXml => "full_text_xml",
            FullTextEpub => "full_text_epub",
            Abstract => "abstract",
            ArticleMetadata => "article_metadata",
            Citation => "citation",
            CitationRis => "citation_ris",
            CitationBibtex => "citation_bibtex",
            Figures => "figures",
            SupplementaryMaterials => "supplementary_materials",
            References => "references",
        }
    }

    pub fn is_full_text(&self) -> bool {
        matches!(
            self,
            Role::FullTextHtml | Role::FullTextPdf | Role::FullTextXml | Role::FullTextEpub
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BiblionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| BiblionError::UnknownRole(s.to_string()))
    }
}

/// All resources that together make up one logical publication unit.
///
/// A canonical key maps to exactly one article within a pass.
#[derive(Debug, Clone)]
pub struct Article {
    key: String,
    roles: BTreeMap<Role, ResourceRef>,
    full_text_role: Option<Role>,
}

impl Article {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            roles: BTreeMap::new(),
            full_text_role: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Assign a resource to a role. Returns the resource previously holding
    /// that role, if any (last write wins).
    pub fn set_role(&mut self, role: Role, resource: ResourceRef) -> Option<ResourceRef> {
        self.roles.insert(role, resource)
    }

    pub fn role(&self, role: Role) -> Option<&ResourceRef> {
        self.roles.get(&role)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains_key(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = (Role, &ResourceRef)> {
        self.roles.iter().map(|(role, res)| (*role, res))
    }

    pub fn role_names(&self) -> Vec<Role> {
        self.roles.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn full_text_role(&self) -> Option<Role> {
        self.full_text_role
    }

    pub fn full_text(&self) -> Option<&ResourceRef> {
        self.full_text_role.and_then(|role| self.roles.get(&role))
    }

    /// Pick the first present role of `preference` as the full-text pointer.
    pub fn select_full_text(&mut self, preference: &[Role]) -> Option<Role> {
        self.full_text_role = preference.iter().copied().find(|role| self.has_role(*role));
        self.full_text_role
    }

    /// Resource carrying the article's metadata, if the article has one.
    pub fn metadata_resource(&self) -> Option<&ResourceRef> {
        self.role(Role::ArticleMetadata)
    }
}

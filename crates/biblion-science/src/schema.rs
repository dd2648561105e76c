//! Compiled extraction schemas.
//!
//! A [`Schema`] is built once when the pipeline is set up and shared by
//! reference with every extraction. Every path expression it carries has
//! already been compiled, so a bad schema fails before a pass starts.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use biblion_core::{
    CookedRecord, EvaluatorKind, FallbackConfig, FieldPathConfig, MetadataField, PublicationConfig,
    RawRecord, SchemaDefinition, SchemaKind,
};

use crate::cook::{RecordType, TypeRule};
use crate::error::{Result, ScienceError};
use crate::presets;
use crate::xml::XPath;

/// Publication-specific adjustment run after cooking and fallbacks.
pub type PostCook = Arc<dyn Fn(&mut CookedRecord, &RawRecord, Option<RecordType>) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub tag: String,
    pub path: XPath,
    pub evaluator: EvaluatorKind,
}

impl FieldRule {
    pub fn compile(config: &FieldPathConfig) -> Result<Self> {
        let path = XPath::compile(&config.path)?;
        if config.evaluator == EvaluatorKind::Attribute && !path.selects_attributes() {
            return Err(ScienceError::Config(format!(
                "field '{}': attribute evaluator needs a path ending in '@name', got '{}'",
                config.tag, config.path
            )));
        }
        Ok(Self {
            tag: config.tag.clone(),
            path,
            evaluator: config.evaluator,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TreeLayout {
    pub article_node: XPath,
    pub fields: Vec<FieldRule>,
    pub global_fields: Vec<FieldRule>,
}

#[derive(Debug, Clone)]
pub enum SchemaStyle {
    /// `<meta name content>` pairs of an HTML page.
    MetaTags,
    /// `TY`…`ER` citation records.
    Ris,
    /// Field paths evaluated under every article node of an XML document.
    Tree(TreeLayout),
}

#[derive(Clone)]
pub struct Schema {
    pub name: String,
    pub style: SchemaStyle,
    /// Raw tag → canonical field, applied in order.
    pub cook: Vec<(String, MetadataField)>,
    pub dedup_key: Option<String>,
    pub consolidation_key: Option<String>,
    pub filename_key: Option<String>,
    pub type_rule: Option<TypeRule>,
    /// Alternate raw tags per field, tried in order while the field is unset.
    pub fallbacks: Vec<(MetadataField, Vec<String>)>,
    pub post_cook: Option<PostCook>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("style", &self.style)
            .field("cook", &self.cook)
            .field("dedup_key", &self.dedup_key)
            .field("consolidation_key", &self.consolidation_key)
            .field("filename_key", &self.filename_key)
            .field("type_rule", &self.type_rule)
            .field("fallbacks", &self.fallbacks)
            .field("post_cook", &self.post_cook.is_some())
            .finish()
    }
}

impl Schema {
    pub fn from_definition(name: &str, def: &SchemaDefinition) -> Result<Self> {
        let style = match def.kind {
            SchemaKind::Xml => {
                let article_node = def.article_node.as_deref().ok_or_else(|| {
                    ScienceError::Config(format!("xml schema '{name}' needs an article_node"))
                })?;
                let compile_all = |rules: &[FieldPathConfig]| {
                    rules.iter().map(FieldRule::compile).collect::<Result<Vec<_>>>()
                };
                SchemaStyle::Tree(TreeLayout {
                    article_node: XPath::compile(article_node)?,
                    fields: compile_all(&def.fields)?,
                    global_fields: compile_all(&def.global_fields)?,
                })
            }
            kind => {
                if !def.fields.is_empty() || !def.global_fields.is_empty() {
                    return Err(ScienceError::Config(format!(
                        "schema '{name}': field paths only apply to xml schemas"
                    )));
                }
                match kind {
                    SchemaKind::MetaTags => SchemaStyle::MetaTags,
                    _ => SchemaStyle::Ris,
                }
            }
        };

        // meta tag names are matched case-insensitively
        let tag = |t: &str| match style {
            SchemaStyle::MetaTags => t.to_ascii_lowercase(),
            _ => t.to_string(),
        };

        Ok(Self {
            name: name.to_string(),
            cook: def.cook.iter().map(|e| (tag(&e.tag), e.field)).collect(),
            dedup_key: def.dedup_key.as_deref().map(tag),
            consolidation_key: def.consolidation_key.as_deref().map(tag),
            filename_key: def.filename_key.as_deref().map(tag),
            type_rule: def.type_rule.as_ref().map(TypeRule::from_config).transpose()?,
            fallbacks: Vec::new(),
            post_cook: None,
            style,
        })
    }

    /// The schema a publication selects: a built-in preset or an inline
    /// definition, with the publication's fallback chains applied on top.
    pub fn resolve(config: &PublicationConfig) -> Result<Self> {
        let schema = match (&config.schema.preset, &config.schema.inline) {
            (Some(_), Some(_)) => {
                return Err(ScienceError::Config(format!(
                    "publication '{}' sets both a schema preset and an inline schema",
                    config.name
                )));
            }
            (Some(name), None) => presets::build(name)?,
            (None, Some(def)) => Self::from_definition(&config.name, def)?,
            (None, None) => {
                return Err(ScienceError::Config(format!(
                    "publication '{}' has no schema",
                    config.name
                )));
            }
        };
        Ok(schema.with_fallbacks(&config.fallbacks))
    }

    /// Merge fallback chains. A chain given here replaces the chain
    /// already present for the same field.
    pub fn with_fallbacks(mut self, fallbacks: &[FallbackConfig]) -> Self {
        for fallback in fallbacks {
            let tags: Vec<String> = fallback.tags.iter().map(|t| self.tag_name(t)).collect();
            match self.fallbacks.iter_mut().find(|(f, _)| *f == fallback.field) {
                Some((_, existing)) => *existing = tags,
                None => self.fallbacks.push((fallback.field, tags)),
            }
        }
        self
    }

    pub fn with_post_cook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut CookedRecord, &RawRecord, Option<RecordType>) + Send + Sync + 'static,
    {
        self.post_cook = Some(Arc::new(hook));
        self
    }

    /// Raw tags whose values are lists: the consolidation key and every
    /// tag cooked into a multi-valued field.
    pub fn list_tags(&self) -> HashSet<&str> {
        self.cook
            .iter()
            .filter(|(_, field)| field.is_multi())
            .map(|(tag, _)| tag.as_str())
            .chain(self.consolidation_key.as_deref())
            .collect()
    }

    fn tag_name(&self, tag: &str) -> String {
        match self.style {
            SchemaStyle::MetaTags => tag.to_ascii_lowercase(),
            _ => tag.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblion_core::{CookEntry, SchemaConfig};

    fn xml_def() -> SchemaDefinition {
        SchemaDefinition {
            kind: SchemaKind::Xml,
            article_node: Some("//record".to_string()),
            fields: vec![FieldPathConfig {
                tag: "title".to_string(),
                path: "title".to_string(),
                evaluator: EvaluatorKind::Text,
            }],
            global_fields: Vec::new(),
            cook: vec![CookEntry {
                tag: "title".to_string(),
                field: MetadataField::ArticleTitle,
            }],
            dedup_key: None,
            consolidation_key: None,
            filename_key: None,
            type_rule: None,
        }
    }

    #[test]
    fn test_xml_schema_compiles() {
        let schema = Schema::from_definition("test", &xml_def()).unwrap();
        assert!(matches!(schema.style, SchemaStyle::Tree(ref t) if t.fields.len() == 1));
    }

    #[test]
    fn test_bad_path_is_config_error() {
        let mut def = xml_def();
        def.fields[0].path = "title[".to_string();
        assert!(matches!(
            Schema::from_definition("test", &def),
            Err(ScienceError::Config(_))
        ));

        let mut def = xml_def();
        def.article_node = None;
        assert!(Schema::from_definition("test", &def).is_err());

        let mut def = xml_def();
        def.fields[0].evaluator = EvaluatorKind::Attribute;
        assert!(Schema::from_definition("test", &def).is_err());
    }

    #[test]
    fn test_meta_tags_are_lowercased() {
        let def = SchemaDefinition {
            kind: SchemaKind::MetaTags,
            article_node: None,
            fields: Vec::new(),
            global_fields: Vec::new(),
            cook: vec![CookEntry {
                tag: "Citation_Title".to_string(),
                field: MetadataField::ArticleTitle,
            }],
            dedup_key: None,
            consolidation_key: None,
            filename_key: None,
            type_rule: None,
        };
        let schema = Schema::from_definition("meta", &def).unwrap();
        assert_eq!(schema.cook[0].0, "citation_title");
    }

    #[test]
    fn test_config_fallbacks_override_preset() {
        let mut config = PublicationConfig::default();
        config.schema = SchemaConfig {
            preset: Some("ris".to_string()),
            inline: None,
        };
        config.fallbacks = vec![FallbackConfig {
            field: MetadataField::Date,
            tags: vec!["PY".to_string()],
        }];
        let schema = Schema::resolve(&config).unwrap();
        let date: Vec<_> = schema
            .fallbacks
            .iter()
            .filter(|(f, _)| *f == MetadataField::Date)
            .collect();
        assert_eq!(date.len(), 1);
        assert_eq!(date[0].1, vec!["PY".to_string()]);
    }

    #[test]
    fn test_schema_selection_errors() {
        let config = PublicationConfig::default();
        assert!(Schema::resolve(&config).is_err());

        let mut config = PublicationConfig::default();
        config.schema.preset = Some("nope".to_string());
        assert!(matches!(Schema::resolve(&config), Err(ScienceError::Config(_))));
    }
}

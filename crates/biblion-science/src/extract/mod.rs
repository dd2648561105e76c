//! Raw extraction: one metadata resource → raw tag/value records.
//!
//! Extractors keep parse state while they run, so [`extract`] builds a
//! fresh one for every call. The [`Schema`] they read from is shared.

pub mod evaluate;
pub mod meta_tags;
pub mod ris;
pub mod tree;

use biblion_core::{RawRecord, ResourceRef};

use crate::error::Result;
use crate::schema::{Schema, SchemaStyle};

pub use meta_tags::MetaTagExtractor;
pub use ris::RisExtractor;
pub use tree::TreeExtractor;

pub trait Extractor {
    /// Parse `text`, the content of the resource named `identifier`.
    fn extract(&mut self, identifier: &str, text: &str) -> Result<Vec<RawRecord>>;
}

/// Extract every raw record `resource` holds under `schema`.
pub fn extract(resource: &ResourceRef, schema: &Schema) -> Result<Vec<RawRecord>> {
    let text = resource.read_to_string()?;
    let mut extractor: Box<dyn Extractor + '_> = match &schema.style {
        SchemaStyle::MetaTags => Box::new(MetaTagExtractor::new()),
        SchemaStyle::Ris => Box::new(RisExtractor::new()),
        SchemaStyle::Tree(layout) => Box::new(TreeExtractor::new(layout)),
    };
    extractor.extract(resource.identifier(), &text)
}

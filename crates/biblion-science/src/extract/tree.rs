use tracing::debug;

use biblion_core::RawRecord;

use crate::error::{Result, ScienceError};
use crate::extract::Extractor;
use crate::extract::evaluate::evaluate;
use crate::schema::{FieldRule, TreeLayout};
use crate::xml::{Document, NodeId};

/// Structured extraction over an XML document: one raw record per node
/// matching the article path, with document-level fields merged into
/// each of them.
pub struct TreeExtractor<'a> {
    layout: &'a TreeLayout,
}

impl<'a> TreeExtractor<'a> {
    pub fn new(layout: &'a TreeLayout) -> Self {
        Self { layout }
    }
}

fn collect_fields(doc: &Document, context: NodeId, rules: &[FieldRule]) -> RawRecord {
    let mut record = RawRecord::new();
    for rule in rules {
        for hit in rule.path.select(doc, context) {
            if let Some(value) = evaluate(rule.evaluator, doc, hit) {
                record.push(&rule.tag, value);
            }
        }
    }
    record
}

impl Extractor for TreeExtractor<'_> {
    fn extract(&mut self, identifier: &str, text: &str) -> Result<Vec<RawRecord>> {
        let doc = Document::parse(text).map_err(|reason| ScienceError::MalformedSource {
            resource: identifier.to_string(),
            reason,
        })?;
        let nodes = self.layout.article_node.select_nodes(&doc, doc.root());
        if nodes.is_empty() {
            return Err(ScienceError::SchemaMismatch {
                resource: identifier.to_string(),
                reason: format!("no node matches '{}'", self.layout.article_node.as_str()),
            });
        }
        debug!("{identifier}: {} article node(s)", nodes.len());

        let globals = collect_fields(&doc, doc.root(), &self.layout.global_fields);
        let records = nodes
            .into_iter()
            .map(|node| {
                let mut record = collect_fields(&doc, node, &self.layout.fields);
                for (tag, values) in globals.iter() {
                    if !record.contains(tag) {
                        record.set(tag, values.to_vec());
                    }
                }
                record
            })
            .collect();
        Ok(records)
    }
}

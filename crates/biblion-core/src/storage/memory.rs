use std::collections::HashMap;

use crate::models::resource::{ResourceRef, content_type_for};
use crate::storage::ResourceStore;

/// Resources held in memory, traversed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    resources: Vec<ResourceRef>,
    index: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Re-inserting an identifier replaces it in place.
    pub fn insert(&mut self, resource: ResourceRef) {
        match self.index.get(resource.identifier()) {
            Some(&pos) => self.resources[pos] = resource,
            None => {
                self.index
                    .insert(resource.identifier().to_string(), self.resources.len());
                self.resources.push(resource);
            }
        }
    }

    /// Add in-memory content, guessing the content type from the identifier.
    pub fn insert_bytes(&mut self, identifier: &str, bytes: impl Into<Vec<u8>>) {
        self.insert(ResourceRef::from_bytes(
            identifier,
            content_type_for(identifier),
            bytes,
        ));
    }

    pub fn with(mut self, identifier: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert_bytes(identifier, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceStore for MemoryStore {
    fn resources(&self) -> Box<dyn Iterator<Item = ResourceRef> + Send + '_> {
        Box::new(self.resources.iter().cloned())
    }

    fn resolve(&self, identifier: &str) -> Option<ResourceRef> {
        self.index
            .get(identifier)
            .map(|&pos| self.resources[pos].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_and_replace() {
        let mut store = MemoryStore::new()
            .with("http://x.org/b", "<html/>")
            .with("http://x.org/a.pdf", "%PDF");
        store.insert_bytes("http://x.org/b", "<html>v2</html>");

        let ids: Vec<String> = store
            .resources()
            .map(|r| r.identifier().to_string())
            .collect();
        assert_eq!(ids, vec!["http://x.org/b", "http://x.org/a.pdf"]);

        let b = store.resolve("http://x.org/b").unwrap();
        assert_eq!(b.read_to_string().unwrap(), "<html>v2</html>");
        assert_eq!(b.content_type(), "text/html");
        assert!(store.resolve("http://x.org/c").is_none());
    }
}

//! Read access to already-fetched content.
//!
//! The pipeline never writes through a store. It walks [`ResourceStore::resources`]
//! once per pass and resolves derived companion names through
//! [`ResourceStore::resolve`].

pub mod memory;
pub mod scan;

use crate::models::resource::ResourceRef;

pub use memory::MemoryStore;
pub use scan::DirectoryStore;

pub trait ResourceStore: Send + Sync {
    /// Lazy, finite, ordered traversal of every resource in the store.
    /// The order is stable across calls.
    fn resources(&self) -> Box<dyn Iterator<Item = ResourceRef> + Send + '_>;

    /// Look up one resource by identifier.
    fn resolve(&self, identifier: &str) -> Option<ResourceRef>;
}

//! Minimal XML tree and path language used by structured extraction.

pub mod dom;
pub mod path;

pub use dom::{Document, NodeId};
pub use path::{Hit, XPath};

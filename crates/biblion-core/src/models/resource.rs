use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Where the bytes of a resource live. Owned by the storage collaborator.
pub trait ContentSource: Send + Sync + fmt::Debug {
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// Bytes kept in memory, shared between clones of the same resource.
#[derive(Debug, Clone)]
pub struct MemoryContent(pub Arc<[u8]>);

impl ContentSource for MemoryContent {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.0.clone())))
    }
}

/// A file on local disk.
#[derive(Debug, Clone)]
pub struct FileContent(pub PathBuf);

impl ContentSource for FileContent {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(std::fs::File::open(&self.0)?))
    }
}

/// An addressable, already-fetched unit of content.
///
/// Immutable: the pipeline only ever reads through [`ResourceRef::open_reader`].
#[derive(Clone)]
pub struct ResourceRef {
    identifier: String,
    content_type: String,
    fetch_time: Option<DateTime<Utc>>,
    content: Arc<dyn ContentSource>,
}

impl ResourceRef {
    pub fn new(
        identifier: impl Into<String>,
        content_type: impl Into<String>,
        content: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            content_type: content_type.into(),
            fetch_time: None,
            content,
        }
    }

    /// Convenience constructor for in-memory content.
    pub fn from_bytes(
        identifier: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self::new(
            identifier,
            content_type,
            Arc::new(MemoryContent(Arc::from(bytes.into_boxed_slice()))),
        )
    }

    pub fn with_fetch_time(mut self, fetch_time: DateTime<Utc>) -> Self {
        self.fetch_time = Some(fetch_time);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// MIME type without parameters, lower-cased.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn fetch_time(&self) -> Option<DateTime<Utc>> {
        self.fetch_time
    }

    pub fn open_reader(&self) -> io::Result<Box<dyn Read + Send>> {
        self.content.open()
    }

    /// Read the whole resource as text, replacing invalid UTF-8 sequences.
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut bytes = Vec::new();
        self.open_reader()?.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Directory part of the identifier, including the trailing slash.
    pub fn parent_identifier(&self) -> &str {
        match self.identifier.rfind('/') {
            Some(pos) => &self.identifier[..=pos],
            None => "",
        }
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("identifier", &self.identifier)
            .field("content_type", &self.content_type)
            .field("fetch_time", &self.fetch_time)
            .finish()
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for ResourceRef {}

/// Guess a content type from the identifier's extension.
pub fn content_type_for(identifier: &str) -> &'static str {
    let name = identifier.rsplit('/').next().unwrap_or(identifier);
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "xml" => "application/xml",
        "ris" => "application/x-research-info-systems",
        "epub" => "application/epub+zip",
        "json" => "application/json",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        // landing pages are usually extension-less
        "" => "text/html",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_memory_resource() {
        let res = ResourceRef::from_bytes("http://x.org/a/b.ris", "text/plain", "TY  - JOUR");
        assert_eq!(res.read_to_string().unwrap(), "TY  - JOUR");
        // readers are independent
        assert_eq!(res.read_to_string().unwrap(), "TY  - JOUR");
    }

    #[test]
    fn test_parent_identifier() {
        let res = ResourceRef::from_bytes("http://x.org/a/b.xml", "application/xml", "");
        assert_eq!(res.parent_identifier(), "http://x.org/a/");
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for("http://x.org/a/b.PDF"), "application/pdf");
        assert_eq!(content_type_for("http://x.org/article/view/12"), "text/html");
        assert_eq!(content_type_for("data/onix.xml"), "application/xml");
    }
}

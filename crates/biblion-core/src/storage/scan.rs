//! Directory-backed resource store.
//!
//! A fetched collection laid out on disk under one root. Each file's
//! identifier is `base_url` followed by its path relative to the root,
//! so `root/article/foo` becomes `http://host/article/foo`.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::{BiblionError, Result};
use crate::models::resource::{FileContent, ResourceRef, content_type_for};
use crate::storage::ResourceStore;

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    base_url: String,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(BiblionError::DirectoryNotFound(root.display().to_string()));
        }
        Ok(Self {
            root,
            base_url: base_url.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn identifier_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("{}{}", self.base_url, parts.join("/")))
    }

    fn path_for(&self, identifier: &str) -> Option<PathBuf> {
        let rel = identifier.strip_prefix(&self.base_url)?;
        let rel = Path::new(rel.trim_start_matches('/'));
        // never leave the root
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(rel))
    }

    fn load(&self, path: &Path, identifier: String) -> ResourceRef {
        let content_type = content_type_for(&identifier);
        let resource = ResourceRef::new(
            identifier,
            content_type,
            Arc::new(FileContent(path.to_path_buf())),
        );
        match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(mtime) => resource.with_fetch_time(DateTime::<Utc>::from(mtime)),
            Err(_) => resource,
        }
    }
}

impl ResourceStore for DirectoryStore {
    fn resources(&self) -> Box<dyn Iterator<Item = ResourceRef> + Send + '_> {
        Box::new(walk(&self.root).filter_map(move |path| {
            let identifier = self.identifier_for(&path)?;
            Some(self.load(&path, identifier))
        }))
    }

    fn resolve(&self, identifier: &str) -> Option<ResourceRef> {
        let path = self.path_for(identifier)?;
        if !path.is_file() {
            return None;
        }
        Some(self.load(&path, identifier.to_string()))
    }
}

// ─── Walk ──────────────────────────────────────────────────

/// Depth-first walk yielding files in name order. Symlinked directories
/// are not descended into; symlinks to files are kept.
fn walk(root: &Path) -> impl Iterator<Item = PathBuf> + Send {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
        })
        .map(DirEntry::into_path)
}

// ─── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DirectoryStore) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("article")).unwrap();
        fs::create_dir_all(root.join("storage/article")).unwrap();
        fs::write(root.join("article/foo"), "<html></html>").unwrap();
        fs::write(root.join("storage/article/foo.pdf"), "%PDF").unwrap();
        fs::write(root.join("index.html"), "<html></html>").unwrap();
        let store = DirectoryStore::new(root, "http://x.org/").unwrap();
        (tmp, store)
    }

    #[test]
    fn test_walk_is_sorted_and_complete() {
        let (_tmp, store) = setup();
        let ids: Vec<String> = store
            .resources()
            .map(|r| r.identifier().to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "http://x.org/article/foo",
                "http://x.org/index.html",
                "http://x.org/storage/article/foo.pdf",
            ]
        );
    }

    #[test]
    fn test_resources_carry_type_and_fetch_time() {
        let (_tmp, store) = setup();
        let pdf = store.resolve("http://x.org/storage/article/foo.pdf").unwrap();
        assert_eq!(pdf.content_type(), "application/pdf");
        assert!(pdf.fetch_time().is_some());
        assert_eq!(pdf.read_to_string().unwrap(), "%PDF");
    }

    #[test]
    fn test_resolve_rejects_foreign_and_escaping_identifiers() {
        let (_tmp, store) = setup();
        assert!(store.resolve("http://other.org/article/foo").is_none());
        assert!(store.resolve("http://x.org/../etc/passwd").is_none());
        assert!(store.resolve("http://x.org/article/missing").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.xml"), "<a/>").unwrap();
        std::os::unix::fs::symlink(root, root.join("loop")).unwrap();
        std::os::unix::fs::symlink(root.join("a.xml"), root.join("b.xml")).unwrap();

        let store = DirectoryStore::new(root, "http://x.org/").unwrap();
        let ids: Vec<String> = store
            .resources()
            .take(50)
            .map(|r| r.identifier().to_string())
            .collect();
        assert_eq!(ids, vec!["http://x.org/a.xml", "http://x.org/b.xml"]);
    }

    #[test]
    fn test_missing_root() {
        let err = DirectoryStore::new("/tmp/biblion_missing_root_dir", "").unwrap_err();
        assert!(matches!(err, BiblionError::DirectoryNotFound(_)));
    }
}

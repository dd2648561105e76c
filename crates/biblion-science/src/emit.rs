//! Companion resolution and hand-off to the metadata sink.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use biblion_core::{
    CompanionConfig, CompanionHeuristic, CookedRecord, MetadataField, RawRecord, ResourceRef,
    ResourceStore,
};

use crate::error::{Result, ScienceError};
use crate::identifiers::Doi;

// ─── Sinks ─────────────────────────────────────────────────

/// Receiver of validated records. Called from worker threads.
pub trait MetadataSink: Send + Sync {
    fn emit(&self, resource: &str, record: &CookedRecord) -> Result<()>;
}

#[derive(Serialize)]
struct Line<'a> {
    resource: &'a str,
    record: &'a CookedRecord,
}

/// One JSON object per line: `{"resource": ..., "record": {...}}`.
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> MetadataSink for JsonLinesSink<W> {
    fn emit(&self, resource: &str, record: &CookedRecord) -> Result<()> {
        let line = serde_json::to_string(&Line { resource, record })
            .map_err(|e| ScienceError::Parse(format!("cannot serialize record: {e}")))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| ScienceError::Parse("sink lock poisoned".to_string()))?;
        writeln!(out, "{line}")?;
        Ok(())
    }
}

/// Keeps every emitted pair in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<(String, CookedRecord)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emitted pairs sorted by resource identifier; workers emit in any order.
    pub fn records(&self) -> Vec<(String, CookedRecord)> {
        let mut records = match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }
}

impl MetadataSink for CollectingSink {
    fn emit(&self, resource: &str, record: &CookedRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ScienceError::Parse("sink lock poisoned".to_string()))?;
        records.push((resource.to_string(), record.clone()));
        Ok(())
    }
}

// ─── Emitter ───────────────────────────────────────────────

/// Exactly-once emission within a pass. Shared by all workers.
pub struct Emitter<'a> {
    sink: &'a dyn MetadataSink,
    processed: Mutex<HashSet<String>>,
    emitted: Mutex<HashSet<(String, usize)>>,
}

impl<'a> Emitter<'a> {
    pub fn new(sink: &'a dyn MetadataSink) -> Self {
        Self {
            sink,
            processed: Mutex::new(HashSet::new()),
            emitted: Mutex::new(HashSet::new()),
        }
    }

    /// Mark a metadata resource as taken. `false` when another article
    /// already processed it in this pass.
    pub fn claim(&self, resource: &str) -> bool {
        match self.processed.lock() {
            Ok(mut set) => set.insert(resource.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(resource.to_string()),
        }
    }

    /// Emit the `ordinal`-th logical record of `resource`: every cooked
    /// record of one consolidation group, handed to the sink together.
    /// Returns `false` when that pair was already emitted.
    pub fn emit(&self, resource: &str, ordinal: usize, records: &[CookedRecord]) -> Result<bool> {
        let fresh = match self.emitted.lock() {
            Ok(mut set) => set.insert((resource.to_string(), ordinal)),
            Err(poisoned) => poisoned.into_inner().insert((resource.to_string(), ordinal)),
        };
        if !fresh {
            return Ok(false);
        }
        for record in records {
            self.sink.emit(resource, record)?;
        }
        Ok(true)
    }
}

// ─── Companion resolution ──────────────────────────────────

/// Derives the expected file name of a record's full-text companion and
/// looks it up next to the metadata resource.
#[derive(Debug, Clone)]
pub struct CompanionResolver {
    heuristics: Vec<CompanionHeuristic>,
    extensions: Vec<String>,
    filename_key: Option<String>,
}

impl CompanionResolver {
    pub fn new(config: &CompanionConfig, filename_key: Option<&str>) -> Self {
        Self {
            heuristics: config.heuristics.clone(),
            extensions: config.extensions.clone(),
            filename_key: filename_key.map(str::to_string),
        }
    }

    /// Candidate base names in heuristic order, without duplicates.
    pub fn base_names(&self, raw: &RawRecord, cooked: &CookedRecord) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for heuristic in &self.heuristics {
            let name = match heuristic {
                CompanionHeuristic::FilenameKey => self
                    .filename_key
                    .as_deref()
                    .and_then(|key| raw.first(key))
                    .map(|v| v.trim().to_string()),
                CompanionHeuristic::DoiSuffix => cooked
                    .get(MetadataField::Doi)
                    .and_then(|doi| Doi::parse(doi).ok())
                    .map(|doi| doi.suffix().to_string()),
                CompanionHeuristic::AuthorTitle => author_title(cooked),
            };
            if let Some(name) = name.filter(|n| !n.is_empty())
                && !names.contains(&name)
            {
                names.push(name);
            }
        }
        names
    }

    /// Full candidate identifiers relative to the metadata resource's directory.
    pub fn candidates(&self, metadata: &ResourceRef, raw: &RawRecord, cooked: &CookedRecord) -> Vec<String> {
        let dir = metadata.parent_identifier();
        let mut out = Vec::new();
        for name in self.base_names(raw, cooked) {
            for ext in &self.extensions {
                let candidate = if name.to_ascii_lowercase().ends_with(&ext.to_ascii_lowercase()) {
                    format!("{dir}{name}")
                } else {
                    format!("{dir}{name}{ext}")
                };
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    /// Set `ACCESS_URL` to the first candidate the store holds, else to
    /// the article's full text, else leave it as cooked.
    pub fn resolve(
        &self,
        store: &dyn ResourceStore,
        metadata: &ResourceRef,
        full_text: Option<&ResourceRef>,
        raw: &RawRecord,
        cooked: &mut CookedRecord,
    ) -> Option<String> {
        let found = self
            .candidates(metadata, raw, cooked)
            .into_iter()
            .find_map(|candidate| store.resolve(&candidate));
        match found {
            Some(companion) => {
                debug!("{}: companion {}", metadata.identifier(), companion.identifier());
                cooked.replace(MetadataField::AccessUrl, companion.identifier());
            }
            None => {
                if let Some(full_text) = full_text {
                    cooked.put(MetadataField::AccessUrl, full_text.identifier());
                }
            }
        }
        cooked.get(MetadataField::AccessUrl).map(str::to_string)
    }
}

/// `Surname_First_Three_Words` from the first author and the article title.
fn author_title(cooked: &CookedRecord) -> Option<String> {
    let author = cooked.get(MetadataField::Author)?;
    let surname = match author.split_once(',') {
        Some((surname, _)) => surname.trim(),
        None => author.split_whitespace().last()?,
    };
    let title = cooked.get(MetadataField::ArticleTitle)?;

    let words: Vec<String> = std::iter::once(surname)
        .chain(title.split_whitespace().take(3))
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect();
    (words.len() > 1).then(|| words.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblion_core::MemoryStore;

    fn cooked() -> CookedRecord {
        let mut rec = CookedRecord::new();
        rec.put(MetadataField::Author, "Smith, John");
        rec.put(MetadataField::ArticleTitle, "Fish & Chips: a study of lunch");
        rec.put(MetadataField::Doi, "10.1000/abc.2020.1");
        rec
    }

    fn raw() -> RawRecord {
        let mut raw = RawRecord::new();
        raw.push("isbn13", "9780306406157");
        raw
    }

    fn resolver(heuristics: &[CompanionHeuristic]) -> CompanionResolver {
        CompanionResolver::new(
            &CompanionConfig {
                heuristics: heuristics.to_vec(),
                extensions: vec![".pdf".to_string()],
            },
            Some("isbn13"),
        )
    }

    #[test]
    fn test_base_names() {
        let r = resolver(&[
            CompanionHeuristic::FilenameKey,
            CompanionHeuristic::DoiSuffix,
            CompanionHeuristic::AuthorTitle,
        ]);
        assert_eq!(
            r.base_names(&raw(), &cooked()),
            vec!["9780306406157", "abc.2020.1", "Smith_Fish_Chips_a"]
        );
    }

    #[test]
    fn test_resolve_prefers_derived_companion() {
        let store = MemoryStore::new()
            .with("/d/meta.xml", "<x/>")
            .with("/d/abc.2020.1.pdf", "%PDF");
        let metadata = store.resolve("/d/meta.xml").unwrap();
        let r = resolver(&[CompanionHeuristic::FilenameKey, CompanionHeuristic::DoiSuffix]);

        let mut rec = cooked();
        let url = r.resolve(&store, &metadata, None, &raw(), &mut rec);
        assert_eq!(url.as_deref(), Some("/d/abc.2020.1.pdf"));
    }

    #[test]
    fn test_resolve_falls_back_to_full_text_or_nothing() {
        let store = MemoryStore::new().with("/d/meta.xml", "<x/>");
        let metadata = store.resolve("/d/meta.xml").unwrap();
        let html = ResourceRef::from_bytes("/d/page.html", "text/html", "");
        let r = resolver(&[CompanionHeuristic::DoiSuffix]);

        let mut rec = cooked();
        assert_eq!(
            r.resolve(&store, &metadata, Some(&html), &raw(), &mut rec).as_deref(),
            Some("/d/page.html")
        );

        let mut rec = cooked();
        assert_eq!(r.resolve(&store, &metadata, None, &raw(), &mut rec), None);
    }

    #[test]
    fn test_emitter_emits_each_pair_once() {
        let sink = CollectingSink::new();
        let emitter = Emitter::new(&sink);
        assert!(emitter.claim("/a.ris"));
        assert!(!emitter.claim("/a.ris"));

        let rec = cooked();
        assert!(emitter.emit("/a.ris", 0, std::slice::from_ref(&rec)).unwrap());
        assert!(!emitter.emit("/a.ris", 0, std::slice::from_ref(&rec)).unwrap());
        assert!(emitter.emit("/a.ris", 1, &[rec.clone(), rec]).unwrap());
        assert_eq!(sink.records().len(), 3);
    }

    #[test]
    fn test_json_lines_sink() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.emit("/a.ris", &cooked()).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["resource"], "/a.ris");
        assert_eq!(value["record"]["doi"], "10.1000/abc.2020.1");
        assert_eq!(value["record"]["author"][0], "Smith, John");
    }
}

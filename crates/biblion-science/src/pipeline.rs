//! One resolution pass over a resource store.
//!
//! The assembler runs on the calling thread as the single consumer of the
//! store traversal. Finished articles fan out to a fixed-size rayon pool
//! for extraction, cooking, validation and emission.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use biblion_core::{
    Article, CookedRecord, MetadataField, PublicationConfig, RawRecord, Registry, ResourceRef,
    ResourceStore, Role,
};

use crate::assembler::{ArticleAssembler, AssemblyRules, AssemblyStats};
use crate::consolidate::Consolidator;
use crate::cook::cook;
use crate::emit::{CompanionResolver, Emitter, MetadataSink};
use crate::error::{Result, ScienceError};
use crate::extract::extract;
use crate::matcher::{Classification, PatternMatcher};
use crate::schema::Schema;
use crate::validate::{RegistryValidator, Verdict};

/// Roles consulted, in order, for the resource to extract metadata from.
const METADATA_ROLES: [Role; 3] = [Role::ArticleMetadata, Role::CitationRis, Role::Citation];

// ─── Report ────────────────────────────────────────────────

/// Counters of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub resources: usize,
    pub scope_misses: usize,
    pub articles: usize,
    pub incomplete: usize,
    pub without_metadata: usize,
    pub extraction_failures: usize,
    pub empty_records: usize,
    pub registry_mismatches: usize,
    pub duplicates: usize,
    pub emitted: usize,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resources ({} out of scope), {} articles ({} incomplete dropped), \
             {} emitted, {} rejected by registry, {} empty, {} extraction failures, \
             {} duplicates, {} without metadata",
            self.resources,
            self.scope_misses,
            self.articles,
            self.incomplete,
            self.emitted,
            self.registry_mismatches,
            self.empty_records,
            self.extraction_failures,
            self.duplicates,
            self.without_metadata,
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    without_metadata: AtomicUsize,
    extraction_failures: AtomicUsize,
    empty_records: AtomicUsize,
    registry_mismatches: AtomicUsize,
    duplicates: AtomicUsize,
    emitted: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    fn report(&self, assembly: &AssemblyStats) -> PassReport {
        let load = |c: &AtomicUsize| c.load(Ordering::Relaxed);
        PassReport {
            resources: load(&assembly.resources),
            scope_misses: load(&assembly.scope_misses),
            articles: load(&assembly.articles),
            incomplete: load(&assembly.incomplete),
            without_metadata: load(&self.without_metadata),
            extraction_failures: load(&self.extraction_failures),
            empty_records: load(&self.empty_records),
            registry_mismatches: load(&self.registry_mismatches),
            duplicates: load(&self.duplicates),
            emitted: load(&self.emitted),
        }
    }
}

/// What became of one raw record after cooking and validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ready(CookedRecord),
    /// No bibliographic field survived cooking.
    Empty,
    RegistryMismatch(String),
}

// ─── Pipeline ──────────────────────────────────────────────

/// Everything compiled from a [`PublicationConfig`]. Immutable once built
/// and shared by every worker of a pass.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    provider: Option<String>,
    matcher: PatternMatcher,
    rules: AssemblyRules,
    schema: Schema,
    validator: RegistryValidator,
    companion: CompanionResolver,
    workers: usize,
}

impl Pipeline {
    /// Compile every rule, template and path expression up front.
    pub fn build(config: &PublicationConfig, registry: &dyn Registry) -> Result<Self> {
        let matcher = PatternMatcher::from_config(config)?;
        let rules = AssemblyRules::from_config(config)?;
        let schema = Schema::resolve(config)?;
        let validator = RegistryValidator::new(&config.params, registry, &config.validation);
        if validator.entry().is_none() && config.validation.enabled {
            warn!(
                "publication '{}': no registry entry for the declared parameters",
                config.name
            );
        }
        let companion = CompanionResolver::new(&config.companion, schema.filename_key.as_deref());

        debug!(
            "publication '{}': {} aspect(s), schema '{}'",
            config.name,
            matcher.rules().len(),
            schema.name
        );
        Ok(Self {
            name: config.name.clone(),
            provider: config.provider.clone(),
            matcher,
            rules,
            schema,
            validator,
            companion,
            workers: config.workers.max(1),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn classify(&self, identifier: &str) -> Option<Classification> {
        self.matcher.classify(identifier)
    }

    /// Assemble every article the store holds without processing them.
    pub fn articles<'s>(&'s self, store: &'s dyn ResourceStore) -> impl Iterator<Item = Article> + 's {
        ArticleAssembler::new(store.resources(), &self.matcher, &self.rules)
    }

    /// Run one pass. Dropped records and unreadable or malformed resources
    /// never fail the pass; a sink failure, a worker pool that cannot start
    /// or a schema that cannot run on any resource does.
    pub fn run(&self, store: &dyn ResourceStore, sink: &dyn MetadataSink) -> Result<PassReport> {
        let assembler = ArticleAssembler::new(store.resources(), &self.matcher, &self.rules);
        let stats = assembler.stats();
        let emitter = Emitter::new(sink);
        let counters = Counters::default();

        if self.workers == 1 {
            for article in assembler {
                self.process_article(&article, store, &emitter, &counters)?;
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .map_err(|e| ScienceError::Config(format!("cannot start worker pool: {e}")))?;
            pool.install(|| {
                assembler
                    .par_bridge()
                    .try_for_each(|article| self.process_article(&article, store, &emitter, &counters))
            })?;
        }

        let report = counters.report(&stats);
        info!("publication '{}': {report}", self.name);
        Ok(report)
    }

    fn process_article(
        &self,
        article: &Article,
        store: &dyn ResourceStore,
        emitter: &Emitter<'_>,
        counters: &Counters,
    ) -> Result<()> {
        let Some(metadata) = METADATA_ROLES.iter().find_map(|role| article.role(*role)) else {
            debug!("article '{}': no metadata resource", article.key());
            bump(&counters.without_metadata);
            return Ok(());
        };
        let resource = metadata.identifier();
        if !emitter.claim(resource) {
            debug!("{resource}: already processed in this pass");
            bump(&counters.duplicates);
            return Ok(());
        }

        let raws = match extract(metadata, &self.schema) {
            Ok(raws) => raws,
            Err(e) if e.is_extraction_failure() => {
                warn!("{resource}: extraction skipped: {e}");
                bump(&counters.extraction_failures);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let groups = Consolidator::for_schema(&self.schema).consolidate(raws);

        for (ordinal, group) in groups.iter().enumerate() {
            let mut ready = Vec::with_capacity(group.len());
            for raw in group {
                match self.finish(raw, article, metadata, store) {
                    Outcome::Ready(cooked) => ready.push(cooked),
                    Outcome::Empty => {
                        debug!("{resource}: record {ordinal} has no usable fields");
                        bump(&counters.empty_records);
                    }
                    Outcome::RegistryMismatch(reason) => {
                        info!("{resource}: record {ordinal} dropped: {reason}");
                        bump(&counters.registry_mismatches);
                    }
                }
            }
            if ready.is_empty() {
                continue;
            }
            if emitter.emit(resource, ordinal, &ready)? {
                counters.emitted.fetch_add(ready.len(), Ordering::Relaxed);
            } else {
                bump(&counters.duplicates);
            }
        }
        Ok(())
    }

    /// Cook one raw record and carry it up to the point of emission.
    pub fn finish(
        &self,
        raw: &RawRecord,
        article: &Article,
        metadata: &ResourceRef,
        store: &dyn ResourceStore,
    ) -> Outcome {
        let mut cooked = cook(raw, &self.schema);
        for error in cooked.errors() {
            debug!(
                "{}: {} rejected '{}': {}",
                metadata.identifier(),
                error.field,
                error.value,
                error.reason
            );
        }

        if !cooked.has_bibliographic_fields() {
            return Outcome::Empty;
        }
        if let Some(provider) = &self.provider {
            cooked.put(MetadataField::Provider, provider.as_str());
        }
        if let Some(fetched) = metadata.fetch_time() {
            cooked.put(MetadataField::FetchTime, fetched.to_rfc3339());
        }

        if let Verdict::Reject(reason) = self.validator.validate(&cooked) {
            return Outcome::RegistryMismatch(reason);
        }
        self.validator.complete(&mut cooked);

        self.companion
            .resolve(store, metadata, article.full_text(), raw, &mut cooked);
        Outcome::Ready(cooked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblion_core::{AspectConfig, MemoryStore, SchemaConfig, StaticRegistry};

    use crate::emit::CollectingSink;

    fn config() -> PublicationConfig {
        PublicationConfig {
            name: "test".to_string(),
            aspects: vec![
                AspectConfig {
                    root: String::new(),
                    pattern: r"/article/([^/.]+)\.ris".to_string(),
                    replacement: "$1".to_string(),
                    roles: vec![Role::ArticleMetadata],
                },
                AspectConfig {
                    root: String::new(),
                    pattern: r"/article/([^/.]+)\.pdf".to_string(),
                    replacement: "$1".to_string(),
                    roles: vec![Role::FullTextPdf],
                },
            ],
            schema: SchemaConfig {
                preset: Some("ris".to_string()),
                inline: None,
            },
            provider: Some("Test Provider".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_rejects_bad_config() {
        let mut cfg = config();
        cfg.schema = SchemaConfig::default();
        let err = Pipeline::build(&cfg, &StaticRegistry::default()).unwrap_err();
        assert!(matches!(err, ScienceError::Config(_)));
    }

    #[test]
    fn test_empty_record_is_not_emitted() {
        let store = MemoryStore::new()
            .with("/article/a.ris", "TY  - JOUR\nUR  - http://x.org/a\nER  -\n")
            .with("/article/a.pdf", "%PDF");
        let sink = CollectingSink::new();
        let pipeline = Pipeline::build(&config(), &StaticRegistry::default()).unwrap();

        let report = pipeline.run(&store, &sink).unwrap();
        assert_eq!(report.articles, 1);
        assert_eq!(report.empty_records, 1);
        assert_eq!(report.emitted, 0);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_provider_and_full_text_pointer() {
        let store = MemoryStore::new()
            .with("/article/a.ris", "TY  - JOUR\nT1  - A title\nER  -\n")
            .with("/article/a.pdf", "%PDF");
        let sink = CollectingSink::new();
        let pipeline = Pipeline::build(&config(), &StaticRegistry::default()).unwrap();

        pipeline.run(&store, &sink).unwrap();
        let records = sink.records();
        assert_eq!(records.len(), 1);
        let (resource, record) = &records[0];
        assert_eq!(resource, "/article/a.ris");
        assert_eq!(record.get(MetadataField::Provider), Some("Test Provider"));
        assert_eq!(record.get(MetadataField::AccessUrl), Some("/article/a.pdf"));
    }

    #[test]
    fn test_unreadable_resource_is_skipped() {
        let mut store = MemoryStore::new()
            .with("/article/b.ris", "TY  - JOUR\nT1  - Readable\nER  -\n")
            .with("/article/b.pdf", "%PDF");
        store.insert(ResourceRef::new(
            "/article/a.ris",
            "application/x-research-info-systems",
            std::sync::Arc::new(biblion_core::FileContent(
                "/nonexistent/biblion/a.ris".into(),
            )),
        ));
        store.insert_bytes("/article/a.pdf", "%PDF");
        let sink = CollectingSink::new();
        let pipeline = Pipeline::build(&config(), &StaticRegistry::default()).unwrap();

        let report = pipeline.run(&store, &sink).unwrap();
        assert_eq!(report.articles, 2);
        assert_eq!(report.extraction_failures, 1);
        assert_eq!(report.emitted, 1);
        assert_eq!(sink.records()[0].0, "/article/b.ris");
    }

    #[test]
    fn test_report_display() {
        let report = PassReport {
            resources: 3,
            emitted: 1,
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.starts_with("3 resources"));
        assert!(text.contains("1 emitted"));
    }
}

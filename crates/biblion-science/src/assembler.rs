//! Groups classified resources into articles.
//!
//! The assembler is the single consumer of the resource traversal: key
//! grouping depends on state accumulated over the whole walk, so it
//! always runs on one thread. Everything downstream works per article.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use biblion_core::{Article, AssemblyMode, PublicationConfig, ResourceRef, Role};

use crate::error::{Result, ScienceError};
use crate::matcher::PatternMatcher;

/// When an article is complete and how its full-text pointer is chosen.
#[derive(Debug, Clone)]
pub struct AssemblyRules {
    pub required_roles: Vec<Role>,
    pub full_text: Vec<Role>,
    /// `(role, sources)`: fill `role` from the first present source.
    pub derived: Vec<(Role, Vec<Role>)>,
    pub mode: AssemblyMode,
}

impl AssemblyRules {
    pub fn from_config(config: &PublicationConfig) -> Result<Self> {
        let full_text = config.full_text.roles();
        if full_text.is_empty() {
            return Err(ScienceError::Config(
                "full-text preference lists no roles".to_string(),
            ));
        }
        Ok(Self {
            required_roles: config.required_roles.clone(),
            full_text,
            derived: config
                .derived_roles
                .iter()
                .map(|d| (d.role, d.from.clone()))
                .collect(),
            mode: config.assembly,
        })
    }

    /// Present directly or derivable from another present role.
    fn has_effective(&self, article: &Article, role: Role) -> bool {
        article.has_role(role)
            || self
                .derived
                .iter()
                .filter(|(target, _)| *target == role)
                .any(|(_, from)| from.iter().any(|r| article.has_role(*r)))
    }

    pub fn is_complete(&self, article: &Article) -> bool {
        self.required_roles
            .iter()
            .all(|role| self.has_effective(article, *role))
            && self
                .full_text
                .iter()
                .any(|role| self.has_effective(article, *role))
    }

    /// Complete, and no later sibling could change the full-text choice:
    /// every role of the preference list is already present.
    pub fn is_settled(&self, article: &Article) -> bool {
        self.is_complete(article)
            && self
                .full_text
                .iter()
                .all(|role| self.has_effective(article, *role))
    }

    /// Apply role derivations, then pick the full-text role.
    pub fn finalize(&self, article: &mut Article) {
        for (target, from) in &self.derived {
            if article.has_role(*target) {
                continue;
            }
            let source = from
                .iter()
                .find_map(|r| article.role(*r).cloned());
            if let Some(resource) = source {
                article.set_role(*target, resource);
            }
        }
        article.select_full_text(&self.full_text);
    }
}

impl Default for AssemblyRules {
    fn default() -> Self {
        Self {
            required_roles: vec![Role::ArticleMetadata],
            full_text: vec![Role::FullTextHtml, Role::FullTextPdf],
            derived: Vec::new(),
            mode: AssemblyMode::Eager,
        }
    }
}

/// Traversal counters, readable after the assembler has been consumed.
#[derive(Debug, Default)]
pub struct AssemblyStats {
    pub resources: AtomicUsize,
    pub scope_misses: AtomicUsize,
    pub articles: AtomicUsize,
    pub incomplete: AtomicUsize,
}

impl AssemblyStats {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Lazy, finite, non-restartable sequence of complete articles.
pub struct ArticleAssembler<'a, I> {
    resources: I,
    matcher: &'a PatternMatcher,
    rules: &'a AssemblyRules,
    working: HashMap<String, Article>,
    first_seen: Vec<String>,
    yielded: HashSet<String>,
    pending: VecDeque<Article>,
    stats: Arc<AssemblyStats>,
    finished: bool,
}

impl<'a, I> ArticleAssembler<'a, I>
where
    I: Iterator<Item = ResourceRef>,
{
    pub fn new(resources: I, matcher: &'a PatternMatcher, rules: &'a AssemblyRules) -> Self {
        Self {
            resources,
            matcher,
            rules,
            working: HashMap::new(),
            first_seen: Vec::new(),
            yielded: HashSet::new(),
            pending: VecDeque::new(),
            stats: Arc::new(AssemblyStats::default()),
            finished: false,
        }
    }

    pub fn stats(&self) -> Arc<AssemblyStats> {
        Arc::clone(&self.stats)
    }

    /// Fold one resource in. Returns an article that just became settled
    /// (eager mode only). Complete but unsettled articles wait for the end
    /// of the traversal.
    fn accept(&mut self, resource: ResourceRef) -> Option<Article> {
        AssemblyStats::bump(&self.stats.resources);
        let Some(class) = self.matcher.classify(resource.identifier()) else {
            AssemblyStats::bump(&self.stats.scope_misses);
            return None;
        };
        if self.yielded.contains(&class.key) {
            debug!(
                "{}: article '{}' already assembled, dropping late resource",
                resource.identifier(),
                class.key
            );
            return None;
        }

        let article = self.working.entry(class.key.clone()).or_insert_with(|| {
            self.first_seen.push(class.key.clone());
            Article::new(class.key.clone())
        });
        for role in &class.roles {
            if let Some(previous) = article.set_role(*role, resource.clone())
                && previous != resource
            {
                warn!(
                    "article '{}': role {role} of {} overwritten by {}",
                    class.key,
                    previous.identifier(),
                    resource.identifier()
                );
            }
        }

        if self.rules.mode == AssemblyMode::Eager && self.rules.is_settled(article) {
            let mut article = self.working.remove(&class.key)?;
            self.yielded.insert(class.key);
            self.rules.finalize(&mut article);
            AssemblyStats::bump(&self.stats.articles);
            return Some(article);
        }
        None
    }

    /// End of traversal: queue whatever is complete, drop the rest.
    fn finish(&mut self) {
        self.finished = true;
        for key in std::mem::take(&mut self.first_seen) {
            let Some(mut article) = self.working.remove(&key) else {
                continue;
            };
            if self.rules.is_complete(&article) {
                self.rules.finalize(&mut article);
                AssemblyStats::bump(&self.stats.articles);
                self.pending.push_back(article);
            } else {
                AssemblyStats::bump(&self.stats.incomplete);
                debug!(
                    "dropping incomplete article '{key}' with roles {:?}",
                    article.role_names()
                );
            }
        }
    }
}

impl<I> Iterator for ArticleAssembler<'_, I>
where
    I: Iterator<Item = ResourceRef>,
{
    type Item = Article;

    fn next(&mut self) -> Option<Article> {
        loop {
            if let Some(article) = self.pending.pop_front() {
                return Some(article);
            }
            if self.finished {
                return None;
            }
            match self.resources.next() {
                Some(resource) => {
                    if let Some(article) = self.accept(resource) {
                        return Some(article);
                    }
                }
                None => self.finish(),
            }
        }
    }
}

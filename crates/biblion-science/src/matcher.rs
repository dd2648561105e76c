//! Aspect classification: which article a resource belongs to, and what
//! role it plays there.

use regex::Regex;
use tracing::debug;

use biblion_core::{AspectConfig, CollectionParams, PublicationConfig, Role};

use crate::error::{Result, ScienceError};
use crate::template::{Escape, substitute};

/// One compiled aspect rule.
#[derive(Debug, Clone)]
pub struct AspectRule {
    root: String,
    pattern: Regex,
    replacement: String,
    roles: Vec<Role>,
}

impl AspectRule {
    /// Resolve placeholders and compile the pattern, anchored at both ends.
    pub fn compile(config: &AspectConfig, params: &CollectionParams) -> Result<Self> {
        if config.roles.is_empty() {
            return Err(ScienceError::Config(format!(
                "aspect '{}' declares no roles",
                config.pattern
            )));
        }
        let root = substitute(&config.root, params, Escape::Literal)?;
        let pattern = substitute(&config.pattern, params, Escape::Regex)?;
        let pattern = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            ScienceError::Config(format!("invalid aspect pattern '{}': {e}", config.pattern))
        })?;
        let replacement = substitute(&config.replacement, params, Escape::Literal)?;

        Ok(Self {
            root,
            pattern,
            replacement,
            roles: config.roles.clone(),
        })
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Canonical key for `identifier`, or `None` when the rule does not apply.
    pub fn key_for(&self, identifier: &str) -> Option<String> {
        let relative = identifier.strip_prefix(self.root.as_str())?;
        let caps = self.pattern.captures(relative)?;
        let mut key = String::new();
        caps.expand(&self.replacement, &mut key);
        (!key.is_empty()).then_some(key)
    }
}

/// Result of classifying one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub key: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    rules: Vec<AspectRule>,
    exclude: Option<Regex>,
}

impl PatternMatcher {
    pub fn new(rules: Vec<AspectRule>, exclude: Option<Regex>) -> Self {
        Self { rules, exclude }
    }

    /// Compile every aspect of a publication. Any bad rule fails the whole set.
    pub fn from_config(config: &PublicationConfig) -> Result<Self> {
        let rules = config
            .aspects
            .iter()
            .map(|aspect| AspectRule::compile(aspect, &config.params))
            .collect::<Result<Vec<_>>>()?;
        if rules.is_empty() {
            return Err(ScienceError::Config(format!(
                "publication '{}' has no aspects",
                config.name
            )));
        }
        let exclude = config
            .exclude
            .as_deref()
            .map(|pattern| {
                let pattern = substitute(pattern, &config.params, Escape::Regex)?;
                Regex::new(&pattern).map_err(|e| {
                    ScienceError::Config(format!("invalid exclude pattern '{pattern}': {e}"))
                })
            })
            .transpose()?;
        Ok(Self::new(rules, exclude))
    }

    pub fn rules(&self) -> &[AspectRule] {
        &self.rules
    }

    /// Classify a resource identifier.
    ///
    /// The first matching rule fixes the key. Later rules reducing to the
    /// same key add their roles. `None` means the resource is out of scope.
    pub fn classify(&self, identifier: &str) -> Option<Classification> {
        if self
            .exclude
            .as_ref()
            .is_some_and(|re| re.is_match(identifier))
        {
            return None;
        }

        let mut found: Option<Classification> = None;
        for rule in &self.rules {
            let Some(key) = rule.key_for(identifier) else {
                continue;
            };
            match found.as_mut() {
                None => {
                    found = Some(Classification {
                        key,
                        roles: rule.roles.clone(),
                    })
                }
                Some(c) if c.key == key => {
                    for role in &rule.roles {
                        if !c.roles.contains(role) {
                            c.roles.push(*role);
                        }
                    }
                }
                Some(c) => {
                    debug!(
                        "{identifier}: ignoring second key '{key}', already classified as '{}'",
                        c.key
                    );
                }
            }
        }
        found
    }
}

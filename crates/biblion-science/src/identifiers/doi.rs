use crate::error::{Result, ScienceError};
use crate::identifiers::strip_label;

const RESOLVER_PREFIXES: [&str; 4] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doi {
    /// `10.x/y` as published, case preserved.
    pub value: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let mut bare = strip_label(input, &["doi:"]);
        for prefix in RESOLVER_PREFIXES {
            if let Some(rest) = bare.strip_prefix(prefix) {
                bare = rest;
                break;
            }
        }

        let Some((registrant, suffix)) = bare.split_once('/') else {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        };
        let registrant_ok = registrant
            .strip_prefix("10.")
            .is_some_and(|r| !r.is_empty() && r.chars().all(|c| c.is_ascii_digit() || c == '.'));
        if !registrant_ok || suffix.trim().is_empty() || bare.chars().any(char::is_whitespace) {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }

        Ok(Self {
            value: bare.to_string(),
        })
    }

    /// Everything after the registrant prefix, e.g. `abc.2020.1` for `10.1000/abc.2020.1`.
    pub fn suffix(&self) -> &str {
        self.value
            .split_once('/')
            .map(|(_, s)| s)
            .unwrap_or(&self.value)
    }
}

use serde::{Deserialize, Serialize};

/// Raw tag → values pairs as extracted from a metadata resource.
///
/// Tags keep first-insertion order and values keep their order of
/// appearance, since repeated tags are meaningful (one per author).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    entries: Vec<(String, Vec<String>)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `tag`. Blank values are dropped.
    pub fn push(&mut self, tag: &str, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(t, _)| t == tag) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((tag.to_string(), vec![value])),
        }
    }

    /// Append `value` only if `tag` does not already hold it.
    pub fn push_unique(&mut self, tag: &str, value: impl Into<String>) {
        let value = value.into();
        if self.get(tag).iter().any(|v| *v == value) {
            return;
        }
        self.push(tag, value);
    }

    /// Replace all values of `tag`.
    pub fn set(&mut self, tag: &str, values: Vec<String>) {
        let values: Vec<String> = values
            .into_iter()
            .filter(|v| !v.trim().is_empty())
            .collect();
        if values.is_empty() {
            self.remove(tag);
            return;
        }
        match self.entries.iter_mut().find(|(t, _)| t == tag) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((tag.to_string(), values)),
        }
    }

    pub fn remove(&mut self, tag: &str) -> Option<Vec<String>> {
        let pos = self.entries.iter().position(|(t, _)| t == tag)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, tag: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, tag: &str) -> Option<&str> {
        self.get(tag).first().map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        !self.get(tag).is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

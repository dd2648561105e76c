//! Merging and grouping of the raw records one resource yields.

use std::collections::{HashMap, HashSet};

use biblion_core::RawRecord;

use crate::schema::Schema;

#[derive(Debug, Clone, Default)]
pub struct Consolidator<'a> {
    dedup_key: Option<&'a str>,
    consolidation_key: Option<&'a str>,
    /// Tags whose values are unioned on merge; all others keep the first value.
    list_tags: HashSet<&'a str>,
}

impl<'a> Consolidator<'a> {
    pub fn new(
        dedup_key: Option<&'a str>,
        consolidation_key: Option<&'a str>,
        list_tags: HashSet<&'a str>,
    ) -> Self {
        Self {
            dedup_key,
            consolidation_key,
            list_tags,
        }
    }

    pub fn for_schema(schema: &'a Schema) -> Self {
        Self::new(
            schema.dedup_key.as_deref(),
            schema.consolidation_key.as_deref(),
            schema.list_tags(),
        )
    }

    /// Records grouped into logical units, in first-seen order.
    ///
    /// With a dedup key, records sharing its value collapse into one
    /// merged record. Otherwise, with a consolidation key, records sharing
    /// that value form one group but stay separate. With neither, every
    /// record is its own group. Each group is emitted as one logical record.
    pub fn consolidate(&self, records: Vec<RawRecord>) -> Vec<Vec<RawRecord>> {
        if let Some(key) = self.dedup_key {
            return self.merge_by(key, records).into_iter().map(|r| vec![r]).collect();
        }
        match self.consolidation_key {
            Some(key) => group_by(key, records),
            None => records.into_iter().map(|r| vec![r]).collect(),
        }
    }

    fn merge_by(&self, key: &str, records: Vec<RawRecord>) -> Vec<RawRecord> {
        let mut merged: Vec<RawRecord> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            // records without a key value cannot be duplicates of anything
            let Some(value) = key_value(&record, key) else {
                merged.push(record);
                continue;
            };
            match index.get(&value) {
                Some(&pos) => self.merge_into(&mut merged[pos], record),
                None => {
                    index.insert(value, merged.len());
                    merged.push(record);
                }
            }
        }
        merged
    }

    fn merge_into(&self, target: &mut RawRecord, other: RawRecord) {
        for (tag, values) in other.iter() {
            if self.list_tags.contains(tag) {
                for value in values {
                    target.push_unique(tag, value.clone());
                }
            } else if !target.contains(tag) {
                target.set(tag, values.to_vec());
            }
        }
    }
}

fn key_value(record: &RawRecord, key: &str) -> Option<String> {
    record
        .first(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn group_by(key: &str, records: Vec<RawRecord>) -> Vec<Vec<RawRecord>> {
    let mut groups: Vec<Vec<RawRecord>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records {
        match key_value(&record, key) {
            Some(value) => match index.get(&value) {
                Some(&pos) => groups[pos].push(record),
                None => {
                    index.insert(value, groups.len());
                    groups.push(vec![record]);
                }
            },
            None => groups.push(vec![record]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(isbn: &str, form: &str, title: &str) -> RawRecord {
        let mut raw = RawRecord::new();
        raw.push("isbn13", isbn);
        raw.push("product_form", form);
        raw.push("title", title);
        raw
    }

    fn consolidator<'a>(dedup: Option<&'a str>, group: Option<&'a str>) -> Consolidator<'a> {
        Consolidator::new(dedup, group, ["product_form"].into_iter().collect())
    }

    #[test]
    fn test_identity_without_keys() {
        let records = vec![product("1", "pdf", "A"), product("1", "epub", "A")];
        assert_eq!(
            consolidator(None, None).consolidate(records.clone()),
            vec![vec![records[0].clone()], vec![records[1].clone()]]
        );
    }

    #[test]
    fn test_dedup_merges_sharing_records() {
        let records = vec![
            product("978", "pdf", "First title"),
            product("111", "pdf", "Other"),
            product("978", "epub", "Second title"),
            product("978", "pdf", "Third title"),
        ];
        let merged: Vec<RawRecord> = consolidator(Some("isbn13"), Some("product_form"))
            .consolidate(records)
            .into_iter()
            .flatten()
            .collect();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].get("product_form"), ["pdf", "epub"]);
        assert_eq!(merged[0].first("title"), Some("First title"));
        assert_eq!(merged[1].first("isbn13"), Some("111"));
    }

    #[test]
    fn test_distinct_keys_keep_cardinality() {
        let records = vec![product("1", "pdf", "A"), product("2", "pdf", "B"), product("3", "pdf", "C")];
        assert_eq!(consolidator(Some("isbn13"), None).consolidate(records).len(), 3);
    }

    #[test]
    fn test_consolidation_key_groups_without_merging() {
        let records = vec![
            product("1", "pdf", "A"),
            product("2", "epub", "B"),
            product("3", "pdf", "C"),
        ];
        let groups = consolidator(None, Some("product_form")).consolidate(records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][1].first("title"), Some("C"));
        assert_eq!(groups[1][0].first("title"), Some("B"));
    }

    #[test]
    fn test_records_without_dedup_value_pass_through() {
        let mut bare = RawRecord::new();
        bare.push("title", "No isbn");
        let records = vec![bare.clone(), bare];
        assert_eq!(consolidator(Some("isbn13"), None).consolidate(records).len(), 2);
    }
}

//! Resource labels and label queries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String key/value labels attached to resource metadata.
///
/// Keys iterate in sorted order, which keeps label-filtered list snapshots
/// stable between reconciles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the label `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True if the label `key` is set, regardless of value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A single label selector term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelTerm {
    /// The label exists and equals the value.
    Equal(String, String),
    /// The label exists with any value.
    Exists(String),
    /// The label does not exist.
    NotExists(String),
}

impl LabelTerm {
    fn matches(&self, labels: &Labels) -> bool {
        match self {
            LabelTerm::Equal(key, value) => labels.get(key) == Some(value.as_str()),
            LabelTerm::Exists(key) => labels.contains(key),
            LabelTerm::NotExists(key) => !labels.contains(key),
        }
    }
}

/// Conjunction of label terms. An empty query matches every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelQuery {
    terms: Vec<LabelTerm>,
}

impl LabelQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.terms.push(LabelTerm::Equal(key.into(), value.into()));
        self
    }

    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.terms.push(LabelTerm::Exists(key.into()));
        self
    }

    pub fn not_exists(mut self, key: impl Into<String>) -> Self {
        self.terms.push(LabelTerm::NotExists(key.into()));
        self
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.terms.iter().all(|term| term.matches(labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_query_matching() {
        let mut labels = Labels::new();
        labels.set("cluster", "c1");
        labels.set("available", "");

        assert!(LabelQuery::new().matches(&labels));
        assert!(LabelQuery::new().eq("cluster", "c1").matches(&labels));
        assert!(!LabelQuery::new().eq("cluster", "c2").matches(&labels));
        assert!(LabelQuery::new().exists("available").matches(&labels));
        assert!(LabelQuery::new().not_exists("machine-set").matches(&labels));
        assert!(!LabelQuery::new()
            .eq("cluster", "c1")
            .not_exists("available")
            .matches(&labels));
    }
}

//! Topics and the per-run topic table.

use indexmap::IndexMap;
use std::borrow::Borrow;
use std::fmt;

/// Name of a pub/sub topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicName(String);

impl TopicName {
    /// Create a topic name.
    pub fn new(name: impl Into<String>) -> Self {
        TopicName(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopicName {
    fn from(name: &str) -> Self {
        TopicName(name.to_string())
    }
}

impl From<String> for TopicName {
    fn from(name: String) -> Self {
        TopicName(name)
    }
}

impl Borrow<str> for TopicName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A topic together with the probability that a node subscribes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub name: TopicName,
    /// Subscription probability, expected in `[0, 1]`.
    pub chance: f64,
}

/// Topics of one experiment run.
///
/// Iteration follows insertion order, which keeps per-topic seeds (and
/// therefore subscription decisions) reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicTable {
    topics: IndexMap<TopicName, f64>,
}

impl TopicTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic, or replace the chance of an existing one (keeping its position).
    pub fn insert(&mut self, name: impl Into<TopicName>, chance: f64) -> Option<f64> {
        self.topics.insert(name.into(), chance)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_topic(mut self, name: impl Into<TopicName>, chance: f64) -> Self {
        self.insert(name, chance);
        self
    }

    /// Subscription chance of a topic.
    pub fn chance(&self, name: &str) -> Option<f64> {
        self.topics.get(name).copied()
    }

    /// Iterate topics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Topic> + '_ {
        self.topics.iter().map(|(name, &chance)| Topic {
            name: name.clone(),
            chance,
        })
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl<N: Into<TopicName>> FromIterator<(N, f64)> for TopicTable {
    fn from_iter<I: IntoIterator<Item = (N, f64)>>(iter: I) -> Self {
        let mut table = TopicTable::new();
        for (name, chance) in iter {
            table.insert(name, chance);
        }
        table
    }
}

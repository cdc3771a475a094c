//! Dependency edges between content paths.
//!
//! Two kinds of edge decide what a change cascades to:
//!
//! - `dependee → dependent`: the dependent renders data of the dependee
//!   (a listing page shows a post's teaser).
//! - `type → subscriber`: the subscriber must regenerate whenever *any*
//!   unit of that type changes, so new posts show up in a listing that did
//!   not know about them yet.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered set-valued map. Values keep insertion order so cascades are
/// deterministic, and never hold duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
struct EdgeMap(BTreeMap<String, Vec<String>>);

impl EdgeMap {
    fn insert(&mut self, key: &str, value: &str) -> bool {
        let values = self.0.entry(key.to_owned()).or_default();
        if values.iter().any(|v| v == value) {
            return false;
        }
        values.push(value.to_owned());
        true
    }

    fn get(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Drop `value` from every set, pruning sets that become empty.
    fn remove_value(&mut self, value: &str) {
        self.0.retain(|_, values| {
            values.retain(|v| v != value);
            !values.is_empty()
        });
    }

    fn remove_key(&mut self, key: &str) {
        self.0.remove(key);
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Content path → paths whose output is derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph(EdgeMap);

impl DependencyGraph {
    /// Record that `dependent` renders data of `dependee`. Returns whether
    /// the edge is new.
    pub fn add_dependency(&mut self, dependee: &str, dependent: &str) -> bool {
        self.0.insert(dependee, dependent)
    }

    pub fn dependents_of(&self, dependee: &str) -> &[String] {
        self.0.get(dependee)
    }

    /// Forget every edge pointing at `dependent`.
    pub fn remove_dependent(&mut self, dependent: &str) {
        self.0.remove_value(dependent);
    }

    /// Forget every edge leaving `dependee`.
    pub fn remove_dependee(&mut self, dependee: &str) {
        self.0.remove_key(dependee);
    }

    /// Number of dependees with at least one dependent.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Type tag → paths that regenerate when any unit of that type changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberRegistry(EdgeMap);

impl SubscriberRegistry {
    pub fn add_subscription(&mut self, type_tag: &str, subscriber: &str) -> bool {
        self.0.insert(type_tag, subscriber)
    }

    pub fn subscribers_of(&self, type_tag: &str) -> &[String] {
        self.0.get(type_tag)
    }

    pub fn remove_subscriber(&mut self, subscriber: &str) {
        self.0.remove_value(subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_set_semantics() {
        let mut deps = DependencyGraph::default();
        assert!(deps.add_dependency("posts/a.md", "listings/blog.html"));
        assert!(!deps.add_dependency("posts/a.md", "listings/blog.html"));
        assert!(deps.add_dependency("posts/a.md", "feeds/rss.xml"));

        assert_eq!(deps.dependents_of("posts/a.md"), ["listings/blog.html", "feeds/rss.xml"]);
        assert!(deps.dependents_of("posts/b.md").is_empty());
    }

    #[test]
    fn test_remove_dependent_prunes_empty_sets() {
        let mut deps = DependencyGraph::default();
        deps.add_dependency("posts/a.md", "listings/blog.html");
        deps.add_dependency("posts/b.md", "listings/blog.html");
        deps.add_dependency("posts/b.md", "feeds/rss.xml");

        deps.remove_dependent("listings/blog.html");
        assert!(deps.dependents_of("posts/a.md").is_empty());
        assert_eq!(deps.dependents_of("posts/b.md"), ["feeds/rss.xml"]);
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn test_remove_dependee() {
        let mut deps = DependencyGraph::default();
        deps.add_dependency("posts/a.md", "listings/blog.html");
        deps.remove_dependee("posts/a.md");
        assert_eq!(deps.len(), 0);
    }

    #[test]
    fn test_subscriptions() {
        let mut subs = SubscriberRegistry::default();
        subs.add_subscription("post", "listings/blog.html");
        subs.add_subscription("post", "feeds/rss.xml");
        assert!(!subs.add_subscription("post", "feeds/rss.xml"));
        assert_eq!(subs.subscribers_of("post"), ["listings/blog.html", "feeds/rss.xml"]);

        subs.remove_subscriber("listings/blog.html");
        assert_eq!(subs.subscribers_of("post"), ["feeds/rss.xml"]);
        assert!(subs.subscribers_of("page").is_empty());
    }

    #[test]
    fn test_serialized_as_plain_map() {
        let mut deps = DependencyGraph::default();
        deps.add_dependency("posts/a.md", "listings/blog.html");
        let json = serde_json::to_value(&deps).unwrap();
        assert_eq!(json, serde_json::json!({ "posts/a.md": ["listings/blog.html"] }));
    }
}

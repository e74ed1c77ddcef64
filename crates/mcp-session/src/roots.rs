//! Client-side root (workspace) bookkeeping.
//!
//! Grounded in the spec's invariant: roots are an ordered set de-duplicated
//! by URI, where the *first* entry for a URI wins the `name` field — a
//! later `roots/list` result naming the same URI differently does not
//! overwrite it.

use mcp_protocol::types::Root;

/// An insertion-ordered collection of [`Root`]s, unique by URI.
#[derive(Debug, Clone, Default)]
pub struct RootSet {
    order: Vec<String>,
    roots: std::collections::HashMap<String, Root>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `root`, keeping the existing entry's `name` if one is already
    /// present for this URI.
    pub fn insert(&mut self, root: Root) {
        if !self.roots.contains_key(&root.uri) {
            self.order.push(root.uri.clone());
            self.roots.insert(root.uri.clone(), root);
        }
    }

    /// Replace the whole set, e.g. after a fresh `roots/list` round trip.
    pub fn replace_all(&mut self, roots: Vec<Root>) {
        self.order.clear();
        self.roots.clear();
        for root in roots {
            self.insert(root);
        }
    }

    /// The roots in insertion order.
    pub fn as_slice(&self) -> Vec<Root> {
        self.order
            .iter()
            .filter_map(|uri| self.roots.get(uri).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(uri: &str, name: Option<&str>) -> Root {
        Root {
            uri: uri.to_string(),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn dedupes_by_uri_and_preserves_order() {
        let mut set = RootSet::new();
        set.insert(root("file:///a", Some("A")));
        set.insert(root("file:///b", Some("B")));
        set.insert(root("file:///a", Some("A again")));

        let roots = set.as_slice();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].uri, "file:///a");
        assert_eq!(roots[0].name.as_deref(), Some("A"));
        assert_eq!(roots[1].uri, "file:///b");
    }

    #[test]
    fn replace_all_resets_the_set() {
        let mut set = RootSet::new();
        set.insert(root("file:///a", None));
        set.replace_all(vec![root("file:///b", Some("B"))]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].uri, "file:///b");
    }
}

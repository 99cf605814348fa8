//! # Coreference Unifier
//!
//! Union-find over ERE labels. Every registered label maps to the root of
//! its class; a merge repoints every member of the absorbed class, so a
//! lookup is a single map read and `get_unifier` is idempotent.
//!
//! The backing map is rank-free and pays an O(n) rescan per merge. Merges
//! happen once per cluster membership while the graph is built, never during
//! search.

use crate::graph::{Graph, GraphStore};
use crate::{NodeKind, Triple, predicates};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Union-find from ERE label to its class representative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unifier {
    /// label -> unifier label (always a root)
    unifier: BTreeMap<String, String>,
}

impl Unifier {
    /// Create an empty unifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a graph: every ERE is registered, and every cluster member
    /// is unified with its cluster's prototype.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let mut unifier = Self::new();
        for ere in graph.eres() {
            unifier.add(ere);
        }

        let prototypes: BTreeMap<&str, &str> = graph
            .labels()
            .filter(|label| graph.kind(label) == Some(NodeKind::SameAsCluster))
            .filter_map(|cluster| {
                let proto = graph.node(cluster)?.first_value(predicates::PROTOTYPE)?;
                Some((cluster, proto))
            })
            .collect();

        let mut merges = 0usize;
        for label in graph.labels() {
            if graph.kind(label) != Some(NodeKind::ClusterMembership) {
                continue;
            }
            let Some(node) = graph.node(label) else {
                continue;
            };
            for cluster in node.values(predicates::CLUSTER) {
                let Some(proto) = prototypes.get(cluster) else {
                    continue;
                };
                for member in node.values(predicates::CLUSTER_MEMBER) {
                    unifier.unify(member, proto);
                    merges = merges.saturating_add(1);
                }
            }
        }

        debug!(
            eres = unifier.len(),
            clusters = prototypes.len(),
            merges,
            "built coreference unifier"
        );
        unifier
    }

    /// Register `id` as its own unifier if unseen.
    pub fn add(&mut self, id: &str) {
        if !self.unifier.contains_key(id) {
            self.unifier.insert(id.to_string(), id.to_string());
        }
    }

    /// Merge the class of `id` into the class of `target`.
    ///
    /// Every label whose unifier was `id`'s root is repointed, not only `id`
    /// itself; merges may arrive in any order, including re-merging a label
    /// that was already absorbed elsewhere.
    pub fn unify(&mut self, id: &str, target: &str) {
        self.add(id);
        self.add(target);

        let absorbed = self.get_unifier(id).to_string();
        let root = self.get_unifier(target).to_string();
        if absorbed == root {
            return;
        }

        for value in self.unifier.values_mut() {
            if *value == absorbed {
                value.clone_from(&root);
            }
        }
    }

    /// Representative of `id`'s class; `id` itself if unregistered.
    #[must_use]
    pub fn get_unifier<'a>(&'a self, id: &'a str) -> &'a str {
        self.unifier.get(id).map_or(id, String::as_str)
    }

    /// True if `a` and `b` are in the same class.
    #[must_use]
    pub fn same_class(&self, a: &str, b: &str) -> bool {
        self.get_unifier(a) == self.get_unifier(b)
    }

    /// Fresh deterministic name for every class, keyed by class root.
    ///
    /// Roots are numbered in label order, so the same unifier always yields
    /// the same names.
    #[must_use]
    pub fn new_canonical_names(&self, prefix: &str) -> BTreeMap<String, String> {
        let roots: BTreeSet<&str> = self.unifier.values().map(String::as_str).collect();
        let width = roots.len().to_string().len().max(4);
        roots
            .into_iter()
            .enumerate()
            .map(|(i, root)| (root.to_string(), format!("{prefix}{i:0width$}")))
            .collect()
    }

    /// Prototype -> member set.
    #[must_use]
    pub fn clusters(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut clusters: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (id, root) in &self.unifier {
            clusters.entry(root.clone()).or_default().insert(id.clone());
        }
        clusters
    }

    /// Number of registered labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.unifier.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unifier.is_empty()
    }

    /// Registered labels in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.unifier.keys().map(String::as_str)
    }
}

// =============================================================================
// GRAPH COLLAPSE
// =============================================================================

/// How collapsed EREs are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseNaming<'a> {
    /// Keep the class root (the cluster prototype).
    Prototype,
    /// Use fresh canonical names with the given prefix.
    Canonical(&'a str),
}

/// Rebuild `graph` with every ERE reference replaced by its class
/// representative. Names, types and statements of merged mentions end up on
/// the representative; identical statements stay distinct nodes.
#[must_use]
pub fn collapse(graph: &Graph, unifier: &Unifier, naming: CollapseNaming<'_>) -> Graph {
    let canonical = match naming {
        CollapseNaming::Prototype => BTreeMap::new(),
        CollapseNaming::Canonical(prefix) => unifier.new_canonical_names(prefix),
    };
    let rename = |label: &str| -> String {
        if !graph.is_ere(label) {
            return label.to_string();
        }
        let root = unifier.get_unifier(label);
        canonical
            .get(root)
            .cloned()
            .unwrap_or_else(|| root.to_string())
    };

    let collapsed = Graph::from_triples(graph.triples().map(|t| Triple {
        subject: rename(&t.subject),
        object: rename(&t.object),
        predicate: t.predicate,
    }));

    debug!(
        before = graph.node_count(),
        after = collapsed.node_count(),
        "collapsed coreference clusters"
    );
    collapsed
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_idempotent(unifier: &Unifier) {
        for id in unifier.ids() {
            let once = unifier.get_unifier(id);
            assert_eq!(unifier.get_unifier(once), once, "not idempotent for {id}");
        }
    }

    #[test]
    fn add_is_idempotent() {
        let mut unifier = Unifier::new();
        unifier.add("a");
        unifier.unify("a", "b");
        unifier.add("a");
        assert_eq!(unifier.get_unifier("a"), "b");
    }

    #[test]
    fn unknown_id_is_its_own_unifier() {
        let unifier = Unifier::new();
        assert_eq!(unifier.get_unifier("ghost"), "ghost");
    }

    #[test]
    fn remerge_of_absorbed_id_moves_whole_class() {
        let mut unifier = Unifier::new();
        unifier.unify("a", "b");
        unifier.unify("b", "c");
        assert_eq!(unifier.get_unifier("a"), "c");

        // `a` is already absorbed; merging it again drags its class along.
        unifier.unify("a", "d");
        assert_eq!(unifier.get_unifier("a"), "d");
        assert_eq!(unifier.get_unifier("b"), "d");
        assert_eq!(unifier.get_unifier("c"), "d");
        assert_idempotent(&unifier);
    }

    #[test]
    fn clusters_invert_mapping() {
        let mut unifier = Unifier::new();
        unifier.add("solo");
        unifier.unify("m1", "p");
        unifier.unify("m2", "p");

        let clusters = unifier.clusters();
        assert_eq!(clusters.len(), 2);
        let members: Vec<_> = clusters
            .get("p")
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        assert_eq!(members, vec!["m1", "m2", "p"]);
    }

    #[test]
    fn canonical_names_are_deterministic_and_fresh() {
        let mut unifier = Unifier::new();
        unifier.unify("x", "p");
        unifier.add("q");
        let names = unifier.new_canonical_names("ere-");
        assert_eq!(names.get("p").map(String::as_str), Some("ere-0000"));
        assert_eq!(names.get("q").map(String::as_str), Some("ere-0001"));
        assert_eq!(names, unifier.new_canonical_names("ere-"));
    }

    fn clustered_graph() -> Graph {
        Graph::from_triples([
            Triple::new("E1", "type", "Entity"),
            Triple::new("E1", "hasName", "Alice"),
            Triple::new("E1b", "type", "Entity"),
            Triple::new("E1b", "hasName", "A. Smith"),
            Triple::new("C1", "type", "SameAsCluster"),
            Triple::new("C1", "prototype", "E1"),
            Triple::new("M1", "type", "ClusterMembership"),
            Triple::new("M1", "cluster", "C1"),
            Triple::new("M1", "clusterMember", "E1b"),
            Triple::new("V1", "type", "Event"),
            Triple::new("S1", "type", "Statement"),
            Triple::new("S1", "subject", "V1"),
            Triple::new("S1", "predicate", "Attacker"),
            Triple::new("S1", "object", "E1b"),
        ])
    }

    #[test]
    fn from_graph_unifies_members_with_prototype() {
        let graph = clustered_graph();
        let unifier = Unifier::from_graph(&graph);
        assert_eq!(unifier.get_unifier("E1b"), "E1");
        assert_eq!(unifier.get_unifier("V1"), "V1");
        assert!(unifier.same_class("E1", "E1b"));
    }

    #[test]
    fn collapse_rewrites_statements_onto_prototype() {
        let graph = clustered_graph();
        let unifier = Unifier::from_graph(&graph);
        let collapsed = collapse(&graph, &unifier, CollapseNaming::Prototype);

        assert!(!collapsed.contains("E1b"));
        let stmt = collapsed.statement("S1").map(|s| s.object);
        assert_eq!(stmt, Some("E1"));
        let names: Vec<_> = collapsed.names("E1").collect();
        assert_eq!(names, vec!["A. Smith", "Alice"]);
    }

    #[test]
    fn collapse_with_canonical_names_hides_original_labels() {
        let graph = clustered_graph();
        let unifier = Unifier::from_graph(&graph);
        let collapsed = collapse(&graph, &unifier, CollapseNaming::Canonical("ere-"));

        assert!(!collapsed.contains("E1"));
        assert!(!collapsed.contains("V1"));
        let subject = collapsed.statement("S1").map(|s| s.subject.to_string());
        assert_eq!(subject.as_deref(), Some("ere-0001"));
    }

    proptest! {
        #[test]
        fn unify_keeps_get_unifier_idempotent(
            merges in prop::collection::vec((0u8..12, 0u8..12), 0..40)
        ) {
            let mut unifier = Unifier::new();
            for (a, b) in &merges {
                unifier.unify(&format!("n{a}"), &format!("n{b}"));
            }
            for id in unifier.ids() {
                let once = unifier.get_unifier(id);
                prop_assert_eq!(unifier.get_unifier(once), once);
            }
            // every merged pair ends up in one class
            for (a, b) in &merges {
                let (na, nb) = (format!("n{a}"), format!("n{b}"));
                prop_assert!(unifier.same_class(&na, &nb));
            }
        }
    }
}

//! # Graph Model
//!
//! Triple store with forward and backward adjacency per node, plus a
//! statement view over reified triples.
//!
//! All data structures use `BTreeMap`/`BTreeSet` so that iteration order,
//! and therefore every downstream search result, is deterministic.
//!
//! The graph is an open-world partial view: unknown labels produce empty
//! results, never errors.

use crate::{Direction, NodeKind, Triple, label_matches, predicates};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// Read and ingest operations shared by every graph backend.
///
/// All lookups are pure; none of them allocate node records.
pub trait GraphStore {
    /// Add triples, creating node records on demand.
    fn ingest<I>(&mut self, triples: I)
    where
        I: IntoIterator<Item = Triple>;

    /// True if a node record exists for `label`.
    fn contains(&self, label: &str) -> bool;

    /// Kind of the node, `None` if unknown.
    fn kind(&self, label: &str) -> Option<NodeKind>;

    /// Every adjacent (predicate, other node, direction) triple.
    ///
    /// Only edges whose other end is itself a node are reported; literal
    /// objects are not neighbors. Each call restarts from the beginning.
    fn neighbors<'a>(&'a self, label: &'a str) -> impl Iterator<Item = Neighbor<'a>> + 'a;

    /// Nodes whose type label matches `type_label` exactly or by short form.
    fn typed_nodes<'a>(&'a self, type_label: &'a str) -> impl Iterator<Item = &'a str> + 'a;

    /// Confidence values attached to a node, empty if none.
    fn confidence(&self, label: &str) -> Vec<f64>;

    /// Total number of node records.
    fn node_count(&self) -> usize;

    /// Total number of distinct triples.
    fn triple_count(&self) -> usize;
}

// =============================================================================
// NEIGHBOR / STATEMENT VIEWS
// =============================================================================

/// One adjacent edge as seen from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Neighbor<'a> {
    pub predicate: &'a str,
    pub other: &'a str,
    pub direction: Direction,
}

/// Borrowed view of a reified statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementRef<'a> {
    pub label: &'a str,
    pub subject: &'a str,
    pub predicate: &'a str,
    pub object: &'a str,
}

impl<'a> StatementRef<'a> {
    /// True for typing statements (`predicate == "type"`).
    #[must_use]
    pub fn is_type_statement(&self) -> bool {
        label_matches(self.predicate, predicates::TYPE)
    }

    /// The value on the side opposite `known`.
    #[must_use]
    pub fn other_side(&self, known: Direction) -> &'a str {
        match known {
            Direction::Forward => self.object,
            Direction::Backward => self.subject,
        }
    }
}

// =============================================================================
// GRAPH NODE
// =============================================================================

/// Per-node record: predicate-keyed forward and backward adjacency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphNode {
    /// predicate -> objects (node labels or literals)
    outgoing: BTreeMap<String, BTreeSet<String>>,
    /// predicate -> subjects (always node labels)
    incoming: BTreeMap<String, BTreeSet<String>>,
}

impl GraphNode {
    /// Values of an outgoing predicate.
    pub fn values<'a>(&'a self, predicate: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.outgoing
            .get(predicate)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// First value of an outgoing predicate in label order.
    #[must_use]
    pub fn first_value(&self, predicate: &str) -> Option<&str> {
        self.outgoing
            .get(predicate)
            .and_then(|set| set.iter().next())
            .map(String::as_str)
    }

    /// Subjects pointing at this node through `predicate`.
    pub fn sources<'a>(&'a self, predicate: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.incoming
            .get(predicate)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The in-memory triple graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node storage: label -> record
    nodes: BTreeMap<String, GraphNode>,

    /// Backward edges whose object had no record yet: object -> predicate -> subjects.
    /// Drained into `incoming` when the object's record is created.
    dangling: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,

    /// Number of distinct triples stored.
    triple_count: usize,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a batch of triples.
    #[must_use]
    pub fn from_triples<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = Triple>,
    {
        let mut graph = Self::new();
        graph.ingest(triples);
        graph
    }

    /// Node record by label.
    #[must_use]
    pub fn node(&self, label: &str) -> Option<&GraphNode> {
        self.nodes.get(label)
    }

    /// All node labels in deterministic order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// All triples in deterministic order.
    pub fn triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.nodes.iter().flat_map(|(subject, node)| {
            node.outgoing.iter().flat_map(move |(predicate, objects)| {
                objects
                    .iter()
                    .map(move |object| Triple::new(subject.as_str(), predicate.as_str(), object.as_str()))
            })
        })
    }

    /// Entity, event and relation labels in deterministic order.
    pub fn eres(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .keys()
            .map(String::as_str)
            .filter(move |label| self.kind(label).is_some_and(NodeKind::is_ere))
    }

    /// True if the label is a known entity, event or relation.
    #[must_use]
    pub fn is_ere(&self, label: &str) -> bool {
        self.kind(label).is_some_and(NodeKind::is_ere)
    }

    /// Reified statement view, `None` if the label is not a statement.
    #[must_use]
    pub fn statement<'a>(&'a self, label: &str) -> Option<StatementRef<'a>> {
        let (key, node) = self.nodes.get_key_value(label)?;
        Some(StatementRef {
            label: key.as_str(),
            subject: node.first_value(predicates::SUBJECT)?,
            predicate: node.first_value(predicates::PREDICATE)?,
            object: node.first_value(predicates::OBJECT)?,
        })
    }

    /// Statements whose subject is `ere`.
    pub fn statements_with_subject<'a>(
        &'a self,
        ere: &str,
    ) -> impl Iterator<Item = StatementRef<'a>> + use<'a> {
        self.statements_by_role(ere, predicates::SUBJECT)
    }

    /// Statements whose object is `ere`.
    pub fn statements_with_object<'a>(
        &'a self,
        ere: &str,
    ) -> impl Iterator<Item = StatementRef<'a>> + use<'a> {
        self.statements_by_role(ere, predicates::OBJECT)
    }

    /// Statements anchored at `ere` on the given side: `Forward` means `ere`
    /// is the statement subject, `Backward` means it is the object.
    pub fn statements_from<'a>(
        &'a self,
        ere: &str,
        side: Direction,
    ) -> impl Iterator<Item = StatementRef<'a>> + use<'a> {
        let role = match side {
            Direction::Forward => predicates::SUBJECT,
            Direction::Backward => predicates::OBJECT,
        };
        self.statements_by_role(ere, role)
    }

    fn statements_by_role<'a>(
        &'a self,
        ere: &str,
        role: &'static str,
    ) -> impl Iterator<Item = StatementRef<'a>> + use<'a> {
        self.nodes
            .get(ere)
            .into_iter()
            .flat_map(move |node| node.sources(role))
            .filter_map(move |label| self.statement(label))
    }

    /// Labels of every statement adjacent to `ere`, sorted and deduplicated.
    #[must_use]
    pub fn adjacent_statements(&self, ere: &str) -> BTreeSet<&str> {
        self.statements_with_subject(ere)
            .chain(self.statements_with_object(ere))
            .map(|stmt| stmt.label)
            .collect()
    }

    /// Number of adjacent statements.
    #[must_use]
    pub fn degree(&self, ere: &str) -> usize {
        self.adjacent_statements(ere).len()
    }

    /// Typing statements whose subject is `ere`.
    pub fn type_statements<'a>(&'a self, ere: &str) -> impl Iterator<Item = StatementRef<'a>> + use<'a> {
        self.statements_with_subject(ere)
            .filter(StatementRef::is_type_statement)
    }

    /// Ontology types asserted for `ere` through typing statements.
    #[must_use]
    pub fn ere_types(&self, ere: &str) -> BTreeSet<&str> {
        self.type_statements(ere).map(|stmt| stmt.object).collect()
    }

    /// True if any typing statement gives `ere` a type matching one of `types`.
    #[must_use]
    pub fn has_ere_type(&self, ere: &str, types: &[String]) -> bool {
        self.type_statements(ere)
            .any(|stmt| types.iter().any(|t| label_matches(stmt.object, t)))
    }

    /// Display names of a node.
    pub fn names<'a>(&'a self, label: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.nodes
            .get(label)
            .into_iter()
            .flat_map(|node| node.values(predicates::NAME))
    }

    /// Highest confidence attached to the node, if any.
    #[must_use]
    pub fn max_confidence(&self, label: &str) -> Option<f64> {
        self.confidence(label).into_iter().reduce(f64::max)
    }

    /// Weight used to order statements: highest confidence, 1.0 if absent.
    #[must_use]
    pub fn statement_weight(&self, label: &str) -> f64 {
        self.max_confidence(label).unwrap_or(1.0)
    }

    fn node_entry(&mut self, label: &str) -> &mut GraphNode {
        if !self.nodes.contains_key(label) {
            let mut node = GraphNode::default();
            if let Some(pending) = self.dangling.remove(label) {
                node.incoming = pending;
            }
            self.nodes.insert(label.to_string(), node);
        }
        // Inserted above when missing.
        self.nodes.entry(label.to_string()).or_default()
    }

    fn insert_triple(&mut self, triple: Triple) {
        let Triple {
            subject,
            predicate,
            object,
        } = triple;

        let inserted = self
            .node_entry(&subject)
            .outgoing
            .entry(predicate.clone())
            .or_default()
            .insert(object.clone());
        if !inserted {
            return;
        }
        self.triple_count = self.triple_count.saturating_add(1);

        match self.nodes.get_mut(&object) {
            Some(target) => {
                target.incoming.entry(predicate).or_default().insert(subject);
            }
            None => {
                self.dangling
                    .entry(object)
                    .or_default()
                    .entry(predicate)
                    .or_default()
                    .insert(subject);
            }
        }
    }
}

impl GraphStore for Graph {
    fn ingest<I>(&mut self, triples: I)
    where
        I: IntoIterator<Item = Triple>,
    {
        for triple in triples {
            self.insert_triple(triple);
        }
    }

    fn contains(&self, label: &str) -> bool {
        self.nodes.contains_key(label)
    }

    fn kind(&self, label: &str) -> Option<NodeKind> {
        let node = self.nodes.get(label)?;
        let declared = node
            .values(predicates::TYPE)
            .map(NodeKind::from_type_label)
            .find(|kind| *kind != NodeKind::Other);
        if let Some(kind) = declared {
            return Some(kind);
        }
        let reified = [predicates::SUBJECT, predicates::PREDICATE, predicates::OBJECT]
            .iter()
            .all(|p| node.first_value(p).is_some());
        Some(if reified {
            NodeKind::Statement
        } else {
            NodeKind::Other
        })
    }

    fn neighbors<'a>(&'a self, label: &'a str) -> impl Iterator<Item = Neighbor<'a>> + 'a {
        let node = self.nodes.get(label);
        let forward = node.into_iter().flat_map(move |node| {
            node.outgoing.iter().flat_map(move |(predicate, objects)| {
                objects
                    .iter()
                    .filter(move |object| self.nodes.contains_key(object.as_str()))
                    .map(move |object| Neighbor {
                        predicate: predicate.as_str(),
                        other: object.as_str(),
                        direction: Direction::Forward,
                    })
            })
        });
        let backward = node.into_iter().flat_map(|node| {
            node.incoming.iter().flat_map(|(predicate, subjects)| {
                subjects.iter().map(move |subject| Neighbor {
                    predicate: predicate.as_str(),
                    other: subject.as_str(),
                    direction: Direction::Backward,
                })
            })
        });
        forward.chain(backward)
    }

    fn typed_nodes<'a>(&'a self, type_label: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.nodes
            .iter()
            .filter(move |(_, node)| {
                node.values(predicates::TYPE)
                    .any(|t| label_matches(t, type_label))
            })
            .map(|(label, _)| label.as_str())
    }

    fn confidence(&self, label: &str) -> Vec<f64> {
        let Some(node) = self.nodes.get(label) else {
            return Vec::new();
        };
        node.values(predicates::CONFIDENCE)
            .flat_map(|value| match self.nodes.get(value) {
                Some(conf_node) => conf_node
                    .values(predicates::CONFIDENCE_VALUE)
                    .filter_map(|v| v.parse::<f64>().ok())
                    .collect::<Vec<_>>(),
                None => value.parse::<f64>().ok().into_iter().collect(),
            })
            .collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn triple_count(&self) -> usize {
        self.triple_count
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the graph for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub triples: Vec<Triple>,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            triples: graph.triples().collect(),
        }
    }
}

impl From<SerializableGraph> for Graph {
    fn from(sg: SerializableGraph) -> Self {
        Graph::from_triples(sg.triples)
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # Ereweave Core
//!
//! Hypothesis search over entity/relation/event (ERE) graphs.
//!
//! The crate is organised leaf-first:
//!
//! - [`graph`]: triple ingestion, bidirectional adjacency, statement view
//! - [`unifier`]: coreference union-find and graph collapse
//! - [`traversal`]: breadth-first path exploration
//! - [`query`], [`temporal`]: facet templates and date windows
//! - [`hypothesis`], [`filter`], [`search`]: the search engine proper
//! - [`ranker`], [`response`]: ordering and the output collection
//! - [`formats`]: JSON graph documents and binary snapshots
//!
//! Everything here is synchronous and deterministic. The graph and unifier
//! are read-only once built; hypotheses are immutable values.

pub mod config;
pub mod error;
pub mod filter;
pub mod formats;
pub mod graph;
pub mod hypothesis;
pub mod query;
pub mod ranker;
pub mod response;
pub mod search;
pub mod temporal;
pub mod traversal;
pub mod unifier;

pub use config::SearchConfig;
pub use error::EngineError;
pub use filter::ConsistencyFilter;
pub use graph::{Graph, GraphStore, Neighbor, StatementRef};
pub use hypothesis::Hypothesis;
pub use query::{Constraint, Facet, QueryDocument, Term};
pub use ranker::Ranker;
pub use response::HypothesisCollection;
pub use search::{HypothesisSearch, OneClusterSeed, SeedState};
pub use traversal::{EdgeStep, PathTraversal};
pub use unifier::Unifier;

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// WELL-KNOWN PREDICATES
// =============================================================================

/// Predicate names the engine interprets structurally.
pub mod predicates {
    pub const TYPE: &str = "type";
    pub const SUBJECT: &str = "subject";
    pub const PREDICATE: &str = "predicate";
    pub const OBJECT: &str = "object";
    pub const NAME: &str = "hasName";
    pub const CONFIDENCE: &str = "confidence";
    pub const CONFIDENCE_VALUE: &str = "confidenceValue";
    pub const PROTOTYPE: &str = "prototype";
    pub const CLUSTER: &str = "cluster";
    pub const CLUSTER_MEMBER: &str = "clusterMember";
    pub const LDC_TIME: &str = "ldcTime";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DAY: &str = "day";
    pub const HOUR: &str = "hour";
    pub const MINUTE: &str = "minute";
}

/// Shorten a label to its final path segment (after the last `#` or `/`).
///
/// `"https://example.org/ontology#Conflict.Attack"` becomes `"Conflict.Attack"`.
#[must_use]
pub fn short_label(label: &str) -> &str {
    match label.rfind(['#', '/']) {
        Some(pos) => &label[pos + 1..],
        None => label,
    }
}

/// True if `label` names `wanted`, either exactly or by its short form.
/// An empty short form (label ending in `#` or `/`) only matches exactly.
#[must_use]
pub fn label_matches(label: &str, wanted: &str) -> bool {
    if label == wanted {
        return true;
    }
    let (short, short_wanted) = (short_label(label), short_label(wanted));
    !short.is_empty() && short == short_wanted
}

// =============================================================================
// NODE KIND
// =============================================================================

/// The kind of a graph vertex, derived from its `type` triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Entity,
    Event,
    Relation,
    Statement,
    SameAsCluster,
    ClusterMembership,
    /// Bookkeeping vertices (confidence, time, justification, literals).
    Other,
}

impl NodeKind {
    /// Classify a single type label. Unknown labels map to `Other`.
    #[must_use]
    pub fn from_type_label(label: &str) -> Self {
        match short_label(label) {
            "Entity" => Self::Entity,
            "Event" => Self::Event,
            "Relation" => Self::Relation,
            "Statement" => Self::Statement,
            "SameAsCluster" => Self::SameAsCluster,
            "ClusterMembership" => Self::ClusterMembership,
            _ => Self::Other,
        }
    }

    /// Entity, Event or Relation.
    #[must_use]
    pub fn is_ere(self) -> bool {
        matches!(self, Self::Entity | Self::Event | Self::Relation)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entity => "Entity",
            Self::Event => "Event",
            Self::Relation => "Relation",
            Self::Statement => "Statement",
            Self::SameAsCluster => "SameAsCluster",
            Self::ClusterMembership => "ClusterMembership",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

// =============================================================================
// TRIPLE
// =============================================================================

/// A raw (subject, predicate, object) triple as produced by ingestion.
///
/// The object is a plain string: it names a node if a node with that label
/// exists, otherwise it is a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    /// Create a new triple.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

// =============================================================================
// DIRECTION
// =============================================================================

/// Which way an edge is walked relative to the node it is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The node is the subject of the triple.
    Forward,
    /// The node is the object of the triple.
    Backward,
}

impl Direction {
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_label_strips_namespaces() {
        assert_eq!(short_label("http://x.org/ont#Conflict.Attack"), "Conflict.Attack");
        assert_eq!(short_label("http://x.org/ont/Event"), "Event");
        assert_eq!(short_label("Entity"), "Entity");
        assert_eq!(short_label("trailing#"), "");
    }

    #[test]
    fn label_matches_exact_and_short() {
        assert!(label_matches("ont#Conflict.Attack", "Conflict.Attack"));
        assert!(label_matches("Conflict.Attack", "ont#Conflict.Attack"));
        assert!(!label_matches("ont#Conflict.Attack", "Conflict.Demonstrate"));
    }

    #[test]
    fn empty_short_labels_do_not_match() {
        assert!(!label_matches("http://a.org/ont#", "http://b.org/other/"));
        assert!(!label_matches("ont#", ""));
        assert!(label_matches("http://a.org/ont#", "http://a.org/ont#"));
    }

    #[test]
    fn node_kind_from_type_label() {
        assert_eq!(NodeKind::from_type_label("aida#Event"), NodeKind::Event);
        assert_eq!(NodeKind::from_type_label("Statement"), NodeKind::Statement);
        assert_eq!(NodeKind::from_type_label("Conflict.Attack"), NodeKind::Other);
        assert!(NodeKind::Relation.is_ere());
        assert!(!NodeKind::Statement.is_ere());
    }
}

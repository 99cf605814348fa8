//! JSON graph documents.
//!
//! A document maps node labels to records, optionally wrapped in a
//! `theGraph` object. Each record flattens into triples on its label.

use crate::error::Result;
use crate::graph::{Graph, GraphStore};
use crate::temporal::TimeWindow;
use crate::{Triple, predicates};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Key wrapping the node map in interchange files.
pub const GRAPH_KEY: &str = "theGraph";

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    // Tried first: structs also deserialize from sequences.
    Many(Vec<T>),
    One(T),
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// One node of a graph document.
///
/// Scalar fields that may repeat (`type`, `name`, `confidence`, `ldcTime`)
/// accept a single value or a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "type", default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Adjacent statements as listed by the producer; recomputed on load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjacent: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub confidence: Vec<f64>,

    #[serde(rename = "ldcTime", default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub ldc_time: Vec<TimeWindow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    #[serde(rename = "clusterMember", default, skip_serializing_if = "Option::is_none")]
    pub cluster_member: Option<String>,
}

impl NodeRecord {
    /// Triples for this record on `label`.
    #[must_use]
    pub fn to_triples(&self, label: &str) -> Vec<Triple> {
        let mut triples: Vec<Triple> = self
            .types
            .iter()
            .map(|t| Triple::new(label, predicates::TYPE, t.as_str()))
            .collect();

        let single = [
            (predicates::SUBJECT, &self.subject),
            (predicates::PREDICATE, &self.predicate),
            (predicates::OBJECT, &self.object),
            (predicates::PROTOTYPE, &self.prototype),
            (predicates::CLUSTER, &self.cluster),
            (predicates::CLUSTER_MEMBER, &self.cluster_member),
        ];
        for (predicate, value) in single {
            if let Some(value) = value {
                triples.push(Triple::new(label, predicate, value.as_str()));
            }
        }

        triples.extend(
            self.name
                .iter()
                .map(|n| Triple::new(label, predicates::NAME, n.as_str())),
        );
        triples.extend(
            self.confidence
                .iter()
                .map(|c| Triple::new(label, predicates::CONFIDENCE, c.to_string())),
        );
        for (index, window) in self.ldc_time.iter().enumerate() {
            if !window.is_unbounded() {
                triples.extend(window.to_triples(label, index));
            }
        }
        triples
    }
}

/// A whole graph document: label -> record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(rename = "theGraph")]
    pub nodes: BTreeMap<String, NodeRecord>,
}

impl GraphDocument {
    /// Parse a document, wrapped in `theGraph` or bare.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        let nodes = if let Some(inner) = value.get_mut(GRAPH_KEY).map(serde_json::Value::take) {
            inner
        } else {
            value
        };
        Ok(Self {
            nodes: serde_json::from_value(nodes)?,
        })
    }

    /// Pretty-printed JSON, always wrapped in `theGraph`.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Flatten every record into triples, in label order.
    #[must_use]
    pub fn to_triples(&self) -> Vec<Triple> {
        self.nodes
            .iter()
            .flat_map(|(label, record)| record.to_triples(label))
            .collect()
    }

    /// Build the indexed graph.
    #[must_use]
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        graph.ingest(self.to_triples());
        debug!(
            records = self.nodes.len(),
            nodes = graph.node_count(),
            triples = graph.triple_count(),
            "graph document loaded"
        );
        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================

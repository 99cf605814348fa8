//! # Response Module
//!
//! The hypothesis collection handed to downstream consumers.
//!
//! Every support entry lists all of its statements, the subset that answers
//! a query constraint directly, and the constraints it could not satisfy.
//! `probs[i]` is entry i's weight normalised over the whole collection.

use crate::error::Result;
use crate::hypothesis::Hypothesis;
use crate::query::{Constraint, Facet};
use serde::{Deserialize, Serialize};

/// One hypothesis as emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportEntry {
    /// Every statement label, sorted.
    pub statements: Vec<String>,
    /// Statements that directly satisfy a query constraint.
    #[serde(rename = "queryStatements")]
    pub query_statements: Vec<String>,
    /// Constraints left unsatisfied.
    #[serde(rename = "failedQueries", default)]
    pub failed_queries: Vec<Constraint>,
}

impl SupportEntry {
    /// Build the entry for a hypothesis found for `facet`.
    #[must_use]
    pub fn new(hypothesis: &Hypothesis, facet: &Facet) -> Self {
        Self {
            statements: hypothesis
                .statements()
                .into_iter()
                .map(str::to_string)
                .collect(),
            query_statements: hypothesis.core_statements().map(str::to_string).collect(),
            failed_queries: hypothesis
                .failed()
                .iter()
                .filter_map(|&i| facet.query_constraints.get(i).cloned())
                .collect(),
        }
    }

    /// True if every constraint was satisfied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_queries.is_empty()
    }
}

/// Ranked hypotheses with their normalised probabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypothesisCollection {
    pub probs: Vec<f64>,
    pub support: Vec<SupportEntry>,
}

impl HypothesisCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ranked `(facet, hypothesis)` pairs, keeping their order.
    #[must_use]
    pub fn from_hypotheses<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a Facet, &'a Hypothesis)>,
    {
        let mut support = Vec::new();
        let mut lweights = Vec::new();
        for (facet, hypothesis) in entries {
            support.push(SupportEntry::new(hypothesis, facet));
            lweights.push(hypothesis.lweight());
        }
        Self {
            probs: softmax(&lweights),
            support,
        }
    }

    /// Number of hypotheses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.support.len()
    }

    /// True if no hypothesis was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }

    /// Parse a collection previously written with [`Self::to_json_pretty`].
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Normalise log-weights into probabilities.
#[must_use]
pub fn softmax(lweights: &[f64]) -> Vec<f64> {
    let Some(max) = lweights.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };
    let exps: Vec<f64> = lweights.iter().map(|w| (w - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

// =============================================================================
// TESTS
// =============================================================================

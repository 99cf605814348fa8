//! # Hypothesis
//!
//! A candidate answer to one facet: statements (core and supporting),
//! variable bindings, constraint bookkeeping and an accumulated log-weight.
//!
//! Hypotheses are values. Every `with_*` method returns a new hypothesis and
//! leaves the receiver untouched, so search branches never alias.

use crate::graph::Graph;
use std::collections::{BTreeMap, BTreeSet};

/// A (partial or finished) hypothesis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hypothesis {
    /// Statements that directly satisfy a query constraint.
    core: BTreeSet<String>,
    /// Supporting statements, e.g. types of bound EREs.
    other: BTreeSet<String>,
    /// Query variable -> ERE label.
    bindings: BTreeMap<String, String>,
    /// Indices of constraints satisfied.
    filled: BTreeSet<usize>,
    /// Indices of constraints that could not be satisfied.
    failed: BTreeSet<usize>,
    /// Sum of penalties; 0.0 for a hypothesis that needed no relaxation.
    lweight: f64,
}

impl Hypothesis {
    /// Create an empty hypothesis.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Core statements in label order.
    pub fn core_statements(&self) -> impl Iterator<Item = &str> {
        self.core.iter().map(String::as_str)
    }

    /// Supporting statements in label order.
    pub fn other_statements(&self) -> impl Iterator<Item = &str> {
        self.other.iter().map(String::as_str)
    }

    /// Every statement, core and supporting, in label order.
    #[must_use]
    pub fn statements(&self) -> BTreeSet<&str> {
        self.core
            .iter()
            .chain(self.other.iter())
            .map(String::as_str)
            .collect()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.len() + self.other.len()
    }

    /// True if the hypothesis holds no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.other.is_empty()
    }

    /// True if `stmt` is in the hypothesis.
    #[must_use]
    pub fn contains(&self, stmt: &str) -> bool {
        self.core.contains(stmt) || self.other.contains(stmt)
    }

    /// True if `stmt` is a core statement.
    #[must_use]
    pub fn is_core(&self, stmt: &str) -> bool {
        self.core.contains(stmt)
    }

    /// Variable bindings.
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    /// Filler bound to `variable`.
    #[must_use]
    pub fn filler(&self, variable: &str) -> Option<&str> {
        self.bindings.get(variable).map(String::as_str)
    }

    /// Indices of satisfied constraints.
    #[must_use]
    pub fn filled(&self) -> &BTreeSet<usize> {
        &self.filled
    }

    /// Indices of failed constraints.
    #[must_use]
    pub fn failed(&self) -> &BTreeSet<usize> {
        &self.failed
    }

    /// Accumulated log-weight.
    #[must_use]
    pub fn lweight(&self) -> f64 {
        self.lweight
    }

    /// EREs touched by the hypothesis: statement subjects/objects that are
    /// EREs, plus every bound filler.
    #[must_use]
    pub fn eres<'a>(&'a self, graph: &'a Graph) -> BTreeSet<&'a str> {
        let mut eres: BTreeSet<&str> = self.bindings.values().map(String::as_str).collect();
        for label in self.core.iter().chain(self.other.iter()) {
            if let Some(stmt) = graph.statement(label) {
                for side in [stmt.subject, stmt.object] {
                    if graph.is_ere(side) {
                        eres.insert(side);
                    }
                }
            }
        }
        eres
    }

    // -------------------------------------------------------------------------
    // Extension (always returns a new hypothesis)
    // -------------------------------------------------------------------------

    /// Copy with `stmt` added. A core addition promotes an existing
    /// supporting statement; a supporting addition never demotes a core one.
    #[must_use]
    pub fn extend(&self, stmt: &str, core: bool) -> Self {
        let mut next = self.clone();
        if core {
            next.other.remove(stmt);
            next.core.insert(stmt.to_string());
        } else if !next.core.contains(stmt) {
            next.other.insert(stmt.to_string());
        }
        next
    }

    /// Copy with `variable` bound to `filler`.
    #[must_use]
    pub fn with_binding(&self, variable: &str, filler: &str) -> Self {
        let mut next = self.clone();
        next.bindings.insert(variable.to_string(), filler.to_string());
        next
    }

    /// Copy with constraint `index` recorded as satisfied.
    #[must_use]
    pub fn with_filled(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.failed.remove(&index);
        next.filled.insert(index);
        next
    }

    /// Copy with constraint `index` recorded as failed.
    #[must_use]
    pub fn with_failed(&self, index: usize) -> Self {
        let mut next = self.clone();
        if !next.filled.contains(&index) {
            next.failed.insert(index);
        }
        next
    }

    /// Copy with `delta` added to the log-weight.
    #[must_use]
    pub fn with_penalty(&self, delta: f64) -> Self {
        let mut next = self.clone();
        next.lweight += delta;
        next
    }

    /// Copy keeping bookkeeping but no statements; used by revalidation.
    #[must_use]
    pub fn without_statements(&self) -> Self {
        Self {
            core: BTreeSet::new(),
            other: BTreeSet::new(),
            ..self.clone()
        }
    }

    /// Union of two hypotheses built independently.
    ///
    /// Bindings of `self` win on conflict; a constraint either side filled
    /// counts as filled; weights add. The result may be inconsistent and
    /// should go through [`crate::ConsistencyFilter::revalidate`].
    #[must_use]
    pub fn merge(&self, other: &Hypothesis) -> Self {
        let mut next = self.clone();
        for stmt in &other.core {
            next.other.remove(stmt);
            next.core.insert(stmt.clone());
        }
        for stmt in &other.other {
            if !next.core.contains(stmt) {
                next.other.insert(stmt.clone());
            }
        }
        for (var, filler) in &other.bindings {
            next.bindings
                .entry(var.clone())
                .or_insert_with(|| filler.clone());
        }
        next.filled.extend(other.filled.iter().copied());
        next.failed.extend(other.failed.iter().copied());
        let filled = next.filled.clone();
        next.failed.retain(|i| !filled.contains(i));
        next.lweight += other.lweight;
        next
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # Query Templates
//!
//! A query document holds facets; a facet is an ordered list of triple
//! constraints over bound labels, literals and `?variables`, with optional
//! temporal windows per variable and optional entry-point candidates.

use crate::error::{EngineError, Result};
use crate::graph::{Graph, GraphStore};
use crate::temporal::TimeWindow;
use crate::unifier::Unifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// TERM
// =============================================================================

/// One side of a constraint after classification against the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    /// `?name`, filled by search.
    Variable(String),
    /// A label naming a graph node (or a facet entry ERE).
    Node(String),
    /// Any other string; matched by value, never bound.
    Literal(String),
}

impl Term {
    /// True for free variables.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }
}

/// True if the raw string is a `?variable`.
#[must_use]
pub fn is_variable(raw: &str) -> bool {
    raw.starts_with('?') && raw.len() > 1
}

// =============================================================================
// CONSTRAINT
// =============================================================================

/// A `[subject, predicate, object]` constraint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Constraint {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Constraint {
    /// Create a new constraint.
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

    /// Variables mentioned by this constraint.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        [self.subject.as_str(), self.object.as_str()]
            .into_iter()
            .filter(|s| is_variable(s))
    }
}

impl TryFrom<Vec<String>> for Constraint {
    type Error = String;

    fn try_from(parts: Vec<String>) -> std::result::Result<Self, Self::Error> {
        match <[String; 3]>::try_from(parts) {
            Ok([subject, predicate, object]) => Ok(Self {
                subject,
                predicate,
                object,
            }),
            Err(parts) => Err(format!(
                "constraint must have 3 parts, found {}",
                parts.len()
            )),
        }
    }
}

impl From<Constraint> for Vec<String> {
    fn from(c: Constraint) -> Self {
        vec![c.subject, c.predicate, c.object]
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.subject, self.predicate, self.object)
    }
}

// =============================================================================
// FACET
// =============================================================================

/// One self-contained constraint template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    /// Optional facet identifier for logging.
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Seed ERE labels; always treated as bound.
    #[serde(default)]
    pub ere: Vec<String>,

    /// Core constraints in fill order.
    #[serde(rename = "queryConstraints")]
    pub query_constraints: Vec<Constraint>,

    /// Variable -> temporal window.
    #[serde(default)]
    pub temporal: BTreeMap<String, TimeWindow>,

    /// Variable -> candidate EREs, one initial seed per combination.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entrypoints: BTreeMap<String, Vec<String>>,
}

impl Facet {
    /// Facet with the given constraints and nothing else.
    #[must_use]
    pub fn new(query_constraints: Vec<Constraint>) -> Self {
        Self {
            query_constraints,
            ..Self::default()
        }
    }

    /// Display name for logs.
    #[must_use]
    pub fn display_name(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("facet-{index}"))
    }

    /// Classify one raw constraint side.
    #[must_use]
    pub fn term(&self, graph: &Graph, raw: &str) -> Term {
        if is_variable(raw) {
            Term::Variable(raw.to_string())
        } else if graph.contains(raw) || self.ere.iter().any(|e| e == raw) {
            Term::Node(raw.to_string())
        } else {
            Term::Literal(raw.to_string())
        }
    }

    /// Temporal window for a variable, if any.
    #[must_use]
    pub fn window(&self, variable: &str) -> Option<&TimeWindow> {
        self.temporal.get(variable).filter(|w| !w.is_unbounded())
    }

    /// Rewrite every bound ERE label onto its coreference representative.
    ///
    /// `canonical` maps class roots to fresh names; pass an empty map to keep
    /// prototype labels.
    #[must_use]
    pub fn with_unifier(&self, unifier: &Unifier, canonical: &BTreeMap<String, String>) -> Self {
        let rename = |label: &str| -> String {
            if is_variable(label) {
                return label.to_string();
            }
            let root = unifier.get_unifier(label);
            canonical
                .get(root)
                .cloned()
                .unwrap_or_else(|| root.to_string())
        };
        Self {
            name: self.name.clone(),
            ere: self.ere.iter().map(|e| rename(e)).collect(),
            query_constraints: self
                .query_constraints
                .iter()
                .map(|c| Constraint::new(rename(&c.subject), c.predicate.clone(), rename(&c.object)))
                .collect(),
            temporal: self.temporal.clone(),
            entrypoints: self
                .entrypoints
                .iter()
                .map(|(var, eres)| (var.clone(), eres.iter().map(|e| rename(e)).collect()))
                .collect(),
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        for constraint in &self.query_constraints {
            if constraint.predicate.trim().is_empty() {
                return Err(EngineError::InvalidQuery(format!(
                    "{}: empty predicate in {constraint}",
                    self.display_name(index)
                )));
            }
            if constraint.subject.trim().is_empty() || constraint.object.trim().is_empty() {
                return Err(EngineError::InvalidQuery(format!(
                    "{}: empty term in {constraint}",
                    self.display_name(index)
                )));
            }
        }
        if let Some(var) = self.entrypoints.keys().find(|v| !is_variable(v)) {
            return Err(EngineError::InvalidQuery(format!(
                "{}: entry point {var} is not a ?variable",
                self.display_name(index)
            )));
        }
        Ok(())
    }
}

// =============================================================================
// QUERY DOCUMENT
// =============================================================================

/// The full information-need document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    pub facets: Vec<Facet>,
}

impl QueryDocument {
    /// Parse and validate a query document.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Structural checks: at least one facet, no empty terms.
    pub fn validate(&self) -> Result<()> {
        if self.facets.is_empty() {
            return Err(EngineError::InvalidQuery("query has no facets".into()));
        }
        for (index, facet) in self.facets.iter().enumerate() {
            facet.validate(index)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

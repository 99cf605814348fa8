//! # Hypothesis Search
//!
//! Fills a facet's constraint template against the graph by breadth-first
//! branching over immutable seeds.
//!
//! Each [`OneClusterSeed`] is either `Extending` or `Done`. One extension
//! step picks the first constraint with a bound side, collects matching
//! statements, escalates temporal leeway until something survives the
//! consistency filter, and returns one child per surviving candidate (or a
//! single child recording the constraint as unfillable).
//!
//! Search never fails. Constraints that cannot be matched end up in the
//! hypothesis' failed set and cost a fixed penalty.

use crate::config::SearchConfig;
use crate::filter::{ConsistencyFilter, role_matches};
use crate::graph::{Graph, StatementRef};
use crate::hypothesis::Hypothesis;
use crate::query::{Constraint, Facet, QueryDocument, Term};
use crate::temporal::{Leeway, ere_time_windows, window_matches};
use crate::{Direction, label_matches};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info, warn};

// =============================================================================
// SEED
// =============================================================================

/// Lifecycle of a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedState {
    /// Some constraint may still be fillable.
    Extending,
    /// No constraint is fillable; the hypothesis is final.
    Done,
}

/// One in-progress hypothesis plus the constraints it has not settled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OneClusterSeed {
    hypothesis: Hypothesis,
    unfilled: BTreeSet<usize>,
    state: SeedState,
}

/// How the unbound side of a selected constraint is handled.
#[derive(Clone, Copy)]
enum OtherSide<'a> {
    /// Must equal this bound label.
    Bound(&'a str),
    /// Must match this literal.
    Literal(&'a str),
    /// Free variable to bind.
    Variable(&'a str),
}

impl OneClusterSeed {
    /// Seed with no statements, every constraint unfilled.
    #[must_use]
    pub fn new(constraint_count: usize) -> Self {
        Self::from_hypothesis(Hypothesis::new(), constraint_count)
    }

    /// Seed starting from an existing (e.g. entry-point bound) hypothesis.
    #[must_use]
    pub fn from_hypothesis(hypothesis: Hypothesis, constraint_count: usize) -> Self {
        Self {
            hypothesis,
            unfilled: (0..constraint_count).collect(),
            state: SeedState::Extending,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SeedState {
        self.state
    }

    /// True once no constraint is fillable.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == SeedState::Done
    }

    /// The hypothesis built so far.
    #[must_use]
    pub fn hypothesis(&self) -> &Hypothesis {
        &self.hypothesis
    }

    /// Consume the seed, returning its hypothesis.
    #[must_use]
    pub fn into_hypothesis(self) -> Hypothesis {
        self.hypothesis
    }

    /// Constraints neither filled nor failed yet.
    #[must_use]
    pub fn unfilled(&self) -> &BTreeSet<usize> {
        &self.unfilled
    }

    /// Value a term currently stands for, if bound.
    fn bound_value<'a>(&'a self, term: &'a Term) -> Option<&'a str> {
        match term {
            Term::Node(label) => Some(label.as_str()),
            Term::Variable(var) => self.hypothesis.filler(var),
            Term::Literal(_) => None,
        }
    }

    /// First unfilled constraint with a bound side.
    fn next_constraint(&self, graph: &Graph, facet: &Facet) -> Option<(usize, Term, Term)> {
        self.unfilled.iter().find_map(|&index| {
            let constraint = facet.query_constraints.get(index)?;
            let subject = facet.term(graph, &constraint.subject);
            let object = facet.term(graph, &constraint.object);
            let fillable =
                self.bound_value(&subject).is_some() || self.bound_value(&object).is_some();
            fillable.then_some((index, subject, object))
        })
    }

    /// One extension step.
    ///
    /// Returns the children of this seed: one per surviving candidate
    /// statement, a single child with the constraint marked unfillable, or
    /// the finalized seed itself once nothing is fillable. The receiver is
    /// never modified.
    #[must_use]
    pub fn extend(&self, search: &HypothesisSearch<'_>, facet: &Facet) -> Vec<OneClusterSeed> {
        if self.is_done() {
            return vec![self.clone()];
        }
        let graph = search.graph;
        let Some((index, subject, object)) = self.next_constraint(graph, facet) else {
            return vec![self.finish(search)];
        };
        let Some(constraint) = facet.query_constraints.get(index) else {
            return vec![self.finish(search)];
        };

        let (known, side, other_term) = match self.bound_value(&subject) {
            Some(value) => (value, Direction::Forward, &object),
            None => match self.bound_value(&object) {
                Some(value) => (value, Direction::Backward, &subject),
                None => return vec![self.finish(search)],
            },
        };
        let other = match other_term {
            Term::Variable(var) => match self.hypothesis.filler(var) {
                Some(filler) => OtherSide::Bound(filler),
                None => OtherSide::Variable(var.as_str()),
            },
            Term::Node(label) => OtherSide::Bound(label.as_str()),
            Term::Literal(value) => OtherSide::Literal(value.as_str()),
        };

        let mut candidates: Vec<StatementRef<'_>> = graph
            .statements_from(known, side)
            .filter(|stmt| role_matches(stmt.predicate, &constraint.predicate))
            .filter(|stmt| match other {
                OtherSide::Bound(value) => stmt.other_side(side) == value,
                OtherSide::Literal(value) => label_matches(stmt.other_side(side), value),
                OtherSide::Variable(_) => true,
            })
            .collect();
        candidates.sort_by(|a, b| {
            graph
                .statement_weight(b.label)
                .total_cmp(&graph.statement_weight(a.label))
                .then_with(|| a.label.cmp(b.label))
        });

        debug!(
            constraint = %constraint,
            known,
            candidates = candidates.len(),
            "extending seed"
        );

        let children = match other {
            OtherSide::Variable(var) => {
                self.branch_on_variable(search, facet, index, var, side, &candidates)
            }
            OtherSide::Bound(_) | OtherSide::Literal(_) => {
                self.fill_without_binding(search, index, &candidates)
            }
        };
        if children.is_empty() {
            vec![self.unfillable(search.config(), index, constraint)]
        } else {
            children
        }
    }

    /// Free-variable case: one child per candidate that survives temporal
    /// matching at the lowest possible leeway and the consistency filter.
    fn branch_on_variable(
        &self,
        search: &HypothesisSearch<'_>,
        facet: &Facet,
        index: usize,
        var: &str,
        side: Direction,
        candidates: &[StatementRef<'_>],
    ) -> Vec<OneClusterSeed> {
        let graph = search.graph;
        let window = facet.window(var);
        let levels: &[Leeway] = if window.is_some() {
            &Leeway::ALL
        } else {
            &[Leeway::Exact]
        };

        for &leeway in levels {
            let survivors: Vec<&StatementRef<'_>> = candidates
                .iter()
                .filter(|stmt| {
                    window.is_none_or(|w| {
                        let filler = stmt.other_side(side);
                        window_matches(w, &ere_time_windows(graph, filler), leeway)
                    })
                })
                .filter(|stmt| search.filter.validate(graph, &self.hypothesis, stmt.label))
                .collect();
            if survivors.is_empty() {
                continue;
            }

            let penalty = f64::from(leeway.steps()) * search.config.relaxation_penalty;
            if leeway != Leeway::Exact {
                debug!(variable = var, ?leeway, penalty, "temporal constraint relaxed");
            }
            return survivors
                .into_iter()
                .map(|stmt| {
                    let filler = stmt.other_side(side);
                    let hypothesis = self
                        .hypothesis
                        .extend(stmt.label, true)
                        .with_binding(var, filler)
                        .with_filled(index)
                        .with_penalty(penalty);
                    self.child(hypothesis, index)
                })
                .collect();
        }
        Vec::new()
    }

    /// Bound or literal case: every accepted candidate joins one child;
    /// no variable is bound.
    fn fill_without_binding(
        &self,
        search: &HypothesisSearch<'_>,
        index: usize,
        candidates: &[StatementRef<'_>],
    ) -> Vec<OneClusterSeed> {
        let mut hypothesis = self.hypothesis.clone();
        let mut admitted = 0usize;
        for stmt in candidates {
            if search.filter.validate(search.graph, &hypothesis, stmt.label) {
                hypothesis = hypothesis.extend(stmt.label, true);
                admitted += 1;
            }
        }
        if admitted == 0 {
            return Vec::new();
        }
        vec![self.child(hypothesis.with_filled(index), index)]
    }

    fn child(&self, hypothesis: Hypothesis, settled: usize) -> Self {
        let mut unfilled = self.unfilled.clone();
        unfilled.remove(&settled);
        Self {
            hypothesis,
            unfilled,
            state: SeedState::Extending,
        }
    }

    fn unfillable(&self, config: &SearchConfig, index: usize, constraint: &Constraint) -> Self {
        debug!(constraint = %constraint, "constraint unfillable");
        let hypothesis = self
            .hypothesis
            .with_failed(index)
            .with_penalty(config.failed_constraint_penalty);
        self.child(hypothesis, index)
    }

    /// Close the seed: every constraint still unfilled is recorded as failed,
    /// then the type statements of the EREs its core statements touch join as
    /// supporting statements.
    fn finish(&self, search: &HypothesisSearch<'_>) -> Self {
        let mut hypothesis = self.hypothesis.clone();
        for &index in &self.unfilled {
            hypothesis = hypothesis
                .with_failed(index)
                .with_penalty(search.config.failed_constraint_penalty);
        }
        let hypothesis = search.complete_types(hypothesis);
        Self {
            hypothesis,
            unfilled: BTreeSet::new(),
            state: SeedState::Done,
        }
    }
}

// =============================================================================
// SEARCH ENGINE
// =============================================================================

/// Runs facets against a read-only graph.
#[derive(Debug)]
pub struct HypothesisSearch<'g> {
    graph: &'g Graph,
    config: SearchConfig,
    filter: ConsistencyFilter,
}

impl<'g> HypothesisSearch<'g> {
    /// Engine with the standard consistency rules.
    #[must_use]
    pub fn new(graph: &'g Graph, config: SearchConfig) -> Self {
        let filter = ConsistencyFilter::standard(&config);
        Self {
            graph,
            config,
            filter,
        }
    }

    /// Replace the consistency filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ConsistencyFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The graph being searched.
    #[must_use]
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Active consistency filter.
    #[must_use]
    pub fn filter(&self) -> &ConsistencyFilter {
        &self.filter
    }

    /// Add the type statements of every ERE endpoint of a core statement,
    /// highest confidence first, each through the filter. Called only once
    /// every core constraint is settled.
    fn complete_types(&self, hypothesis: Hypothesis) -> Hypothesis {
        let graph = self.graph;
        let mut eres: BTreeSet<&str> = BTreeSet::new();
        for label in hypothesis.core_statements() {
            if let Some(stmt) = graph.statement(label) {
                eres.extend([stmt.subject, stmt.object].into_iter().filter(|n| graph.is_ere(n)));
            }
        }
        let mut types: Vec<StatementRef<'_>> = eres
            .into_iter()
            .flat_map(|ere| graph.type_statements(ere))
            .collect();
        types.sort_by(|a, b| {
            graph
                .statement_weight(b.label)
                .total_cmp(&graph.statement_weight(a.label))
                .then_with(|| a.label.cmp(b.label))
        });

        let mut next = hypothesis;
        for type_stmt in types {
            if self.filter.validate(graph, &next, type_stmt.label) {
                next = next.extend(type_stmt.label, false);
            }
        }
        next
    }

    /// Initial seeds: one per combination of entry-point fillers, capped at
    /// `max_seeds`; a single empty seed if the facet names none.
    #[must_use]
    pub fn initial_seeds(&self, facet: &Facet) -> Vec<OneClusterSeed> {
        let count = facet.query_constraints.len();
        let mut partial = vec![Hypothesis::new()];
        for (var, fillers) in &facet.entrypoints {
            if fillers.is_empty() {
                continue;
            }
            let mut next = Vec::new();
            'outer: for base in &partial {
                for filler in fillers {
                    if next.len() >= self.config.max_seeds {
                        break 'outer;
                    }
                    next.push(base.with_binding(var, filler));
                }
            }
            partial = next;
        }
        partial
            .into_iter()
            .map(|h| OneClusterSeed::from_hypothesis(h, count))
            .collect()
    }

    /// Search one facet. Hypotheses come back in discovery order; duplicates
    /// and hypotheses without any statement are dropped.
    #[must_use]
    pub fn run_facet(&self, facet: &Facet) -> Vec<Hypothesis> {
        let mut frontier: VecDeque<OneClusterSeed> = self.initial_seeds(facet).into();
        let mut finished = Vec::new();
        let mut seen: BTreeSet<(Vec<String>, Vec<(String, String)>)> = BTreeSet::new();
        let mut dropped = 0usize;
        let mut steps = 0usize;

        while let Some(seed) = frontier.pop_front() {
            if finished.len() >= self.config.max_hypotheses {
                break;
            }
            if seed.is_done() {
                let hypothesis = seed.into_hypothesis();
                if hypothesis.is_empty() {
                    continue;
                }
                let key = (
                    hypothesis.statements().into_iter().map(str::to_string).collect(),
                    hypothesis
                        .bindings()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                );
                if seen.insert(key) {
                    finished.push(hypothesis);
                }
                continue;
            }

            steps += 1;
            for child in seed.extend(self, facet) {
                if frontier.len() >= self.config.max_frontier {
                    dropped += 1;
                    continue;
                }
                frontier.push_back(child);
            }
        }

        if dropped > 0 {
            warn!(dropped, max_frontier = self.config.max_frontier, "search frontier truncated");
        }
        info!(
            constraints = facet.query_constraints.len(),
            steps,
            hypotheses = finished.len(),
            "facet search finished"
        );
        finished
    }

    /// Search every facet of a query document, in order.
    #[must_use]
    pub fn run_query(&self, query: &QueryDocument) -> Vec<Vec<Hypothesis>> {
        query
            .facets
            .iter()
            .enumerate()
            .map(|(i, facet)| {
                debug!(facet = %facet.display_name(i), "searching facet");
                self.run_facet(facet)
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Triple;

    fn stmt(t: &mut Vec<Triple>, label: &str, s: &str, p: &str, o: &str) {
        t.push(Triple::new(label, "type", "Statement"));
        t.push(Triple::new(label, "subject", s));
        t.push(Triple::new(label, "predicate", p));
        t.push(Triple::new(label, "object", o));
    }

    fn graph() -> Graph {
        let mut t = Vec::new();
        for (ere, kind) in [("E1", "Entity"), ("E2", "Entity"), ("E3", "Entity"), ("V1", "Event")] {
            t.push(Triple::new(ere, "type", kind));
        }
        stmt(&mut t, "T1", "V1", "type", "Conflict.Attack");
        stmt(&mut t, "S1", "V1", "Attacker", "E1");
        stmt(&mut t, "S2", "V1", "Instrument", "E2");
        stmt(&mut t, "S3", "V1", "Instrument", "E3");
        Graph::from_triples(t)
    }

    #[test]
    fn seed_without_bound_side_finishes_with_all_failed() {
        let g = graph();
        let search = HypothesisSearch::new(&g, SearchConfig::default());
        let facet = Facet::new(vec![Constraint::new("?X", "Attacker", "?Y")]);

        let children = OneClusterSeed::new(1).extend(&search, &facet);
        assert_eq!(children.len(), 1);
        assert!(children[0].is_done());
        assert!(children[0].hypothesis().failed().contains(&0));
    }

    #[test]
    fn extend_branches_per_candidate_and_keeps_parent() {
        let g = graph();
        let search = HypothesisSearch::new(&g, SearchConfig::default());
        let facet = Facet::new(vec![Constraint::new("V1", "Instrument", "?Y")]);

        let parent = OneClusterSeed::new(1);
        let snapshot = parent.clone();
        let children = parent.extend(&search, &facet);

        assert_eq!(parent, snapshot);
        let fillers: Vec<_> = children
            .iter()
            .filter_map(|c| c.hypothesis().filler("?Y"))
            .collect();
        assert_eq!(fillers, vec!["E2", "E3"]);
        for child in &children {
            assert!(child.unfilled().is_empty());
            assert!(!child.hypothesis().contains("T1"));

            let finished = child.extend(&search, &facet);
            assert_eq!(finished.len(), 1);
            assert!(finished[0].is_done());
            assert!(finished[0].hypothesis().contains("T1"));
            assert!(!finished[0].hypothesis().is_core("T1"));
        }
    }

    #[test]
    fn core_type_constraint_wins_over_supporting_type() {
        let mut t = Vec::new();
        t.push(Triple::new("E1", "type", "Entity"));
        t.push(Triple::new("V1", "type", "Event"));
        stmt(&mut t, "T1", "V1", "type", "Conflict.Attack");
        stmt(&mut t, "T2", "V1", "type", "Conflict.Demonstrate");
        stmt(&mut t, "S1", "V1", "Attacker", "E1");
        t.push(Triple::new("T1", "confidence", "0.9"));
        t.push(Triple::new("T2", "confidence", "0.4"));
        let g = Graph::from_triples(t);

        let search = HypothesisSearch::new(&g, SearchConfig::default());
        let facet = Facet::new(vec![
            Constraint::new("?X", "Attacker", "E1"),
            Constraint::new("?X", "type", "Conflict.Demonstrate"),
        ]);

        let hypotheses = search.run_facet(&facet);
        assert_eq!(hypotheses.len(), 1);
        let h = &hypotheses[0];
        assert!(h.is_core("S1"));
        assert!(h.is_core("T2"));
        assert!(!h.contains("T1"));
        assert!(h.failed().is_empty());
        assert!(h.lweight().abs() < f64::EPSILON);
    }

    #[test]
    fn literal_side_filters_without_binding() {
        let g = graph();
        let search = HypothesisSearch::new(&g, SearchConfig::default());
        let facet = Facet::new(vec![Constraint::new("V1", "type", "Conflict.Attack")]);

        let children = OneClusterSeed::new(1).extend(&search, &facet);
        assert_eq!(children.len(), 1);
        let h = children[0].hypothesis();
        assert!(h.is_core("T1"));
        assert!(h.bindings().is_empty());
        assert!(h.filled().contains(&0));
    }

    #[test]
    fn entrypoints_seed_bindings() {
        let g = graph();
        let search = HypothesisSearch::new(&g, SearchConfig::default());
        let mut facet = Facet::new(vec![Constraint::new("?X", "Instrument", "?Y")]);
        facet.entrypoints.insert("?X".into(), vec!["V1".into()]);

        let seeds = search.initial_seeds(&facet);
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].hypothesis().filler("?X"), Some("V1"));

        let hypotheses = search.run_facet(&facet);
        assert_eq!(hypotheses.len(), 2);
    }

    #[test]
    fn entrypoint_combinations_respect_max_seeds() {
        let g = graph();
        let config = SearchConfig {
            max_seeds: 3,
            ..SearchConfig::default()
        };
        let search = HypothesisSearch::new(&g, config);
        let mut facet = Facet::new(vec![]);
        facet.entrypoints.insert("?A".into(), vec!["E1".into(), "E2".into()]);
        facet.entrypoints.insert("?B".into(), vec!["E2".into(), "E3".into()]);
        assert_eq!(search.initial_seeds(&facet).len(), 3);
    }

    #[test]
    fn max_hypotheses_bounds_output() {
        let g = graph();
        let config = SearchConfig {
            max_hypotheses: 1,
            ..SearchConfig::default()
        };
        let search = HypothesisSearch::new(&g, config);
        let facet = Facet::new(vec![Constraint::new("V1", "Instrument", "?Y")]);
        assert_eq!(search.run_facet(&facet).len(), 1);
    }

    #[test]
    fn all_failed_facet_yields_no_hypotheses() {
        let g = graph();
        let search = HypothesisSearch::new(&g, SearchConfig::default());
        let facet = Facet::new(vec![Constraint::new("V1", "Target", "?Z")]);
        assert!(search.run_facet(&facet).is_empty());
    }
}

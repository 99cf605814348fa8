//! # Ranker
//!
//! Two-pass ordering of finished hypotheses.
//!
//! Pass 1 groups by accumulated weight (fewer relaxations and failures
//! first) and orders each group by connectedness. Pass 2 re-ranks the top K
//! greedily by novelty so near-duplicates that only swap an interchangeable
//! filler do not crowd the head of the list.

use crate::config::SearchConfig;
use crate::graph::Graph;
use crate::hypothesis::Hypothesis;
use std::collections::BTreeMap;
use tracing::debug;

/// Weight resolution used for grouping.
const WEIGHT_SCALE: f64 = 1000.0;

/// Hypothesis ranker over a read-only graph.
#[derive(Debug, Clone)]
pub struct Ranker<'g> {
    graph: &'g Graph,
    top_k: usize,
    novelty_bonus: f64,
}

impl<'g> Ranker<'g> {
    /// Ranker using `novelty_top_k` and `novelty_bonus` from the config.
    #[must_use]
    pub fn new(graph: &'g Graph, config: &SearchConfig) -> Self {
        Self {
            graph,
            top_k: config.novelty_top_k,
            novelty_bonus: config.novelty_bonus,
        }
    }

    /// Override the novelty window.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sum of adjacent-statement degree over every ERE in the hypothesis.
    #[must_use]
    pub fn connectedness(&self, hypothesis: &Hypothesis) -> usize {
        hypothesis
            .eres(self.graph)
            .into_iter()
            .map(|ere| self.graph.degree(ere))
            .sum()
    }

    /// Full ranking: connectedness pass, then novelty over the top K.
    #[must_use]
    pub fn rank(&self, hypotheses: Vec<Hypothesis>) -> Vec<Hypothesis> {
        let ranked = self.rank_by_connectedness(hypotheses);
        self.rerank_by_novelty(ranked)
    }

    /// Pass 1. Higher weight first; within equal weight, higher
    /// connectedness first; otherwise input order.
    #[must_use]
    pub fn rank_by_connectedness(&self, hypotheses: Vec<Hypothesis>) -> Vec<Hypothesis> {
        let mut keyed: Vec<(i64, usize, Hypothesis)> = hypotheses
            .into_iter()
            .map(|h| {
                let weight = (h.lweight() * WEIGHT_SCALE).round() as i64;
                (weight, self.connectedness(&h), h)
            })
            .collect();
        keyed.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        keyed.into_iter().map(|(_, _, h)| h).collect()
    }

    /// Pass 2. Greedy re-rank of the first K by binding novelty.
    ///
    /// A binding never selected before earns the novelty bonus; one already
    /// selected costs its prior use count. Ties keep the incoming order, and
    /// positions beyond K are left untouched.
    #[must_use]
    pub fn rerank_by_novelty(&self, mut hypotheses: Vec<Hypothesis>) -> Vec<Hypothesis> {
        let k = self.top_k.min(hypotheses.len());
        if k < 2 {
            return hypotheses;
        }
        let tail = hypotheses.split_off(k);
        let mut pool = hypotheses;
        let mut uses: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        let mut selected = Vec::with_capacity(k + tail.len());

        while !pool.is_empty() {
            let mut best = 0usize;
            let mut best_score = f64::NEG_INFINITY;
            for (i, h) in pool.iter().enumerate() {
                let score = self.novelty(h, &uses);
                if score > best_score {
                    best = i;
                    best_score = score;
                }
            }
            let chosen = pool.remove(best);
            for (var, filler) in chosen.bindings() {
                *uses
                    .entry(var.clone())
                    .or_default()
                    .entry(filler.clone())
                    .or_default() += 1;
            }
            selected.push(chosen);
        }

        debug!(top_k = k, "novelty re-rank applied");
        selected.extend(tail);
        selected
    }

    fn novelty(&self, hypothesis: &Hypothesis, uses: &BTreeMap<String, BTreeMap<String, usize>>) -> f64 {
        hypothesis
            .bindings()
            .iter()
            .map(|(var, filler)| {
                match uses.get(var).and_then(|fillers| fillers.get(filler)) {
                    Some(&count) if count > 0 => -(count as f64),
                    _ => self.novelty_bonus,
                }
            })
            .sum()
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
        for ere in ["E1", "E2", "E3", "E4"] {
            t.push(Triple::new(ere, "type", "Entity"));
        }
        t.push(Triple::new("V1", "type", "Event"));
        stmt(&mut t, "S1", "V1", "Attacker", "E1");
        stmt(&mut t, "S2", "V1", "Target", "E2");
        stmt(&mut t, "S3", "E2", "member", "E3");
        stmt(&mut t, "S4", "E2", "member", "E4");
        Graph::from_triples(t)
    }

    #[test]
    fn connectedness_sums_ere_degrees() {
        let g = graph();
        let ranker = Ranker::new(&g, &SearchConfig::default());
        let h = Hypothesis::new().extend("S2", true);
        // V1: S1, S2; E2: S2, S3, S4
        assert_eq!(ranker.connectedness(&h), 5);
    }

    #[test]
    fn weight_dominates_connectedness() {
        let g = graph();
        let ranker = Ranker::new(&g, &SearchConfig::default());
        let dense_but_relaxed = Hypothesis::new().extend("S2", true).with_penalty(-1.0);
        let sparse_exact = Hypothesis::new().extend("S1", true);

        let ranked = ranker.rank_by_connectedness(vec![dense_but_relaxed, sparse_exact.clone()]);
        assert_eq!(ranked[0], sparse_exact);
    }

    #[test]
    fn equal_weight_orders_by_connectedness() {
        let g = graph();
        let ranker = Ranker::new(&g, &SearchConfig::default());
        let sparse = Hypothesis::new().extend("S1", true);
        let dense = Hypothesis::new().extend("S2", true);

        let ranked = ranker.rank_by_connectedness(vec![sparse, dense.clone()]);
        assert_eq!(ranked[0], dense);
    }

    #[test]
    fn novelty_promotes_distinct_fillers() {
        let g = graph();
        let ranker = Ranker::new(&g, &SearchConfig::default());
        let a = Hypothesis::new().with_binding("?X", "E1").with_binding("?Y", "E3");
        let b = Hypothesis::new().with_binding("?X", "E1").with_binding("?Y", "E4");
        let c = Hypothesis::new().with_binding("?X", "E2").with_binding("?Y", "E3");
        let d = Hypothesis::new().with_binding("?X", "E2").with_binding("?Y", "E4");

        let ranked = ranker.rerank_by_novelty(vec![a.clone(), b, c, d.clone()]);
        assert_eq!(ranked[0], a);
        assert_eq!(ranked[1], d);
    }

    #[test]
    fn positions_beyond_top_k_keep_order() {
        let g = graph();
        let ranker = Ranker::new(&g, &SearchConfig::default()).with_top_k(2);
        let hs: Vec<_> = ["E1", "E1", "E2", "E3"]
            .iter()
            .map(|f| Hypothesis::new().with_binding("?X", f))
            .collect();

        let ranked = ranker.rerank_by_novelty(hs.clone());
        assert_eq!(ranked[2..], hs[2..]);
    }

    #[test]
    fn ties_keep_incoming_order() {
        let g = graph();
        let ranker = Ranker::new(&g, &SearchConfig::default());
        let hs: Vec<_> = ["E1", "E2", "E3"]
            .iter()
            .map(|f| Hypothesis::new().with_binding("?X", f))
            .collect();
        assert_eq!(ranker.rerank_by_novelty(hs.clone()), hs);
    }
}

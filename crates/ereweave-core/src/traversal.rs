//! # Path Traversal
//!
//! Breadth-first exploration that yields every reachable node together
//! with the edge path taken to reach it.
//!
//! Termination: each directed edge visit `(from, role, direction, to)` is
//! recorded together with its mirror image, so no edge is ever walked twice
//! in either direction. The queue therefore holds at most one entry per edge,
//! and cyclic graphs terminate.

use crate::graph::{Graph, GraphStore};
use crate::{Direction, SearchConfig};
use std::collections::{BTreeSet, VecDeque};

/// One step of a path: the edge walked and the node it led to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeStep {
    pub from: String,
    pub role: String,
    pub direction: Direction,
    pub to: String,
}

impl EdgeStep {
    /// The same edge walked the other way.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            from: self.to.clone(),
            role: self.role.clone(),
            direction: self.direction.reverse(),
            to: self.from.clone(),
        }
    }
}

/// Lazy breadth-first traversal iterator.
///
/// The first item is the start node with an empty path (if the start node
/// exists). Building a new `PathTraversal` restarts from scratch.
#[derive(Debug)]
pub struct PathTraversal<'g> {
    graph: &'g Graph,
    excluded_roles: Vec<String>,
    queue: VecDeque<(String, Vec<EdgeStep>)>,
    visited: BTreeSet<EdgeStep>,
    /// Items discovered but not yet yielded.
    ready: VecDeque<(String, Vec<EdgeStep>)>,
}

impl<'g> PathTraversal<'g> {
    /// Start a traversal at `start`, never expanding edges whose role matches
    /// one of `excluded_roles` (exact or short label).
    #[must_use]
    pub fn new(graph: &'g Graph, start: &str, excluded_roles: &[String]) -> Self {
        let mut ready = VecDeque::new();
        let mut queue = VecDeque::new();
        if graph.contains(start) {
            ready.push_back((start.to_string(), Vec::new()));
            queue.push_back((start.to_string(), Vec::new()));
        }
        Self {
            graph,
            excluded_roles: excluded_roles.to_vec(),
            queue,
            visited: BTreeSet::new(),
            ready,
        }
    }

    /// Traversal that skips the roles excluded by `config`.
    #[must_use]
    pub fn with_config(graph: &'g Graph, start: &str, config: &SearchConfig) -> Self {
        Self::new(graph, start, &config.excluded_roles)
    }

    fn is_excluded(&self, role: &str) -> bool {
        self.excluded_roles
            .iter()
            .any(|r| crate::label_matches(role, r))
    }

    /// Expand the next queued node, moving its new arrivals to `ready`.
    fn expand_next(&mut self) -> bool {
        let Some((node, path)) = self.queue.pop_front() else {
            return false;
        };
        for neighbor in self.graph.neighbors(&node) {
            if self.is_excluded(neighbor.predicate) {
                continue;
            }
            let step = EdgeStep {
                from: node.clone(),
                role: neighbor.predicate.to_string(),
                direction: neighbor.direction,
                to: neighbor.other.to_string(),
            };
            if self.visited.contains(&step) {
                continue;
            }
            self.visited.insert(step.mirrored());
            self.visited.insert(step.clone());

            let mut next_path = path.clone();
            next_path.push(step);
            let other = neighbor.other.to_string();
            self.queue.push_back((other.clone(), next_path.clone()));
            self.ready.push_back((other, next_path));
        }
        true
    }
}

impl Iterator for PathTraversal<'_> {
    type Item = (String, Vec<EdgeStep>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if !self.expand_next() {
                return None;
            }
        }
    }
}

/// Start a traversal. See [`PathTraversal`].
#[must_use]
pub fn traverse<'g>(graph: &'g Graph, start: &str, excluded_roles: &[String]) -> PathTraversal<'g> {
    PathTraversal::new(graph, start, excluded_roles)
}

/// Every traversal path from `start` that arrives at `goal`, shortest first,
/// capped at `max_paths`. Used to explain how two contradictorily annotated
/// nodes are connected.
#[must_use]
pub fn paths_between(
    graph: &Graph,
    start: &str,
    goal: &str,
    excluded_roles: &[String],
    max_paths: usize,
) -> Vec<Vec<EdgeStep>> {
    traverse(graph, start, excluded_roles)
        .filter(|(node, path)| node == goal && !path.is_empty())
        .map(|(_, path)| path)
        .take(max_paths)
        .collect()
}

/// Number of ERE-to-ERE hops on the first path from `start` to `goal`.
///
/// EREs are linked through statement nodes, so one hop is two edges.
/// `Some(0)` when `start == goal`, `None` if unreachable.
#[must_use]
pub fn hop_distance(
    graph: &Graph,
    start: &str,
    goal: &str,
    excluded_roles: &[String],
) -> Option<usize> {
    traverse(graph, start, excluded_roles)
        .find(|(node, _)| node == goal)
        .map(|(_, path)| path.len().div_ceil(2))
}

// =============================================================================
// TESTS
// =============================================================================

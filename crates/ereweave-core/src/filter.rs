//! # Consistency Filter
//!
//! Rule-based validation of one candidate statement against a hypothesis.
//!
//! Validation is incremental: the hypothesis is assumed consistent before
//! the candidate, so each rule only looks at what the candidate adds.
//! [`ConsistencyFilter::revalidate`] rebuilds a whole hypothesis through the
//! same rules, which is how merged hypotheses are cleaned up.

use crate::graph::{Graph, StatementRef};
use crate::hypothesis::Hypothesis;
use crate::{SearchConfig, label_matches, short_label};
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

// =============================================================================
// RULE TRAIT
// =============================================================================

/// One consistency rule.
pub trait ConsistencyRule: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// True if adding `stmt` keeps `hypothesis` consistent.
    fn accepts(&self, graph: &Graph, hypothesis: &Hypothesis, stmt: StatementRef<'_>) -> bool;
}

// =============================================================================
// ATTACK ROLES
// =============================================================================

/// Role categories of attack-style events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttackRole {
    Attacker,
    Instrument,
    Target,
}

impl AttackRole {
    fn of(predicate: &str) -> Option<Self> {
        let short = short_label(predicate);
        if short.ends_with("Attacker") {
            Some(Self::Attacker)
        } else if short.ends_with("Instrument") {
            Some(Self::Instrument)
        } else if short.ends_with("Target") {
            Some(Self::Target)
        } else {
            None
        }
    }
}

fn is_attack_event(graph: &Graph, ere: &str, attack_types: &[String]) -> bool {
    graph.has_ere_type(ere, attack_types)
}

/// Hypothesis statements with the given subject, as statement views.
fn statements_about<'g>(
    graph: &'g Graph,
    hypothesis: &'g Hypothesis,
    subject: &'g str,
) -> impl Iterator<Item = StatementRef<'g>> + 'g {
    hypothesis
        .core_statements()
        .chain(hypothesis.other_statements())
        .filter_map(move |label| graph.statement(label))
        .filter(move |stmt| stmt.subject == subject)
}

/// EREs that `ere` may be affiliated with.
///
/// An affiliation relation is a relation typed `*Affiliation*`; its role
/// ending in `Affiliation` names the affiliated-with ERE, every other role
/// names a member.
#[must_use]
pub fn possible_affiliations<'g>(graph: &'g Graph, ere: &str) -> BTreeSet<&'g str> {
    let mut affiliations = BTreeSet::new();
    for membership in graph.statements_with_object(ere) {
        if short_label(membership.predicate).ends_with("Affiliation") {
            continue;
        }
        let relation = membership.subject;
        let is_affiliation_relation = graph
            .ere_types(relation)
            .iter()
            .any(|t| short_label(t).contains("Affiliation"));
        if !is_affiliation_relation {
            continue;
        }
        for arg in graph.statements_with_subject(relation) {
            if short_label(arg.predicate).ends_with("Affiliation") && arg.object != ere {
                affiliations.insert(arg.object);
            }
        }
    }
    affiliations
}

// =============================================================================
// RULES
// =============================================================================

/// Attackers of one attack event must share a possible affiliation; so must
/// its instruments. Participants with no known affiliation are unconstrained.
#[derive(Debug, Clone)]
pub struct AttackAffiliationRule {
    attack_types: Vec<String>,
}

impl ConsistencyRule for AttackAffiliationRule {
    fn name(&self) -> &'static str {
        "attack-affiliation"
    }

    fn accepts(&self, graph: &Graph, hypothesis: &Hypothesis, stmt: StatementRef<'_>) -> bool {
        let Some(role) = AttackRole::of(stmt.predicate) else {
            return true;
        };
        if role == AttackRole::Target || !is_attack_event(graph, stmt.subject, &self.attack_types) {
            return true;
        }

        let mut participants: BTreeSet<&str> = statements_about(graph, hypothesis, stmt.subject)
            .filter(|other| AttackRole::of(other.predicate) == Some(role))
            .map(|other| other.object)
            .collect();
        participants.insert(stmt.object);

        let mut common: Option<BTreeSet<&str>> = None;
        for participant in participants {
            let known = possible_affiliations(graph, participant);
            if known.is_empty() {
                continue;
            }
            common = Some(match common {
                None => known,
                Some(acc) => acc.intersection(&known).copied().collect(),
            });
        }
        common.is_none_or(|set| !set.is_empty())
    }
}

/// An entity, event or relation carries at most one type per hypothesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleTypeRule;

impl ConsistencyRule for SingleTypeRule {
    fn name(&self) -> &'static str {
        "single-type"
    }

    fn accepts(&self, graph: &Graph, hypothesis: &Hypothesis, stmt: StatementRef<'_>) -> bool {
        if !stmt.is_type_statement() || !graph.is_ere(stmt.subject) {
            return true;
        }
        !statements_about(graph, hypothesis, stmt.subject)
            .any(|other| other.is_type_statement() && other.label != stmt.label)
    }
}

/// A statement may not relate an ERE to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSelfRelationRule;

impl ConsistencyRule for NoSelfRelationRule {
    fn name(&self) -> &'static str {
        "no-self-relation"
    }

    fn accepts(&self, graph: &Graph, _hypothesis: &Hypothesis, stmt: StatementRef<'_>) -> bool {
        stmt.subject != stmt.object || !graph.is_ere(stmt.object)
    }
}

/// The attacker and the target of one attack are different EREs.
#[derive(Debug, Clone)]
pub struct AttackerNotTargetRule {
    attack_types: Vec<String>,
}

impl ConsistencyRule for AttackerNotTargetRule {
    fn name(&self) -> &'static str {
        "attacker-not-target"
    }

    fn accepts(&self, graph: &Graph, hypothesis: &Hypothesis, stmt: StatementRef<'_>) -> bool {
        let opposite = match AttackRole::of(stmt.predicate) {
            Some(AttackRole::Attacker) => AttackRole::Target,
            Some(AttackRole::Target) => AttackRole::Attacker,
            _ => return true,
        };
        if !is_attack_event(graph, stmt.subject, &self.attack_types) {
            return true;
        }
        !statements_about(graph, hypothesis, stmt.subject).any(|other| {
            AttackRole::of(other.predicate) == Some(opposite) && other.object == stmt.object
        })
    }
}

// =============================================================================
// FILTER
// =============================================================================

/// Ordered set of rules applied to every candidate statement.
pub struct ConsistencyFilter {
    rules: Vec<Box<dyn ConsistencyRule>>,
}

impl fmt::Debug for ConsistencyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistencyFilter")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ConsistencyFilter {
    fn default() -> Self {
        Self::standard(&SearchConfig::default())
    }
}

impl ConsistencyFilter {
    /// Filter with no rules: accepts every statement.
    #[must_use]
    pub fn permissive() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard rule set.
    #[must_use]
    pub fn standard(config: &SearchConfig) -> Self {
        Self::permissive()
            .with_rule(AttackAffiliationRule {
                attack_types: config.attack_event_types.clone(),
            })
            .with_rule(SingleTypeRule)
            .with_rule(NoSelfRelationRule)
            .with_rule(AttackerNotTargetRule {
                attack_types: config.attack_event_types.clone(),
            })
    }

    /// Append a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl ConsistencyRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the active rules in order.
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name())
    }

    /// True if `stmt` may join `hypothesis`.
    ///
    /// Statements already present are accepted; labels that are not
    /// statements in `graph` are rejected.
    #[must_use]
    pub fn validate(&self, graph: &Graph, hypothesis: &Hypothesis, stmt: &str) -> bool {
        if hypothesis.contains(stmt) {
            return true;
        }
        let Some(view) = graph.statement(stmt) else {
            return false;
        };
        for rule in &self.rules {
            if !rule.accepts(graph, hypothesis, view) {
                trace!(rule = rule.name(), statement = stmt, "statement rejected");
                return false;
            }
        }
        true
    }

    /// Rebuild `hypothesis` from its core statements outward.
    ///
    /// Core statements are re-admitted in label order, then supporting
    /// statements in descending confidence; anything the rules now reject is
    /// dropped. Bindings, constraint bookkeeping and weight are kept.
    #[must_use]
    pub fn revalidate(&self, graph: &Graph, hypothesis: &Hypothesis) -> Hypothesis {
        let mut rebuilt = hypothesis.without_statements();
        for stmt in hypothesis.core_statements() {
            if self.validate(graph, &rebuilt, stmt) {
                rebuilt = rebuilt.extend(stmt, true);
            }
        }

        let mut others: Vec<&str> = hypothesis.other_statements().collect();
        others.sort_by(|a, b| {
            graph
                .statement_weight(b)
                .total_cmp(&graph.statement_weight(a))
                .then_with(|| a.cmp(b))
        });
        for stmt in others {
            if self.validate(graph, &rebuilt, stmt) {
                rebuilt = rebuilt.extend(stmt, false);
            }
        }
        rebuilt
    }
}

/// True if `predicate` names the `wanted` role: exactly, by short label, or
/// as the role suffix of an event-qualified predicate (`Conflict.Attack_Attacker`).
#[must_use]
pub fn role_matches(predicate: &str, wanted: &str) -> bool {
    if label_matches(predicate, wanted) {
        return true;
    }
    let short = short_label(predicate);
    let wanted = short_label(wanted);
    !wanted.is_empty()
        && short
            .strip_suffix(wanted)
            .is_some_and(|prefix| prefix.ends_with('_'))
}

// =============================================================================
// TESTS
// =============================================================================

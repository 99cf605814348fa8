//! # Search Configuration
//!
//! Tunable policy for the search engine and ranker. Every field has a
//! default, so a partial JSON document only overrides what it names.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Default number of finished hypotheses per facet.
pub const DEFAULT_MAX_HYPOTHESES: usize = 500;

/// Default number of in-flight seeds per facet.
pub const DEFAULT_MAX_FRONTIER: usize = 5000;

/// Default number of initial seeds built from entry-point combinations.
pub const DEFAULT_MAX_SEEDS: usize = 100;

/// Default size of the novelty re-ranking window.
pub const DEFAULT_NOVELTY_TOP_K: usize = 50;

/// Configuration for [`crate::HypothesisSearch`] and [`crate::Ranker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Stop a facet once this many hypotheses are finished.
    pub max_hypotheses: usize,

    /// Maximum number of seeds waiting for extension.
    pub max_frontier: usize,

    /// Maximum number of initial seeds from entry-point combinations.
    pub max_seeds: usize,

    /// Number of top hypotheses re-ranked by novelty.
    pub novelty_top_k: usize,

    /// Score for a binding no earlier pick has used.
    pub novelty_bonus: f64,

    /// Log-weight added per temporal relaxation step.
    pub relaxation_penalty: f64,

    /// Log-weight added per unfillable constraint.
    pub failed_constraint_penalty: f64,

    /// Roles never expanded by path traversal.
    pub excluded_roles: Vec<String>,

    /// Event types treated as attack-style conflicts by the consistency filter.
    pub attack_event_types: Vec<String>,

    /// Prefix for fresh canonical names produced by coreference collapse.
    pub canonical_prefix: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_hypotheses: DEFAULT_MAX_HYPOTHESES,
            max_frontier: DEFAULT_MAX_FRONTIER,
            max_seeds: DEFAULT_MAX_SEEDS,
            novelty_top_k: DEFAULT_NOVELTY_TOP_K,
            novelty_bonus: 2.0,
            relaxation_penalty: -1.0,
            failed_constraint_penalty: -3.0,
            excluded_roles: [
                "system",
                "confidence",
                "justifiedBy",
                "informativeJustification",
                "privateData",
                "sourceDocument",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            attack_event_types: vec!["Conflict.Attack".to_string()],
            canonical_prefix: "ere-".to_string(),
        }
    }
}

impl SearchConfig {
    /// Parse a (possibly partial) JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject budgets that would make the search produce nothing.
    pub fn validate(&self) -> Result<()> {
        if self.max_hypotheses == 0 {
            return Err(EngineError::Config("max_hypotheses must be > 0".into()));
        }
        if self.max_frontier == 0 {
            return Err(EngineError::Config("max_frontier must be > 0".into()));
        }
        if self.max_seeds == 0 {
            return Err(EngineError::Config("max_seeds must be > 0".into()));
        }
        if self.relaxation_penalty > 0.0 || self.failed_constraint_penalty > 0.0 {
            return Err(EngineError::Config("penalties must not be positive".into()));
        }
        Ok(())
    }

    /// True if traversal should skip edges with this role.
    #[must_use]
    pub fn is_excluded_role(&self, role: &str) -> bool {
        self.excluded_roles
            .iter()
            .any(|r| crate::label_matches(role, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SearchConfig::from_json(r#"{"novelty_top_k": 7}"#);
        assert!(config.is_ok());
        let config = config.unwrap_or_default();
        assert_eq!(config.novelty_top_k, 7);
        assert_eq!(config.max_hypotheses, DEFAULT_MAX_HYPOTHESES);
    }

    #[test]
    fn zero_budget_rejected() {
        let result = SearchConfig::from_json(r#"{"max_hypotheses": 0}"#);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn positive_penalty_rejected() {
        let result = SearchConfig::from_json(r#"{"relaxation_penalty": 0.5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn excluded_role_matches_short_form() {
        let config = SearchConfig::default();
        assert!(config.is_excluded_role("aida#justifiedBy"));
        assert!(!config.is_excluded_role("Attacker"));
    }
}

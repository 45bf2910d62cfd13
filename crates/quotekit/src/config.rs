//! JSON configuration loading.

use quotekit_core::{QuoteError, RuleSet};

use crate::engine::EngineOptions;

/// Parse a rule set from JSON of the form `{"rules": [{"name": ..., ...}]}`.
///
/// # Errors
///
/// [`QuoteError::ParseError`] describing the first JSON problem.
pub fn rule_set_from_json(json: &str) -> Result<RuleSet, QuoteError> {
    serde_json::from_str(json).map_err(|e| QuoteError::ParseError(format!("rule set: {e}")))
}

/// Parse engine options from JSON; missing fields keep their defaults.
pub fn engine_options_from_json(json: &str) -> Result<EngineOptions, QuoteError> {
    serde_json::from_str(json).map_err(|e| QuoteError::ParseError(format!("engine options: {e}")))
}

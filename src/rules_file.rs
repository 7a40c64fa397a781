//! Rule file loading.
//!
//! Rules live in a TOML file as an ordered `[[rules]]` array. Order matters:
//! the first rule whose trigger set matches a request wins.
//!
//! ```toml
//! [[rules]]
//! name = "github"
//!
//! [rules.trigger_set]
//! operator = "and"
//!
//! [[rules.trigger_set.triggers]]
//! name = "github-path"
//! property = "path"
//! comparator = "equal"
//! value = { value = "/github" }
//!
//! [rules.action]
//! upstream = "http://127.0.0.1:9000/hooks"
//! delivery_mode = "fallback"
//! timeout = 5
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use hookgate_core::rules::{Rule, RuleConfig, resolve_rules};
use hookgate_core::{HookGateError, Result};

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleConfig>,
}

/// Parses and validates rule file content.
///
/// # Errors
///
/// Returns [`HookGateError::ConfigError`] for malformed TOML and
/// [`HookGateError::Validation`] for the first invalid rule.
pub fn parse_rules(content: &str) -> Result<Vec<Rule>> {
    let file: RuleFile =
        toml::from_str(content).map_err(|e| HookGateError::ConfigError(e.to_string()))?;
    let rules = resolve_rules(file.rules)?;
    debug!(count = rules.len(), "Rules resolved");
    Ok(rules)
}

/// Reads, parses and validates a rule file.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        HookGateError::ConfigError(format!("cannot read rules {}: {e}", path.display()))
    })?;
    parse_rules(&content)
}

//! AND/OR combination of triggers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::trigger::{Trigger, TriggerConfig};
use crate::error::{HookGateError, Result, ValidationError};
use crate::request::InboundRequest;

/// How the triggers of a set are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Every trigger must match.
    #[default]
    #[serde(alias = "AND", alias = "And")]
    And,
    /// At least one trigger must match.
    #[serde(alias = "OR", alias = "Or")]
    Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
        }
    }
}

/// Trigger set as written in a rule file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSetConfig {
    /// Combination operator, `and` when omitted.
    #[serde(default)]
    pub operator: Operator,
    /// Triggers in evaluation order.
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
}

/// Result of evaluating a [`TriggerSet`].
///
/// `matched` stays meaningful even when `error` is set: errors from
/// individual triggers are collected while evaluation continues.
#[derive(Debug)]
pub struct Evaluation {
    /// Whether the set matched.
    pub matched: bool,
    /// Every trigger error seen, joined.
    pub error: Option<HookGateError>,
}

impl Evaluation {
    /// Converts into a `Result`, failing if any trigger errored.
    pub fn into_result(self) -> Result<bool> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.matched),
        }
    }
}

/// An ordered set of triggers combined with an [`Operator`].
///
/// An empty `and` set matches every request, an empty `or` set matches none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSet {
    operator: Operator,
    triggers: Vec<Trigger>,
}

impl TriggerSet {
    /// Creates a set from validated triggers.
    pub fn new(operator: Operator, triggers: Vec<Trigger>) -> Self {
        Self { operator, triggers }
    }

    /// Evaluates the triggers left to right.
    ///
    /// Under `or` the first match short-circuits to true, under `and` the
    /// first non-match short-circuits to false. A trigger that errors counts
    /// as a non-match and its error is kept.
    ///
    /// # Example
    ///
    /// ```
    /// use hookgate_core::InboundRequest;
    /// use hookgate_core::rules::{Comparator, Operator, Property, Target, Trigger, TriggerSet};
    /// use hyper::{Method, Uri};
    ///
    /// let set = TriggerSet::new(Operator::And, vec![
    ///     Trigger::new("path", Property::Path, Comparator::Equal, Target::value("/x")).unwrap(),
    ///     Trigger::new("method", Property::Method, Comparator::Equal, Target::value("GET")).unwrap(),
    /// ]);
    ///
    /// let req = InboundRequest::new(Method::GET, Uri::from_static("/x"));
    /// assert!(set.evaluate(&req).matched);
    /// ```
    pub fn evaluate(&self, req: &InboundRequest) -> Evaluation {
        let mut errors = Vec::new();
        let short_circuit_on = self.operator == Operator::Or;

        for trigger in &self.triggers {
            let matched = match trigger.matches(req) {
                Ok(matched) => matched,
                Err(err) => {
                    errors.push(err);
                    false
                }
            };

            if matched == short_circuit_on {
                return Evaluation {
                    matched,
                    error: HookGateError::join(errors),
                };
            }
        }

        Evaluation {
            matched: !short_circuit_on,
            error: HookGateError::join(errors),
        }
    }

    /// Combination operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Triggers in evaluation order.
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }
}

impl TryFrom<TriggerSetConfig> for TriggerSet {
    type Error = ValidationError;

    fn try_from(config: TriggerSetConfig) -> std::result::Result<Self, Self::Error> {
        let triggers = config
            .triggers
            .into_iter()
            .map(Trigger::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(config.operator, triggers))
    }
}

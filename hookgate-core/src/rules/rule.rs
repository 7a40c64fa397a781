//! Rules, actions and first-match selection.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::trigger_set::{TriggerSet, TriggerSetConfig};
use crate::error::{HookGateError, Result, ValidationError};
use crate::request::InboundRequest;

/// How a matched request reaches its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Forward synchronously and relay the upstream response.
    Instant,
    /// Publish to the queue and answer 202 right away.
    Queued,
    /// Try instant delivery, queue on transport failure or server error.
    Fallback,
}

impl DeliveryMode {
    /// Returns the configuration tag for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instant => "instant",
            Self::Queued => "queued",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action as written in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Upstream base URL.
    pub upstream: String,
    /// Delivery strategy.
    pub delivery_mode: DeliveryMode,
    /// Instant delivery timeout in seconds (0 = gateway default).
    #[serde(default)]
    pub timeout: u64,
    /// Requested delay before delivery, in seconds.
    #[serde(default)]
    pub delay: u64,
    /// Requested retry budget.
    #[serde(default)]
    pub retries: u32,
}

/// What to do with a request once its rule matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    upstream: Url,
    delivery_mode: DeliveryMode,
    timeout: Option<Duration>,
    delay: Duration,
    retries: u32,
}

impl Action {
    /// Parses and validates the upstream URL.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUpstream`] unless the upstream is an
    /// absolute `http` or `https` URL with a host.
    pub fn new(upstream: &str, delivery_mode: DeliveryMode) -> std::result::Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidUpstream {
            url: upstream.to_string(),
            reason,
        };

        let url = Url::parse(upstream).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self {
            upstream: url,
            delivery_mode,
            timeout: None,
            delay: Duration::ZERO,
            retries: 0,
        })
    }

    /// Sets the instant delivery timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Sets the requested delay and retry budget.
    pub fn with_retry_policy(mut self, delay: Duration, retries: u32) -> Self {
        self.delay = delay;
        self.retries = retries;
        self
    }

    /// Parsed upstream URL.
    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Delivery strategy.
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Rule-specific timeout, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Requested delay before delivery.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Requested retry budget.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl TryFrom<ActionConfig> for Action {
    type Error = ValidationError;

    fn try_from(config: ActionConfig) -> std::result::Result<Self, Self::Error> {
        Ok(Self::new(&config.upstream, config.delivery_mode)?
            .with_timeout(Duration::from_secs(config.timeout))
            .with_retry_policy(Duration::from_secs(config.delay), config.retries))
    }
}

/// Rule as written in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Rule name, used in logs.
    pub name: String,
    /// Triggers deciding whether the rule applies.
    #[serde(default)]
    pub trigger_set: TriggerSetConfig,
    /// What to do on match.
    pub action: ActionConfig,
}

/// A validated, immutable routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    trigger_set: TriggerSet,
    action: Action,
}

impl Rule {
    /// Creates a rule from validated parts.
    pub fn new(name: impl Into<String>, trigger_set: TriggerSet, action: Action) -> Self {
        Self {
            name: name.into(),
            trigger_set,
            action,
        }
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trigger set.
    pub fn trigger_set(&self) -> &TriggerSet {
        &self.trigger_set
    }

    /// Action.
    pub fn action(&self) -> &Action {
        &self.action
    }
}

impl TryFrom<RuleConfig> for Rule {
    type Error = ValidationError;

    fn try_from(config: RuleConfig) -> std::result::Result<Self, Self::Error> {
        let name = config.name;
        let trigger_set = TriggerSet::try_from(config.trigger_set).map_err(|e| e.in_rule(&name))?;
        let action = Action::try_from(config.action).map_err(|e| e.in_rule(&name))?;
        Ok(Self::new(name, trigger_set, action))
    }
}

/// Resolves parsed rule records into rules, preserving order.
///
/// # Errors
///
/// Fails on the first invalid rule, or with [`ValidationError::NoRules`]
/// when `configs` is empty.
pub fn resolve_rules(configs: Vec<RuleConfig>) -> std::result::Result<Vec<Rule>, ValidationError> {
    if configs.is_empty() {
        return Err(ValidationError::NoRules);
    }
    configs.into_iter().map(Rule::try_from).collect()
}

/// Returns the first rule whose trigger set matches `req`.
///
/// An evaluation error stops the walk immediately, even if a later rule
/// would have matched.
///
/// # Errors
///
/// Returns the joined evaluation error, or [`HookGateError::NoMatchingRule`].
pub fn select_rule<'a>(rules: &'a [Rule], req: &InboundRequest) -> Result<&'a Rule> {
    for rule in rules {
        if rule.trigger_set.evaluate(req).into_result()? {
            return Ok(rule);
        }
    }
    Err(HookGateError::NoMatchingRule)
}

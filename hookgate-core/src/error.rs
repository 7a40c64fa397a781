//! Error types for HookGate.
//!
//! This module provides a unified error type for rule evaluation, request
//! transformation and delivery, plus the fatal/retryable classification used
//! when processing queued messages.

use thiserror::Error;

use crate::rules::DeliveryMode;

/// Result type alias for HookGate operations.
pub type Result<T> = std::result::Result<T, HookGateError>;

/// Problems found while resolving rule configuration.
///
/// These only occur at load time. A gateway holding an invalid rule must not
/// start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A trigger is missing its target value (or key, for multimap properties).
    #[error("empty rule value")]
    EmptyRuleValue,

    /// `equal`/`not_equal` used against a header or query multimap.
    #[error("unsupported comparator {comparator} for property {property}")]
    UnsupportedComparatorForProperty {
        /// Comparator tag as configured.
        comparator: String,
        /// Property tag as configured.
        property: String,
    },

    /// The action upstream is not an absolute http(s) URL.
    #[error("invalid upstream URL '{url}': {reason}")]
    InvalidUpstream {
        /// Upstream as configured.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Wraps another validation error with the offending rule name.
    #[error("rule '{rule}': {source}")]
    InRule {
        /// Rule name.
        rule: String,
        /// Underlying problem.
        #[source]
        source: Box<ValidationError>,
    },

    /// The rule file did not contain any rule.
    #[error("no rules configured")]
    NoRules,
}

impl ValidationError {
    /// Attaches a rule name to this error.
    pub fn in_rule(self, rule: &str) -> Self {
        Self::InRule {
            rule: rule.to_string(),
            source: Box::new(self),
        }
    }
}

/// Unified error type for HookGate operations.
///
/// # Example
///
/// ```
/// use hookgate_core::error::{HookGateError, Result};
///
/// fn require_host(host: &str) -> Result<()> {
///     if host.is_empty() {
///         return Err(HookGateError::InvalidUrl("missing host".into()));
///     }
///     Ok(())
/// }
///
/// assert!(require_host("").is_err());
/// ```
#[derive(Debug, Error)]
pub enum HookGateError {
    /// Rule or trigger configuration is invalid.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A comparator received a property value shape it cannot handle.
    #[error("unsupported comparator {comparator} for value of type {shape}")]
    UnsupportedComparator {
        /// Comparator tag.
        comparator: &'static str,
        /// Shape of the extracted value.
        shape: &'static str,
    },

    /// Several errors collected while evaluating a trigger set.
    #[error("{}", join_messages(.0))]
    Evaluation(Vec<HookGateError>),

    /// No rule matched the inbound request.
    #[error("no matching ruleset action found")]
    NoMatchingRule,

    /// The matched rule names a delivery mode without a registered forwarder.
    #[error("no forwarder registered for delivery mode {0}")]
    UnknownDeliveryMode(DeliveryMode),

    /// Upstream connection failed.
    #[error("Upstream connection failed: {0}")]
    UpstreamConnectionFailed(String),

    /// Upstream request timed out.
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Upstream connection broke while its response body was streaming.
    #[error("Upstream body error: {0}")]
    UpstreamBodyError(String),

    /// Upstream answered with a server error status.
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    /// HTTP client error (from reqwest).
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// The queue refused the payload.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Encoding or decoding a queued request failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request body too large.
    #[error("Request body too large: {size} bytes (max: {max} bytes)")]
    BodyTooLarge {
        /// Declared body size in bytes, or one past `max` when a streamed
        /// body was cut off at the limit.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// Failed to read request or response body.
    #[error("Body read error: {0}")]
    BodyReadError(String),

    /// The caller asked to switch protocols, which a webhook gateway does not do.
    #[error("Upgrade requests are not supported")]
    UpgradeNotSupported,

    /// Target or replayed URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid HTTP header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// HTTP method could not be parsed.
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Configuration error (missing or invalid values).
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

fn join_messages(errors: &[HookGateError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl HookGateError {
    /// Joins evaluation errors, flattening nested joins.
    ///
    /// Returns `None` when there is nothing to report and the single error
    /// itself when only one was collected.
    pub fn join(errors: Vec<HookGateError>) -> Option<Self> {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                Self::Evaluation(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Self::Evaluation(flat)),
        }
    }

    /// Returns the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> hyper::StatusCode {
        use hyper::StatusCode;

        match self {
            Self::Validation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnsupportedComparator { .. } => StatusCode::BAD_GATEWAY,
            Self::Evaluation(_) => StatusCode::BAD_GATEWAY,
            Self::NoMatchingRule => StatusCode::BAD_GATEWAY,
            Self::UnknownDeliveryMode(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamConnectionFailed(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamBodyError(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            Self::HttpClientError(_) => StatusCode::BAD_GATEWAY,
            Self::Publish(_) => StatusCode::BAD_GATEWAY,
            Self::Serialization(_) => StatusCode::BAD_GATEWAY,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyReadError(_) => StatusCode::BAD_REQUEST,
            Self::UpgradeNotSupported => StatusCode::NOT_IMPLEMENTED,
            Self::InvalidUrl(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidHeader(_) => StatusCode::BAD_REQUEST,
            Self::InvalidMethod(_) => StatusCode::BAD_REQUEST,
            Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message written back to the caller.
    ///
    /// Rule selection failures keep their own text so webhook senders can
    /// tell a routing miss from an upstream outage. Transport details stay
    /// internal.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedComparator { .. } | Self::Evaluation(_) | Self::NoMatchingRule => {
                self.to_string()
            }
            Self::UnknownDeliveryMode(mode) => {
                format!("unsupported delivery mode {mode}")
            }
            Self::Validation(_) | Self::ConfigError(_) => "Internal server error".to_string(),
            Self::UpstreamConnectionFailed(_) => "Could not connect to upstream service".to_string(),
            Self::UpstreamTimeout(_) => "Upstream service timeout".to_string(),
            Self::UpstreamStatus(_)
            | Self::UpstreamBodyError(_)
            | Self::HttpClientError(_)
            | Self::InvalidUrl(_) => "Upstream service error".to_string(),
            Self::Publish(_) | Self::Serialization(_) => "Failed to enqueue request".to_string(),
            Self::BodyTooLarge { .. } => "Request body too large".to_string(),
            Self::BodyReadError(_) => "Failed to read request body".to_string(),
            Self::UpgradeNotSupported => self.to_string(),
            Self::InvalidHeader(_) | Self::InvalidMethod(_) => "Bad request".to_string(),
        }
    }

    /// Returns true for network failures talking to an upstream.
    ///
    /// The fallback forwarder reacts to these specifically.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::UpstreamConnectionFailed(_)
                | Self::UpstreamTimeout(_)
                | Self::UpstreamBodyError(_)
                | Self::HttpClientError(_)
        )
    }

    /// Returns true if this error should be logged at error level.
    ///
    /// Routing misses and caller mistakes are expected and only logged as
    /// warnings.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::ConfigError(_)
                | Self::UpstreamConnectionFailed(_)
                | Self::UpstreamTimeout(_)
                | Self::UpstreamBodyError(_)
                | Self::UpstreamStatus(_)
                | Self::HttpClientError(_)
                | Self::Publish(_)
                | Self::Serialization(_)
        )
    }
}

/// Outcome classification for a failed queued message.
///
/// A fatal error discards the message, a retryable one sends it back to the
/// queue.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The message can never succeed.
    #[error("fatal: {0}")]
    Fatal(#[source] HookGateError),

    /// The message may succeed on a later attempt.
    #[error("retryable: {0}")]
    Retryable(#[source] HookGateError),
}

impl ProcessingError {
    /// Classifies `err` as fatal.
    pub fn fatal(err: impl Into<HookGateError>) -> Self {
        Self::Fatal(err.into())
    }

    /// Classifies `err` as retryable.
    pub fn retryable(err: impl Into<HookGateError>) -> Self {
        Self::Retryable(err.into())
    }

    /// Returns true when the message must be discarded without requeue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// The underlying error.
    pub fn inner(&self) -> &HookGateError {
        match self {
            Self::Fatal(err) | Self::Retryable(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[test]
    fn test_error_display() {
        let err = HookGateError::NoMatchingRule;
        assert_eq!(err.to_string(), "no matching ruleset action found");

        let err = HookGateError::BodyTooLarge {
            size: 200,
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "Request body too large: 200 bytes (max: 100 bytes)"
        );

        let err = HookGateError::from(ValidationError::EmptyRuleValue.in_rule("github"));
        assert_eq!(
            err.to_string(),
            "Validation error: rule 'github': empty rule value"
        );
    }

    #[test]
    fn test_validation_display() {
        let err = ValidationError::UnsupportedComparatorForProperty {
            comparator: "equal".into(),
            property: "header".into(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported comparator equal for property header"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            HookGateError::NoMatchingRule.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            HookGateError::UnknownDeliveryMode(DeliveryMode::Queued).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            HookGateError::UpstreamTimeout("".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            HookGateError::BodyTooLarge { size: 1, max: 0 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            HookGateError::BodyReadError("".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HookGateError::Publish("".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            HookGateError::UpgradeNotSupported.status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn test_upstream_body_error_is_bad_gateway() {
        let err = HookGateError::UpstreamBodyError("connection closed".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.user_message(), "Upstream service error");
        assert!(err.is_server_error());
    }

    #[test]
    fn test_user_message_keeps_routing_errors() {
        assert_eq!(
            HookGateError::NoMatchingRule.user_message(),
            "no matching ruleset action found"
        );
        assert_eq!(
            HookGateError::UpstreamConnectionFailed("10.0.0.1:80 refused".into()).user_message(),
            "Could not connect to upstream service"
        );
    }

    // ===========================================
    // join tests
    // ===========================================

    #[test]
    fn test_join_empty_is_none() {
        assert!(HookGateError::join(vec![]).is_none());
    }

    #[test]
    fn test_join_single_is_unwrapped() {
        let joined = HookGateError::join(vec![HookGateError::NoMatchingRule]).unwrap();
        assert!(matches!(joined, HookGateError::NoMatchingRule));
    }

    #[test]
    fn test_join_flattens_nested() {
        let nested = HookGateError::Evaluation(vec![
            HookGateError::UnsupportedComparator {
                comparator: "equal",
                shape: "multimap",
            },
            HookGateError::UnsupportedComparator {
                comparator: "contains",
                shape: "nil",
            },
        ]);
        let joined = HookGateError::join(vec![nested, HookGateError::NoMatchingRule]).unwrap();

        match &joined {
            HookGateError::Evaluation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected joined error, got {other:?}"),
        }
        assert_eq!(
            joined.to_string(),
            "unsupported comparator equal for value of type multimap; \
             unsupported comparator contains for value of type nil; \
             no matching ruleset action found"
        );
    }

    // ===========================================
    // classification tests
    // ===========================================

    #[test]
    fn test_is_transport() {
        assert!(HookGateError::UpstreamTimeout("".into()).is_transport());
        assert!(HookGateError::UpstreamConnectionFailed("".into()).is_transport());
        assert!(HookGateError::UpstreamBodyError("".into()).is_transport());
        assert!(!HookGateError::NoMatchingRule.is_transport());
        assert!(!HookGateError::Publish("".into()).is_transport());
    }

    #[test]
    fn test_is_server_error() {
        assert!(HookGateError::Publish("".into()).is_server_error());
        assert!(HookGateError::UpstreamTimeout("".into()).is_server_error());
        assert!(!HookGateError::NoMatchingRule.is_server_error());
        assert!(!HookGateError::BodyReadError("".into()).is_server_error());
        assert!(!HookGateError::UpgradeNotSupported.is_server_error());
    }

    #[test]
    fn test_processing_error_classification() {
        let fatal = ProcessingError::fatal(HookGateError::InvalidUrl("::".into()));
        assert!(fatal.is_fatal());
        assert_eq!(fatal.to_string(), "fatal: Invalid URL: ::");

        let retry = ProcessingError::retryable(HookGateError::UpstreamTimeout("slow".into()));
        assert!(!retry.is_fatal());
        assert!(retry.inner().is_transport());
    }
}

//! HTTP request handling for the gateway.
//!
//! # Architecture
//!
//! The request handling flow:
//! 1. Assign a request id
//! 2. Refuse protocol upgrades with `501 Not Implemented`
//! 3. Buffer the body, enforcing the size limit
//! 4. Select the first rule whose trigger set matches
//! 5. Look up the forwarder for the rule's delivery mode
//! 6. Forward and relay the result to the caller
//!
//! Any failure before or during forwarding produces a plain text error
//! response; nothing is forwarded after a selection failure.

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use tracing::{debug, error, info, warn};

use crate::error::{HookGateError, Result};
use crate::forwarder::{DeliveryContext, ForwarderRegistry};
use crate::headers;
use crate::proxy::ForwardedResponse;
use crate::request::InboundRequest;
use crate::rules::{Rule, select_rule};
use crate::types::{ProxyConfig, ProxyProvider, RequestId};

/// Routes inbound requests to forwarders by rule.
///
/// Holds the rule list and forwarder registry read-only; one instance is
/// shared by all connections.
#[derive(Debug)]
pub struct Gateway {
    rules: Vec<Rule>,
    forwarders: ForwarderRegistry,
    proxy: ProxyConfig,
}

impl Gateway {
    /// Creates a gateway over an ordered rule list.
    pub fn new(rules: Vec<Rule>, forwarders: ForwarderRegistry, config: &impl ProxyProvider) -> Self {
        Self {
            rules,
            forwarders,
            proxy: config.proxy_config().clone(),
        }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Registered forwarders.
    pub fn forwarders(&self) -> &ForwarderRegistry {
        &self.forwarders
    }

    /// Returns the first rule matching `request`.
    ///
    /// # Errors
    ///
    /// See [`select_rule`].
    pub fn select_rule(&self, request: &InboundRequest) -> Result<&Rule> {
        select_rule(&self.rules, request)
    }

    /// Selects a rule for `request` and delivers it.
    ///
    /// # Errors
    ///
    /// Returns the rule selection error,
    /// [`HookGateError::UnknownDeliveryMode`] when no forwarder handles the
    /// matched rule, or the forwarder's own error.
    pub async fn dispatch(
        &self,
        request_id: RequestId,
        request: &InboundRequest,
    ) -> Result<ForwardedResponse> {
        let rule = self.select_rule(request)?;
        let action = rule.action();
        let mode = action.delivery_mode();

        info!(
            request_id = %request_id,
            rule = rule.name(),
            delivery_mode = %mode,
            upstream = %action.upstream(),
            "Matching rule"
        );

        let forwarder = self
            .forwarders
            .get(mode)
            .ok_or(HookGateError::UnknownDeliveryMode(mode))?;
        let ctx = DeliveryContext::for_rule(request_id, rule, &self.proxy);

        forwarder.forward(&ctx, request, action.upstream()).await
    }

    /// Handles an incoming HTTP request.
    ///
    /// # Arguments
    ///
    /// * `req` - The incoming HTTP request
    /// * `remote_addr` - Peer address of the connection, appended to
    ///   `X-Forwarded-For`
    ///
    /// # Returns
    ///
    /// Always returns `Ok` with either the relayed upstream response, the
    /// `202 Accepted` of a queued delivery, or an error response.
    pub async fn handle_request<B>(
        &self,
        req: Request<B>,
        remote_addr: Option<SocketAddr>,
    ) -> std::result::Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = RequestId::new();
        info!(
            request_id = %request_id,
            method = %req.method(),
            path = req.uri().path(),
            "Incoming request"
        );

        let result = if headers::is_upgrade(req.headers()) {
            Err(HookGateError::UpgradeNotSupported)
        } else {
            match InboundRequest::from_request(req, remote_addr, self.proxy.max_body_size).await {
                Ok(request) => self.dispatch(request_id, &request).await,
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(response) => {
                debug!(
                    request_id = %request_id,
                    status = response.status.as_u16(),
                    "Relaying response"
                );
                Ok(response.into_response())
            }
            Err(e) => {
                if e.is_server_error() {
                    error!(request_id = %request_id, error = %e, "Request failed");
                } else {
                    warn!(request_id = %request_id, error = %e, "Request rejected");
                }
                Ok(create_error_response(e.status_code(), &e.user_message()))
            }
        }
    }
}

/// Creates a standardized error response.
///
/// Builds an HTTP response with the given status code and plain text message.
/// Falls back to a minimal 500 response if building fails (should never happen
/// with valid StatusCode).
///
/// # Arguments
///
/// * `status` - The HTTP status code for the response
/// * `message` - The plain text error message body
///
/// # Returns
///
/// An HTTP response with `content-type: text/plain` header.
///
/// # Example
///
/// ```
/// use hookgate_core::request_handler::create_error_response;
/// use hyper::StatusCode;
///
/// let response = create_error_response(StatusCode::BAD_GATEWAY, "no matching ruleset action found");
/// assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
/// ```
pub fn create_error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Full::new(Bytes::from(message.to_string())))
        .unwrap_or_else(|_| {
            // Fallback response if builder fails (extremely unlikely)
            Response::new(Full::new(Bytes::from("Internal Server Error")))
        })
}

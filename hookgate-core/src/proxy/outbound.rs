use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method};
use url::Url;

use super::{clean_query, join_url_path, merge_query};
use crate::error::{HookGateError, Result};
use crate::headers;
use crate::request::InboundRequest;

/// A request ready to be sent to an upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute upstream URL.
    pub url: Url,
    /// Host the original caller addressed, sent upstream as `Host`.
    pub host: String,
    /// Headers to send, without `Host`.
    pub headers: HeaderMap,
    /// Body bytes.
    pub body: Bytes,
}

/// Builds the upstream request for `inbound` aimed at `target`.
///
/// The inbound request is left untouched, so a later delivery attempt can
/// build from it again.
///
/// # Arguments
///
/// * `inbound` - The buffered caller request
/// * `target` - Upstream base URL; its path prefixes the inbound path and
///   its query is merged before the inbound query
///
/// # Errors
///
/// Returns [`HookGateError::InvalidUrl`] if `target` cannot carry a path,
/// and [`HookGateError::InvalidHeader`] if a forwarding header cannot be
/// encoded.
///
/// # Example
///
/// ```
/// use hookgate_core::InboundRequest;
/// use hookgate_core::proxy::build_outbound_request;
/// use hyper::{Method, Uri};
/// use url::Url;
///
/// let inbound = InboundRequest::new(Method::POST, Uri::from_static("/hook?b=2"))
///     .with_host("gateway.local");
/// let target = Url::parse("http://upstream.local/api/?a=1").unwrap();
///
/// let out = build_outbound_request(&inbound, &target).unwrap();
/// assert_eq!(out.url.as_str(), "http://upstream.local/api/hook?a=1&b=2");
/// assert_eq!(out.headers["x-forwarded-host"], "gateway.local");
/// ```
pub fn build_outbound_request(inbound: &InboundRequest, target: &Url) -> Result<OutboundRequest> {
    if target.cannot_be_a_base() {
        return Err(HookGateError::InvalidUrl(format!(
            "target '{target}' cannot carry a path"
        )));
    }

    let mut url = target.clone();
    url.set_path(&join_url_path(target.path(), inbound.path()));
    let inbound_query = inbound.query().map(clean_query);
    url.set_query(merge_query(target.query(), inbound_query.as_deref()).as_deref());

    let prior_chain: Vec<String> = inbound
        .headers
        .get_all(headers::X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    let mut out_headers = inbound.headers.clone();
    headers::remove_hop_by_hop(&mut out_headers);
    headers::remove_forwarding_metadata(&mut out_headers);
    out_headers.remove(headers::HOST);

    let mut chain = prior_chain;
    if let Some(addr) = inbound.remote_addr {
        chain.push(addr.ip().to_string());
    }
    if !chain.is_empty() {
        set_header(&mut out_headers, headers::X_FORWARDED_FOR, &chain.join(", "))?;
    }
    if !inbound.host.is_empty() {
        set_header(&mut out_headers, headers::X_FORWARDED_HOST, &inbound.host)?;
    }
    let proto = if inbound.tls { "https" } else { "http" };
    set_header(&mut out_headers, headers::X_FORWARDED_PROTO, proto)?;

    // Keep an explicit empty User-Agent so the client adds none of its own.
    if !out_headers.contains_key(headers::USER_AGENT) {
        out_headers.insert(
            HeaderName::from_static(headers::USER_AGENT),
            HeaderValue::from_static(""),
        );
    }

    Ok(OutboundRequest {
        method: inbound.method.clone(),
        url,
        host: inbound.host.clone(),
        headers: out_headers,
        body: inbound.body.clone(),
    })
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let value =
        HeaderValue::from_str(value).map_err(|e| HookGateError::InvalidHeader(e.to_string()))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

//! HTTP header constants for HookGate.
//!
//! This module centralizes the header names the request transformer strips
//! or regenerates, so the inbound and response paths agree on them.

use hyper::HeaderMap;

/// X-Forwarded-For header - chain of client IPs seen by each proxy.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// X-Forwarded-Host header - the Host the caller originally asked for.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// X-Forwarded-Proto header - scheme of the inbound connection.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Forwarded header (RFC 7239) - standardized proxy header.
pub const FORWARDED: &str = "forwarded";

/// Content-Type header.
pub const CONTENT_TYPE: &str = "content-type";

/// Host header.
pub const HOST: &str = "host";

/// Content-Length header.
pub const CONTENT_LENGTH: &str = "content-length";

/// User-Agent header.
pub const USER_AGENT: &str = "user-agent";

/// Connection header (hop-by-hop).
pub const CONNECTION: &str = "connection";

/// Proxy-Connection header (hop-by-hop, non-standard but still sent).
pub const PROXY_CONNECTION: &str = "proxy-connection";

/// Keep-Alive header (hop-by-hop).
pub const KEEP_ALIVE: &str = "keep-alive";

/// Proxy-Authenticate header (hop-by-hop).
pub const PROXY_AUTHENTICATE: &str = "proxy-authenticate";

/// Proxy-Authorization header (hop-by-hop).
pub const PROXY_AUTHORIZATION: &str = "proxy-authorization";

/// TE header (hop-by-hop).
pub const TE: &str = "te";

/// Trailer header (hop-by-hop).
pub const TRAILER: &str = "trailer";

/// Transfer-Encoding header (hop-by-hop).
pub const TRANSFER_ENCODING: &str = "transfer-encoding";

/// Upgrade header (hop-by-hop).
pub const UPGRADE: &str = "upgrade";

/// List of all hop-by-hop headers that should not be forwarded.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    CONNECTION,
    PROXY_CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Forwarding metadata headers, regenerated on the way in and removed on
/// the way back.
pub const FORWARDED_HEADERS: &[&str] =
    &[FORWARDED, X_FORWARDED_FOR, X_FORWARDED_HOST, X_FORWARDED_PROTO];

/// Check if a header is a hop-by-hop header that shouldn't be forwarded.
///
/// # Arguments
///
/// * `header_name` - The header name to check (lowercase).
///
/// # Returns
///
/// `true` if the header is a hop-by-hop header, `false` otherwise.
///
/// # Example
///
/// ```
/// use hookgate_core::headers::is_hop_by_hop;
///
/// assert!(is_hop_by_hop("connection"));
/// assert!(is_hop_by_hop("proxy-connection"));
/// assert!(!is_hop_by_hop("content-type"));
/// ```
pub fn is_hop_by_hop(header_name: &str) -> bool {
    HOP_BY_HOP_HEADERS.contains(&header_name)
}

/// Check if a header carries forwarding metadata.
///
/// # Example
///
/// ```
/// use hookgate_core::headers::is_forwarding_metadata;
///
/// assert!(is_forwarding_metadata("x-forwarded-for"));
/// assert!(!is_forwarding_metadata("x-request-id"));
/// ```
pub fn is_forwarding_metadata(header_name: &str) -> bool {
    FORWARDED_HEADERS.contains(&header_name)
}

/// Removes hop-by-hop headers from `headers`.
///
/// Every header named in a `Connection` value is dropped first, then the
/// fixed hop-by-hop set.
pub fn remove_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Returns true when a `Connection` value lists the `upgrade` token.
///
/// # Example
///
/// ```
/// use hookgate_core::headers::is_upgrade;
/// use hyper::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("connection", "keep-alive, Upgrade".parse().unwrap());
/// assert!(is_upgrade(&headers));
/// ```
pub fn is_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case(UPGRADE))
}

/// Removes `Forwarded` and `X-Forwarded-*` headers from `headers`.
pub fn remove_forwarding_metadata(headers: &mut HeaderMap) {
    for name in FORWARDED_HEADERS {
        headers.remove(*name);
    }
}

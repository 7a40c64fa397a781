//! Request transformation for proxying.
//!
//! This module turns an [`InboundRequest`](crate::InboundRequest) into the
//! request sent to an upstream, whether it is sent right away or serialized
//! and replayed from the queue later:
//! - [`build_outbound_request`] strips hop-by-hop headers, regenerates
//!   forwarding metadata, joins the target and inbound paths and cleans
//!   malformed inbound queries with [`clean_query`]
//! - [`SerializedRequest`] is the queue payload for a built request
//! - [`ForwardedResponse`] is what gets relayed back to the caller, with
//!   forwarding metadata removed

mod outbound;
mod response;
mod serialized;

pub use outbound::{OutboundRequest, build_outbound_request};
pub use response::{ForwardedResponse, sanitize_response_headers};
pub use serialized::SerializedRequest;

use std::borrow::Cow;

use url::form_urlencoded;

/// Joins two URL paths with exactly one slash between them.
///
/// # Example
///
/// ```
/// use hookgate_core::proxy::join_url_path;
///
/// assert_eq!(join_url_path("/api/", "/hook"), "/api/hook");
/// assert_eq!(join_url_path("/api", "hook"), "/api/hook");
/// assert_eq!(join_url_path("/api", "/hook"), "/api/hook");
/// ```
pub fn join_url_path(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
    }

    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

/// Merges two raw query strings, joining with `&` only when both are set.
///
/// # Example
///
/// ```
/// use hookgate_core::proxy::merge_query;
///
/// assert_eq!(merge_query(Some("a=1"), Some("b=2")).as_deref(), Some("a=1&b=2"));
/// assert_eq!(merge_query(None, Some("b=2")).as_deref(), Some("b=2"));
/// assert_eq!(merge_query(Some(""), None), None);
/// ```
pub fn merge_query(target: Option<&str>, inbound: Option<&str>) -> Option<String> {
    let target = target.filter(|q| !q.is_empty());
    let inbound = inbound.filter(|q| !q.is_empty());

    match (target, inbound) {
        (Some(t), Some(i)) => Some(format!("{t}&{i}")),
        (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    }
}

/// Re-encodes a raw query that carries a `;` or a malformed `%` escape.
///
/// Well-formed queries are returned untouched. Otherwise the query is parsed
/// as `&`-separated form pairs, with invalid escapes kept literally, and
/// serialized again, so the upstream always receives a valid query.
///
/// # Example
///
/// ```
/// use hookgate_core::proxy::clean_query;
///
/// assert_eq!(clean_query("a=1&b=%20"), "a=1&b=%20");
/// assert_eq!(clean_query("rate=100%"), "rate=100%25");
/// ```
pub fn clean_query(raw: &str) -> Cow<'_, str> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => return Cow::Owned(reencode_query(raw)),
            b'%' => {
                let escaped = bytes
                    .get(i + 1..i + 3)
                    .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
                if !escaped {
                    return Cow::Owned(reencode_query(raw));
                }
                i += 3;
            }
            _ => i += 1,
        }
    }
    Cow::Borrowed(raw)
}

fn reencode_query(raw: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form_urlencoded::parse(raw.as_bytes()))
        .finish()
}

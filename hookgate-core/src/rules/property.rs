//! Request properties a trigger can inspect.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::InboundRequest;

/// String multimap used for headers and query parameters.
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// Which part of the request a trigger looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Property {
    /// URL path.
    Path,
    /// Request body. Accepted in configuration but no comparator supports it.
    Body,
    /// Host the caller addressed.
    Host,
    /// HTTP method.
    Method,
    /// Header multimap, keyed by lowercase header name.
    Header,
    /// Decoded query parameters.
    Query,
}

/// A value extracted from a request, shaped by its [`Property`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Path, host or method.
    Scalar(String),
    /// Headers or query parameters.
    MultiMap(MultiMap),
}

impl PropertyValue {
    /// Short name of the value's shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "string",
            Self::MultiMap(_) => "multimap",
        }
    }
}

impl Property {
    /// Returns the configuration tag for this property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Body => "body",
            Self::Host => "host",
            Self::Method => "method",
            Self::Header => "header",
            Self::Query => "query",
        }
    }

    /// Returns `true` for properties extracted as a multimap.
    pub fn is_multimap(&self) -> bool {
        matches!(self, Self::Header | Self::Query)
    }

    /// Extracts this property from `req`.
    ///
    /// Returns `None` for [`Property::Body`], which has no comparable shape.
    pub fn extract(&self, req: &InboundRequest) -> Option<PropertyValue> {
        match self {
            Self::Path => Some(PropertyValue::Scalar(req.path().to_string())),
            Self::Host => Some(PropertyValue::Scalar(req.host.clone())),
            Self::Method => Some(PropertyValue::Scalar(req.method.as_str().to_string())),
            Self::Header => Some(PropertyValue::MultiMap(header_multimap(req))),
            Self::Query => Some(PropertyValue::MultiMap(query_multimap(req))),
            Self::Body => None,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn header_multimap(req: &InboundRequest) -> MultiMap {
    let mut map = MultiMap::new();
    for (name, value) in req.headers.iter() {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

fn query_multimap(req: &InboundRequest) -> MultiMap {
    let mut map = MultiMap::new();
    if let Some(query) = req.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            map.entry(key.into_owned()).or_default().push(value.into_owned());
        }
    }
    map
}

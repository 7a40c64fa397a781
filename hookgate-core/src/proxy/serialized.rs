use std::collections::BTreeMap;

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use url::Url;

use super::OutboundRequest;
use crate::error::{HookGateError, Result};
use crate::types::RequestId;

/// Queue payload for an outbound request.
///
/// Encoded as JSON with the body in standard base64. Header names are
/// lowercase and values keep their order per name, so decoding and
/// re-encoding a payload yields the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRequest {
    /// Request id assigned by the gateway.
    pub id: RequestId,
    /// HTTP method.
    pub method: String,
    /// Absolute upstream URL.
    pub url: String,
    /// Host the original caller addressed.
    pub host: String,
    /// Header multimap.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Body bytes.
    #[serde(with = "base64_body")]
    pub body: Bytes,
}

impl SerializedRequest {
    /// Captures `request`, taking ownership of its body.
    ///
    /// Header values that are not valid UTF-8 are converted lossily.
    pub fn capture(id: RequestId, request: OutboundRequest) -> Self {
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in request.headers.keys() {
            let values = request
                .headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            headers.insert(name.as_str().to_string(), values);
        }

        Self {
            id,
            method: request.method.as_str().to_string(),
            url: request.url.into(),
            host: request.host,
            headers,
            body: request.body,
        }
    }

    /// Encodes the payload as JSON.
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decodes a payload produced by [`SerializedRequest::to_bytes`].
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Rebuilds the outbound request.
    ///
    /// # Errors
    ///
    /// Fails if the method, URL or a header cannot be parsed.
    pub fn into_outbound(self) -> Result<OutboundRequest> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| HookGateError::InvalidMethod(self.method.clone()))?;
        let url = Url::parse(&self.url)
            .map_err(|e| HookGateError::InvalidUrl(format!("{}: {e}", self.url)))?;

        let mut headers = HeaderMap::new();
        for (name, values) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HookGateError::InvalidHeader(format!("{name}: {e}")))?;
            for value in values {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| HookGateError::InvalidHeader(format!("{name}: {e}")))?;
                headers.append(name.clone(), value);
            }
        }

        Ok(OutboundRequest {
            method,
            url,
            host: self.host,
            headers,
            body: self.body,
        })
    }
}

impl OutboundRequest {
    /// Serializes this request for the queue, consuming it.
    pub fn into_serialized(self, id: RequestId) -> SerializedRequest {
        SerializedRequest::capture(id, self)
    }
}

mod base64_body {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

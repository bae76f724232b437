//! Request, Response and Cache Entry types that flow through the engine.

use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};

use crate::headers::HeaderMap;

/// An inbound request as seen by the engine.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method. Only `GET` is ever treated as cacheable (§4.2).
    pub method: Method,
    /// The absolute URI used as the expiry-index member and Redis key
    /// material (e.g. `https://example.com/a?b=1`).
    pub uri_full: String,
    /// Path + query passed to the upstream (e.g. `/a?b=1`).
    pub uri_relative: String,
    /// Request authority (`Host` header value).
    pub host: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body, if any.
    pub body: Option<Bytes>,
}

/// Classifies a request's interaction with the cache.
///
/// Ordered: `SUBZERO < COLD < WARM < HOT`. `HOT` and `WARM` count as a
/// cache "HIT" for `X-Cache`; `SUBZERO` and `COLD` count as a "MISS".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CacheState {
    /// Never seen before; written to the store for the first time.
    Subzero = 1,
    /// Reserved: a stale entry served under grace while a refresh is in
    /// flight. Not reached by the default state machine (§9 open
    /// question) — see [`crate::engine::StateEngine::classify_stale`].
    Cold = 2,
    /// Reserved: an entry fresh enough to serve but past its nominal
    /// expiry, triggering a background revalidate. Not reached by the
    /// default state machine; see [`crate::engine::StateEngine::classify_stale`].
    Warm = 3,
    /// A hit within TTL, served straight from the store.
    Hot = 4,
}

impl CacheState {
    /// Symbolic name emitted as `X-Cache-State`.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheState::Subzero => "SUBZERO",
            CacheState::Cold => "COLD",
            CacheState::Warm => "WARM",
            CacheState::Hot => "HOT",
        }
    }

    /// `X-Cache` is "HIT" for states at or above `WARM`, "MISS" otherwise.
    pub fn is_hit(self) -> bool {
        self >= CacheState::Warm
    }
}

/// A response as it flows through the engine. `state` is transient: it is
/// never part of the stored Cache Entry.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code, 100-599.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
    /// Cache state assigned by the State Engine. Not persisted.
    pub state: Option<CacheState>,
}

impl Response {
    /// Construct a response with no assigned state.
    pub fn new(status: u16, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, headers, body, state: None }
    }

    /// Convenience accessor mirroring the design's `res.ttl()` test hook:
    /// the TTL that was computed for this response, if a plugin stashed
    /// it via `X-TTL` (see [`crate::engine::set_headers`]).
    pub fn ttl(&self) -> Option<u64> {
        self.headers.get("x-ttl").and_then(|v| v.parse().ok())
    }
}

/// A Cache Entry as persisted by the Cache Store Adapter.
///
/// Header fields are prefixed with a literal `h:` sigil in the underlying
/// store to disambiguate them from the structural `status`/`body`/`uri`
/// fields, per the data model's storage shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Stored status code.
    pub status: u16,
    /// Stored body.
    pub body: Vec<u8>,
    /// The `uri_full` that produced this entry.
    pub uri: String,
    /// Stored response headers, display-name keyed (no `h:` prefix at this
    /// layer — the sigil is an encoding detail of the store backend).
    pub headers: Vec<(String, String)>,
}

impl CacheEntry {
    /// Rehydrate a [`Response`] from a stored entry.
    pub fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            headers.set(name, value);
        }
        Response::new(self.status, headers, Bytes::from(self.body))
    }

    /// Build a Cache Entry from a request/response pair about to be
    /// stored.
    pub fn from_response(uri: &str, res: &Response) -> Self {
        Self {
            status: res.status,
            body: res.body.to_vec(),
            uri: uri.to_string(),
            headers: res.headers.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect(),
        }
    }
}

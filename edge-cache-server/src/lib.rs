#![forbid(unsafe_code)]
//! A thin Tower service that terminates inbound HTTP, derives a cache
//! key, and drives [`edge_cache::StateEngine::handle`] for the result.
//!
//! This crate performs no cache-policy decisions of its own: it is
//! purely a translation shim at the edges between `http`'s request/
//! response types and `edge_cache`'s. Everything about whether a
//! response is cacheable, how long it lives, and what state it reports
//! lives in `edge_cache`.

mod keyer;

pub use keyer::{DefaultKeyer, Keyer};

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use edge_cache::{CacheError, Request as CacheRequest, Response as CacheResponse, StateEngine};
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use tower::Service;

/// Body type returned by [`CacheService`].
pub type ResponseBody = Full<Bytes>;

/// A [`tower::Service`] that answers every inbound request by running it
/// through a shared [`StateEngine`].
///
/// Unlike the wrapping middleware pattern this crate's predecessor used,
/// `CacheService` has no inner service to delegate to: the engine itself
/// owns the path to the origin (see [`edge_cache::OriginFetcher`]), so
/// this service is terminal.
#[derive(Clone)]
pub struct CacheService<K = DefaultKeyer> {
    engine: Arc<StateEngine>,
    keyer: K,
}

impl<K> CacheService<K>
where
    K: Keyer,
{
    /// Build a service around `engine`, deriving cache keys with `keyer`.
    pub fn new(engine: Arc<StateEngine>, keyer: K) -> Self {
        Self { engine, keyer }
    }
}

impl CacheService<DefaultKeyer> {
    /// Build a service around `engine` using the default `METHOD URI`
    /// keying scheme (§4.9).
    pub fn with_default_keyer(engine: Arc<StateEngine>) -> Self {
        Self::new(engine, DefaultKeyer)
    }
}

impl<K, ReqBody> Service<Request<ReqBody>> for CacheService<K>
where
    K: Keyer + Clone + Send + Sync + 'static,
    ReqBody: http_body::Body + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let engine = self.engine.clone();
        let keyer = self.keyer.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body_bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(_) => Bytes::new(),
            };

            let cache_request = into_cache_request(&parts, body_bytes);
            let cache_key = keyer.key(&cache_request);

            match engine.handle(&cache_key, cache_request).await {
                Ok(res) => Ok(from_cache_response(res)),
                Err(err) => Ok(error_response(&err)),
            }
        })
    }
}

fn into_cache_request(parts: &http::request::Parts, body: Bytes) -> CacheRequest {
    let host = parts
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .unwrap_or("")
        .to_string();

    let uri_relative = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let uri_full = if parts.uri.authority().is_some() {
        parts.uri.to_string()
    } else {
        format!("http://{host}{uri_relative}")
    };

    let mut headers = edge_cache::HeaderMap::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            headers.set(name.as_str(), value);
        }
    }

    CacheRequest {
        method: parts.method.clone(),
        uri_full,
        uri_relative,
        host,
        headers,
        body: if body.is_empty() { None } else { Some(body) },
    }
}

fn from_cache_response(res: CacheResponse) -> Response<ResponseBody> {
    let mut builder = Response::builder().status(res.status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in res.headers.iter() {
            if let (Ok(name), Ok(value)) = (http::header::HeaderName::from_bytes(name.as_bytes()), http::HeaderValue::from_str(value))
            {
                headers.append(name, value);
            }
        }
    }
    builder.body(Full::new(res.body)).unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn error_response(err: &CacheError) -> Response<ResponseBody> {
    tracing::error!(error = %err, "cache engine request failed");
    Response::builder()
        .status(http::StatusCode::BAD_GATEWAY)
        .body(Full::new(Bytes::from_static(b"cache engine error")))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

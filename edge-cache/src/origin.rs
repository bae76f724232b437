//! Origin Fetcher — proxies an inbound request to the configured
//! upstream, merges the response, and hands storage off to the Cache
//! Store Adapter once the Oracle has approved the response.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::cacheability::response_is_cacheable;
use crate::error::Result;
use crate::events::{self, EventBus};
use crate::headers::HeaderMap;
use crate::model::{Request, Response};
use crate::store::CacheStore;
use crate::ttl;

/// Outcome of an origin fetch attempt.
pub enum FetchOutcome {
    /// The origin responded with a cacheable (or at least non-5xx)
    /// response, already stored if the Oracle approved it.
    Fetched(Response),
    /// The origin returned >= 500, or the transport call itself failed
    /// (synthesized as a 502). No event fired beyond what ran before the
    /// short-circuit, nothing stored; the engine passes this straight
    /// through to the client.
    NotFetched(Response),
}

/// Issues the upstream HTTP call for one request and, on success, stores
/// the result via `store` if the Cacheability Oracle approves it.
pub struct OriginFetcher {
    client: reqwest::Client,
    proxy_location: String,
    events: Arc<EventBus>,
    store: Arc<dyn CacheStore>,
    serve_when_stale: Duration,
}

impl OriginFetcher {
    /// Build a fetcher targeting `proxy_location` (e.g.
    /// `http://127.0.0.1:8080`), using `events` for the `origin_required`/
    /// `origin_fetched` hooks and `store` for the eventual write.
    pub fn new(
        client: reqwest::Client,
        proxy_location: String,
        events: Arc<EventBus>,
        store: Arc<dyn CacheStore>,
        serve_when_stale: Duration,
    ) -> Self {
        Self { client, proxy_location, events, store, serve_when_stale }
    }

    /// Perform the fetch for `cache_key`, mutating `req`/`res` through the
    /// `origin_required`/`origin_fetched` hooks along the way.
    pub async fn fetch(&self, cache_key: &str, req: &mut Request, mut res: Response) -> Result<FetchOutcome> {
        self.events.fire(events::ORIGIN_REQUIRED, req, &mut res)?;

        let url = format!("{}{}", self.proxy_location, req.uri_relative);
        let method = req.method.clone();
        let mut builder = self.client.request(method, &url);
        for (name, value) in req.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let origin_response = match builder.send().await {
            Ok(response) => response,
            Err(_) => {
                res.status = 502;
                res.body = Bytes::new();
                return Ok(FetchOutcome::NotFetched(res));
            }
        };

        let status = origin_response.status().as_u16();
        let mut origin_headers = HeaderMap::new();
        for (name, value) in origin_response.headers() {
            if let Ok(value) = value.to_str() {
                origin_headers.set(name.as_str(), value);
            }
        }
        let body = origin_response.bytes().await.unwrap_or_default();

        res.status = status;
        res.headers.merge(&origin_headers);
        res.body = body;

        if status >= 500 {
            return Ok(FetchOutcome::NotFetched(res));
        }

        self.events.fire(events::ORIGIN_FETCHED, req, &mut res)?;

        if response_is_cacheable(&res) {
            let ttl = ttl::calculate(&res, self.serve_when_stale);
            self.store.write(cache_key, req, &res, &ttl).await?;
        }

        Ok(FetchOutcome::Fetched(res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use http::Method;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn req(uri_relative: &str) -> Request {
        Request {
            method: Method::GET,
            uri_full: format!("https://example.com{uri_relative}"),
            uri_relative: uri_relative.to_string(),
            host: "example.com".into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn cacheable_origin_response_is_stored() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).insert_header("cache-control", "max-age=60").set_body_string("hi"))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let fetcher = OriginFetcher::new(
            reqwest::Client::new(),
            mock_server.uri(),
            Arc::new(EventBus::new()),
            store.clone(),
            Duration::ZERO,
        );

        let mut request = req("/a");
        let res = Response::new(0, HeaderMap::new(), Bytes::new());
        let outcome = fetcher.fetch("GET https://example.com/a", &mut request, res).await.unwrap();
        let FetchOutcome::Fetched(res) = outcome else { panic!("expected Fetched") };
        assert_eq!(res.status, 200);
        assert_eq!(res.body, Bytes::from_static(b"hi"));
        assert!(store.read("GET https://example.com/a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn non_cacheable_origin_response_is_not_stored() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).insert_header("cache-control", "no-store").set_body_string("hi"))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let fetcher = OriginFetcher::new(
            reqwest::Client::new(),
            mock_server.uri(),
            Arc::new(EventBus::new()),
            store.clone(),
            Duration::ZERO,
        );

        let mut request = req("/a");
        let res = Response::new(0, HeaderMap::new(), Bytes::new());
        fetcher.fetch("GET https://example.com/a", &mut request, res).await.unwrap();
        assert!(store.read("GET https://example.com/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn origin_5xx_short_circuits_without_firing_origin_fetched() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let mut events = EventBus::new();
        events.on(
            events::ORIGIN_FETCHED,
            Arc::new(|_: &mut Request, _: &mut Response| panic!("origin_fetched must not fire on 5xx")),
        );
        let fetcher =
            OriginFetcher::new(reqwest::Client::new(), mock_server.uri(), Arc::new(events), store.clone(), Duration::ZERO);

        let mut request = req("/a");
        let res = Response::new(0, HeaderMap::new(), Bytes::new());
        let outcome = fetcher.fetch("GET https://example.com/a", &mut request, res).await.unwrap();
        let FetchOutcome::NotFetched(res) = outcome else { panic!("expected NotFetched") };
        assert_eq!(res.status, 503);
        assert!(store.read("GET https://example.com/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transport_failure_synthesizes_502_passthrough() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = OriginFetcher::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1".to_string(),
            Arc::new(EventBus::new()),
            store,
            Duration::ZERO,
        );

        let mut request = req("/a");
        let res = Response::new(0, HeaderMap::new(), Bytes::new());
        let outcome = fetcher.fetch("GET https://example.com/a", &mut request, res).await.unwrap();
        let FetchOutcome::NotFetched(res) = outcome else { panic!("expected NotFetched") };
        assert_eq!(res.status, 502);
    }
}

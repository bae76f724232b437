//! State Engine — orchestrates one request: classifies state, decides
//! serve/fetch/revalidate, and emits diagnostic headers.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::cacheability::request_accepts_cache;
use crate::error::Result;
use crate::events::{self, EventBus};
use crate::headers::HeaderMap;
use crate::model::{CacheState, Request, Response};
use crate::origin::{FetchOutcome, OriginFetcher};
use crate::store::CacheStore;

/// Orchestrates the request lifecycle described in the design's state
/// machine: LOOKUP against the store, FETCH from origin on miss, and the
/// diagnostic-header bookkeeping that always follows a HOT hit or a
/// SUBZERO fetch.
pub struct StateEngine {
    store: Arc<dyn CacheStore>,
    events: Arc<EventBus>,
    fetcher: OriginFetcher,
}

impl StateEngine {
    /// Assemble an engine from its collaborators.
    pub fn new(store: Arc<dyn CacheStore>, events: Arc<EventBus>, fetcher: OriginFetcher) -> Self {
        Self { store, events, fetcher }
    }

    /// Run the pipeline for one request, identified by the caller-derived
    /// opaque `cache_key` (§4.9).
    ///
    /// `request_ready`, wherever it fires, fires exactly once — except on
    /// the origin-5xx passthrough, where it is suppressed so diagnostic
    /// headers don't advertise an error as cache activity.
    #[tracing::instrument(skip(self, req), fields(method = %req.method, state))]
    pub async fn handle(&self, cache_key: &str, mut req: Request) -> Result<Response> {
        if !request_accepts_cache(&req) {
            tracing::debug!("request bypasses cache entirely");
            return self.fetch_only(cache_key, &mut req).await;
        }

        let result = match self.store.read(cache_key).await? {
            Some(mut res) => {
                res.state = Some(CacheState::Hot);
                self.events.fire(events::CACHE_ACCESSED, &mut req, &mut res)?;
                set_headers(&req.host, &mut res);
                self.events.fire(events::RESPONSE_READY, &mut req, &mut res)?;
                Ok(res)
            }
            None => match self.fetcher.fetch(cache_key, &mut req, blank_response()).await? {
                FetchOutcome::NotFetched(res) => Ok(res),
                FetchOutcome::Fetched(mut res) => {
                    res.state = Some(CacheState::Subzero);
                    set_headers(&req.host, &mut res);
                    self.events.fire(events::RESPONSE_READY, &mut req, &mut res)?;
                    Ok(res)
                }
            },
        };

        if let Ok(res) = &result {
            if let Some(state) = res.state {
                tracing::Span::current().record("state", state.as_str());
            }
        }
        result
    }

    /// Bypass path for a request the Oracle rejects outright (non-GET, or
    /// carrying `no-cache`): straight proxy through the same Origin
    /// Fetcher, with no cache-state classification, no diagnostic
    /// headers, and no `response_ready`.
    async fn fetch_only(&self, cache_key: &str, req: &mut Request) -> Result<Response> {
        match self.fetcher.fetch(cache_key, req, blank_response()).await? {
            FetchOutcome::Fetched(res) | FetchOutcome::NotFetched(res) => Ok(res),
        }
    }

    /// Extension point for the stale-while-revalidate design noted in
    /// §9's open question. `handle` never calls this — the Cache Store
    /// Adapter's `read` contract collapses any non-positive remaining TTL
    /// to a miss, so COLD/WARM are never observed on the default path. A
    /// caller wiring stale-while-revalidate would plumb the store's raw
    /// remaining TTL through here, then invoke
    /// [`crate::revalidate::RevalidationPublisher`] itself on a `Warm`
    /// result.
    pub fn classify_stale(remaining_ttl: i64, grace: Duration) -> Option<CacheState> {
        if remaining_ttl > 0 {
            return None;
        }
        let stale_for = remaining_ttl.unsigned_abs();
        if stale_for <= grace.as_secs() {
            Some(CacheState::Warm)
        } else {
            Some(CacheState::Cold)
        }
    }
}

fn blank_response() -> Response {
    Response::new(0, HeaderMap::new(), Bytes::new())
}

/// Emit `Via`, `X-Cache` and `X-Cache-State` onto `res`, which must
/// already carry an assigned [`CacheState`].
pub fn set_headers(host: &str, res: &mut Response) {
    let prefix = format!("1.1 {host}");
    match res.headers.get("via") {
        Some(existing) => {
            let combined = format!("{prefix}, {existing}");
            res.headers.set("Via", combined);
        }
        None => res.headers.set("Via", prefix),
    }

    let state = res.state.expect("set_headers requires an assigned cache state");
    res.headers.set("X-Cache", if state.is_hit() { "HIT" } else { "MISS" });
    res.headers.set("X-Cache-State", state.as_str());
}

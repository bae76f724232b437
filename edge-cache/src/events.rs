//! Event Bus — named synchronous hooks through which plugins observe and
//! mutate the request/response pair.
//!
//! Names are fixed: `cache_accessed`, `origin_required`, `origin_fetched`,
//! `response_ready`. Handlers are registered by name and run in
//! registration order; a handler that returns `Err` aborts the request
//! with a fatal fault (identical treatment to a store-protocol fault).

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::error::{CacheError, Result};
use crate::model::{Request, Response};

/// `cache_accessed` — fired when a request is served from cache.
pub const CACHE_ACCESSED: &str = "cache_accessed";
/// `origin_required` — fired before the Origin Fetcher issues its call.
pub const ORIGIN_REQUIRED: &str = "origin_required";
/// `origin_fetched` — fired after a successful origin call, before storage.
pub const ORIGIN_FETCHED: &str = "origin_fetched";
/// `response_ready` — fired exactly once before the engine returns, except
/// on the origin-5xx passthrough where it is suppressed.
pub const RESPONSE_READY: &str = "response_ready";

/// A synchronous hook invoked with `(req, res)` by shared reference; it
/// may mutate either. Implemented for plain functions/closures via the
/// blanket impl below, and for bespoke plugin types directly.
pub trait EventHandler: Send + Sync {
    /// Run the hook. An `Err` return aborts the request as a fatal fault.
    fn handle(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> std::result::Result<(), Box<dyn StdError + Send + Sync>>;
}

impl<F> EventHandler for F
where
    F: Fn(&mut Request, &mut Response) -> std::result::Result<(), Box<dyn StdError + Send + Sync>>
        + Send
        + Sync,
{
    fn handle(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> std::result::Result<(), Box<dyn StdError + Send + Sync>> {
        (self)(req, res)
    }
}

/// The process-global (per-engine-instance) handler registry. Registered
/// at startup, dispatched synchronously thereafter; mutating the
/// registry during dispatch is a programming error the design leaves
/// unguarded against, per the concurrency model's "effectively read-only
/// after startup" note.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: HashMap<&'static str, Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// An empty bus with no handlers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a named event, appended after any already
    /// registered for that name.
    pub fn on(&mut self, event: &'static str, handler: Arc<dyn EventHandler>) {
        self.handlers.entry(event).or_default().push(handler);
    }

    /// Dispatch `event` to its handlers in registration order. The first
    /// handler to error aborts dispatch and the request.
    pub fn fire(&self, event: &'static str, req: &mut Request, res: &mut Response) -> Result<()> {
        let Some(handlers) = self.handlers.get(event) else { return Ok(()) };
        for handler in handlers {
            handler
                .handle(req, res)
                .map_err(|source| CacheError::Handler { event, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use bytes::Bytes;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn req() -> Request {
        Request {
            method: Method::GET,
            uri_full: "https://example.com/".into(),
            uri_relative: "/".into(),
            host: "example.com".into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    fn res() -> Response {
        Response::new(200, HeaderMap::new(), Bytes::new())
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut bus = EventBus::new();
        bus.on(
            ORIGIN_FETCHED,
            Arc::new(|_: &mut Request, res: &mut Response| {
                res.headers.set("X-Order", "1");
                Ok(())
            }),
        );
        bus.on(
            ORIGIN_FETCHED,
            Arc::new(|_: &mut Request, res: &mut Response| {
                let prior = res.headers.get("X-Order").unwrap_or_default().to_string();
                res.headers.set("X-Order", format!("{prior},2"));
                Ok(())
            }),
        );
        let mut request = req();
        let mut response = res();
        bus.fire(ORIGIN_FETCHED, &mut request, &mut response).unwrap();
        assert_eq!(response.headers.get("x-order"), Some("1,2"));
    }

    #[test]
    fn handler_error_aborts_dispatch_and_is_fatal() {
        let mut bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        bus.on(
            RESPONSE_READY,
            Arc::new(move |_: &mut Request, _: &mut Response| {
                calls2.fetch_add(1, Ordering::SeqCst);
                Err("boom".into())
            }),
        );
        bus.on(
            RESPONSE_READY,
            Arc::new(move |_: &mut Request, _: &mut Response| {
                panic!("second handler must not run");
            }),
        );
        let mut request = req();
        let mut response = res();
        let err = bus.fire(RESPONSE_READY, &mut request, &mut response).unwrap_err();
        assert!(matches!(err, CacheError::Handler { event: RESPONSE_READY, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_event_is_a_no_op() {
        let bus = EventBus::new();
        let mut request = req();
        let mut response = res();
        bus.fire("response_ready", &mut request, &mut response).unwrap();
    }
}

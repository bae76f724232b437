#![forbid(unsafe_code)]
#![deny(missing_docs, unused_import_braces, unused_extern_crates)]
//! Cache-state engine and response pipeline for a reverse-proxy HTTP
//! cache.
//!
//! This crate implements the hard part of a reverse-proxy cache sitting
//! in front of an origin server: classifying a request's interaction
//! with the cache into one of four states, deciding whether to serve
//! from cache or fetch from origin, computing the TTL to store from
//! `Cache-Control`/`Expires`, persisting the entity atomically in a
//! shared Redis-backed store, and firing a small set of named lifecycle
//! events through which plugins may mutate the request/response before
//! storage or before send.
//!
//! The HTTP listener, request parser, and connection termination are
//! external collaborators — see the sibling `edge-cache-server` crate
//! for a Tower/Axum adapter that drives [`StateEngine::handle`] from real
//! inbound requests.
//!
//! ```no_run
//! use edge_cache::{EventBus, OriginFetcher, RedisStore, StateEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = deadpool_redis::Config::from_url("redis://127.0.0.1:6379/0");
//! let pool = cfg.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
//! let store: Arc<dyn edge_cache::CacheStore> = Arc::new(RedisStore::new(pool));
//! let events = Arc::new(EventBus::new());
//! let fetcher = OriginFetcher::new(
//!     reqwest::Client::new(),
//!     "http://127.0.0.1:8080".to_string(),
//!     events.clone(),
//!     store.clone(),
//!     Duration::ZERO,
//! );
//! let engine = StateEngine::new(store, events, fetcher);
//! # let _ = engine;
//! # Ok(())
//! # }
//! ```

mod cacheability;
mod config;
mod engine;
mod error;
mod events;
mod headers;
mod model;
mod origin;
mod revalidate;
mod store;
mod ttl;

pub use cacheability::{request_accepts_cache, response_is_cacheable};
pub use config::{load as load_config, EngineConfig, KeepaliveConfig, RedisConfig};
pub use engine::{set_headers, StateEngine};
pub use error::{CacheError, Result};
pub use events::{EventBus, EventHandler, CACHE_ACCESSED, ORIGIN_FETCHED, ORIGIN_REQUIRED, RESPONSE_READY};
pub use headers::HeaderMap;
pub use model::{CacheEntry, CacheState, Request, Response};
pub use origin::{FetchOutcome, OriginFetcher};
pub use revalidate::RevalidationPublisher;
pub use store::{CacheStore, MemoryStore, RedisStore, EXPIRY_INDEX_KEY, REVALIDATE_CHANNEL};
pub use ttl::{calculate as calculate_ttl, Ttl};

//! Runs the cache in front of a stub origin so its behaviour can be
//! poked at with curl.
//!
//! ```bash
//! cargo run --example reverse_proxy
//!
//! curl -v http://localhost:3000/          # first request: MISS
//! curl -v http://localhost:3000/          # second request: HIT
//! curl -v http://localhost:3000/no-store  # never cached
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use edge_cache::{CacheStore, EventBus, MemoryStore, OriginFetcher, StateEngine};
use edge_cache_server::CacheService;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let origin = Router::new()
        .route("/", get(|| async { ([("cache-control", "max-age=60")], "hello from origin") }))
        .route("/no-store", get(|| async { ([("cache-control", "no-store")], "never cached") }));
    let origin_listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await.unwrap();
    let origin_addr = origin_listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(origin_listener, origin).await.unwrap();
    });

    let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
    let events = Arc::new(EventBus::new());
    let fetcher = OriginFetcher::new(
        reqwest::Client::new(),
        format!("http://{origin_addr}"),
        events.clone(),
        store.clone(),
        Duration::ZERO,
    );
    let engine = Arc::new(StateEngine::new(store, events, fetcher));
    let service = CacheService::with_default_keyer(engine);
    // `CacheService` is terminal, not a `Router`; mount it as the fallback
    // so `axum::serve` sees the `axum::body::Body` response type it needs.
    let app = Router::new().fallback_service(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("cache listening on http://127.0.0.1:3000, proxying to http://{origin_addr}");
    axum::serve(listener, app).await.unwrap();
}

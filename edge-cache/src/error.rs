use miette::Diagnostic;
use thiserror::Error;

/// A `Result` typedef to use with the [`CacheError`] type
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised by the cache-state engine and its collaborators.
///
/// Store-protocol faults and event-handler errors are both fatal for the
/// request (`Fault` / `Handler`). Upstream 5xx and transport failures are
/// not represented here at all — they are handled as ordinary response
/// passthrough rather than as errors.
#[derive(Error, Diagnostic, Debug)]
pub enum CacheError {
    /// A pipelined store operation returned an error, or a read violated
    /// the "positive TTL implies a complete hash" shape contract.
    #[error("cache store fault: {0}")]
    #[diagnostic(code(edge_cache::store_fault))]
    Fault(String),

    /// An event handler returned an error. Treated identically to a
    /// store-protocol fault: fatal for the request.
    #[error("event handler `{event}` failed: {source}")]
    #[diagnostic(code(edge_cache::handler_fault))]
    Handler {
        /// The event name being dispatched when the handler failed.
        event: &'static str,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The Oracle returned non-cacheable but `write` was invoked anyway.
    /// This is a programming error in the caller, not a runtime fault.
    #[error("attempted to store a non-cacheable response")]
    #[diagnostic(code(edge_cache::cacheability_violation))]
    CacheabilityViolation,

    /// There was an error parsing an HTTP header value
    #[error(transparent)]
    #[diagnostic(code(edge_cache::invalid_header_value))]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Error from the Redis client.
    #[error(transparent)]
    #[diagnostic(code(edge_cache::redis))]
    Redis(#[from] redis::RedisError),

    /// Error acquiring a pooled Redis connection.
    #[error(transparent)]
    #[diagnostic(code(edge_cache::redis_pool))]
    RedisPool(#[from] deadpool_redis::PoolError),

    /// Error performing the upstream origin request.
    #[error(transparent)]
    #[diagnostic(code(edge_cache::origin_transport))]
    OriginTransport(#[from] reqwest::Error),
}

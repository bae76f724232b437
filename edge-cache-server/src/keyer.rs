//! Derives the opaque cache key a [`crate::CacheService`] passes to
//! [`edge_cache::StateEngine::handle`].

use edge_cache::Request;

/// Derives a cache key from a request. The engine treats the key as an
/// opaque string; it never parses it back out.
pub trait Keyer {
    /// Compute the cache key for `req`.
    fn key(&self, req: &Request) -> String;
}

/// The default keying scheme: `METHOD uri_full`, matching the shape the
/// engine's own tests use (§4.9's "method plus absolute URI" rule).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyer;

impl Keyer for DefaultKeyer {
    fn key(&self, req: &Request) -> String {
        format!("{} {}", req.method, req.uri_full)
    }
}

impl<F> Keyer for F
where
    F: Fn(&Request) -> String,
{
    fn key(&self, req: &Request) -> String {
        self(req)
    }
}

//! TTL Calculator — derives `(ttl_seconds, absolute_expiry_epoch)` from a
//! cacheable response's `Cache-Control`/`Expires` headers, per the fixed
//! precedence: `s-maxage` > `max-age` > `Expires` > 0.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::model::Response;

/// Result of TTL derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttl {
    /// Seconds of freshness to hand to the store's `EXPIRE`, including any
    /// `serve_when_stale` grace.
    pub ttl_seconds: u64,
    /// Absolute epoch-second expiry to record in the expiry index.
    /// Computed as `now + ttl_seconds_without_grace`, per §9's resolved
    /// open question (the index does not get the grace added).
    pub absolute_expiry: u64,
}

fn now_epoch() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs()
}

/// Parse an exact `directive=N` token out of a `Cache-Control` value.
/// No directive-list semantics beyond finding the named token followed by
/// `=` and a non-negative integer; this mirrors the literal-value stance
/// of the Cacheability Oracle.
fn find_directive_value(cache_control: &str, directive: &str) -> Option<i64> {
    for part in cache_control.split(',') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix(directive) {
            if let Some(value) = value.strip_prefix('=') {
                return value.trim().parse::<i64>().ok();
            }
        }
    }
    None
}

/// Derive the storage TTL and absolute expiry for a response already
/// confirmed cacheable by the Oracle. `serve_when_stale` is a grace period
/// (design-level configurable, default zero) added to the TTL handed to
/// the store but never to the absolute expiry recorded in the index.
pub fn calculate(res: &Response, serve_when_stale: Duration) -> Ttl {
    let now = now_epoch();

    let base_ttl: i64 = if let Some(cc) = res.headers.get("cache-control") {
        if let Some(s_maxage) = find_directive_value(cc, "s-maxage") {
            s_maxage
        } else if let Some(max_age) = find_directive_value(cc, "max-age") {
            max_age
        } else {
            ttl_from_expires(res, now)
        }
    } else {
        ttl_from_expires(res, now)
    };

    let base_ttl = base_ttl.max(0) as u64;
    let ttl_seconds = base_ttl.saturating_add(serve_when_stale.as_secs());
    let absolute_expiry = now.saturating_add(base_ttl);

    Ttl { ttl_seconds, absolute_expiry }
}

fn ttl_from_expires(res: &Response, now: u64) -> i64 {
    let Some(expires) = res.headers.get("expires") else { return 0 };
    match httpdate::parse_http_date(expires) {
        Ok(expiry) => {
            let expiry_epoch =
                expiry.duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0);
            expiry_epoch - now as i64
        }
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use bytes::Bytes;

    fn http_date_in(seconds: i64) -> String {
        let target = SystemTime::now() + Duration::from_secs(seconds.max(0) as u64);
        httpdate::fmt_http_date(target)
    }

    fn res_with(cache_control: Option<&str>, expires_in: Option<i64>) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(cc) = cache_control {
            headers.set("Cache-Control", cc);
        }
        if let Some(secs) = expires_in {
            headers.set("Expires", http_date_in(secs));
        }
        Response::new(200, headers, Bytes::new())
    }

    #[test]
    fn s_maxage_wins_over_max_age_and_expires() {
        let res = res_with(Some("max-age=600, s-maxage=1200"), Some(300));
        let ttl = calculate(&res, Duration::ZERO);
        assert_eq!(ttl.ttl_seconds, 1200);
    }

    #[test]
    fn max_age_wins_over_expires() {
        let res = res_with(Some("max-age=600"), Some(300));
        let ttl = calculate(&res, Duration::ZERO);
        assert_eq!(ttl.ttl_seconds, 600);
    }

    #[test]
    fn bare_expires_is_used() {
        let res = res_with(None, Some(300));
        let ttl = calculate(&res, Duration::ZERO);
        // allow a one-second rounding slop from the http-date's second resolution
        assert!((299..=300).contains(&ttl.ttl_seconds), "{}", ttl.ttl_seconds);
    }

    #[test]
    fn no_directives_is_zero() {
        let res = res_with(None, None);
        let ttl = calculate(&res, Duration::ZERO);
        assert_eq!(ttl.ttl_seconds, 0);
    }

    #[test]
    fn negative_results_clamp_to_zero() {
        let res = res_with(None, Some(-600));
        let ttl = calculate(&res, Duration::ZERO);
        assert_eq!(ttl.ttl_seconds, 0);
    }

    #[test]
    fn unparseable_expires_degrades_to_zero() {
        let mut headers = HeaderMap::new();
        headers.set("Expires", "not a date");
        let res = Response::new(200, headers, Bytes::new());
        let ttl = calculate(&res, Duration::ZERO);
        assert_eq!(ttl.ttl_seconds, 0);
    }

    #[test]
    fn serve_when_stale_grace_extends_store_ttl_but_not_absolute_expiry() {
        let res = res_with(Some("max-age=600"), None);
        let without_grace = calculate(&res, Duration::ZERO);
        let with_grace = calculate(&res, Duration::from_secs(30));
        assert_eq!(with_grace.ttl_seconds, without_grace.ttl_seconds + 30);
        assert_eq!(with_grace.absolute_expiry, without_grace.absolute_expiry);
    }
}

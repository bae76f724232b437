//! Cacheability Oracle — two predicates over the literal value of a few
//! named headers. No directive-list parsing is performed (§9 REDESIGN
//! FLAGS is explicit that this imprecision — `max-age=0` not being
//! recognized as a no-cache signal, `private` alongside another directive
//! not being caught — is to be *kept*, not fixed, by an implementer
//! reproducing this behavior).

use http::Method;

use crate::model::Request;
use crate::model::Response;

/// True iff the request accepts a cached response: method is `GET` and
/// neither `Cache-Control: no-cache` nor `Pragma: no-cache` appears as the
/// header's entire value.
pub fn request_accepts_cache(req: &Request) -> bool {
    if req.method != Method::GET {
        return false;
    }
    if req.headers.value_eq_ignore_ascii_case("cache-control", "no-cache") {
        return false;
    }
    if req.headers.value_eq_ignore_ascii_case("pragma", "no-cache") {
        return false;
    }
    true
}

/// True unless any of the following appears as the entire value of the
/// named response header (case-insensitive): `Pragma: no-cache`,
/// `Cache-Control: no-cache | must-revalidate | no-store | private`.
///
/// `Cache-Control: max-age=600` is therefore cacheable — it isn't any of
/// the literal tokens above.
pub fn response_is_cacheable(res: &Response) -> bool {
    if res.headers.value_eq_ignore_ascii_case("pragma", "no-cache") {
        return false;
    }
    const NON_CACHEABLE_CACHE_CONTROL: [&str; 4] =
        ["no-cache", "must-revalidate", "no-store", "private"];
    if let Some(cc) = res.headers.get("cache-control") {
        if NON_CACHEABLE_CACHE_CONTROL.iter().any(|tok| cc.eq_ignore_ascii_case(tok)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use bytes::Bytes;

    fn req(method: Method, cc: Option<&str>, pragma: Option<&str>) -> Request {
        let mut headers = HeaderMap::new();
        if let Some(cc) = cc {
            headers.set("Cache-Control", cc);
        }
        if let Some(p) = pragma {
            headers.set("Pragma", p);
        }
        Request {
            method,
            uri_full: "https://example.com/".into(),
            uri_relative: "/".into(),
            host: "example.com".into(),
            headers,
            body: None,
        }
    }

    fn res(cc: Option<&str>, pragma: Option<&str>) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(cc) = cc {
            headers.set("Cache-Control", cc);
        }
        if let Some(p) = pragma {
            headers.set("Pragma", p);
        }
        Response::new(200, headers, Bytes::new())
    }

    #[test]
    fn get_with_no_directives_is_cacheable() {
        assert!(request_accepts_cache(&req(Method::GET, None, None)));
    }

    #[test]
    fn non_get_is_never_cacheable() {
        assert!(!request_accepts_cache(&req(Method::POST, None, None)));
        assert!(!request_accepts_cache(&req(Method::HEAD, None, None)));
    }

    #[test]
    fn request_no_cache_directives_reject() {
        assert!(!request_accepts_cache(&req(Method::GET, Some("no-cache"), None)));
        assert!(!request_accepts_cache(&req(Method::GET, None, Some("no-cache"))));
    }

    #[test]
    fn response_max_age_is_cacheable() {
        assert!(response_is_cacheable(&res(Some("max-age=600"), None)));
    }

    #[test]
    fn response_literal_non_cacheable_tokens_reject() {
        for tok in ["no-cache", "must-revalidate", "no-store", "private"] {
            assert!(!response_is_cacheable(&res(Some(tok), None)), "{tok}");
        }
        assert!(!response_is_cacheable(&res(None, Some("no-cache"))));
    }

    #[test]
    fn response_with_no_headers_is_cacheable() {
        assert!(response_is_cacheable(&res(None, None)));
    }
}

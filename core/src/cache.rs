//! Process-wide response cache.
//!
//! The timing scanner sends the same baseline probe many times; to keep
//! repeated identical requests from re-hitting the network, every response
//! is stored under a fingerprint of the request that produced it. Reads
//! are gated behind an explicit `ignore_cache` flag carried on the lookup
//! key itself, matching the Go original's `IgnoreCache` field on
//! `scanOptions` (`original_source/scanutil/scanOptions.go`) used by
//! `scanners/timing_scanner.go` to force fresh sends when measuring delay.

use crate::response::HttpResponse;
use std::collections::HashMap;

fn fingerprint(method: &str, url: &str, body: &str, ignore_cache: bool) -> String {
    let raw = format!("{method}{url}{body}{ignore_cache}");
    format!("{:x}", md5::compute(raw.as_bytes()))
}

/// An in-memory cache of prior responses, keyed by request fingerprint.
/// Every send is recorded; only reads are conditional on `ignore_cache`.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, HttpResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        ResponseCache { entries: HashMap::new() }
    }

    /// Returns a cached response for this exact request, unless
    /// `ignore_cache` is set, in which case lookups always miss.
    pub fn get(&self, method: &str, url: &str, body: &str, ignore_cache: bool) -> Option<&HttpResponse> {
        if ignore_cache {
            return None;
        }
        self.entries.get(&fingerprint(method, url, body, ignore_cache))
    }

    /// Records `response` against this request's fingerprint, regardless
    /// of `ignore_cache` -- the flag only ever suppresses reads.
    pub fn put(&mut self, method: &str, url: &str, body: &str, ignore_cache: bool, response: HttpResponse) {
        self.entries
            .insert(fingerprint(method, url, body, ignore_cache), response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn resp(body: &str) -> HttpResponse {
        HttpResponse { status: 200, headers: Map::new(), body: body.to_string(), elapsed_ms: 0 }
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut cache = ResponseCache::new();
        cache.put("GET", "http://x/a", "", false, resp("hello"));
        let found = cache.get("GET", "http://x/a", "", false);
        assert_eq!(found.unwrap().body, "hello");
    }

    #[test]
    fn ignore_cache_always_misses_on_read() {
        let mut cache = ResponseCache::new();
        cache.put("GET", "http://x/a", "", false, resp("hello"));
        assert!(cache.get("GET", "http://x/a", "", true).is_none());
    }

    #[test]
    fn different_requests_do_not_collide() {
        let mut cache = ResponseCache::new();
        cache.put("GET", "http://x/a", "", false, resp("a"));
        cache.put("GET", "http://x/b", "", false, resp("b"));
        assert_eq!(cache.get("GET", "http://x/a", "", false).unwrap().body, "a");
        assert_eq!(cache.get("GET", "http://x/b", "", false).unwrap().body, "b");
    }
}

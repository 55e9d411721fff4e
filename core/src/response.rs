//! Captured HTTP response and its equality predicates.
//!
//! Grounded in `original_source/scanutil/HTTPResponseObject.go`: scanners
//! compare responses by body/status only (`ContentEquals`, used by the
//! boolean-blind and error scanners to tell a baseline from a probe) or by
//! body/status/headers (`DeepEquals`, unused by any in-scope scanner but
//! kept as a documented equality tier for completeness).

use std::collections::HashMap;

/// A captured HTTP response, read fully into memory.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub elapsed_ms: u128,
}

impl HttpResponse {
    /// True if status and body are identical. This is the comparison the
    /// blind-boolean and error scanners use to distinguish a probe response
    /// from the recorded baseline.
    pub fn content_equals(&self, other: &HttpResponse) -> bool {
        self.status == other.status && self.body == other.body
    }

    /// True if status, body, and headers are all identical.
    pub fn deep_equals(&self, other: &HttpResponse) -> bool {
        self.content_equals(other) && self.headers == other.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn content_equals_ignores_headers() {
        let mut a = resp(200, "ok");
        let mut b = resp(200, "ok");
        a.headers.insert("x-a".into(), "1".into());
        b.headers.insert("x-b".into(), "2".into());
        assert!(a.content_equals(&b));
        assert!(!a.deep_equals(&b));
    }

    #[test]
    fn content_equals_detects_status_or_body_differences() {
        let a = resp(200, "ok");
        assert!(!a.content_equals(&resp(500, "ok")));
        assert!(!a.content_equals(&resp(200, "different")));
    }

    #[test]
    fn deep_equals_requires_matching_headers() {
        let mut a = resp(200, "ok");
        let mut b = resp(200, "ok");
        a.headers.insert("x".into(), "1".into());
        b.headers.insert("x".into(), "1".into());
        assert!(a.deep_equals(&b));
    }
}

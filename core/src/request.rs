//! Scan configuration and the mutable attack request model.
//!
//! `ScanOptions` is grounded in `original_source/scanutil/scanOptions.go`.
//! `AttackObject` is grounded in `original_source/scanutil/attackObject.go`
//! and its test contract in `attackObject_test.go`: a baseline request plus
//! mutable query/body state that every scanner mutates and restores
//! in-place, with `Copy()` giving scanners an isolated clone to probe with.

use crate::body::{self, BodyItem};
use crate::catalog::{VERSION, VERSION_NAME};
use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::env;
use url::Url;

/// How a request body should be interpreted when flattening it into
/// [`BodyItem`]s. Grounded in the teacher's `detect_body_type`
/// (`src/http/mod.rs`), narrowed to the two encodings the spec scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Json,
    FormUrlEncoded,
    None,
}

impl BodyType {
    pub fn from_content_type(content_type: Option<&str>) -> BodyType {
        match content_type {
            Some(ct) if ct.contains("application/json") => BodyType::Json,
            Some(ct) if ct.contains("application/x-www-form-urlencoded") => {
                BodyType::FormUrlEncoded
            }
            _ => BodyType::None,
        }
    }
}

/// User-supplied scan configuration: what to scan, and how to reach it.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub target: Option<String>,
    pub raw_request_path: Option<String>,
    pub proxy_input: Option<String>,
    pub user_agent_input: Option<String>,
    pub request_data: Option<String>,
    pub require_https: bool,
    pub sleep_ms: u64,
}

impl ScanOptions {
    /// The proxy to use, falling back to `HTTP_PROXY` when not set
    /// explicitly, matching the Go original's `Proxy()`.
    pub fn proxy(&self) -> Option<String> {
        self.proxy_input
            .clone()
            .or_else(|| env::var("HTTP_PROXY").ok())
    }

    /// The User-Agent header to send, defaulting to an identifying string
    /// for this engine when not overridden.
    pub fn user_agent(&self) -> String {
        self.user_agent_input
            .clone()
            .unwrap_or_else(|| format!("NoSQLInjector: {VERSION_NAME} v{VERSION}"))
    }
}

/// Percent-encodes a query key, leaving `[` and `]` literal so Mongo/Express
/// style operator keys (`role[$ne]`) survive on the wire unescaped.
fn encode_query_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'[' | b']' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Percent-encodes a query value using the standard unreserved set, with no
/// exception for brackets.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// A request under test, with the query string and body kept both in their
/// original ("baseline") form and in a mutable working form that scanners
/// rewrite probe-by-probe.
#[derive(Debug, Clone)]
pub struct AttackObject {
    pub method: String,
    base_url: Url,
    query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    original_body: String,
    body: String,
    pub body_type: BodyType,
    /// When set, bypasses cache reads for every send of this object.
    /// The timing scanner sets this so repeated identical probes still
    /// measure a real round-trip instead of replaying a cached latency.
    pub ignore_cache: bool,
}

impl AttackObject {
    pub fn new(
        method: impl Into<String>,
        url: Url,
        headers: HashMap<String, String>,
        body: String,
        body_type: BodyType,
    ) -> Self {
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let mut base_url = url;
        base_url.set_query(None);
        AttackObject {
            method: method.into(),
            base_url,
            query,
            headers,
            original_body: body.clone(),
            body,
            body_type,
            ignore_cache: false,
        }
    }

    /// Marks this object so every [`crate::client::HttpTransport`] send
    /// bypasses cache reads (the write still happens). Used by the timing
    /// scanner, per spec: `IgnoreCache` never suppresses the cache write,
    /// only the read.
    pub fn set_ignore_cache(&mut self, ignore: bool) {
        self.ignore_cache = ignore;
    }

    /// Builds an `AttackObject` for a bare target URL: a GET request with
    /// no body, used when no raw request file or request data was given.
    pub fn from_target(opts: &ScanOptions) -> Result<Self> {
        let target = opts
            .target
            .as_ref()
            .ok_or_else(|| EngineError::Config("no target URL or raw request provided".into()))?;
        let url = Url::parse(target)?;
        if opts.require_https && url.scheme() != "https" {
            return Err(EngineError::Config(format!(
                "target {target} does not use https and --https was required"
            )));
        }
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), opts.user_agent());
        let (method, body, body_type) = match &opts.request_data {
            Some(data) => (
                "POST".to_string(),
                data.clone(),
                BodyType::Json,
            ),
            None => ("GET".to_string(), String::new(), BodyType::None),
        };
        if body_type == BodyType::Json {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        Ok(AttackObject::new(method, url, headers, body, body_type))
    }

    /// The full URL the request should currently be sent to, query string
    /// included.
    ///
    /// Built by hand rather than through `Url::query_pairs_mut`, which
    /// percent-encodes `[` and `]` in keys. Per spec §4.2, operator-style
    /// keys like `param[$regex]` must reach the wire with their brackets
    /// literal -- that's the syntax Express/Mongoose query parsers expect --
    /// so keys are encoded with a narrower reserved set than values.
    pub fn request_url(&self) -> Url {
        let mut url = self.base_url.clone();
        if self.query.is_empty() {
            url.set_query(None);
            return url;
        }
        let qs = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", encode_query_key(k), encode_query_value(v)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&qs));
        url
    }

    pub fn query_keys(&self) -> Vec<String> {
        self.query.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Rewrites every occurrence of `key` in the query string to `value`.
    /// If `key` is not present, appends it.
    pub fn set_query_param(&mut self, key: &str, value: &str) {
        let mut found = false;
        for (k, v) in self.query.iter_mut() {
            if k == key {
                *v = value.to_string();
                found = true;
            }
        }
        if !found {
            self.query.push((key.to_string(), value.to_string()));
        }
    }

    /// Rewrites the key itself for every pair currently named `key`,
    /// leaving the value untouched. Used by the operator scanner to turn
    /// `p=value` into `p[$ne]=value`.
    pub fn rename_query_key(&mut self, key: &str, new_key: &str) {
        for (k, _) in self.query.iter_mut() {
            if k == key {
                *k = new_key.to_string();
            }
        }
    }

    /// Rewrites both the key and value for every pair currently named
    /// `key` in a single step, e.g. turning `p=1` into `p[$ne]=a`.
    pub fn override_query_pair(&mut self, key: &str, new_key: &str, new_value: &str) {
        for (k, v) in self.query.iter_mut() {
            if k == key {
                *k = new_key.to_string();
                *v = new_value.to_string();
            }
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: String) {
        self.body = body;
    }

    /// Resets the body to the value it held when this `AttackObject` was
    /// constructed (or last had [`Self::set_body`] called with intent to
    /// become the new baseline -- scanners never call that, only
    /// `restore_body`, so the original is always recoverable).
    pub fn restore_body(&mut self) {
        self.body = self.original_body.clone();
    }

    /// Flattens the current body into injectable values, per
    /// [`Self::body_type`].
    pub fn body_values(&self) -> Result<Vec<BodyItem>> {
        match self.body_type {
            BodyType::Json => body::extract_json_body_values(&self.body),
            BodyType::FormUrlEncoded => Ok(body::extract_form_body_values(&self.body)),
            BodyType::None => Ok(Vec::new()),
        }
    }

    /// Like [`Self::body_values`], but a `BodyParseError` is logged and
    /// treated as "no body positions to scan" rather than propagated --
    /// per spec §7, a body that claims JSON but fails to parse is fatal
    /// only for the body-position half of the current request, not the
    /// whole scan.
    pub fn body_values_or_warn(&self) -> Vec<BodyItem> {
        self.body_values().unwrap_or_else(|err| {
            log::warn!("skipping body-position scanning: {err}");
            Vec::new()
        })
    }

    /// Replaces the `index`-th occurrence of `pattern` in the body with
    /// `payload`. For form-encoded bodies `index` is ignored (form
    /// replacement is always all-at-once, per spec §4.1); a no-op when
    /// there is no body to mutate.
    pub fn replace_body_object(
        &mut self,
        pattern: &str,
        payload: &str,
        replace_key: bool,
        index: i64,
    ) -> Result<()> {
        match self.body_type {
            BodyType::Json => {
                self.body =
                    body::replace_body_object(&self.body, pattern, payload, replace_key, index)?;
            }
            BodyType::FormUrlEncoded => {
                self.body = body::replace_form_body_object(&self.body, pattern, payload, replace_key);
            }
            BodyType::None => {}
        }
        Ok(())
    }

    /// Replaces the `index`-th occurrence of a string value `pattern` with
    /// a raw (unquoted) object literal, e.g. `{"$regex": ".*"}`. Only
    /// meaningful for JSON bodies; a no-op otherwise.
    pub fn inject_raw_body_value(&mut self, pattern: &str, raw: &str, index: i64) -> Result<()> {
        if self.body_type != BodyType::Json {
            return Ok(());
        }
        self.body = body::replace_body_value_raw(&self.body, pattern, raw, index)?;
        Ok(())
    }

    /// An independent clone scanners can mutate freely without affecting
    /// the caller's copy. Verified in tests via divergent bodies after
    /// mutation, mirroring the Go original's `Copy()` contract.
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

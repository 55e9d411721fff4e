//! Pluggable HTTP transport.
//!
//! Grounded in the teacher's `HttpClient` (`src/http/client.rs`): a
//! narrow, swappable send interface built on `reqwest`, with TLS
//! verification disabled (black-box scanning routinely hits self-signed
//! lab targets) and an optional upstream proxy. The teacher's random
//! User-Agent rotation is dropped -- this engine sends one fixed,
//! identifying User-Agent per `ScanOptions::user_agent`.

use crate::cache::ResponseCache;
use crate::error::{EngineError, Result};
use crate::request::AttackObject;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Anything that can send an [`AttackObject`] and return the response it
/// produced. Scanners depend on this trait, not on `reqwest` directly, so
/// tests can substitute a fake transport with scripted responses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, attack: &AttackObject) -> Result<HttpResponse>;
}

/// Default transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(proxy: Option<String>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(true);
        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(&proxy_url).map_err(EngineError::Transport)?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(EngineError::Transport)?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
        let url = attack.request_url();
        let method = reqwest::Method::from_bytes(attack.method.as_bytes())
            .map_err(|e| EngineError::Config(format!("invalid HTTP method: {e}")))?;
        let mut builder = self.client.request(method, url);
        for (name, value) in &attack.headers {
            builder = builder.header(name, value);
        }
        if !attack.body().is_empty() {
            builder = builder.body(attack.body().to_string());
        }

        let start = Instant::now();
        let resp = builder.send().await.map_err(EngineError::Transport)?;
        let status = resp.status().as_u16();
        let headers: HashMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = resp.text().await.map_err(EngineError::Transport)?;
        let elapsed_ms = start.elapsed().as_millis();

        Ok(HttpResponse { status, headers, body, elapsed_ms })
    }
}

/// Decorates any [`HttpTransport`] with the process-wide response cache
/// described in spec §4.3: reads are served from the cache unless the
/// probe's `ignore_cache` flag is set, and every send (hit or miss) is
/// recorded, so two semantically identical probes within one run cost at
/// most one round trip. Transport-level failures are caught here, logged,
/// and turned into an empty response rather than aborting the scan --
/// spec §7 treats a `TransportError` as "no finding for this probe", not
/// a reason to stop scanning.
pub struct CachingTransport {
    inner: Box<dyn HttpTransport>,
    cache: Mutex<ResponseCache>,
}

impl CachingTransport {
    pub fn new(inner: Box<dyn HttpTransport>) -> Self {
        CachingTransport { inner, cache: Mutex::new(ResponseCache::new()) }
    }
}

#[async_trait]
impl HttpTransport for CachingTransport {
    async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
        let url = attack.request_url().to_string();
        let body = attack.body().to_string();
        let ignore_cache = attack.ignore_cache;

        if let Some(cached) = self
            .cache
            .lock()
            .expect("response cache mutex poisoned")
            .get(&attack.method, &url, &body, ignore_cache)
            .cloned()
        {
            return Ok(cached);
        }

        let response = match self.inner.send(attack).await {
            Ok(resp) => resp,
            Err(err) => {
                log::warn!("transport error probing {url}: {err}");
                HttpResponse { status: 0, headers: HashMap::new(), body: String::new(), elapsed_ms: 0 }
            }
        };

        self.cache
            .lock()
            .expect("response cache mutex poisoned")
            .put(&attack.method, &url, &body, ignore_cache, response.clone());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::BodyType;
    use url::Url;

    #[test]
    fn transport_builds_without_a_proxy() {
        assert!(ReqwestTransport::new(None).is_ok());
    }

    #[test]
    fn invalid_proxy_url_is_reported() {
        assert!(ReqwestTransport::new(Some("not a url".into())).is_err());
    }

    #[tokio::test]
    async fn send_against_an_unreachable_host_returns_a_transport_error() {
        let transport = ReqwestTransport::new(None).unwrap();
        let attack = AttackObject::new(
            "GET",
            Url::parse("http://127.0.0.1:1").unwrap(),
            HashMap::new(),
            String::new(),
            BodyType::None,
        );
        let result = transport.send(&attack).await;
        assert!(result.is_err());
    }

    fn att(ignore_cache: bool) -> AttackObject {
        let mut a = AttackObject::new(
            "GET",
            Url::parse("http://example.com/a?x=1").unwrap(),
            HashMap::new(),
            String::new(),
            BodyType::None,
        );
        a.set_ignore_cache(ignore_cache);
        a
    }

    #[tokio::test]
    async fn caching_transport_ignore_cache_forces_a_fresh_send() {
        struct Counter(std::sync::atomic::AtomicUsize);
        #[async_trait]
        impl HttpTransport for Counter {
            async fn send(&self, _attack: &AttackObject) -> Result<HttpResponse> {
                let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(HttpResponse { status: 200, headers: HashMap::new(), body: n.to_string(), elapsed_ms: 1 })
            }
        }

        let caching = CachingTransport::new(Box::new(Counter(std::sync::atomic::AtomicUsize::new(0))));
        let first = caching.send(&att(false)).await.unwrap();
        let second = caching.send(&att(false)).await.unwrap();
        assert_eq!(first.body, second.body, "second send should be served from cache");

        let third = caching.send(&att(true)).await.unwrap();
        assert_ne!(third.body, second.body, "ignore_cache must force a real send");
    }

    #[tokio::test]
    async fn caching_transport_turns_transport_errors_into_an_empty_response() {
        struct AlwaysFails;
        #[async_trait]
        impl HttpTransport for AlwaysFails {
            async fn send(&self, _attack: &AttackObject) -> Result<HttpResponse> {
                Err(EngineError::Config("boom".into()))
            }
        }
        let caching = CachingTransport::new(Box::new(AlwaysFails));
        let resp = caching.send(&att(false)).await.unwrap();
        assert_eq!(resp.status, 0);
        assert!(resp.body.is_empty());
    }
}

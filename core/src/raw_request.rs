//! Loading a scan target from a raw HTTP request file (Burp/curl-style
//! `-r` input), as an alternative to a bare target URL.
//!
//! There is no direct Go counterpart for this loader -- the Go original
//! only ever took a target URL or inline `--data`
//! (`original_source/cmd/root.go`) -- so its shape follows the spec's
//! description of the feature directly, written in the style of the rest
//! of this module: a plain parser returning an [`AttackObject`].

use crate::error::{EngineError, Result};
use crate::request::{AttackObject, BodyType, ScanOptions};
use std::collections::HashMap;
use url::Url;

/// Parses a raw HTTP request (request line, headers, blank line, body) and
/// builds the `AttackObject` it describes. `scheme_host` supplies the
/// scheme and host the request targets, since a raw request's start line
/// only carries a path.
pub fn parse_raw_request(raw: &str, scheme_host: &str, opts: &ScanOptions) -> Result<AttackObject> {
    let mut lines = raw.split("\r\n").collect::<Vec<_>>();
    if lines.len() == 1 {
        lines = raw.split('\n').collect();
    }
    let mut iter = lines.into_iter();

    let request_line = iter
        .next()
        .ok_or_else(|| EngineError::RawRequest("empty raw request file".into()))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| EngineError::RawRequest("missing method in request line".into()))?
        .to_string();
    let path = parts
        .next()
        .ok_or_else(|| EngineError::RawRequest("missing path in request line".into()))?;

    let mut headers = HashMap::new();
    let mut body_lines = Vec::new();
    let mut in_body = false;
    for line in iter {
        if in_body {
            body_lines.push(line);
            continue;
        }
        if line.is_empty() {
            in_body = true;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    let body = match &opts.request_data {
        Some(data) => data.clone(),
        None => body_lines.join("\n"),
    };

    let host_header = headers.get("Host").cloned();
    let base = match host_header {
        Some(host) => format!("{scheme_host}://{host}"),
        None => scheme_host.to_string(),
    };
    let full_url = format!("{}{}", base.trim_end_matches('/'), path);
    let url = Url::parse(&full_url)?;

    let body_type = BodyType::from_content_type(headers.get("Content-Type").map(String::as_str));

    Ok(AttackObject::new(method, url, headers, body, body_type))
}

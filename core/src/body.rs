//! Request body introspection: flattening a JSON or form body into a list
//! of injectable values, and replacing the Nth occurrence of a value with
//! an injected payload while leaving the rest of the body untouched.
//!
//! Grounded in `original_source/scanutil/attackObject_test.go` (the
//! `BodyValues`/`ReplaceBodyObject` contract, including its exact
//! before/after body strings for string/number/bool/object patterns) and
//! `original_source/scanutil/jsonUtils.go` (`FlattenJSON`, `jsonType`).

use crate::error::{EngineError, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// A single key or value found while walking a request body, tagged with
/// its zero-based occurrence index among prior identical values.
///
/// `placement` lets [`replace_body_object`] target one specific occurrence
/// of a repeated value (e.g. the second `"1"` in a body that has several)
/// rather than rewriting every match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyItem {
    pub value: String,
    pub placement: usize,
}

/// The JSON type of a value discovered during extraction. Drives which
/// replacement discipline [`replace_body_object`] uses: strings are matched
/// as quoted substrings, scalars as anchored tokens, composites (arrays and
/// objects serialized back to text) as plain substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonValueKind {
    String,
    Scalar,
    Composite,
}

fn classify(value: &Value) -> JsonValueKind {
    match value {
        Value::String(_) => JsonValueKind::String,
        Value::Number(_) | Value::Bool(_) | Value::Null => JsonValueKind::Scalar,
        Value::Array(_) | Value::Object(_) => JsonValueKind::Composite,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Parses `body` as JSON and returns every object key and every leaf/array
/// value encountered, in document order: for an object, the key is emitted
/// before recursing into its value; for an array, each element is emitted
/// in turn before recursing. `placement` counts prior occurrences of the
/// identical string so repeated values can still be targeted individually.
pub fn extract_json_body_values(body: &str) -> Result<Vec<BodyItem>> {
    let root: Value =
        serde_json::from_str(body).map_err(|e| EngineError::BodyParse(e.to_string()))?;
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    walk_json(&root, &mut seen, &mut out);
    Ok(out)
}

fn walk_json(value: &Value, seen: &mut HashMap<String, usize>, out: &mut Vec<BodyItem>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                push_item(key.clone(), seen, out);
                walk_json(child, seen, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => walk_json(item, seen, out),
                    _ => {
                        push_item(scalar_text(item), seen, out);
                        walk_json(item, seen, out);
                    }
                }
            }
        }
        Value::String(s) => push_item(s.clone(), seen, out),
        Value::Number(_) | Value::Bool(_) | Value::Null => {
            push_item(scalar_text(value), seen, out)
        }
    }
}

fn push_item(value: String, seen: &mut HashMap<String, usize>, out: &mut Vec<BodyItem>) {
    let placement = *seen.get(&value).unwrap_or(&0);
    seen.insert(value.clone(), placement + 1);
    out.push(BodyItem { value, placement });
}

/// Parses a `application/x-www-form-urlencoded` body and returns each
/// value in field order, with the same `placement` semantics as
/// [`extract_json_body_values`].
pub fn extract_form_body_values(body: &str) -> Vec<BodyItem> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for pair in body.split('&') {
        if pair.is_empty() {
            continue;
        }
        let value = match pair.split_once('=') {
            Some((_, v)) => v,
            None => pair,
        };
        let decoded = percent_decode(value);
        push_item(decoded, &mut seen, &mut out);
    }
    out
}

fn percent_decode(s: &str) -> String {
    let bytes = s.replace('+', " ");
    let mut out = String::with_capacity(bytes.len());
    let mut chars = bytes.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hi = chars.next();
            let lo = chars.next();
            if let (Some(hi), Some(lo)) = (hi, lo) {
                if let Ok(byte) = u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                    out.push(byte as char);
                    continue;
                }
            }
            out.push('%');
        } else {
            out.push(c);
        }
    }
    out
}

/// Replaces a key or value in a `application/x-www-form-urlencoded` body.
///
/// Per spec §4.1: URL-decode the body, parse it as a query string; if
/// `replace_key` and `pattern` matches a key, rename that key while
/// keeping its value; otherwise, if `pattern` matches a (decoded) value,
/// replace that value; then re-encode. Unlike the JSON path there is no
/// occurrence index -- form keys are unique by construction, so a match
/// always targets every pair sharing that key/value pair.
pub fn replace_form_body_object(body: &str, pattern: &str, payload: &str, replace_key: bool) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for field in body.split('&') {
        if field.is_empty() {
            continue;
        }
        let (key, value) = match field.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(field), String::new()),
        };
        pairs.push((key, value));
    }

    for (key, value) in pairs.iter_mut() {
        if replace_key && key == pattern {
            *key = payload.to_string();
        } else if value == pattern {
            *value = payload.to_string();
        }
    }

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", percent_encode(&k), percent_encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn quoted_string_regex(pattern: &str) -> Result<Regex> {
    Regex::new(&format!(r#""{}""#, regex::escape(pattern)))
        .map_err(EngineError::RegexCompile)
}

fn scalar_token_regex(pattern: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?P<pre>[:,\[]\s*){}(?P<post>\s*[,\]}}])", regex::escape(pattern)))
        .map_err(EngineError::RegexCompile)
}

/// Replaces occurrences of `pattern` within `body` with `payload`.
///
/// `replace_key` selects whether `pattern` is matched as a bare string (a
/// JSON object key, or a value) or, when false, always treated as a value.
/// The raw original value's [`JsonValueKind`] (inferred by re-parsing
/// `pattern` as JSON) determines the matching discipline:
/// - strings are matched as a quoted substring (`"pattern"` -> `payload`,
///   where `payload` supplies its own quoting if needed)
/// - numbers/bools/null are matched as an anchored token bounded by JSON
///   punctuation, to avoid clobbering substrings of larger numbers
/// - composite values (arrays/objects, passed pre-serialized) are matched
///   as a plain substring
///
/// `index` selects which occurrence to replace: `-1` replaces every match,
/// a non-negative value replaces only that zero-based occurrence. An
/// out-of-range `index` leaves `body` unchanged.
pub fn replace_body_object(
    body: &str,
    pattern: &str,
    payload: &str,
    replace_key: bool,
    index: i64,
) -> Result<String> {
    let kind = if replace_key {
        JsonValueKind::String
    } else {
        match serde_json::from_str::<Value>(pattern) {
            Ok(v) => classify(&v),
            Err(_) => JsonValueKind::String,
        }
    };

    match kind {
        JsonValueKind::String => {
            let re = quoted_string_regex(pattern)?;
            let framed_payload = format!("\"{payload}\"");
            Ok(replace_nth(&re, body, &framed_payload, index))
        }
        JsonValueKind::Scalar => {
            let re = scalar_token_regex(pattern)?;
            Ok(replace_nth_captured(&re, body, payload, index))
        }
        JsonValueKind::Composite => {
            Ok(replace_plain_nth(body, pattern, payload, index))
        }
    }
}

fn replace_nth(re: &Regex, body: &str, replacement: &str, index: i64) -> String {
    if index < 0 {
        return re.replace_all(body, replacement.replace('$', "$$")).into_owned();
    }
    let target = index as usize;
    let mut count = 0usize;
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for m in re.find_iter(body) {
        if count == target {
            out.push_str(&body[last..m.start()]);
            out.push_str(replacement);
            last = m.end();
            count += 1;
            break;
        }
        count += 1;
    }
    out.push_str(&body[last..]);
    out
}

fn replace_nth_captured(re: &Regex, body: &str, payload: &str, index: i64) -> String {
    if index < 0 {
        return re
            .replace_all(body, |caps: &regex::Captures| {
                format!("{}{}{}", &caps["pre"], payload, &caps["post"])
            })
            .into_owned();
    }
    let target = index as usize;
    let mut count = 0usize;
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for caps in re.captures_iter(body) {
        let m = caps.get(0).expect("whole match always present");
        if count == target {
            out.push_str(&body[last..m.start()]);
            out.push_str(&caps["pre"]);
            out.push_str(payload);
            out.push_str(&caps["post"]);
            last = m.end();
            count += 1;
            break;
        }
        count += 1;
    }
    out.push_str(&body[last..]);
    out
}

fn replace_plain_nth(body: &str, pattern: &str, payload: &str, index: i64) -> String {
    if pattern.is_empty() {
        return body.to_string();
    }
    if index < 0 {
        return body.replace(pattern, payload);
    }
    let target = index as usize;
    let mut count = 0usize;
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    loop {
        match rest.find(pattern) {
            Some(pos) => {
                if count == target {
                    out.push_str(&rest[..pos]);
                    out.push_str(payload);
                    out.push_str(&rest[pos + pattern.len()..]);
                    return out;
                }
                out.push_str(&rest[..pos + pattern.len()]);
                rest = &rest[pos + pattern.len()..];
                count += 1;
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Replaces the quoted string value `pattern` with the raw (unquoted)
/// text `replacement`, rather than re-quoting it as a string. Used by the
/// blind-boolean scanner to swap a string field's value for a literal
/// Mongo operator object, e.g. turning `"alice"` into `{"$regex": ".*"}`.
pub fn replace_body_value_raw(
    body: &str,
    pattern: &str,
    replacement: &str,
    index: i64,
) -> Result<String> {
    let re = quoted_string_regex(pattern)?;
    Ok(replace_nth(&re, body, replacement, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_form_values_in_order_with_placement() {
        let items = extract_form_body_values("user=alice&pass=1&again=1");
        assert_eq!(
            items,
            vec![
                BodyItem { value: "alice".into(), placement: 0 },
                BodyItem { value: "1".into(), placement: 0 },
                BodyItem { value: "1".into(), placement: 1 },
            ]
        );
    }

    #[test]
    fn extracts_json_object_key_then_value() {
        let items = extract_json_body_values(r#"{"user":"alice"}"#).unwrap();
        assert_eq!(
            items,
            vec![
                BodyItem { value: "user".into(), placement: 0 },
                BodyItem { value: "alice".into(), placement: 0 },
            ]
        );
    }

    #[test]
    fn extracts_nested_array_elements() {
        let items = extract_json_body_values(r#"{"tags":["a","b"]}"#).unwrap();
        assert_eq!(
            items,
            vec![
                BodyItem { value: "tags".into(), placement: 0 },
                BodyItem { value: "a".into(), placement: 0 },
                BodyItem { value: "b".into(), placement: 0 },
            ]
        );
    }

    #[test]
    fn replace_string_value_targets_specific_occurrence() {
        let body = r#"{"a":"x","b":"x"}"#;
        let out = replace_body_object(body, "x", "PAYLOAD", false, 1).unwrap();
        assert_eq!(out, r#"{"a":"x","b":"PAYLOAD"}"#);
    }

    #[test]
    fn replace_string_value_all_occurrences() {
        let body = r#"{"a":"x","b":"x"}"#;
        let out = replace_body_object(body, "x", "PAYLOAD", false, -1).unwrap();
        assert_eq!(out, r#"{"a":"PAYLOAD","b":"PAYLOAD"}"#);
    }

    #[test]
    fn replace_numeric_value_does_not_clobber_longer_numbers() {
        let body = r#"{"a":1,"b":12}"#;
        let out = replace_body_object(body, "1", "PAYLOAD", false, -1).unwrap();
        assert_eq!(out, r#"{"a":PAYLOAD,"b":12}"#);
    }

    #[test]
    fn out_of_range_index_is_a_no_op() {
        let body = r#"{"a":"x"}"#;
        let out = replace_body_object(body, "x", "PAYLOAD", false, 5).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn form_body_replaces_a_value_by_default() {
        let out = replace_form_body_object("user=alice&pass=hunter2", "alice", "alice'", false);
        assert_eq!(out, "user=alice%27&pass=hunter2");
    }

    #[test]
    fn form_body_renames_a_key_in_key_mode() {
        let out = replace_form_body_object("user=alice&pass=hunter2", "user", "user[$]", true);
        assert_eq!(out, "user%5B%24%5D=alice&pass=hunter2");
    }

    #[test]
    fn form_body_key_mode_falls_back_to_value_match_when_key_absent() {
        let out = replace_form_body_object("user=alice&pass=hunter2", "hunter2", "x' || 'a'=='a", true);
        assert_eq!(out, "user=alice&pass=x%27+%7C%7C+%27a%27%3D%3D%27a");
    }
}

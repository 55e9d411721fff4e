//! Blind-boolean detection: inject a query/body predicate that is always
//! true and one that is always false, and look for a response that tells
//! the two apart from the unmodified baseline.
//!
//! The GET and POST `$regex` sub-engines are grounded in
//! `original_source/scanners/boolean_blind_scanner.go`'s
//! `iterateRegexGetBooleanInjections`/`iterateRegexPOSTBooleanInjections`:
//! true pattern `.*`, false pattern `a^`, and -- because parameters can
//! interact (`type=product&id=58`) -- every non-empty subset of
//! parameters is first driven to the always-true form via
//! [`crate::combinatorics::combinations`], then flipped one member at a
//! time to the always-false form while the rest of the subset stays true.
//! Regex-GET additionally tries establishing its baseline against every
//! query value zeroed out (spec §4.7 item 1), falling back to the
//! unmodified baseline whenever the emptied probe itself looks like a
//! NoSQL or JS error.
//!
//! The JS-GET sub-engine (spec §4.7 item 3) is built straight from
//! catalog.rs's documented Cartesian-product intent, since the retained Go
//! fragment only covers the `$regex` shape: for each quote style (`'`,
//! `"`), [`crate::catalog::JS_TRUE_STRINGS`]/[`crate::catalog::JS_FALSE_STRINGS`]
//! are quote-substituted, crossed with [`crate::catalog::JS_PREFIXES`] and
//! [`crate::catalog::JS_SUFFIXES`], and for every subset of query keys the
//! same true-string combination is applied to the whole subset before
//! each member is flipped through *every* false-string variant in turn --
//! a true string maps to the full set of false strings, not a single
//! paired one. The whole-object sub-engine (item 4, `OBJECT_INJECTIONS_TRUE`/
//! `OBJECT_INJECTIONS_FALSE`) swaps the entire body for a true/false pair
//! in one step, also absent from the retained Go fragment.
//!
//! On top of the spec's four engines, `scan_post_js` applies the same
//! JS true/false catalog to individual body positions (not just the query
//! string) -- this isn't a named spec engine, but JSON bodies are just as
//! likely to feed a `$where` clause as query parameters are, and the
//! catalog already exists; skipped entirely for non-JSON targets.
//!
//! All sub-engines share the tri-state predicate from spec §4.7,
//! `is_blind_injectable`: a pair only counts as a finding if the true- and
//! false-response bodies don't both look like NoSQL/JS errors, not all
//! three (baseline/true/false) are identical, and *exactly one* of the
//! true/false responses matches the baseline.

use crate::catalog::{JS_FALSE_STRINGS, JS_PREFIXES, JS_SUFFIXES, JS_TRUE_STRINGS};
use crate::catalog::{OBJECT_INJECTIONS_FALSE, OBJECT_INJECTIONS_TRUE};
use crate::classifier::has_nosql_or_js_error;
use crate::client::HttpTransport;
use crate::combinatorics::combinations;
use crate::error::Result;
use crate::finding::{self, FindingKind, InjectionFinding};
use crate::request::{AttackObject, BodyType};
use crate::response::HttpResponse;

const TRUE_REGEX: &str = ".*";
const FALSE_REGEX: &str = "a^";

/// Runs every blind-boolean sub-engine applicable to `baseline`.
pub async fn scan(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = scan_get_regex(baseline, transport).await?;
    findings.extend(scan_get_js(baseline, transport).await?);
    if baseline.body_type == BodyType::Json {
        findings.extend(scan_post_regex(baseline, transport).await?);
        findings.extend(scan_post_js(baseline, transport).await?);
        findings.extend(scan_whole_object(baseline, transport).await?);
    }
    Ok(findings)
}

/// The tri-state predicate from spec §4.7/§8: false if either probe
/// response looks like a NoSQL or JS-syntax error (that's the error-based
/// channel's concern), false if baseline/true/false are all identical,
/// true iff exactly one of the true/false responses equals the baseline.
fn is_blind_injectable(baseline: &HttpResponse, true_resp: &HttpResponse, false_resp: &HttpResponse) -> bool {
    if has_nosql_or_js_error(&true_resp.body) || has_nosql_or_js_error(&false_resp.body) {
        return false;
    }
    if baseline.content_equals(true_resp) && baseline.content_equals(false_resp) {
        return false;
    }
    baseline.content_equals(true_resp) != baseline.content_equals(false_resp)
}

/// Spec §4.7 item 1: establish the Regex-GET baseline by first trying every
/// query value zeroed out, accepting that emptied probe as the baseline
/// only if it doesn't itself look like a NoSQL or JS error -- an emptied
/// baseline gives the true/false sweep a cleaner reference when the
/// backend's ordinary response already varies with the real parameter
/// values. Falls back to the unmodified baseline response otherwise.
async fn zeroed_get_baseline(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<HttpResponse> {
    let mut zeroed = baseline.copy();
    for key in baseline.query_keys() {
        zeroed.set_query_param(&key, "");
    }
    let zeroed_resp = transport.send(&zeroed).await?;
    if !has_nosql_or_js_error(&zeroed_resp.body) {
        return Ok(zeroed_resp);
    }
    transport.send(baseline).await
}

async fn scan_get_regex(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();
    let keys = baseline.query_keys();
    if keys.is_empty() {
        return Ok(findings);
    }
    let baseline_resp = zeroed_get_baseline(baseline, transport).await?;

    for subset in combinations(&keys) {
        let mut probe = baseline.copy();
        for key in &subset {
            let injected_key = format!("{key}[$regex]");
            probe.override_query_pair(key, &injected_key, TRUE_REGEX);
        }

        for key in &subset {
            let injected_key = format!("{key}[$regex]");
            let true_resp = transport.send(&probe).await?;

            probe.set_query_param(&injected_key, FALSE_REGEX);
            let false_resp = transport.send(&probe).await?;

            if is_blind_injectable(&baseline_resp, &true_resp, &false_resp) {
                findings.push(InjectionFinding::new(
                    FindingKind::BlindBoolean,
                    url.clone(),
                    key.clone(),
                    injected_key.clone(),
                    format!("true: {TRUE_REGEX}, false: {FALSE_REGEX}"),
                ));
            }

            probe.set_query_param(&injected_key, TRUE_REGEX);
        }
    }
    Ok(finding::unique(findings))
}

async fn scan_post_regex(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();
    let baseline_resp = transport.send(baseline).await?;
    let items = baseline.body_values_or_warn();

    let true_raw = format!(r#"{{"$regex": "{TRUE_REGEX}"}}"#);
    let false_raw = format!(r#"{{"$regex": "{FALSE_REGEX}"}}"#);

    for item in &items {
        let mut probe_true = baseline.copy();
        probe_true.inject_raw_body_value(&item.value, &true_raw, item.placement as i64)?;
        let true_resp = transport.send(&probe_true).await?;

        let mut probe_false = baseline.copy();
        probe_false.inject_raw_body_value(&item.value, &false_raw, item.placement as i64)?;
        let false_resp = transport.send(&probe_false).await?;

        if is_blind_injectable(&baseline_resp, &true_resp, &false_resp) {
            findings.push(InjectionFinding::new(
                FindingKind::BlindBoolean,
                url.clone(),
                item.value.clone(),
                item.value.clone(),
                format!("true: {true_raw}, false: {false_raw}"),
            ));
        }
    }
    Ok(finding::unique(findings))
}

/// JS-GET sub-engine: spec §4.7 item 3. For every quote style, every
/// `JSPrefixes x JSTrueStrings x JSSuffixes` combination, and every
/// non-empty subset of query keys, sets the whole subset to the true
/// payload, then flips each member in turn through every false-string
/// variant, comparing against the baseline via [`is_blind_injectable`].
async fn scan_get_js(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();
    let keys = baseline.query_keys();
    if keys.is_empty() {
        return Ok(findings);
    }
    let baseline_resp = transport.send(baseline).await?;

    let orig_value = |key: &str| -> String {
        baseline
            .query_pairs()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };

    for quote in ["'", "\""] {
        let true_variants: Vec<String> =
            JS_TRUE_STRINGS.iter().map(|s| s.replace('\'', quote)).collect();
        let false_variants: Vec<String> =
            JS_FALSE_STRINGS.iter().map(|s| s.replace('\'', quote)).collect();

        for prefix in JS_PREFIXES {
            for suffix in JS_SUFFIXES {
                for true_str in &true_variants {
                    for subset in combinations(&keys) {
                        let mut probe = baseline.copy();
                        for key in &subset {
                            let payload = format!("{}{prefix}{true_str}{suffix}", orig_value(key));
                            probe.set_query_param(key, &payload);
                        }

                        for key in &subset {
                            let true_payload =
                                format!("{}{prefix}{true_str}{suffix}", orig_value(key));
                            let true_resp = transport.send(&probe).await?;

                            for false_str in &false_variants {
                                let false_payload =
                                    format!("{}{prefix}{false_str}{suffix}", orig_value(key));
                                probe.set_query_param(key, &false_payload);
                                let false_resp = transport.send(&probe).await?;

                                if is_blind_injectable(&baseline_resp, &true_resp, &false_resp) {
                                    findings.push(InjectionFinding::new(
                                        FindingKind::BlindBoolean,
                                        url.clone(),
                                        key.clone(),
                                        key.clone(),
                                        format!("true: {true_payload}, false: {false_payload}"),
                                    ));
                                }
                            }
                            // Restore this key to its subset-true form before
                            // the next key in the subset is flipped, so each
                            // key is probed with the rest of the subset held
                            // at its always-true value.
                            probe.set_query_param(key, &true_payload);
                        }
                    }
                }
            }
        }
    }
    Ok(finding::unique(findings))
}

/// Applies the JS true/false catalog to individual JSON body positions.
/// Not one of spec §4.7's four named engines, but a direct extension of
/// the same catalog to the body -- a `$where` clause is just as reachable
/// through a body field as a query parameter.
async fn scan_post_js(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();
    let baseline_resp = transport.send(baseline).await?;
    let items = baseline.body_values_or_warn();

    'items: for item in &items {
        for prefix in JS_PREFIXES {
            for suffix in JS_SUFFIXES {
                for (true_js, false_js) in JS_TRUE_STRINGS.iter().zip(
                    JS_FALSE_STRINGS
                        .iter()
                        .cycle()
                        .take(JS_TRUE_STRINGS.len()),
                ) {
                    let true_payload = format!("{prefix}{}{true_js}{suffix}", item.value);
                    let false_payload = format!("{prefix}{}{false_js}{suffix}", item.value);

                    let mut probe_true = baseline.copy();
                    probe_true.replace_body_object(
                        &item.value,
                        &true_payload,
                        false,
                        item.placement as i64,
                    )?;
                    let true_resp = transport.send(&probe_true).await?;

                    let mut probe_false = baseline.copy();
                    probe_false.replace_body_object(
                        &item.value,
                        &false_payload,
                        false,
                        item.placement as i64,
                    )?;
                    let false_resp = transport.send(&probe_false).await?;

                    if is_blind_injectable(&baseline_resp, &true_resp, &false_resp) {
                        findings.push(InjectionFinding::new(
                            FindingKind::BlindBoolean,
                            url.clone(),
                            item.value.clone(),
                            item.value.clone(),
                            format!("true: {true_payload}, false: {false_payload}"),
                        ));
                        continue 'items;
                    }
                }
            }
        }
    }
    Ok(finding::unique(findings))
}

async fn scan_whole_object(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();
    let baseline_resp = transport.send(baseline).await?;

    for (true_obj, false_obj) in OBJECT_INJECTIONS_TRUE.iter().zip(OBJECT_INJECTIONS_FALSE) {
        let mut probe_true = baseline.copy();
        probe_true.set_body((*true_obj).to_string());
        let true_resp = transport.send(&probe_true).await?;

        let mut probe_false = baseline.copy();
        probe_false.set_body((*false_obj).to_string());
        let false_resp = transport.send(&probe_false).await?;

        if is_blind_injectable(&baseline_resp, &true_resp, &false_resp) {
            findings.push(InjectionFinding::new(
                FindingKind::BlindBoolean,
                url.clone(),
                "<body>".to_string(),
                "<body>".to_string(),
                format!("true: {true_obj}, false: {false_obj}"),
            ));
            break;
        }
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use url::Url;

    fn resp(status: u16, body: &str) -> HttpResponse {
        HttpResponse { status, headers: HashMap::new(), body: body.to_string(), elapsed_ms: 0 }
    }

    #[test]
    fn predicate_is_true_iff_exactly_one_matches_baseline() {
        let baseline = resp(200, "base");
        let t = resp(200, "base");
        let f = resp(200, "different");
        assert!(is_blind_injectable(&baseline, &t, &f));
        assert!(is_blind_injectable(&baseline, &f, &t));
    }

    #[test]
    fn predicate_is_false_when_all_three_match() {
        let baseline = resp(200, "same");
        assert!(!is_blind_injectable(&baseline, &resp(200, "same"), &resp(200, "same")));
    }

    #[test]
    fn predicate_is_false_when_neither_matches_baseline() {
        let baseline = resp(200, "base");
        assert!(!is_blind_injectable(&baseline, &resp(200, "t"), &resp(200, "f")));
    }

    #[test]
    fn predicate_is_false_when_a_probe_looks_like_a_nosql_error() {
        let baseline = resp(200, "base");
        let t = resp(500, "MongoError: bad");
        let f = resp(200, "different");
        assert!(!is_blind_injectable(&baseline, &t, &f));
    }

    /// Responds `MATCHED_MANY` only when every key in the current query is
    /// in its always-true `[$regex]=.*` form, `NO_MATCH` otherwise -- so a
    /// single-parameter GET target is only ever detected when every member
    /// of its (singleton) subset is flipped correctly.
    struct RegexAwareTransport;

    #[async_trait]
    impl HttpTransport for RegexAwareTransport {
        async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
            let has_true = attack
                .query_pairs()
                .iter()
                .any(|(k, v)| k == "q[$regex]" && v == TRUE_REGEX);
            let body = if has_true { "MATCHED_MANY" } else { "NO_MATCH" };
            Ok(resp(200, body))
        }
    }

    #[tokio::test]
    async fn detects_regex_differential_on_query_param() {
        let url = Url::parse("http://example.com/search?q=alice").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan_get_regex(&baseline, &RegexAwareTransport).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].injectable_param, "q");
    }

    /// Responds `TRUE_BRANCH` whenever `q`'s value ends in one of the
    /// catalog's true strings (any quote/prefix/suffix combo), `FALSE_BRANCH`
    /// otherwise -- so a `$where`-style backend is modeled without needing
    /// to track which exact combination was sent.
    struct JsAwareTransport;

    #[async_trait]
    impl HttpTransport for JsAwareTransport {
        async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
            let value = attack
                .query_pairs()
                .iter()
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            let is_true = JS_TRUE_STRINGS.iter().any(|s| {
                value.ends_with(s) || value.ends_with(&s.replace('\'', "\""))
            });
            Ok(resp(200, if is_true { "TRUE_BRANCH" } else { "FALSE_BRANCH" }))
        }
    }

    #[tokio::test]
    async fn detects_js_differential_on_query_param() {
        let url = Url::parse("http://example.com/search?q=alice").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan_get_js(&baseline, &JsAwareTransport).await.unwrap();
        assert!(!findings.is_empty());
        assert!(findings.iter().all(|f| f.injectable_param == "q"));
    }

    struct AlwaysSame;

    #[async_trait]
    impl HttpTransport for AlwaysSame {
        async fn send(&self, _attack: &AttackObject) -> Result<HttpResponse> {
            Ok(resp(200, "SAME"))
        }
    }

    #[tokio::test]
    async fn identical_responses_report_no_finding() {
        let url = Url::parse("http://example.com/search?q=alice").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan_get_regex(&baseline, &AlwaysSame).await.unwrap();
        assert!(findings.is_empty());
    }

    struct AlwaysErrors;

    #[async_trait]
    impl HttpTransport for AlwaysErrors {
        async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
            let has_true = attack
                .query_pairs()
                .iter()
                .any(|(k, v)| k == "q[$regex]" && v == TRUE_REGEX);
            let body = if has_true { "MongoError: bad" } else { "ok" };
            Ok(resp(500, body))
        }
    }

    #[tokio::test]
    async fn differing_responses_that_are_actually_errors_are_not_reported() {
        let url = Url::parse("http://example.com/search?q=alice").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan_get_regex(&baseline, &AlwaysErrors).await.unwrap();
        assert!(findings.is_empty());
    }

    /// Two interacting parameters, modeling the Go source's motivating
    /// example (`type=product&id=58`): the backend grants `ADMIN` only
    /// when *both* `role` and `id` independently "pass" -- either by
    /// matching their real value, or by carrying a `[$regex]` operator
    /// that resolves true. Neither parameter passes on its own literal
    /// value, so probing `role` alone (leaving `id=58` untouched) never
    /// triggers a differential; only the combined `{role, id}` subset --
    /// which neutralizes `id` to always-true while `role` is swept --
    /// surfaces the finding.
    struct InteractingParams;

    fn field_pass(pairs: &[(String, String)], plain_key: &str, regex_key: &str, real_value: &str) -> bool {
        if let Some((_, v)) = pairs.iter().find(|(k, _)| k == regex_key) {
            return v == TRUE_REGEX;
        }
        if let Some((_, v)) = pairs.iter().find(|(k, _)| k == plain_key) {
            return v == real_value;
        }
        false
    }

    #[async_trait]
    impl HttpTransport for InteractingParams {
        async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
            let pairs = attack.query_pairs();
            let role_pass = field_pass(pairs, "role", "role[$regex]", "admin");
            let id_pass = field_pass(pairs, "id", "id[$regex]", "1");
            Ok(resp(200, if role_pass && id_pass { "ADMIN" } else { "DENY" }))
        }
    }

    #[tokio::test]
    async fn subset_probing_finds_interacting_parameters() {
        let url = Url::parse("http://example.com/login?role=guest&id=58").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan_get_regex(&baseline, &InteractingParams).await.unwrap();
        assert!(findings.iter().any(|f| f.injectable_param == "role"));
        assert!(findings.iter().any(|f| f.injectable_param == "id"));
    }

    #[tokio::test]
    async fn single_parameter_alone_would_have_missed_it() {
        let url = Url::parse("http://example.com/login?role=guest&id=58").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let baseline_resp = InteractingParams.send(&baseline).await.unwrap();

        let mut role_only = baseline.copy();
        role_only.override_query_pair("role", "role[$regex]", TRUE_REGEX);
        let role_true = InteractingParams.send(&role_only).await.unwrap();
        role_only.set_query_param("role[$regex]", FALSE_REGEX);
        let role_false = InteractingParams.send(&role_only).await.unwrap();

        assert!(!is_blind_injectable(&baseline_resp, &role_true, &role_false));
    }
}

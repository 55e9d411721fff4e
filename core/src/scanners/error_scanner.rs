//! Error-based detection: replace a parameter's value with a character
//! that breaks out of a Mongo query or a JSON body and look for a
//! resulting server error.
//!
//! Grounded in `original_source/scanners/error_scanner.go`:
//! `injectSpecialCharsIntoQuery`/`injectSpecialCharsIntoBody` replace a
//! parameter's value outright with each of
//! [`crate::catalog::MONGO_SPECIAL_CHARACTERS`] in turn, restoring the
//! baseline between probes, and flag the parameter the moment
//! [`crate::classifier::has_nosql_error`] matches the response.

use crate::catalog::{MONGO_JSON_ERROR_ATTACKS, MONGO_SPECIAL_CHARACTERS, MONGO_SPECIAL_KEY_CHARACTERS};
use crate::classifier::has_nosql_error;
use crate::client::HttpTransport;
use crate::error::Result;
use crate::finding::{FindingKind, InjectionFinding};
use crate::request::{AttackObject, BodyType};

/// Runs the error-based channel against both the query string and (if
/// present) the request body, returning every parameter found injectable.
pub async fn scan(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = scan_query(baseline, transport).await?;
    findings.extend(scan_body(baseline, transport).await?);
    Ok(findings)
}

async fn scan_query(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();

    for key in baseline.query_keys() {
        for special in MONGO_SPECIAL_CHARACTERS {
            let mut probe = baseline.copy();
            probe.set_query_param(&key, special);
            let resp = transport.send(&probe).await?;
            if has_nosql_error(&resp.body) {
                findings.push(InjectionFinding::new(
                    FindingKind::ErrorBased,
                    url.clone(),
                    key.clone(),
                    key.clone(),
                    (*special).to_string(),
                ));
                break;
            }
        }

        // Key-mode: append the payload to the key itself (`username` ->
        // `username[$]`), keeping the original value untouched.
        for special in MONGO_SPECIAL_KEY_CHARACTERS {
            let injected_key = format!("{key}{special}");
            let mut probe = baseline.copy();
            probe.rename_query_key(&key, &injected_key);
            let resp = transport.send(&probe).await?;
            if has_nosql_error(&resp.body) {
                findings.push(InjectionFinding::new(
                    FindingKind::ErrorBased,
                    url.clone(),
                    key.clone(),
                    injected_key,
                    (*special).to_string(),
                ));
                break;
            }
        }
    }
    Ok(findings)
}

async fn scan_body(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    if baseline.body_type == BodyType::None {
        return Ok(findings);
    }
    let url = baseline.request_url().to_string();
    let items = baseline.body_values_or_warn();

    'items: for item in &items {
        for special in MONGO_SPECIAL_CHARACTERS {
            let mut probe = baseline.copy();
            probe.replace_body_object(&item.value, special, false, item.placement as i64)?;
            let resp = transport.send(&probe).await?;
            if has_nosql_error(&resp.body) {
                findings.push(InjectionFinding::new(
                    FindingKind::ErrorBased,
                    url.clone(),
                    item.value.clone(),
                    item.value.clone(),
                    (*special).to_string(),
                ));
                continue 'items;
            }
        }
    }

    // MongoJSONErrorAttacks entries are full JSON fragments; per spec
    // §4.5 they're injected as whole-body replacements, not appended
    // to a single position, and only make sense against a JSON body.
    if baseline.body_type == BodyType::Json {
        for attack in MONGO_JSON_ERROR_ATTACKS {
            let mut probe = baseline.copy();
            probe.set_body((*attack).to_string());
            let resp = transport.send(&probe).await?;
            if has_nosql_error(&resp.body) {
                findings.push(InjectionFinding::new(
                    FindingKind::ErrorBased,
                    url.clone(),
                    "<body>".to_string(),
                    "<body>".to_string(),
                    (*attack).to_string(),
                ));
                break;
            }
        }
    }
    Ok(findings)
}

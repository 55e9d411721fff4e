//! Timing-based detection: inject a JS sleep expression and look for a
//! response that took meaningfully longer than the baseline.
//!
//! Grounded in `original_source/scanners/timing_scanner.go`:
//! `TimingInjectionTest` takes three baseline measurements, then an
//! injected probe is flagged only if its elapsed time clears
//! `mean + 2*stddev` of the baseline -- the statistic the Go original
//! computed via `montanaflynn/stats`, reproduced here inline rather than
//! through an external statistics crate -- and also clears the requested
//! sleep duration itself, since a baseline that happens to be unusually
//! noisy shouldn't let a noise spike masquerade as injection.
//!
//! Every probe here is sent with caching disabled: a cached response
//! carries no real delay, which would make every probe after the first
//! look instant.

use crate::catalog::{js_timing_strings, JS_PREFIXES, JS_SUFFIXES, JS_TIMING_OBJECT_INJECTIONS_RAW, JS_TIMING_STRINGS_RAW};
use crate::client::HttpTransport;
use crate::error::Result;
use crate::finding::{FindingKind, InjectionFinding};
use crate::request::{AttackObject, BodyType};

const BASELINE_SAMPLES: usize = 3;

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn stddev(samples: &[f64], mean: f64) -> f64 {
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

fn is_timing_injectable(probe_ms: f64, baseline_mean: f64, baseline_stddev: f64, sleep_ms: u64) -> bool {
    probe_ms > baseline_mean + 2.0 * baseline_stddev && probe_ms >= sleep_ms as f64
}

async fn measure(attack: &AttackObject, transport: &dyn HttpTransport) -> Result<f64> {
    Ok(transport.send(attack).await?.elapsed_ms as f64)
}

async fn baseline_stats(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
) -> Result<(f64, f64)> {
    let mut fresh = baseline.copy();
    fresh.set_ignore_cache(true);
    let mut samples = Vec::with_capacity(BASELINE_SAMPLES);
    for _ in 0..BASELINE_SAMPLES {
        samples.push(measure(&fresh, transport).await?);
    }
    let m = mean(&samples);
    Ok((m, stddev(&samples, m)))
}

/// Runs the timing channel against the query string and (if present) the
/// request body.
pub async fn scan(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
    sleep_ms: u64,
) -> Result<Vec<InjectionFinding>> {
    let (base_mean, base_stddev) = baseline_stats(baseline, transport).await?;

    let mut findings = scan_get(baseline, transport, sleep_ms, base_mean, base_stddev).await?;
    if baseline.body_type == BodyType::Json {
        findings.extend(
            scan_post_values(baseline, transport, sleep_ms, base_mean, base_stddev).await?,
        );
        findings.extend(
            scan_post_object(baseline, transport, sleep_ms, base_mean, base_stddev).await?,
        );
    }
    Ok(findings)
}

async fn scan_get(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
    sleep_ms: u64,
    base_mean: f64,
    base_stddev: f64,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();

    'keys: for key in baseline.query_keys() {
        let orig_value = baseline
            .query_pairs()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        for prefix in JS_PREFIXES {
            for suffix in JS_SUFFIXES {
                for timing in js_timing_strings(JS_TIMING_STRINGS_RAW, sleep_ms) {
                    for keep_original in [String::new(), orig_value.clone()] {
                        let attack_string = format!("{keep_original}{prefix}{timing}{suffix}");
                        let mut probe = baseline.copy();
                        probe.set_ignore_cache(true);
                        probe.set_query_param(&key, &attack_string);
                        let elapsed = measure(&probe, transport).await?;
                        if is_timing_injectable(elapsed, base_mean, base_stddev, sleep_ms) {
                            findings.push(InjectionFinding::new(
                                FindingKind::Timed,
                                url.clone(),
                                key.clone(),
                                key.clone(),
                                attack_string,
                            ));
                            continue 'keys;
                        }
                    }
                }
            }
        }
    }
    Ok(findings)
}

async fn scan_post_values(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
    sleep_ms: u64,
    base_mean: f64,
    base_stddev: f64,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();
    let items = baseline.body_values_or_warn();

    'items: for item in &items {
        for prefix in JS_PREFIXES {
            for suffix in JS_SUFFIXES {
                for timing in js_timing_strings(JS_TIMING_STRINGS_RAW, sleep_ms) {
                    for keep_original in [String::new(), item.value.clone()] {
                        for wrap_quote in ["", "\""] {
                            let payload = format!(
                                "{wrap_quote}{keep_original}{prefix}{timing}{suffix}{wrap_quote}"
                            );
                            let mut probe = baseline.copy();
                            probe.set_ignore_cache(true);
                            probe.replace_body_object(
                                &item.value,
                                &payload,
                                false,
                                item.placement as i64,
                            )?;
                            let elapsed = measure(&probe, transport).await?;
                            if is_timing_injectable(elapsed, base_mean, base_stddev, sleep_ms) {
                                findings.push(InjectionFinding::new(
                                    FindingKind::Timed,
                                    url.clone(),
                                    item.value.clone(),
                                    item.value.clone(),
                                    payload,
                                ));
                                continue 'items;
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(findings)
}

async fn scan_post_object(
    baseline: &AttackObject,
    transport: &dyn HttpTransport,
    sleep_ms: u64,
    base_mean: f64,
    base_stddev: f64,
) -> Result<Vec<InjectionFinding>> {
    let mut findings = Vec::new();
    let url = baseline.request_url().to_string();

    for object in js_timing_strings(JS_TIMING_OBJECT_INJECTIONS_RAW, sleep_ms) {
        let mut probe = baseline.copy();
        probe.set_ignore_cache(true);
        probe.set_body(object.clone());
        let elapsed = measure(&probe, transport).await?;
        if is_timing_injectable(elapsed, base_mean, base_stddev, sleep_ms) {
            findings.push(InjectionFinding::new(
                FindingKind::Timed,
                url.clone(),
                "<body>".to_string(),
                "<body>".to_string(),
                object,
            ));
            break;
        }
    }
    Ok(findings)
}

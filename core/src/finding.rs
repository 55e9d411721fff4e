//! Scan findings and their deduplication.
//!
//! Grounded in `original_source/scanutil/InjectionObject.go`: each finding
//! carries an injection `Kind`, the request/parameter/value that produced
//! it, and a stable MD5 fingerprint used to drop duplicate findings while
//! keeping the first (and therefore simplest) payload that triggered them.

use std::collections::HashSet;

/// Which detection channel produced a finding. Mirrors the Go original's
/// `InjectionType` (`Blind`, `Timed`, `Error`, `GetParam`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    ErrorBased,
    Timed,
    BlindBoolean,
    OperatorParam,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::ErrorBased => "Error Based",
            FindingKind::Timed => "Timing Based",
            FindingKind::BlindBoolean => "Blind Boolean Based",
            FindingKind::OperatorParam => "Operator Injection",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single confirmed (or suspected) injection point.
#[derive(Debug, Clone)]
pub struct InjectionFinding {
    pub kind: FindingKind,
    pub url: String,
    pub injectable_param: String,
    pub injected_param: String,
    pub injected_value: String,
}

impl InjectionFinding {
    pub fn new(
        kind: FindingKind,
        url: impl Into<String>,
        injectable_param: impl Into<String>,
        injected_param: impl Into<String>,
        injected_value: impl Into<String>,
    ) -> Self {
        InjectionFinding {
            kind,
            url: url.into(),
            injectable_param: injectable_param.into(),
            injected_param: injected_param.into(),
            injected_value: injected_value.into(),
        }
    }

    /// MD5 fingerprint of `kind + url + injectable_param + injected_param +
    /// injected_value`, used to identify duplicate findings across probes.
    pub fn fingerprint(&self) -> String {
        let raw = format!(
            "{}{}{}{}{}",
            self.kind, self.url, self.injectable_param, self.injected_param, self.injected_value
        );
        format!("{:x}", md5::compute(raw.as_bytes()))
    }
}

/// Removes findings whose fingerprint has already been seen, keeping the
/// first occurrence of each.
pub fn unique(findings: Vec<InjectionFinding>) -> Vec<InjectionFinding> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|f| seen.insert(f.fingerprint()))
        .collect()
}

//! Sequential scan orchestration.
//!
//! Grounded in the teacher's `ScanEngine` (`core/src/core/engine.rs`) for
//! overall shape -- a struct owning a transport and an output sink, with a
//! `run` entry point -- but its concurrent `stream::buffer_unordered`
//! fan-out is dropped: each detection channel here depends on a stable,
//! freshly-measured baseline (the timing channel especially), so probes
//! run sequentially, one channel at a time, against one target.

use crate::client::{CachingTransport, HttpTransport};
use crate::error::Result;
use crate::finding::{self, InjectionFinding};
use crate::raw_request;
use crate::request::{AttackObject, ScanOptions};
use crate::scanners::{blind_boolean, error_scanner, operator_scanner, timing};
use crate::SinkRef;

/// Default timing threshold, matching the Go original's default.
pub const DEFAULT_SLEEP_MS: u64 = 500;

pub struct ScanEngine {
    transport: CachingTransport,
    sink: SinkRef,
}

impl ScanEngine {
    /// Wraps `transport` in the process-wide response cache (spec §4.3) so
    /// every scanner sharing this engine benefits from deduplication
    /// without threading a cache handle through each of them.
    pub fn new(transport: Box<dyn HttpTransport>, sink: SinkRef) -> Self {
        ScanEngine { transport: CachingTransport::new(transport), sink }
    }

    /// Builds the `AttackObject` to scan from `opts`: a raw request file
    /// takes precedence over a bare target URL.
    pub fn build_target(&self, opts: &ScanOptions) -> Result<AttackObject> {
        if let Some(path) = &opts.raw_request_path {
            let raw = std::fs::read_to_string(path)?;
            let scheme = if opts.require_https { "https" } else { "http" };
            return raw_request::parse_raw_request(&raw, scheme, opts);
        }
        AttackObject::from_target(opts)
    }

    /// Runs every detection channel against `target` and returns the
    /// deduplicated findings.
    pub async fn run(&self, opts: &ScanOptions, target: &AttackObject) -> Result<Vec<InjectionFinding>> {
        let sleep_ms = if opts.sleep_ms == 0 { DEFAULT_SLEEP_MS } else { opts.sleep_ms };

        let mut findings = Vec::new();

        self.sink.on_progress("error-based", 0, 4);
        let before = findings.len();
        findings.extend(error_scanner::scan(target, &self.transport).await?);
        self.report_range(&findings, before);

        self.sink.on_progress("operator-based", 1, 4);
        let before = findings.len();
        findings.extend(operator_scanner::scan(target, &self.transport).await?);
        self.report_range(&findings, before);

        self.sink.on_progress("blind-boolean", 2, 4);
        let before = findings.len();
        findings.extend(blind_boolean::scan(target, &self.transport).await?);
        self.report_range(&findings, before);

        self.sink.on_progress("timing-based", 3, 4);
        let before = findings.len();
        findings.extend(timing::scan(target, &self.transport, sleep_ms).await?);
        self.report_range(&findings, before);

        Ok(finding::unique(findings))
    }

    fn report_range(&self, findings: &[InjectionFinding], from: usize) {
        for f in &findings[from..] {
            self.sink.on_finding(f);
        }
    }
}

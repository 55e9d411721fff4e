pub mod body;
pub mod cache;
pub mod catalog;
pub mod classifier;
pub mod client;
pub mod combinatorics;
pub mod engine;
pub mod error;
pub mod finding;
pub mod raw_request;
pub mod request;
pub mod response;
pub mod scanners;

use std::sync::Arc;

pub use crate::engine::ScanEngine;
pub use crate::error::EngineError;
pub use crate::finding::{FindingKind, InjectionFinding};
pub use crate::request::ScanOptions;

/// Output abstraction for the scan pipeline. The engine only ever talks to
/// a `SinkRef`; the CLI installs [`ConsoleSink`], and library callers that
/// just want the final `Vec<InjectionFinding>` can install [`NullSink`].
pub trait ScanEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_finding(&self, finding: &InjectionFinding);
    fn on_progress(&self, phase: &str, current: usize, total: usize);
}

pub type SinkRef = Arc<dyn ScanEventSink>;

/// Terminal output sink for CLI usage.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl ScanEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        use std::io::Write;
        let colored = match level {
            "success" => message.green().to_string(),
            "error" => message.red().to_string(),
            "warn" => message.yellow().to_string(),
            "phase" => message.bright_cyan().bold().to_string(),
            _ => message.to_string(),
        };
        print!("{}\r\n", colored);
        std::io::stdout().flush().ok();
    }

    fn on_finding(&self, finding: &InjectionFinding) {
        use colored::*;
        use std::io::Write;
        let out = |text: &str| {
            print!("{}\r\n", text);
            std::io::stdout().flush().ok();
        };
        out(&format!(
            "\n{} {} detected!",
            "[+]".green().bold(),
            finding.kind.as_str().red().bold()
        ));
        out(&format!("    Target:    {}", finding.url.white()));
        out(&format!("    Parameter: {}", finding.injectable_param.bright_yellow()));
        out(&format!("    Injected:  {} = {}", finding.injected_param.cyan(), finding.injected_value.cyan()));
        out(&"──────────────────────────────────────────".dimmed().to_string());
    }

    fn on_progress(&self, phase: &str, current: usize, total: usize) {
        use colored::*;
        use std::io::Write;
        if total > 0 {
            print!("{}\r\n", format!("[*] {} ({}/{})", phase, current, total).bright_cyan());
        } else {
            print!("{}\r\n", format!("[*] {}", phase).bright_cyan());
        }
        std::io::stdout().flush().ok();
    }
}

/// A sink that discards everything, for library callers that only want
/// the returned findings and no terminal chatter.
pub struct NullSink;

impl ScanEventSink for NullSink {
    fn on_log(&self, _level: &str, _message: &str) {}
    fn on_finding(&self, _finding: &InjectionFinding) {}
    fn on_progress(&self, _phase: &str, _current: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::FindingKind;

    #[test]
    fn null_sink_accepts_every_call_without_panicking() {
        let sink = NullSink;
        sink.on_log("warn", "hello");
        sink.on_progress("error-based", 1, 4);
        sink.on_finding(&InjectionFinding::new(
            FindingKind::ErrorBased,
            "http://x/a",
            "q",
            "q",
            "'",
        ));
    }
}

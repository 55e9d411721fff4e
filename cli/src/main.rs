use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use nosqli_core::client::{HttpTransport, ReqwestTransport};
use nosqli_core::request::ScanOptions;
use nosqli_core::{ConsoleSink, ScanEngine, SinkRef};

/// Black-box NoSQL injection detector: mutates query and body parameters
/// with a catalog of Mongo-style payloads and reports the probes that
/// look injectable.
#[derive(Parser, Debug)]
#[command(name = "nosqli", author, version, about)]
struct Args {
    /// Target URL to scan (conflicts with --request).
    #[arg(short = 't', long, conflicts_with = "request")]
    target: Option<String>,

    /// Load the baseline request from a raw HTTP/1.x request file.
    #[arg(short = 'r', long)]
    request: Option<String>,

    /// Default POST body to send with the baseline request.
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Upstream proxy URL. Falls back to the HTTP_PROXY environment
    /// variable when unset.
    #[arg(short = 'p', long)]
    proxy: Option<String>,

    /// Custom User-Agent header. Defaults to an identifying string for
    /// this engine.
    #[arg(short = 'u', long = "user-agent")]
    user_agent: Option<String>,

    /// Require HTTPS when reconstructing the target URL from a raw
    /// request file.
    #[arg(long)]
    https: bool,

    /// Raise the log level to debug.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Write findings as JSON lines to this file, in addition to the
    /// console report.
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Milliseconds the timing scanner asks injected payloads to sleep.
    #[arg(long, default_value_t = nosqli_core::engine::DEFAULT_SLEEP_MS)]
    sleep_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let opts = ScanOptions {
        target: args.target.clone(),
        raw_request_path: args.request.clone(),
        proxy_input: args.proxy.clone(),
        user_agent_input: args.user_agent.clone(),
        request_data: args.data.clone(),
        require_https: args.https,
        sleep_ms: args.sleep_ms,
    };

    if opts.target.is_none() && opts.raw_request_path.is_none() {
        log::error!("no target URL or raw request file provided; pass -t <URL> or -r <FILE>");
        return ExitCode::FAILURE;
    }

    match run(opts, args.output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            // A scan that got underway reports diagnostics, never a
            // failure exit -- this tool never "fails", it only finds or
            // doesn't. Only a config error before scanning starts (no
            // usable target) exits non-zero, handled above.
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(opts: ScanOptions, output_path: Option<String>) -> Result<()> {
    let sink: SinkRef = ConsoleSink::new_ref();

    let transport: Box<dyn HttpTransport> = Box::new(
        ReqwestTransport::new(opts.proxy()).context("failed to build HTTP transport")?,
    );
    let engine = ScanEngine::new(transport, Arc::clone(&sink));

    let target = engine
        .build_target(&opts)
        .context("failed to build scan target")?;

    sink.on_log(
        "phase",
        &format!("[*] Scanning {} ({})", target.request_url(), target.method),
    );

    let findings = engine.run(&opts, &target).await.context("scan failed")?;

    sink.on_log(
        "success",
        &format!("[+] Scan complete: {} finding(s).", findings.len()),
    );

    if let Some(path) = output_path {
        write_findings_jsonl(&path, &findings)?;
        sink.on_log("success", &format!("[+] Wrote findings to {path}"));
    }

    Ok(())
}

fn write_findings_jsonl(path: &str, findings: &[nosqli_core::InjectionFinding]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create output file {path}"))?;
    for finding in findings {
        let line = serde_json::json!({
            "kind": finding.kind.as_str(),
            "url": finding.url,
            "injectable_param": finding.injectable_param,
            "injected_param": finding.injected_param,
            "injected_value": finding.injected_value,
            "fingerprint": finding.fingerprint(),
        });
        writeln!(file, "{line}").context("failed to write finding")?;
    }
    Ok(())
}

//! Application entry point — asr-relay CLI.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse command-line arguments (file paths + options).
//! 3. Load [`AppConfig`] from disk (returns default on first run).
//! 4. Build both recognition backends, the cache and the dispatcher.
//! 5. Submit every file, then wait until all sink notifications have fired.
//! 6. Exit non-zero when any job failed.
//!
//! # Usage
//!
//! ```text
//! asr-relay [--backend=bcut|jianying] [--format=txt|srt|ass] [--no-cache] FILE...
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use asr_relay::backend::{AsrBackend, BackendKind, BcutBackend, JianYingBackend, Segment};
use asr_relay::cache::RecognitionCache;
use asr_relay::config::AppConfig;
use asr_relay::dispatch::{JobDispatcher, OutputFormat, RecognitionSink};

// ---------------------------------------------------------------------------
// CLI sink
// ---------------------------------------------------------------------------

/// Prints results to stdout/stderr and counts failures for the exit code.
#[derive(Default)]
struct CliSink {
    failures: AtomicUsize,
}

impl RecognitionSink for CliSink {
    fn on_segment_result(&self, segment: &Segment) {
        println!(
            "[{:>6} – {:>6} ms] {}",
            segment.start_ms, segment.end_ms, segment.text
        );
    }

    fn on_job_finished(&self, path: &Path, text: &str) {
        println!("=== {} ===", path.display());
        println!("{text}");
    }

    fn on_job_failed(&self, path: &Path, message: &str) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        eprintln!("error: {}: {message}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    files: Vec<String>,
    backend: BackendKind,
    format: OutputFormat,
    use_cache: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut files = Vec::new();
    let mut backend = BackendKind::Bcut;
    let mut format = OutputFormat::Txt;
    let mut use_cache = true;

    for arg in args {
        if let Some(value) = arg.strip_prefix("--backend=") {
            backend = value.parse()?;
        } else if let Some(value) = arg.strip_prefix("--format=") {
            format = value.parse()?;
        } else if arg == "--no-cache" {
            use_cache = false;
        } else if arg.starts_with("--") {
            return Err(format!("unknown option: {arg}"));
        } else {
            files.push(arg);
        }
    }

    if files.is_empty() {
        return Err("no input files given".into());
    }

    Ok(CliArgs {
        files,
        backend,
        format,
        use_cache,
    })
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Arguments
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!(
                "usage: asr-relay [--backend=bcut|jianying] [--format=txt|srt|ass] [--no-cache] FILE..."
            );
            return ExitCode::from(2);
        }
    };

    // 3. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if !args.use_cache {
        config.cache.enabled = false;
    }

    // 4. Backends, cache, dispatcher
    let backends: Vec<Arc<dyn AsrBackend>> = vec![
        Arc::new(BcutBackend::from_config(&config.backend)),
        Arc::new(JianYingBackend::from_config(&config.backend)),
    ];
    let cache = Arc::new(RecognitionCache::from_config(&config.cache));
    let sink = Arc::new(CliSink::default());

    let dispatcher = JobDispatcher::new(backends, cache, sink.clone(), &config.dispatcher);

    // 5. Submit everything, then wait for the pool to drain
    let mut submit_errors = 0usize;
    for file in &args.files {
        if let Err(e) = dispatcher.submit(file, args.backend, args.format) {
            eprintln!("error: {e}");
            submit_errors += 1;
        }
    }
    dispatcher.wait_idle().await;

    // 6. Exit code
    let failures = sink.failures.load(Ordering::SeqCst) + submit_errors;
    if failures > 0 {
        log::error!("{failures} of {} job(s) failed", args.files.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_are_bcut_txt_cached() {
        let args = parse(&["a.wav"]).unwrap();
        assert_eq!(args.backend, BackendKind::Bcut);
        assert_eq!(args.format, OutputFormat::Txt);
        assert!(args.use_cache);
        assert_eq!(args.files, vec!["a.wav"]);
    }

    #[test]
    fn options_are_applied() {
        let args = parse(&["--backend=jianying", "--format=srt", "--no-cache", "a.wav"]).unwrap();
        assert_eq!(args.backend, BackendKind::JianYing);
        assert_eq!(args.format, OutputFormat::Srt);
        assert!(!args.use_cache);
    }

    #[test]
    fn no_files_is_an_error() {
        assert!(parse(&["--no-cache"]).is_err());
    }

    #[test]
    fn unknown_option_is_an_error() {
        assert!(parse(&["--frobnicate", "a.wav"]).is_err());
    }
}

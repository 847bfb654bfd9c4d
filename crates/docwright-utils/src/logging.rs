//! Structured logging setup.
//!
//! Verbose format includes `run_id`/`stage`/`duration_ms` fields via
//! `tracing::info_span!` at call sites; this module only wires the
//! subscriber.

use std::io::IsTerminal;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initializes the global tracing subscriber. Idempotent: safe to call
/// once at process start; later calls are no-ops (the underlying
/// `try_init` just returns an error we ignore).
pub fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("docwright=debug,info")
            } else {
                EnvFilter::try_new("docwright=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_ansi(use_color())
        .with_target(verbose)
        .with_span_events(if verbose {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

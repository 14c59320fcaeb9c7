//! Logging setup
//!
//! Stdout always. With a log directory, three daily rolling files as well:
//!
//! - `relay.log` - everything that passes the env filter
//! - `error.log` - ERROR events only
//! - `hooks.log` - the raw request journal (target [`JOURNAL_TARGET`]), JSON lines
//!
//! The journal target is kept out of stdout and `relay.log`. It carries the
//! raw request body, so it is subject to the env filter like everything else
//! and can be switched off with `RUST_LOG=...,capi_relay::journal=off`.

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::{filter_fn, EnvFilter, LevelFilter};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Target used for the raw request journal
pub const JOURNAL_TARGET: &str = "capi_relay::journal";

const DEFAULT_FILTER: &str = "capi_relay=info,capi_core=info,tower_http=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

fn is_journal(target: &str) -> bool {
    target == JOURNAL_TARGET
}

/// JSON lines for the journal target only, gated by `filter`
fn journal_layer<S, W>(writer: W, filter: EnvFilter) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_writer(writer)
        .with_filter(filter)
        .with_filter(filter_fn(|meta| is_journal(meta.target())))
}

/// Install the global subscriber
///
/// The returned guards flush the file writers on drop; keep them alive for
/// the lifetime of the process.
pub fn init(log_dir: Option<&Path>) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();

    let stdout_layer = fmt::layer()
        .with_filter(env_filter())
        .with_filter(filter_fn(|meta| !is_journal(meta.target())));

    let file_layers = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;

            let (relay_writer, relay_guard) =
                tracing_appender::non_blocking(rolling::daily(dir, "relay.log"));
            let (error_writer, error_guard) =
                tracing_appender::non_blocking(rolling::daily(dir, "error.log"));
            let (journal_writer, journal_guard) =
                tracing_appender::non_blocking(rolling::daily(dir, "hooks.log"));
            guards.extend([relay_guard, error_guard, journal_guard]);

            let relay_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(relay_writer)
                .with_filter(env_filter())
                .with_filter(filter_fn(|meta| !is_journal(meta.target())));

            let error_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(error_writer)
                .with_filter(LevelFilter::ERROR);

            Some(
                relay_layer
                    .and_then(error_layer)
                    .and_then(journal_layer(journal_writer, env_filter())),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layers)
        .try_init()?;

    tracing::info!(
        file_logging = log_dir.is_some(),
        "Logging initialized"
    );
    Ok(guards)
}

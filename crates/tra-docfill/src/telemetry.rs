//! Logging bootstrap.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install the global `fmt` subscriber, filtered by `RUST_LOG`.
///
/// `verbose` raises the default to `debug` for this crate and `docgen`; an
/// explicit `RUST_LOG` still wins.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "info,docgen=debug,tra_docfill=debug"
    } else {
        DEFAULT_LOG_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with_target(false)
        .init();
}

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `quiet` raises the filter to `error` regardless of `RUST_LOG`, matching
/// the original's `logger.setLevel(logging.CRITICAL)` under `--quiet`.
pub fn init(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

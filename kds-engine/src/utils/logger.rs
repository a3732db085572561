//! Logging Infrastructure
//!
//! Subscriber setup for embedders, demos, and tests. The engine itself
//! only emits `tracing` events and never installs a subscriber behind a
//! host application's back.

/// Initialize a terminal subscriber honoring `RUST_LOG`.
///
/// Falls back to `default_level` when the environment sets nothing.
/// Safe to call more than once per process; later calls are no-ops.
pub fn init_logger(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

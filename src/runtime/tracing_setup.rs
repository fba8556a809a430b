//! Observability setup.
//!
//! Structured logging via the `tracing` crate: `info!` for lifecycle and
//! committed state changes, `debug!` for full request payloads at function
//! entry, `warn!` for swallowed failures (store writes, background
//! reconciles, stale responses).
//!
//! Configure with `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info    # compact lifecycle logs
//! RUST_LOG=debug   # full payloads and optimistic-step traces
//! ```

/// Initializes the global subscriber. Call once at application startup.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

//! Opt-in `tracing` setup for hosts of the model pipeline.
//!
//! Stage construction, range and interval changes and every published delta
//! are logged at `debug` under the `time_models` target; broadcasts held for
//! a busy stage at `warn`. Hosts with their own subscriber need nothing from here.

/// Directive used when `RUST_LOG` is unset: pipeline events at `info`,
/// everything else at `warn`.
pub const DEFAULT_FILTER: &str = "warn,time_models=info";

/// Installs a compact fmt subscriber filtered by `RUST_LOG`, or by
/// [`DEFAULT_FILTER`] when unset.
///
/// Returns `false` without the `telemetry` feature, or when a global
/// subscriber is already installed.
#[must_use]
pub fn init_default_tracing() -> bool {
    init_tracing(DEFAULT_FILTER)
}

/// Same as [`init_default_tracing`] with a caller-chosen fallback directive,
/// e.g. `"time_models=debug"` to watch every delta.
#[must_use]
pub fn init_tracing(fallback_directive: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_directive));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = fallback_directive;
        false
    }
}

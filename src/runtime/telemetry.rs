//! Log output for embedding hosts
//!
//! The runtime only emits `tracing` events. A host that has no subscriber of
//! its own can call [`init_tracing`] to print them to stderr.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the filter directives, e.g. `spy_runtime=debug`.
pub const LOG_ENV: &str = "SPY_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install a stderr subscriber filtered by `SPY_LOG` (default `warn`).
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        init_tracing();
        assert!(!init_tracing());
    }
}

//! Diagnostic logging setup.
//!
//! Logs go to stderr so they never interleave with rendered events on
//! stdout. The filter comes from `COMMAND_AGENT_LOG` using `EnvFilter`
//! directive syntax (e.g. `debug`, `command_agent::rpc=debug`).

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const ENV_LOG: &str = "COMMAND_AGENT_LOG";
/// Filter used when `COMMAND_AGENT_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Build the filter from `value`, falling back to [`DEFAULT_LOG_FILTER`].
pub fn filter_from(value: Option<&str>) -> EnvFilter {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging() {
    let filter = filter_from(std::env::var(ENV_LOG).ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

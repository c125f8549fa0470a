//! Environment overrides applied on top of the file config.

use crate::error::ConfigError;

use super::Config;

/// Overrides the active model id.
pub const ENV_MODEL: &str = "COMMAND_AGENT_MODEL";
/// Overrides the runtime executable path.
pub const ENV_CLI_PATH: &str = "COMMAND_AGENT_CLI_PATH";
/// Overrides the per-prompt timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "COMMAND_AGENT_TIMEOUT_SECS";

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(model) = non_empty(env_lookup(ENV_MODEL)) {
        config.session.model = model;
    }
    if let Some(path) = non_empty(env_lookup(ENV_CLI_PATH)) {
        config.client.cli_path = path;
    }
    if let Some(timeout) = non_empty(env_lookup(ENV_TIMEOUT_SECS)) {
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid {ENV_TIMEOUT_SECS} value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        // Clamp to at least 1 second; zero would time out every prompt.
        config.session.prompt_timeout_secs = parsed.max(1);
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

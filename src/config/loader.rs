//! Top-level config loading pipeline.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::env::apply_runtime_env_overrides;
use super::init::config_root_dir;
use super::sources::read_config_text_with_sources;
use super::{Config, ConfigDiagnostics, FileConfig, LoadedConfig};

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_with_diagnostics(path_override)?.config)
}

/// Load configuration and return where it came from plus warnings.
pub fn load_config_with_diagnostics(
    path_override: Option<&str>,
) -> Result<LoadedConfig, ConfigError> {
    load_config_with_diagnostics_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

pub(super) fn load_config_with_diagnostics_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let parsed: FileConfig = toml::from_str(&config_text)?;
    let mut config = parsed.into_config();
    apply_runtime_env_overrides(&mut config, &env_lookup)?;

    let mut diagnostics = ConfigDiagnostics {
        source: source.to_string(),
        warnings: Vec::new(),
    };
    validate_config(&config, &mut diagnostics)?;

    Ok(LoadedConfig {
        config,
        diagnostics,
    })
}

/// Reject configs the runtime cannot use; record softer problems as warnings.
pub(super) fn validate_config(
    config: &Config,
    diagnostics: &mut ConfigDiagnostics,
) -> Result<(), ConfigError> {
    if config.session.model.trim().is_empty() {
        return Err(ConfigError::Invalid("session.model must not be empty".into()));
    }
    if config.client.cli_path.trim().is_empty() {
        return Err(ConfigError::Invalid("client.cli_path must not be empty".into()));
    }
    for (name, server) in &config.mcp_servers {
        if server.command.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "mcp_servers.{name}.command must not be empty"
            )));
        }
        if server.tools.is_empty() {
            diagnostics.warnings.push(format!(
                "mcp_servers.{name}.tools is empty; the provider will expose no tools"
            ));
        }
    }
    if config.mcp_servers.is_empty() {
        diagnostics
            .warnings
            .push("no tool providers configured under [mcp_servers]".to_string());
    }
    Ok(())
}

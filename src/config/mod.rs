//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`COMMAND_AGENT_MODEL`, `COMMAND_AGENT_CLI_PATH`,
//!    `COMMAND_AGENT_TIMEOUT_SECS`)
//! 2. TOML file specified via --config CLI flag
//! 3. ./command-agent.toml in the current directory
//! 4. $XDG_CONFIG_HOME/command-agent/command-agent.toml
//!    (or ~/.config/command-agent/command-agent.toml)
//! 5. Built-in defaults

mod defaults;
mod env;
mod init;
mod loader;
mod sources;
mod types;

pub use env::{ENV_CLI_PATH, ENV_MODEL, ENV_TIMEOUT_SECS};
pub use init::{config_root_dir, default_global_config_path, initialize_default_global_config};
pub use loader::{load_config, load_config_with_diagnostics};
pub use types::{
    ClientConfig, Config, ConfigDiagnostics, DisplayConfig, GlobalConfigInitResult, LoadedConfig,
    McpServerConfig, McpTransport, SessionConfig,
};
use types::FileConfig;

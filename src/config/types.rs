//! Configuration data model.
//!
//! This module holds struct/enum definitions plus default values. Loader and
//! source-resolution logic lives in sibling modules so precedence behavior
//! stays centralized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{
    default_mcp_servers, DEFAULT_CLI_LOG_LEVEL, DEFAULT_CLI_PATH, DEFAULT_EXCLUDED_TOOLS,
    DEFAULT_MODEL_ID, DEFAULT_PROMPT_TIMEOUT_SECS, DEFAULT_SYSTEM_MESSAGE,
};

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub session: SessionConfig,
    /// Tool-provider registry keyed by provider name.
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            session: SessionConfig::default(),
            mcp_servers: default_mcp_servers(),
            display: DisplayConfig::default(),
        }
    }
}

/// How to launch and talk to the agent runtime process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Runtime executable; resolved through `PATH` when not absolute.
    pub cli_path: String,
    /// Extra arguments placed before the server-mode flags.
    pub cli_args: Vec<String>,
    /// Log level forwarded to the runtime via `--log-level`.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cli_path: DEFAULT_CLI_PATH.to_string(),
            cli_args: Vec::new(),
            log_level: DEFAULT_CLI_LOG_LEVEL.to_string(),
        }
    }
}

/// Conversation settings sent with `session.create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub model: String,
    pub system_message: String,
    pub excluded_tools: Vec<String>,
    pub prompt_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL_ID.to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            excluded_tools: DEFAULT_EXCLUDED_TOOLS
                .iter()
                .map(|tool| tool.to_string())
                .collect(),
            prompt_timeout_secs: DEFAULT_PROMPT_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    /// Per-prompt deadline for `send_and_wait`.
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs.max(1))
    }
}

/// Transport used by the runtime to reach a tool provider.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum McpTransport {
    #[default]
    Stdio,
    Local,
}

/// One tool-provider entry under `[mcp_servers.<name>]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct McpServerConfig {
    #[serde(rename = "type", default)]
    pub transport: McpTransport,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Enabled-tool selector; `["*"]` enables everything the provider offers.
    #[serde(default = "all_tools")]
    pub tools: Vec<String>,
}

fn all_tools() -> Vec<String> {
    vec!["*".to_string()]
}

/// Display / rendering preferences.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
    /// Initial verbosity; toggled at runtime with the `verbose` directive.
    pub verbose: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub(super) client: ClientConfig,
    pub(super) session: SessionConfig,
    /// `None` when the file has no `[mcp_servers]` table at all.
    #[serde(alias = "mcpServers")]
    pub(super) mcp_servers: Option<BTreeMap<String, McpServerConfig>>,
    pub(super) display: DisplayConfig,
}

impl FileConfig {
    pub(super) fn into_config(self) -> Config {
        Config {
            client: self.client,
            session: self.session,
            mcp_servers: self.mcp_servers.unwrap_or_else(default_mcp_servers),
            display: self.display,
        }
    }
}

/// Diagnostics captured while resolving runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigDiagnostics {
    /// Human-readable description of where the config came from.
    pub source: String,
    /// Non-fatal problems worth surfacing to the operator.
    pub warnings: Vec<String>,
}

/// Configuration payload plus load-time diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub diagnostics: ConfigDiagnostics,
}

/// Result of explicit global config initialization (`command-agent init`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalConfigInitResult {
    Created { path: PathBuf },
    AlreadyInitialized { path: PathBuf },
    Overwritten { path: PathBuf, backup_path: PathBuf },
}

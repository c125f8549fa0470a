//! Default configuration constants and the bundled tool-provider registry.

use std::collections::BTreeMap;

use super::{McpServerConfig, McpTransport};

/// Embedded default config template written by `command-agent init`.
pub(super) const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../templates/command-agent.toml");
/// File name used for both local and global config files.
pub(super) const CONFIG_FILE_NAME: &str = "command-agent.toml";
/// Directory under the config root holding the global config.
pub(super) const CONFIG_DIR_NAME: &str = "command-agent";
/// Runtime executable launched in server mode.
pub(super) const DEFAULT_CLI_PATH: &str = "copilot";
/// Runtime log level.
pub(super) const DEFAULT_CLI_LOG_LEVEL: &str = "info";
/// Model id requested at session creation.
pub(super) const DEFAULT_MODEL_ID: &str = "gpt-4.1";
/// System instructions appended to the runtime's own.
pub(super) const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a browser automation assistant. DO NOT USE POWERSHELL";
/// Tools the runtime must never offer to the model.
pub(super) const DEFAULT_EXCLUDED_TOOLS: &[&str] = &["powershell"];
/// Per-prompt deadline.
pub(super) const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 120;

/// Default tool-provider registry: a Playwright MCP host launched via npx.
pub(super) fn default_mcp_servers() -> BTreeMap<String, McpServerConfig> {
    let mut servers = BTreeMap::new();
    servers.insert(
        "playwright".to_string(),
        McpServerConfig {
            transport: McpTransport::Stdio,
            command: "npx".to_string(),
            args: vec!["-y".to_string(), "@playwright/mcp@latest".to_string()],
            tools: vec!["*".to_string()],
        },
    );
    servers
}

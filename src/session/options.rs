//! Session and client launch options derived from [`Config`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::config::{Config, McpServerConfig, McpTransport};

use super::permission::{AlwaysApprove, PermissionPolicy};

/// Grace period between closing the runtime's stdin and killing it.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);

/// How to launch the agent runtime.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub cli_path: String,
    pub cli_args: Vec<String>,
    pub log_level: String,
    pub stop_grace: Duration,
}

impl ClientOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cli_path: config.client.cli_path.clone(),
            cli_args: config.client.cli_args.clone(),
            log_level: config.client.log_level.clone(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Full argument vector after the executable.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.cli_args.clone();
        args.extend([
            "--server".to_string(),
            "--log-level".to_string(),
            self.log_level.clone(),
            "--stdio".to_string(),
        ]);
        args
    }
}

/// Everything `session.create` needs, plus the local permission policy.
#[derive(Clone)]
pub struct SessionOptions {
    pub model: String,
    pub system_message: String,
    pub excluded_tools: Vec<String>,
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
    pub permission_policy: Arc<dyn PermissionPolicy>,
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("model", &self.model)
            .field("system_message", &self.system_message)
            .field("excluded_tools", &self.excluded_tools)
            .field("mcp_servers", &self.mcp_servers)
            .finish_non_exhaustive()
    }
}

impl SessionOptions {
    /// Options from config with the always-approve policy.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.session.model.clone(),
            system_message: config.session.system_message.clone(),
            excluded_tools: config.session.excluded_tools.clone(),
            mcp_servers: config.mcp_servers.clone(),
            permission_policy: Arc::new(AlwaysApprove),
        }
    }

    pub fn with_permission_policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.permission_policy = policy;
        self
    }

    /// Params object for the `session.create` request.
    pub fn create_params(&self) -> Value {
        let mut params = Map::new();
        params.insert("model".into(), json!(self.model));
        if !self.system_message.trim().is_empty() {
            params.insert(
                "systemMessage".into(),
                json!({ "mode": "append", "content": self.system_message }),
            );
        }
        if !self.excluded_tools.is_empty() {
            params.insert("excludedTools".into(), json!(self.excluded_tools));
        }
        if !self.mcp_servers.is_empty() {
            let servers: Map<String, Value> = self
                .mcp_servers
                .iter()
                .map(|(name, server)| (name.clone(), mcp_server_wire(server)))
                .collect();
            params.insert("mcpServers".into(), Value::Object(servers));
        }
        params.insert("requestPermission".into(), json!(true));
        Value::Object(params)
    }
}

fn mcp_server_wire(server: &McpServerConfig) -> Value {
    let transport = match server.transport {
        McpTransport::Stdio => "stdio",
        McpTransport::Local => "local",
    };
    json!({
        "type": transport,
        "command": server.command,
        "args": server.args,
        "tools": server.tools,
    })
}

//! Unified error types for the console.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// RpcError
// ---------------------------------------------------------------------------

/// Errors from the JSON-RPC transport to the agent runtime.
#[derive(Debug)]
pub enum RpcError {
    /// Reading from or writing to the transport failed.
    Io(std::io::Error),
    /// The peer sent something that is not valid framed JSON-RPC.
    Protocol(String),
    /// The peer answered a request with a JSON-RPC error object.
    Remote { code: i64, message: String },
    /// The connection closed before a response arrived.
    ConnectionClosed,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Remote { code, message } => write!(f, "remote error {code}: {message}"),
            Self::ConnectionClosed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<std::io::Error> for RpcError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors surfaced by the session client.
#[derive(Debug)]
pub enum SessionError {
    /// The runtime could not be started or the session could not be created.
    Setup(String),
    /// A prompt did not reach `session.idle` before its deadline.
    Timeout { after: Duration },
    /// A control request got no reply before its deadline.
    Unanswered {
        method: &'static str,
        after: Duration,
    },
    /// The runtime reported a failure for the current prompt.
    Execution(String),
    /// Transport-level failure outside of a prompt.
    Rpc(RpcError),
    /// The session was already destroyed.
    Destroyed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(msg) => write!(f, "setup failed: {msg}"),
            Self::Timeout { after } => write!(
                f,
                "Timeout after {}ms waiting for session.idle",
                after.as_millis()
            ),
            Self::Unanswered { method, after } => write!(
                f,
                "no reply to {method} within {}ms",
                after.as_millis()
            ),
            Self::Execution(msg) => write!(f, "{msg}"),
            Self::Rpc(e) => write!(f, "rpc: {e}"),
            Self::Destroyed => write!(f, "session already destroyed"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RpcError> for SessionError {
    fn from(e: RpcError) -> Self {
        Self::Rpc(e)
    }
}

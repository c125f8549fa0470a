//! Session client for the agent runtime.
//!
//! [`AgentClient`] owns the runtime process and its JSON-RPC connection and
//! creates [`Session`]s. The console only depends on the [`SessionHandle`]
//! and [`ClientHandle`] traits so it can be driven by fakes in tests.

mod client;
mod dispatch;
mod events;
mod handle;
mod options;
mod permission;

pub use client::{AgentClient, PingResponse, SUPPORTED_PROTOCOL_VERSION};
pub use events::{SessionEvent, SessionEventNotification, ToolFailure, ToolResult, WireEvent};
pub use handle::Session;
pub use options::{ClientOptions, SessionOptions, DEFAULT_STOP_GRACE};
pub use permission::{
    AllowKinds, AlwaysApprove, PermissionDecision, PermissionPolicy, PermissionRequest,
};

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// Identifies one subscriber of a session's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// One subscriber's view of the event stream. The receiver finishes when the
/// subscription is removed or the session is destroyed.
#[derive(Debug)]
pub struct EventSubscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<SessionEvent>,
}

/// What the console needs from a live session.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    fn id(&self) -> &str;

    fn subscribe(&self) -> EventSubscription;

    /// Returns false when `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Send `prompt` and wait for `session.idle`.
    ///
    /// Resolves with the last assistant message of the turn, if any. Fails
    /// with [`SessionError::Timeout`] when `timeout` passes first (the remote
    /// turn keeps running) and with [`SessionError::Execution`] on
    /// `session.error`.
    async fn send_and_wait(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<Option<String>, SessionError>;

    /// Cancel the turn currently in flight.
    async fn abort(&self) -> Result<(), SessionError>;

    /// Release the remote session. A second call is a no-op.
    async fn destroy(&self) -> Result<(), SessionError>;
}

/// What the console needs from the client that owns the runtime.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    /// Destroy remaining sessions, close the connection and end the runtime.
    async fn stop(&self) -> Result<(), SessionError>;
}

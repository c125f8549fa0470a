use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::SessionError;
use crate::rpc::{InboundHandler, RpcConnection, RpcErrorObject};

use super::dispatch::{SessionRegistry, SessionShared};
use super::events::{SessionEvent, SessionEventNotification};
use super::handle::{destroy_remote, Session};
use super::options::{ClientOptions, SessionOptions, DEFAULT_STOP_GRACE};
use super::permission::{PermissionDecision, PermissionRequest};
use super::ClientHandle;

/// Server protocol version this client speaks.
pub const SUPPORTED_PROTOCOL_VERSION: i64 = 2;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PingResponse {
    pub message: String,
    pub timestamp: Option<i64>,
    pub protocol_version: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionRequestParams {
    session_id: String,
    permission_request: PermissionRequest,
}

/// Routes peer traffic to the registered sessions.
struct ClientInbound {
    sessions: SessionRegistry,
}

#[async_trait]
impl InboundHandler for ClientInbound {
    fn on_notification(&self, method: &str, params: Value) {
        if method != "session.event" {
            tracing::debug!(method, "ignoring notification");
            return;
        }
        let note: SessionEventNotification = match serde_json::from_value(params) {
            Ok(note) => note,
            Err(err) => {
                tracing::warn!(error = %err, "malformed session.event");
                return;
            }
        };
        let event = SessionEvent::from_wire(note.event);
        tracing::debug!(session = %note.session_id, kind = event.kind(), "session event");
        self.sessions.route(&note.session_id, event);
    }

    async fn on_request(&self, method: &str, params: Value) -> Result<Value, RpcErrorObject> {
        match method {
            "permission.request" => {
                let params: PermissionRequestParams =
                    serde_json::from_value(params).map_err(RpcErrorObject::invalid_params)?;
                let decision = match self.sessions.get(&params.session_id) {
                    Some(session) => session.decide(&params.permission_request),
                    None => PermissionDecision::Unavailable,
                };
                tracing::debug!(
                    session = %params.session_id,
                    kind = %params.permission_request.kind,
                    ?decision,
                    "permission request"
                );
                Ok(decision.to_wire())
            }
            other => Err(RpcErrorObject::method_not_found(other)),
        }
    }

    fn on_close(&self) {
        self.sessions.close_all();
    }
}

/// Owns the runtime process and the connection to it.
pub struct AgentClient {
    connection: Arc<RpcConnection>,
    sessions: SessionRegistry,
    child: AsyncMutex<Option<Child>>,
    stop_grace: Duration,
    stopped: AtomicBool,
}

impl AgentClient {
    /// Launch the runtime in server mode and verify it answers `ping`.
    pub async fn start(options: &ClientOptions) -> Result<Self, SessionError> {
        let args = options.launch_args();
        tracing::debug!(cli = %options.cli_path, ?args, "starting agent runtime");

        let mut child = Command::new(&options.cli_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SessionError::Setup(format!("failed to start `{}`: {e}", options.cli_path))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(SessionError::Setup(
                "runtime stdio was not captured".to_string(),
            ));
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let mut client = Self::connect(stdout, stdin).with_stop_grace(options.stop_grace);
        client.child = AsyncMutex::new(Some(child));

        if let Err(err) = client.ping("command-agent").await {
            // Setup already failed; the stop error adds nothing.
            let _ = client.stop().await;
            return Err(SessionError::Setup(format!("runtime did not answer ping: {err}")));
        }
        Ok(client)
    }

    /// Speak to a runtime over an existing transport. No process is owned.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let sessions = SessionRegistry::default();
        let handler = Arc::new(ClientInbound {
            sessions: sessions.clone(),
        });
        Self {
            connection: Arc::new(RpcConnection::spawn(reader, writer, handler)),
            sessions,
            child: AsyncMutex::new(None),
            stop_grace: DEFAULT_STOP_GRACE,
            stopped: AtomicBool::new(false),
        }
    }

    /// Bound each `session.destroy` and the wait for the process to exit.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub async fn ping(&self, message: &str) -> Result<PingResponse, SessionError> {
        let value = self
            .connection
            .request("ping", json!({ "message": message }))
            .await?;
        let response: PingResponse =
            serde_json::from_value(value).map_err(|e| SessionError::Rpc(e.into()))?;
        match response.protocol_version {
            Some(version) if version != SUPPORTED_PROTOCOL_VERSION => tracing::warn!(
                server = version,
                supported = SUPPORTED_PROTOCOL_VERSION,
                "runtime protocol version mismatch"
            ),
            None => tracing::debug!("runtime did not report a protocol version"),
            _ => {}
        }
        Ok(response)
    }

    /// Create a session and register it for event and permission routing.
    pub async fn create_session(&self, options: &SessionOptions) -> Result<Session, SessionError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(SessionError::Setup("client already stopped".to_string()));
        }
        let value = self
            .connection
            .request("session.create", options.create_params())
            .await
            .map_err(|e| SessionError::Setup(format!("session.create: {e}")))?;
        let response: CreateSessionResponse = serde_json::from_value(value)
            .map_err(|e| SessionError::Setup(format!("session.create: {e}")))?;

        tracing::debug!(session = %response.session_id, model = %options.model, "session created");
        let shared = Arc::new(SessionShared::new(
            response.session_id,
            options.permission_policy.clone(),
        ));
        self.sessions.insert(shared.clone());
        Ok(Session::new(
            shared,
            self.connection.clone(),
            self.sessions.clone(),
            self.stop_grace,
        ))
    }

    async fn stop_inner(&self) -> Result<(), SessionError> {
        let mut first_error: Option<SessionError> = None;

        for session in self.sessions.drain() {
            session.close();
            tracing::debug!(session = %session.id(), "destroying session on stop");
            if let Err(err) = destroy_remote(&self.connection, session.id(), self.stop_grace).await {
                tracing::warn!(session = %session.id(), error = %err, "destroy during stop failed");
                first_error.get_or_insert(err);
            }
        }

        self.connection.shutdown();

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(self.stop_grace, child.wait()).await {
                Ok(Ok(status)) => tracing::debug!(%status, "agent runtime exited"),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "waiting for agent runtime failed");
                    first_error.get_or_insert(SessionError::Rpc(err.into()));
                }
                Err(_) => {
                    tracing::warn!("agent runtime did not exit in time; killing it");
                    if let Err(err) = child.kill().await {
                        first_error.get_or_insert(SessionError::Rpc(err.into()));
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClientHandle for AgentClient {
    async fn stop(&self) -> Result<(), SessionError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop_inner().await
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::debug!(target: "command_agent::runtime", "{line}"),
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err, "runtime stderr closed");
                break;
            }
        }
    }
}

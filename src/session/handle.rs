use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::error::{RpcError, SessionError};
use crate::rpc::RpcConnection;

use super::dispatch::{SessionRegistry, SessionShared};
use super::events::SessionEvent;
use super::{EventSubscription, SessionHandle, SubscriptionId};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    #[serde(default)]
    message_id: Option<String>,
}

/// One conversation held open against the runtime.
pub struct Session {
    shared: Arc<SessionShared>,
    connection: Arc<RpcConnection>,
    registry: SessionRegistry,
    /// Deadline for `session.destroy`.
    destroy_deadline: Duration,
}

impl Session {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        connection: Arc<RpcConnection>,
        registry: SessionRegistry,
        destroy_deadline: Duration,
    ) -> Self {
        Self {
            shared,
            connection,
            registry,
            destroy_deadline,
        }
    }

    /// Queue `prompt` for the session and return the runtime's message id.
    pub async fn send(&self, prompt: &str) -> Result<Option<String>, SessionError> {
        if self.shared.is_closed() {
            return Err(SessionError::Destroyed);
        }
        let value = self
            .connection
            .request(
                "session.send",
                json!({ "sessionId": self.shared.id(), "prompt": prompt }),
            )
            .await
            .map_err(|err| match err {
                RpcError::Remote { message, .. } => SessionError::Execution(message),
                other => SessionError::Rpc(other),
            })?;
        let response: SendResponse =
            serde_json::from_value(value).map_err(|e| SessionError::Rpc(e.into()))?;
        Ok(response.message_id)
    }
}

/// Ask the runtime to destroy session `id`, giving up after `deadline`.
pub(crate) async fn destroy_remote(
    connection: &RpcConnection,
    id: &str,
    deadline: Duration,
) -> Result<(), SessionError> {
    let request = connection.request("session.destroy", json!({ "sessionId": id }));
    match tokio::time::timeout(deadline, request).await {
        Ok(result) => {
            result?;
            Ok(())
        }
        Err(_) => Err(SessionError::Unanswered {
            method: "session.destroy",
            after: deadline,
        }),
    }
}

async fn wait_for_idle(
    receiver: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<Option<String>, SessionError> {
    let mut last_message = None;
    while let Some(event) = receiver.recv().await {
        match event {
            SessionEvent::AssistantMessage { content } => last_message = Some(content),
            SessionEvent::Error { message } => return Err(SessionError::Execution(message)),
            SessionEvent::Idle => return Ok(last_message),
            _ => {}
        }
    }
    Err(SessionError::Rpc(RpcError::ConnectionClosed))
}

#[async_trait]
impl SessionHandle for Session {
    fn id(&self) -> &str {
        self.shared.id()
    }

    fn subscribe(&self) -> EventSubscription {
        self.shared.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.unsubscribe(id)
    }

    async fn send_and_wait(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<Option<String>, SessionError> {
        // Subscribe before sending so no event of this turn is missed.
        let mut subscription = self.shared.subscribe();
        let result = async {
            self.send(prompt).await?;
            match tokio::time::timeout(timeout, wait_for_idle(&mut subscription.receiver)).await {
                Ok(result) => result,
                Err(_) => Err(SessionError::Timeout { after: timeout }),
            }
        }
        .await;
        self.shared.unsubscribe(subscription.id);
        result
    }

    async fn abort(&self) -> Result<(), SessionError> {
        if self.shared.is_closed() {
            return Err(SessionError::Destroyed);
        }
        self.connection
            .request("session.abort", json!({ "sessionId": self.shared.id() }))
            .await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), SessionError> {
        // Whoever removes the registry entry owns the remote destroy.
        let Some(shared) = self.registry.remove(self.shared.id()) else {
            tracing::debug!(session = %self.shared.id(), "session already destroyed");
            return Ok(());
        };
        shared.close();
        tracing::debug!(session = %shared.id(), "destroying session");
        destroy_remote(&self.connection, shared.id(), self.destroy_deadline).await
    }
}

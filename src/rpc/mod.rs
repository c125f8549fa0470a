//! JSON-RPC 2.0 connection over an async byte stream.
//!
//! One reader task decodes frames and routes them: responses complete the
//! matching pending request, notifications are handed to the
//! [`InboundHandler`] synchronously and in arrival order, and peer requests
//! are answered from a spawned task so a slow handler never stalls the
//! reader. One writer task owns the write half so frames never interleave.

mod codec;
mod message;

pub use codec::{write_frame, FrameReader};
pub use message::{Incoming, RpcErrorObject, INVALID_PARAMS, METHOD_NOT_FOUND};

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::RpcError;

/// Receiver for peer-initiated traffic.
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    /// Called on the reader task for every notification, in arrival order.
    fn on_notification(&self, method: &str, params: Value);
    /// Answer one peer request.
    async fn on_request(&self, method: &str, params: Value) -> Result<Value, RpcErrorObject>;
    /// Called when the connection stops delivering messages. May run more
    /// than once (reader exit and explicit shutdown), so keep it idempotent.
    fn on_close(&self) {}
}

/// Outstanding requests keyed by id; `closed` refuses new entries once the
/// connection has failed them all.
#[derive(Default)]
struct PendingRequests {
    waiters: HashMap<i64, oneshot::Sender<Result<Value, RpcError>>>,
    closed: bool,
}

type PendingMap = Arc<Mutex<PendingRequests>>;

/// Client side of a JSON-RPC connection.
pub struct RpcConnection {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    pending: PendingMap,
    next_id: AtomicI64,
    handler: Arc<dyn InboundHandler>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RpcConnection {
    /// Start reader and writer tasks over the given stream halves.
    pub fn spawn<R, W>(reader: R, writer: W, handler: Arc<dyn InboundHandler>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let pending: PendingMap = Arc::new(Mutex::new(PendingRequests::default()));

        let writer_task = tokio::spawn(write_loop(writer, outgoing_rx, pending.clone()));
        let reader_task = tokio::spawn(read_loop(
            FrameReader::new(reader),
            outgoing.clone(),
            pending.clone(),
            handler.clone(),
        ));

        Self {
            outgoing,
            pending,
            next_id: AtomicI64::new(1),
            handler,
            tasks: Mutex::new(vec![reader_task, writer_task]),
        }
    }

    /// Send a request and wait for its response.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = message::request_body(id, method, params)?;
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock_unpoisoned(&self.pending);
            if pending.closed {
                return Err(RpcError::ConnectionClosed);
            }
            pending.waiters.insert(id, tx);
        }

        tracing::debug!(id, method, "rpc request");
        if self.outgoing.send(body).is_err() {
            lock_unpoisoned(&self.pending).waiters.remove(&id);
            return Err(RpcError::ConnectionClosed);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(RpcError::ConnectionClosed),
        }
    }

    /// Stop both tasks and fail every outstanding request.
    ///
    /// Dropping the writer task releases the write half, which signals EOF
    /// to a child process reading its stdin.
    pub fn shutdown(&self) {
        let tasks: Vec<_> = lock_unpoisoned(&self.tasks).drain(..).collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        fail_pending(&self.pending);
        self.handler.on_close();
    }
}

impl Drop for RpcConnection {
    fn drop(&mut self) {
        for task in lock_unpoisoned(&self.tasks).drain(..) {
            task.abort();
        }
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: PendingMap,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(body) = outgoing.recv().await {
        if let Err(err) = write_frame(&mut writer, &body).await {
            tracing::warn!(error = %err, "rpc write failed; closing connection");
            break;
        }
    }
    outgoing.close();
    fail_pending(&pending);
}

async fn read_loop<R>(
    mut reader: FrameReader<R>,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    pending: PendingMap,
    handler: Arc<dyn InboundHandler>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let body = match reader.read_frame().await {
            Ok(Some(body)) => body,
            Ok(None) => {
                tracing::debug!("rpc peer closed the stream");
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "rpc read failed; closing connection");
                break;
            }
        };

        let incoming = match Incoming::parse(&body) {
            Ok(incoming) => incoming,
            Err(err) => {
                tracing::warn!(error = %err, "dropping undecodable rpc message");
                continue;
            }
        };

        match incoming {
            Incoming::Response { id, result } => {
                let waiter = lock_unpoisoned(&pending).waiters.remove(&id);
                match waiter {
                    Some(waiter) => {
                        let _ = waiter.send(result.map_err(RpcError::from));
                    }
                    None => tracing::debug!(id, "response for unknown request id"),
                }
            }
            Incoming::Notification { method, params } => {
                handler.on_notification(&method, params);
            }
            Incoming::Request { id, method, params } => {
                let handler = handler.clone();
                let outgoing = outgoing.clone();
                tokio::spawn(async move {
                    let result = handler.on_request(&method, params).await;
                    match message::response_body(id, result) {
                        Ok(body) => {
                            if outgoing.send(body).is_err() {
                                tracing::debug!(method = %method, "connection closed before reply");
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, method = %method, "failed to encode reply")
                        }
                    }
                });
            }
        }
    }

    fail_pending(&pending);
    handler.on_close();
}

fn fail_pending(pending: &PendingMap) {
    let waiters: Vec<_> = {
        let mut pending = lock_unpoisoned(pending);
        pending.closed = true;
        pending.waiters.drain().collect()
    };
    for (_, waiter) in waiters {
        let _ = waiter.send(Err(RpcError::ConnectionClosed));
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

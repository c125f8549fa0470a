//! Operator line input.
//!
//! Lines come from a dedicated blocking reader thread so an unfinished read
//! never holds the async runtime open at exit. Both operations are
//! cancel-safe: the command loop races them against session events.

use std::io::{self, BufRead};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Result of waiting for one operator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A full line without its terminator.
    Line(String),
    /// End of input (Ctrl-D or closed stdin).
    Eof,
    /// Ctrl-C while waiting for input.
    Cancelled,
}

#[async_trait]
pub trait ConsoleInput: Send {
    /// Wait for the next line. Dropping the future loses no input.
    async fn read_line(&mut self) -> ReadOutcome;
    /// Resolve on the next operator interrupt.
    async fn interrupted(&mut self);
    /// Stop reading; later reads return [`ReadOutcome::Eof`].
    fn close(&mut self);
}

/// Process stdin plus Ctrl-C.
pub struct StdinInput {
    lines: Option<mpsc::UnboundedReceiver<io::Result<String>>>,
}

impl StdinInput {
    /// Start the reader thread.
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || read_stdin_lines(tx))?;
        Ok(Self { lines: Some(rx) })
    }
}

fn read_stdin_lines(tx: mpsc::UnboundedSender<io::Result<String>>) {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let text = line.trim_end_matches(&['\r', '\n'][..]).to_string();
                if tx.send(Ok(text)).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err));
                break;
            }
        }
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl ConsoleInput for StdinInput {
    async fn read_line(&mut self) -> ReadOutcome {
        let Some(lines) = self.lines.as_mut() else {
            return ReadOutcome::Eof;
        };
        tokio::select! {
            line = lines.recv() => match line {
                Some(Ok(line)) => ReadOutcome::Line(line),
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "stdin read failed");
                    ReadOutcome::Eof
                }
                None => ReadOutcome::Eof,
            },
            _ = ctrl_c() => ReadOutcome::Cancelled,
        }
    }

    async fn interrupted(&mut self) {
        ctrl_c().await;
    }

    fn close(&mut self) {
        // Dropping the receiver ends the reader thread after its next line.
        self.lines = None;
    }
}

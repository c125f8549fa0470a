//! Shared test fixtures.
//!
//! The console fakes all write into one [`Journal`] so tests can assert the
//! relative order of input, session, client, and output activity.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::console::{ConsoleInput, ConsoleSink, ReadOutcome};
use crate::error::SessionError;
use crate::rpc::lock_unpoisoned;
use crate::session::{
    ClientHandle, EventSubscription, SessionEvent, SessionHandle, SubscriptionId,
};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("command-agent-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Ordered record of everything the fakes observed.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        lock_unpoisoned(&self.entries).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        lock_unpoisoned(&self.entries).clone()
    }

    /// Entries starting with `prefix`, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// Console input that replays a fixed script, then reports end of input.
pub struct ScriptedInput {
    journal: Journal,
    script: VecDeque<ReadOutcome>,
    interrupts: usize,
}

impl ScriptedInput {
    pub fn new(journal: &Journal, lines: &[&str]) -> Self {
        Self {
            journal: journal.clone(),
            script: lines
                .iter()
                .map(|line| ReadOutcome::Line(line.to_string()))
                .collect(),
            interrupts: 0,
        }
    }

    /// Append a raw outcome (e.g. `Cancelled`) after the scripted lines.
    pub fn then(mut self, outcome: ReadOutcome) -> Self {
        self.script.push_back(outcome);
        self
    }

    /// Make the next `n` in-flight waits see an operator interrupt.
    pub fn with_interrupts(mut self, n: usize) -> Self {
        self.interrupts = n;
        self
    }
}

#[async_trait]
impl ConsoleInput for ScriptedInput {
    async fn read_line(&mut self) -> ReadOutcome {
        let outcome = self.script.pop_front().unwrap_or(ReadOutcome::Eof);
        self.journal.push(format!("input:{outcome:?}"));
        outcome
    }

    async fn interrupted(&mut self) {
        if self.interrupts == 0 {
            std::future::pending::<()>().await;
        }
        // Let the in-flight wait get polled once first.
        tokio::task::yield_now().await;
        self.interrupts -= 1;
        self.journal.push("input:interrupt");
    }

    fn close(&mut self) {
        self.journal.push("input:close");
    }
}

/// What the fake session does with the next prompt.
#[derive(Debug, Clone)]
pub enum Turn {
    /// Emit the events, then go idle.
    Reply(Vec<SessionEvent>),
    /// Emit the events, then report `session.error` with the message.
    Fail(Vec<SessionEvent>, String),
    /// Never go idle.
    Hang,
}

/// In-memory [`SessionHandle`] driven by scripted turns.
pub struct FakeSession {
    journal: Journal,
    turns: Mutex<VecDeque<Turn>>,
    subscribers: Mutex<Vec<(u64, mpsc::UnboundedSender<SessionEvent>)>>,
    next_subscription: AtomicU64,
    destroyed: AtomicBool,
    fail_destroy: bool,
}

impl FakeSession {
    pub fn new(journal: &Journal, turns: Vec<Turn>) -> Self {
        Self {
            journal: journal.clone(),
            turns: Mutex::new(turns.into()),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
            fail_destroy: false,
        }
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    /// Push one event to every subscriber, as the runtime would.
    pub fn emit(&self, event: SessionEvent) {
        lock_unpoisoned(&self.subscribers).retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn last_message(events: &[SessionEvent]) -> Option<String> {
        events.iter().rev().find_map(|event| match event {
            SessionEvent::AssistantMessage { content } => Some(content.clone()),
            _ => None,
        })
    }
}

#[async_trait]
impl SessionHandle for FakeSession {
    fn id(&self) -> &str {
        "fake-session"
    }

    fn subscribe(&self) -> EventSubscription {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        lock_unpoisoned(&self.subscribers).push((id, tx));
        self.journal.push("session:subscribe");
        EventSubscription {
            id: SubscriptionId(id),
            receiver: rx,
        }
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = lock_unpoisoned(&self.subscribers);
        let before = subs.len();
        subs.retain(|(entry, _)| *entry != id.0);
        self.journal.push("session:unsubscribe");
        subs.len() != before
    }

    async fn send_and_wait(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<Option<String>, SessionError> {
        self.journal.push(format!("session:send:{prompt}"));
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(SessionError::Destroyed);
        }
        let turn = lock_unpoisoned(&self.turns)
            .pop_front()
            .unwrap_or(Turn::Reply(Vec::new()));
        match turn {
            Turn::Reply(events) => {
                for event in &events {
                    self.emit(event.clone());
                }
                self.emit(SessionEvent::Idle);
                Ok(Self::last_message(&events))
            }
            Turn::Fail(events, message) => {
                for event in events {
                    self.emit(event);
                }
                self.emit(SessionEvent::Error {
                    message: message.clone(),
                });
                Err(SessionError::Execution(message))
            }
            Turn::Hang => {
                tokio::time::sleep(timeout).await;
                Err(SessionError::Timeout { after: timeout })
            }
        }
    }

    async fn abort(&self) -> Result<(), SessionError> {
        self.journal.push("session:abort");
        Ok(())
    }

    async fn destroy(&self) -> Result<(), SessionError> {
        self.journal.push("session:destroy");
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        lock_unpoisoned(&self.subscribers).clear();
        if self.fail_destroy {
            return Err(SessionError::Execution("Session not found".into()));
        }
        Ok(())
    }
}

/// [`ClientHandle`] that only records calls.
pub struct FakeClient {
    journal: Journal,
}

impl FakeClient {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

#[async_trait]
impl ClientHandle for FakeClient {
    async fn stop(&self) -> Result<(), SessionError> {
        self.journal.push("client:stop");
        Ok(())
    }
}

/// [`ConsoleSink`] that records output instead of printing it.
pub struct CaptureSink {
    journal: Journal,
}

impl CaptureSink {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl ConsoleSink for CaptureSink {
    fn prompt(&self) {
        self.journal.push("out:prompt");
    }

    fn event(&self, text: &str) {
        self.journal.push(format!("out:event:{text}"));
    }

    fn line(&self, text: &str) {
        self.journal.push(format!("out:line:{text}"));
    }

    fn error(&self, text: &str) {
        self.journal.push(format!("out:error:{text}"));
    }

    fn warn(&self, text: &str) {
        self.journal.push(format!("out:warn:{text}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert!(file.starts_with(fixture.path()));
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
    }

    #[test]
    fn journal_filters_by_prefix() {
        let journal = Journal::default();
        journal.push("session:subscribe");
        journal.push("out:prompt");
        journal.push("session:destroy");
        assert_eq!(
            journal.matching("session:"),
            vec!["session:subscribe", "session:destroy"]
        );
        assert_eq!(journal.position("out:prompt"), Some(1));
        assert_eq!(journal.count("out:prompt"), 1);
    }
}

//! Ordered teardown for every exit path.
//!
//! Steps run in a fixed order and each one is attempted even when an earlier
//! one failed: close input, detach the render subscription, destroy the
//! session, stop the client.

use crate::error::SessionError;
use crate::session::{ClientHandle, SessionHandle, SubscriptionId};

use super::input::ConsoleInput;
use super::sink::ConsoleSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    CloseInput,
    Unsubscribe,
    DestroySession,
    StopClient,
}

/// Which steps ran and which of them failed.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub completed: Vec<ShutdownStep>,
    pub failures: Vec<(ShutdownStep, SessionError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: ShutdownStep, result: Result<(), SessionError>, sink: &dyn ConsoleSink) {
        match result {
            Ok(()) => self.completed.push(step),
            Err(err) => {
                tracing::warn!(?step, error = %err, "shutdown step failed");
                sink.warn(&format!("{}: {err}", step_label(step)));
                self.failures.push((step, err));
            }
        }
    }
}

fn step_label(step: ShutdownStep) -> &'static str {
    match step {
        ShutdownStep::CloseInput => "failed to close input",
        ShutdownStep::Unsubscribe => "failed to detach event subscription",
        ShutdownStep::DestroySession => "failed to destroy session",
        ShutdownStep::StopClient => "failed to stop client",
    }
}

/// The session to tear down and the render subscription attached to it.
pub struct SessionTeardown<'a> {
    pub session: &'a dyn SessionHandle,
    pub subscription: Option<SubscriptionId>,
}

pub struct ShutdownPlan<'a> {
    pub input: &'a mut dyn ConsoleInput,
    pub session: Option<SessionTeardown<'a>>,
    pub client: Option<&'a dyn ClientHandle>,
}

pub async fn run_shutdown(plan: ShutdownPlan<'_>, sink: &dyn ConsoleSink) -> ShutdownReport {
    let ShutdownPlan {
        input,
        session,
        client,
    } = plan;
    let mut report = ShutdownReport::default();

    input.close();
    report.completed.push(ShutdownStep::CloseInput);

    if let Some(teardown) = session {
        if let Some(id) = teardown.subscription {
            if !teardown.session.unsubscribe(id) {
                tracing::debug!("render subscription was already detached");
            }
            report.completed.push(ShutdownStep::Unsubscribe);
        }
        let destroyed = teardown.session.destroy().await;
        report.record(ShutdownStep::DestroySession, destroyed, sink);
    }

    if let Some(client) = client {
        let stopped = client.stop().await;
        report.record(ShutdownStep::StopClient, stopped, sink);
    }

    tracing::debug!(
        completed = report.completed.len(),
        failed = report.failures.len(),
        "shutdown finished"
    );
    report
}

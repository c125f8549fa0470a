//! The interactive command loop.
//!
//! The loop is the only consumer of the render subscription. While it waits
//! for input or for a prompt to finish it also renders events as they
//! arrive, always preferring pending events so output keeps delivery order.

use std::time::Duration;

use crate::error::SessionError;
use crate::session::{EventSubscription, SessionEvent, SessionHandle};

use super::command::{classify, Command};
use super::input::{ConsoleInput, ReadOutcome};
use super::render::render_event;
use super::sink::ConsoleSink;

pub const BANNER: &str =
    "Interactive Mode started. Type 'exit' to quit or 'verbose' to toggle logs";
pub const EXIT_NOTICE: &str = "\nExiting...";
pub const INTERRUPTED_NOTICE: &str = "[interrupted]";

/// Why the command loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// `exit` or `quit`.
    Directive,
    EndOfInput,
    /// Ctrl-C at the input prompt.
    Cancelled,
}

/// Result of one submitted prompt.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The turn reached `session.idle`; carries the last assistant message.
    Completed(Option<String>),
    Failed(SessionError),
    /// The operator interrupted the wait; the turn was aborted.
    Interrupted,
}

pub struct CommandLoop<'a> {
    session: &'a dyn SessionHandle,
    sink: &'a dyn ConsoleSink,
    events: &'a mut EventSubscription,
    verbose: bool,
    prompt_timeout: Duration,
}

impl<'a> CommandLoop<'a> {
    pub fn new(
        session: &'a dyn SessionHandle,
        sink: &'a dyn ConsoleSink,
        events: &'a mut EventSubscription,
        verbose: bool,
        prompt_timeout: Duration,
    ) -> Self {
        Self {
            session,
            sink,
            events,
            verbose,
            prompt_timeout,
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Run until an exit directive, end of input, or Ctrl-C at the prompt.
    pub async fn run(&mut self, input: &mut dyn ConsoleInput) -> LoopExit {
        self.sink.line(BANNER);
        loop {
            let line = match self.read_command(input).await {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Eof => {
                    self.sink.line(EXIT_NOTICE);
                    return LoopExit::EndOfInput;
                }
                ReadOutcome::Cancelled => {
                    self.sink.line(EXIT_NOTICE);
                    return LoopExit::Cancelled;
                }
            };

            match classify(&line) {
                Command::Exit => return LoopExit::Directive,
                Command::ToggleVerbose => {
                    self.verbose = !self.verbose;
                    self.sink.line(&format!("verbose mode: {}", self.verbose));
                }
                Command::Blank => {}
                Command::Prompt(prompt) => match self.submit(&prompt, input).await {
                    SubmitOutcome::Completed(_) => {}
                    SubmitOutcome::Failed(err) => {
                        tracing::debug!(error = %err, "prompt failed");
                        self.sink.error(&format!("[Execution Error]: {err}"));
                    }
                    SubmitOutcome::Interrupted => self.sink.line(INTERRUPTED_NOTICE),
                },
            }
        }
    }

    /// Show the prompt and wait for a line, rendering events meanwhile.
    async fn read_command(&mut self, input: &mut dyn ConsoleInput) -> ReadOutcome {
        self.sink.prompt();
        loop {
            let event = tokio::select! {
                biased;
                Some(event) = self.events.receiver.recv() => event,
                outcome = input.read_line() => return outcome,
            };
            // Late output lands after the prompt text; show it again.
            if self.show(&event) {
                self.sink.prompt();
            }
        }
    }

    /// Send one prompt and wait for it to finish, time out, fail, or be
    /// interrupted.
    pub async fn submit(&mut self, prompt: &str, input: &mut dyn ConsoleInput) -> SubmitOutcome {
        let session = self.session;
        let outcome = {
            let wait = session.send_and_wait(prompt, self.prompt_timeout);
            tokio::pin!(wait);
            loop {
                let event = tokio::select! {
                    biased;
                    Some(event) = self.events.receiver.recv() => event,
                    result = &mut wait => break match result {
                        Ok(reply) => SubmitOutcome::Completed(reply),
                        Err(err) => SubmitOutcome::Failed(err),
                    },
                    _ = input.interrupted() => break SubmitOutcome::Interrupted,
                };
                self.show(&event);
            }
        };

        if matches!(outcome, SubmitOutcome::Interrupted) {
            if let Err(err) = session.abort().await {
                tracing::warn!(error = %err, "abort failed");
                self.sink.warn(&format!("failed to abort the current turn: {err}"));
            }
        }
        self.drain_events();
        outcome
    }

    /// Render everything already delivered to the subscription.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.receiver.try_recv() {
            self.show(&event);
        }
    }

    fn show(&self, event: &SessionEvent) -> bool {
        match render_event(event, self.verbose) {
            Some(text) => {
                self.sink.event(&text);
                true
            }
            None => false,
        }
    }
}

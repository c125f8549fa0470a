//! Interactive console over one agent session.
//!
//! [`Console`] tracks the process lifecycle
//! (`Bootstrapping -> Interactive -> Draining -> Terminated`), runs the
//! command loop, and always finishes with the shutdown sequence.

pub mod command;
pub mod input;
pub mod render;
pub mod repl;
pub mod shutdown;
pub mod sink;

pub use command::{classify, Command};
pub use input::{ConsoleInput, ReadOutcome, StdinInput};
pub use render::render_event;
pub use repl::{CommandLoop, LoopExit, SubmitOutcome};
pub use shutdown::{run_shutdown, SessionTeardown, ShutdownPlan, ShutdownReport, ShutdownStep};
pub use sink::{ConsoleSink, TerminalSink};

use std::fmt;
use std::time::Duration;

use crate::error::SessionError;
use crate::session::{ClientHandle, SessionHandle};

/// Process exit code after a normal exit.
pub const EXIT_OK: i32 = 0;
/// Process exit code when setup failed.
pub const EXIT_SETUP_FAILURE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    Bootstrapping,
    Interactive,
    Draining,
    Terminated,
}

impl fmt::Display for ConsoleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bootstrapping => "bootstrapping",
            Self::Interactive => "interactive",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConsoleSettings {
    pub prompt_timeout: Duration,
    /// Initial verbosity.
    pub verbose: bool,
}

pub struct Console<'a> {
    sink: &'a dyn ConsoleSink,
    settings: ConsoleSettings,
    state: ConsoleState,
}

impl<'a> Console<'a> {
    pub fn new(sink: &'a dyn ConsoleSink, settings: ConsoleSettings) -> Self {
        Self {
            sink,
            settings,
            state: ConsoleState::Bootstrapping,
        }
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    fn enter(&mut self, next: ConsoleState) {
        tracing::debug!(from = %self.state, to = %next, "console state");
        self.state = next;
    }

    /// Drive the command loop until it ends, then tear everything down.
    pub async fn run_session(
        &mut self,
        input: &mut dyn ConsoleInput,
        session: &dyn SessionHandle,
        client: &dyn ClientHandle,
    ) -> i32 {
        let mut events = session.subscribe();
        self.enter(ConsoleState::Interactive);

        let exit = CommandLoop::new(
            session,
            self.sink,
            &mut events,
            self.settings.verbose,
            self.settings.prompt_timeout,
        )
        .run(input)
        .await;
        tracing::debug!(?exit, "command loop ended");

        self.enter(ConsoleState::Draining);
        let plan = ShutdownPlan {
            input,
            session: Some(SessionTeardown {
                session,
                subscription: Some(events.id),
            }),
            client: Some(client),
        };
        let report = run_shutdown(plan, self.sink).await;
        if !report.is_clean() {
            tracing::warn!(failed = report.failures.len(), "shutdown finished with failures");
        }
        self.enter(ConsoleState::Terminated);
        EXIT_OK
    }

    /// Report a setup failure and release whatever was already started.
    pub async fn abort_bootstrap(
        &mut self,
        err: &SessionError,
        input: &mut dyn ConsoleInput,
        client: Option<&dyn ClientHandle>,
    ) -> i32 {
        tracing::debug!(error = %err, "bootstrap failed");
        self.sink.error(&format!("error: {err}"));
        self.enter(ConsoleState::Draining);
        let plan = ShutdownPlan {
            input,
            session: None,
            client,
        };
        run_shutdown(plan, self.sink).await;
        self.enter(ConsoleState::Terminated);
        EXIT_SETUP_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionEvent, ToolResult};
    use crate::testsupport::{CaptureSink, FakeClient, FakeSession, Journal, ScriptedInput, Turn};

    fn settings() -> ConsoleSettings {
        ConsoleSettings {
            prompt_timeout: Duration::from_secs(120),
            verbose: false,
        }
    }

    struct Run {
        journal: Journal,
        code: i32,
        state: ConsoleState,
    }

    async fn run_script(
        lines: &[&str],
        turns: Vec<Turn>,
        settings: ConsoleSettings,
    ) -> Run {
        let journal = Journal::default();
        let input = ScriptedInput::new(&journal, lines);
        let session = FakeSession::new(&journal, turns);
        run_with(journal, input, session, settings).await
    }

    async fn run_with(
        journal: Journal,
        mut input: ScriptedInput,
        session: FakeSession,
        settings: ConsoleSettings,
    ) -> Run {
        let client = FakeClient::new(&journal);
        let sink = CaptureSink::new(&journal);
        let mut console = Console::new(&sink, settings);
        let code = console.run_session(&mut input, &session, &client).await;
        Run {
            journal,
            code,
            state: console.state(),
        }
    }

    fn info(message: &str) -> SessionEvent {
        SessionEvent::Info {
            message: message.into(),
        }
    }

    fn assistant(content: &str) -> SessionEvent {
        SessionEvent::AssistantMessage {
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn blank_lines_never_reach_the_session() {
        let run = run_script(&["", "   ", "\t", "exit"], vec![], settings()).await;
        assert!(run.journal.matching("session:send").is_empty());
        assert_eq!(run.journal.count("out:prompt"), 4);
    }

    #[tokio::test]
    async fn exit_directives_shut_down_once_in_order() {
        for directive in ["exit", "QUIT", "Exit", "quit"] {
            let run = run_script(&[directive], vec![], settings()).await;
            let j = &run.journal;
            assert_eq!(run.code, EXIT_OK);
            assert_eq!(run.state, ConsoleState::Terminated);
            for step in ["input:close", "session:unsubscribe", "session:destroy", "client:stop"] {
                assert_eq!(j.count(step), 1, "{directive}: {step} in {:?}", j.entries());
            }
            let close = j.position("input:close").unwrap();
            let unsubscribe = j.position("session:unsubscribe").unwrap();
            let destroy = j.position("session:destroy").unwrap();
            let stop = j.position("client:stop").unwrap();
            assert!(close < unsubscribe && unsubscribe < destroy && destroy < stop);
            assert!(j.matching("out:line:\nExiting").is_empty());
        }
    }

    #[tokio::test]
    async fn verbose_toggles_report_new_state() {
        let run = run_script(&["verbose", "VERBOSE", "exit"], vec![], settings()).await;
        assert_eq!(
            run.journal.matching("out:line:verbose"),
            vec!["out:line:verbose mode: true", "out:line:verbose mode: false"]
        );
    }

    #[tokio::test]
    async fn events_before_idle_render_before_next_prompt() {
        let turn = Turn::Reply(vec![info("browser ready"), assistant("Title: Example Domain")]);
        let run = run_script(&["open example.com", "exit"], vec![turn], settings()).await;
        let entries = run.journal.entries();
        let send = run.journal.position("session:send:open example.com").unwrap();
        let after: Vec<&str> = entries[send + 1..].iter().map(String::as_str).collect();
        assert_eq!(
            &after[..3],
            &[
                "out:event:\n[session info] browser ready",
                "out:event:\n[assistant]\nTitle: Example Domain",
                "out:prompt",
            ]
        );
    }

    #[tokio::test]
    async fn execution_errors_are_reported_and_the_loop_continues() {
        let turns = vec![
            Turn::Fail(vec![], "model overloaded".into()),
            Turn::Reply(vec![assistant("ok")]),
        ];
        let run = run_script(&["first", "second", "exit"], turns, settings()).await;
        let j = &run.journal;
        assert_eq!(j.count("out:event:\n[session error] model overloaded"), 1);
        assert_eq!(j.count("out:error:[Execution Error]: model overloaded"), 1);
        assert_eq!(j.count("session:send:second"), 1);
        assert_eq!(run.code, EXIT_OK);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_prompt_fails_and_next_command_is_accepted() {
        let settings = ConsoleSettings {
            prompt_timeout: Duration::from_secs(5),
            verbose: false,
        };
        let run = run_script(&["slow", "next", "exit"], vec![Turn::Hang], settings).await;
        let j = &run.journal;
        assert_eq!(
            j.count("out:error:[Execution Error]: Timeout after 5000ms waiting for session.idle"),
            1
        );
        assert_eq!(j.count("session:send:next"), 1);
        assert!(j.matching("session:abort").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_aborts_the_turn_and_keeps_the_console() {
        let journal = Journal::default();
        let input = ScriptedInput::new(&journal, &["slow", "after", "exit"]).with_interrupts(1);
        let session = FakeSession::new(&journal, vec![Turn::Hang]);
        let run = run_with(journal, input, session, settings()).await;
        let j = &run.journal;
        assert_eq!(j.count("session:abort"), 1);
        assert_eq!(j.count("out:line:[interrupted]"), 1);
        assert!(j.matching("out:error").is_empty());
        assert_eq!(j.count("session:send:after"), 1);
    }

    #[tokio::test]
    async fn end_of_input_exits_like_the_directive() {
        let run = run_script(&[], vec![], settings()).await;
        assert_eq!(run.code, EXIT_OK);
        assert_eq!(run.journal.count("out:line:\nExiting..."), 1);
        assert_eq!(run.journal.count("session:destroy"), 1);
        assert_eq!(run.journal.count("client:stop"), 1);
    }

    #[tokio::test]
    async fn ctrl_c_at_the_prompt_exits() {
        let journal = Journal::default();
        let input = ScriptedInput::new(&journal, &[]).then(ReadOutcome::Cancelled);
        let session = FakeSession::new(&journal, vec![]);
        let run = run_with(journal, input, session, settings()).await;
        assert_eq!(run.code, EXIT_OK);
        assert_eq!(run.journal.count("out:line:\nExiting..."), 1);
        assert_eq!(run.journal.count("client:stop"), 1);
    }

    #[tokio::test]
    async fn destroy_failure_still_stops_the_client() {
        let journal = Journal::default();
        let input = ScriptedInput::new(&journal, &["exit"]);
        let session = FakeSession::new(&journal, vec![]).failing_destroy();
        let run = run_with(journal, input, session, settings()).await;
        assert_eq!(run.code, EXIT_OK);
        assert_eq!(
            run.journal.count("out:warn:failed to destroy session: Session not found"),
            1
        );
        assert_eq!(run.journal.count("client:stop"), 1);
    }

    #[tokio::test]
    async fn verbose_mode_shows_tool_detail() {
        let done = SessionEvent::ToolComplete {
            tool_call_id: "call_9".into(),
            success: true,
            result: Some(ToolResult { content: None }),
            error: None,
        };
        let turns = vec![Turn::Reply(vec![done.clone()]), Turn::Reply(vec![done])];
        let run = run_script(&["plain", "verbose", "detailed", "exit"], turns, settings()).await;
        assert_eq!(
            run.journal.matching("out:event:[tool done]"),
            vec![
                "out:event:[tool done] id=call_9 success=true",
                "out:event:[tool done] id=call_9 success=true\n(no content)",
            ]
        );
    }

    #[tokio::test]
    async fn events_at_the_prompt_are_rendered_and_prompt_reissued() {
        let journal = Journal::default();
        let session = FakeSession::new(&journal, vec![]);
        let sink = CaptureSink::new(&journal);
        let mut input = ScriptedInput::new(&journal, &["exit"]);
        let mut events = session.subscribe();
        session.emit(info("late result after timeout"));

        let exit = CommandLoop::new(&session, &sink, &mut events, false, Duration::from_secs(1))
            .run(&mut input)
            .await;
        assert_eq!(exit, LoopExit::Directive);
        let out = journal.matching("out:");
        assert_eq!(
            &out[1..4],
            &[
                "out:prompt".to_string(),
                "out:event:\n[session info] late result after timeout".to_string(),
                "out:prompt".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn submit_resolves_with_last_assistant_message() {
        let journal = Journal::default();
        let turn = Turn::Reply(vec![assistant("first"), assistant("final")]);
        let session = FakeSession::new(&journal, vec![turn]);
        let sink = CaptureSink::new(&journal);
        let mut input = ScriptedInput::new(&journal, &[]);
        let mut events = session.subscribe();
        let mut repl =
            CommandLoop::new(&session, &sink, &mut events, true, Duration::from_secs(1));

        let outcome = repl.submit("summarize", &mut input).await;
        assert!(repl.verbose());
        assert!(
            matches!(outcome, SubmitOutcome::Completed(Some(ref text)) if text == "final"),
            "got {outcome:?}"
        );
        assert_eq!(journal.matching("out:event").len(), 2);
    }

    #[tokio::test]
    async fn bootstrap_failure_skips_session_and_exits_nonzero() {
        let journal = Journal::default();
        let sink = CaptureSink::new(&journal);
        let client = FakeClient::new(&journal);
        let mut input = ScriptedInput::new(&journal, &["never read"]);
        let mut console = Console::new(&sink, settings());
        assert_eq!(console.state(), ConsoleState::Bootstrapping);

        let err = SessionError::Setup("session.create: remote error -32000: bad model".into());
        let code = console
            .abort_bootstrap(&err, &mut input, Some(&client as &dyn ClientHandle))
            .await;
        assert_eq!(code, EXIT_SETUP_FAILURE);
        assert_eq!(console.state(), ConsoleState::Terminated);
        assert_eq!(
            journal.entries(),
            vec![
                "out:error:error: setup failed: session.create: remote error -32000: bad model",
                "input:close",
                "client:stop",
            ]
        );
    }
}

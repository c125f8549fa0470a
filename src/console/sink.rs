//! Console output contract and the default terminal implementation.
//!
//! Orchestration code talks to [`ConsoleSink`] so tests can capture output
//! without touching stdout.

use std::io::{self, Write};

use crossterm::style::{Color, Stylize};

/// Prompt shown while waiting for operator input.
pub const PROMPT: &str = "\nCommand Agent > ";

pub trait ConsoleSink: Send + Sync {
    /// Print the input prompt without a trailing newline.
    fn prompt(&self);
    /// Print one rendered session event.
    fn event(&self, text: &str);
    /// Print a plain status line (banner, verbosity changes).
    fn line(&self, text: &str);
    /// Print a per-command failure.
    fn error(&self, text: &str);
    /// Print a recovered anomaly (shutdown step failures, config warnings).
    fn warn(&self, text: &str);
}

/// Writes to stdout/stderr, optionally coloring `[label]` prefixes.
#[derive(Debug, Clone, Copy)]
pub struct TerminalSink {
    color: bool,
}

impl TerminalSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn styled_event(&self, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let body = text.trim_start_matches('\n');
        let lead = &text[..text.len() - body.len()];
        let Some(end) = body.strip_prefix('[').and_then(|rest| rest.find(']')) else {
            return text.to_string();
        };
        let (label, rest) = body.split_at(end + 2);
        let styled = label.with(label_color(label)).bold();
        format!("{lead}{styled}{rest}")
    }
}

fn label_color(label: &str) -> Color {
    match label {
        "[assistant]" => Color::Green,
        "[session error]" => Color::Red,
        "[session info]" => Color::Blue,
        _ => Color::DarkGrey,
    }
}

impl ConsoleSink for TerminalSink {
    fn prompt(&self) {
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "{PROMPT}");
        let _ = stdout.flush();
    }

    fn event(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", self.styled_event(text));
        let _ = stdout.flush();
    }

    fn line(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{text}");
        let _ = stdout.flush();
    }

    fn error(&self, text: &str) {
        if self.color {
            eprintln!("{}", text.with(Color::Red));
        } else {
            eprintln!("{text}");
        }
    }

    fn warn(&self, text: &str) {
        if self.color {
            eprintln!("{} {text}", "warning:".with(Color::Yellow).bold());
        } else {
            eprintln!("warning: {text}");
        }
    }
}

//! Operator line classification.

/// One classified line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    ToggleVerbose,
    Blank,
    /// Anything else, forwarded verbatim.
    Prompt(String),
}

/// Classify one line. Directives match case-insensitively after trimming.
pub fn classify(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Blank;
    }
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        return Command::Exit;
    }
    if trimmed.eq_ignore_ascii_case("verbose") {
        return Command::ToggleVerbose;
    }
    Command::Prompt(line.to_string())
}

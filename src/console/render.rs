//! Session event to console text.
//!
//! Rendering is a pure function of the event and the verbosity flag; the
//! command loop owns the flag and passes it on every call.

use crate::session::SessionEvent;

/// Shown for a completed tool call that carried neither output nor an error.
pub const NO_CONTENT: &str = "(no content)";

/// Text to print for `event`, or `None` when the event is not shown.
///
/// A leading `\n` marks events that open a new block of output.
pub fn render_event(event: &SessionEvent, verbose: bool) -> Option<String> {
    let text = match event {
        SessionEvent::Info { message } => format!("\n[session info] {message}"),
        SessionEvent::Error { message } => format!("\n[session error] {message}"),
        SessionEvent::ToolStart {
            tool_name,
            tool_call_id,
            arguments,
        } => {
            let mut line = format!("\n[tool start] {tool_name}");
            if verbose {
                line.push_str(&format!(" id={tool_call_id} args={arguments}"));
            }
            line
        }
        SessionEvent::ToolPartialResult {
            tool_call_id,
            partial_output,
        } => with_detail(
            format!("[tool partial] id={tool_call_id}"),
            verbose.then_some(partial_output.as_str()),
        ),
        SessionEvent::ToolProgress {
            tool_call_id,
            progress_message,
        } => with_detail(
            format!("[tool progress] id={tool_call_id}"),
            verbose.then_some(progress_message.as_str()),
        ),
        SessionEvent::ToolComplete {
            tool_call_id,
            success,
            result,
            error,
        } => {
            let mut line = format!("[tool done] id={tool_call_id} success={success}");
            if verbose {
                let output = result
                    .as_ref()
                    .and_then(|r| r.content.as_deref())
                    .or_else(|| error.as_ref().and_then(|e| e.message.as_deref()))
                    .unwrap_or(NO_CONTENT);
                line.push('\n');
                line.push_str(output);
            }
            line
        }
        SessionEvent::AssistantMessage { content } => format!("\n[assistant]\n{content}"),
        SessionEvent::Idle | SessionEvent::Other { .. } => return None,
    };
    Some(text)
}

fn with_detail(mut line: String, detail: Option<&str>) -> String {
    if let Some(detail) = detail.filter(|d| !d.is_empty()) {
        line.push(' ');
        line.push_str(detail);
    }
    line
}

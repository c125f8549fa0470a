//! `command-agent init` flow.

use command_agent::config::{initialize_default_global_config, GlobalConfigInitResult};
use command_agent::console::ConsoleSink;

/// Write the bundled config template to the per-user config path.
pub(crate) fn run_init_flow(sink: &dyn ConsoleSink, force: bool) -> Result<(), String> {
    let result = initialize_default_global_config(force)
        .map_err(|e| format!("failed to initialize ~/.config/command-agent: {e}"))?;
    for line in init_result_lines(&result) {
        sink.line(&line);
    }
    Ok(())
}

fn init_result_lines(result: &GlobalConfigInitResult) -> Vec<String> {
    match result {
        GlobalConfigInitResult::Created { path } => vec![
            "initialized command-agent config".to_string(),
            format!("  path: {}", path.display()),
        ],
        GlobalConfigInitResult::Overwritten { path, backup_path } => vec![
            "reinitialized command-agent config".to_string(),
            format!("  path: {}", path.display()),
            format!("  backup: {}", backup_path.display()),
        ],
        GlobalConfigInitResult::AlreadyInitialized { path } => vec![
            "command-agent config already initialized".to_string(),
            format!("  path: {}", path.display()),
            "  run `command-agent init --force` to overwrite it".to_string(),
        ],
    }
}

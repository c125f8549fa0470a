//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};

/// Interactive console for a Copilot CLI agent session with browser tools.
#[derive(Debug, Parser)]
#[command(name = "command-agent", version)]
pub struct Args {
    /// Path to config file (default: ./command-agent.toml or
    /// ~/.config/command-agent/command-agent.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Override the model id.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Override the agent runtime executable.
    #[arg(long = "cli-path", value_name = "PATH")]
    pub cli_path: Option<String>,

    /// Per-prompt timeout in seconds.
    #[arg(long = "timeout", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Start with verbose event rendering.
    #[arg(long = "verbose")]
    pub verbose: bool,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the default config to ~/.config/command-agent/command-agent.toml.
    Init {
        /// Overwrite an existing config after backing it up.
        #[arg(long = "force")]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::{Args, Command};
    use clap::Parser;

    #[test]
    fn defaults_leave_overrides_unset() {
        let args = Args::parse_from(["command-agent"]);
        assert!(args.config.is_none());
        assert!(args.model.is_none());
        assert!(args.timeout.is_none());
        assert!(!args.verbose);
        assert!(args.command.is_none());
    }

    #[test]
    fn overrides_parse() {
        let args = Args::parse_from([
            "command-agent",
            "-m",
            "claude-sonnet-4",
            "--cli-path",
            "/opt/copilot/bin/copilot",
            "--timeout",
            "30",
            "--verbose",
            "--no-color",
        ]);
        assert_eq!(args.model.as_deref(), Some("claude-sonnet-4"));
        assert_eq!(args.cli_path.as_deref(), Some("/opt/copilot/bin/copilot"));
        assert_eq!(args.timeout, Some(30));
        assert!(args.verbose && args.no_color);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Args::try_parse_from(["command-agent", "--timeout", "0"]).is_err());
    }

    #[test]
    fn init_subcommand_parses_force() {
        let args = Args::parse_from(["command-agent", "init", "--force"]);
        assert!(matches!(args.command, Some(Command::Init { force: true })));
    }
}

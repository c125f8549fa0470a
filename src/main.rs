//! CLI entry point for command-agent.

mod app;
mod cli;

use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    command_agent::logging::init_logging();
    let args = cli::Args::parse();
    let code = app::entry::run(args).await;
    std::process::exit(code);
}

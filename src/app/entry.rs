//! Application entry orchestration: config, runtime start, session creation,
//! then the interactive console.

use command_agent::config::{load_config_with_diagnostics, Config};
use command_agent::console::{
    Console, ConsoleSettings, ConsoleSink, StdinInput, TerminalSink, EXIT_OK, EXIT_SETUP_FAILURE,
};
use command_agent::session::{AgentClient, ClientHandle, ClientOptions, SessionOptions};

use crate::app::init_flow::run_init_flow;
use crate::cli::{Args, Command};

/// Top-level entrypoint; returns the process exit code.
pub(crate) async fn run(args: Args) -> i32 {
    let bootstrap_sink = TerminalSink::new(!args.no_color);
    if let Some(Command::Init { force }) = args.command {
        return match run_init_flow(&bootstrap_sink, force) {
            Ok(()) => EXIT_OK,
            Err(msg) => {
                bootstrap_sink.error(&format!("error: {msg}"));
                EXIT_SETUP_FAILURE
            }
        };
    }

    let loaded = match load_config_with_diagnostics(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            bootstrap_sink.error(&format!("error: failed to load config: {err}"));
            return EXIT_SETUP_FAILURE;
        }
    };
    let mut config = loaded.config;
    apply_cli_overrides(&args, &mut config);
    tracing::debug!(source = %loaded.diagnostics.source, model = %config.session.model, "config loaded");

    let sink = TerminalSink::new(config.display.color);
    for warning in &loaded.diagnostics.warnings {
        sink.warn(warning);
    }

    let mut input = match StdinInput::spawn() {
        Ok(input) => input,
        Err(err) => {
            sink.error(&format!("error: failed to read stdin: {err}"));
            return EXIT_SETUP_FAILURE;
        }
    };
    let mut console = Console::new(
        &sink,
        ConsoleSettings {
            prompt_timeout: config.session.prompt_timeout(),
            verbose: config.display.verbose,
        },
    );

    let client = match AgentClient::start(&ClientOptions::from_config(&config)).await {
        Ok(client) => client,
        Err(err) => return console.abort_bootstrap(&err, &mut input, None).await,
    };
    let session = match client
        .create_session(&SessionOptions::from_config(&config))
        .await
    {
        Ok(session) => session,
        Err(err) => {
            let client: &dyn ClientHandle = &client;
            return console.abort_bootstrap(&err, &mut input, Some(client)).await;
        }
    };

    console.run_session(&mut input, &session, &client).await
}

/// Apply CLI overrides, which outrank both files and environment.
fn apply_cli_overrides(args: &Args, config: &mut Config) {
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        config.session.model = model.to_string();
    }
    if let Some(cli_path) = args.cli_path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        config.client.cli_path = cli_path.to_string();
    }
    if let Some(timeout) = args.timeout {
        config.session.prompt_timeout_secs = timeout.max(1);
    }
    if args.verbose {
        config.display.verbose = true;
    }
    if args.no_color {
        config.display.color = false;
    }
}

//! Command Agent: an interactive console driving one Copilot CLI agent
//! session with a Playwright MCP tool host.
//!
//! The crate launches the agent runtime as a child process, speaks JSON-RPC
//! to it over stdio, and runs a prompt loop that renders the session's event
//! stream while each prompt is in flight.
//!
//! # Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use command_agent::config::load_config;
//! use command_agent::session::{
//!     AgentClient, ClientHandle, ClientOptions, SessionHandle, SessionOptions,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None)?;
//! let client = AgentClient::start(&ClientOptions::from_config(&config)).await?;
//! let session = client.create_session(&SessionOptions::from_config(&config)).await?;
//! let reply = session
//!     .send_and_wait("Open example.com and read the title", Duration::from_secs(300))
//!     .await?;
//! println!("{}", reply.unwrap_or_default());
//! session.destroy().await?;
//! client.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod session;
#[cfg(test)]
pub mod testsupport;

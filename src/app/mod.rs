//! Binary-local application orchestration.
//!
//! `main.rs` only parses arguments and initializes logging; bootstrap and
//! subcommand flows live here.

pub(crate) mod entry;
pub(crate) mod init_flow;

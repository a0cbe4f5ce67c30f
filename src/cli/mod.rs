//! # CLI Module
//!
//! Command-line front end for a service binary. The `rpcgate` binary hosts the
//! demo `Math` service with it; any other binary can do the same:
//!
//! ```rust,ignore
//! use clap::Parser;
//! use rpcgate::cli::{run_cli, Cli};
//!
//! fn main() -> anyhow::Result<()> {
//!     run_cli(Cli::parse(), MyService::default())
//! }
//! ```
//!
//! ## Commands
//!
//! - `methods`: list registered methods; with `--verbose`, also the excluded
//!   ones and why.
//! - `invoke <method> [--body JSON] [--request-id ID]`: dispatch one call and
//!   print the envelope.
//! - `stdio`: answer line-delimited JSON invocations on stdin.
//! - `serve [--addr ADDR]`: run the HTTP adapter until SIGINT or SIGTERM.
//!
//! Global flags: `--config <yaml>` (see [`Settings`](crate::config::Settings))
//! and `--verbose`.
//!
//! ```bash
//! rpcgate invoke add_some_numbers --body '[1, 2, 3]'
//! echo '{"event": {"params": {"path": {"method": "no_input"}}}}' | rpcgate stdio
//! rpcgate --config rpcgate.yaml serve --addr 0.0.0.0:8080
//! ```

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};

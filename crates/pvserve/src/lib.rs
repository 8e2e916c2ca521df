//! Process variable server and client CLI.
//!
//! The binary exposes a `serve` command that runs the single-threaded server
//! loop over a Unix domain socket, plus `get` / `put` / `monitor` client
//! commands speaking the framed JSON wire protocol in [`wire`].

pub mod client;
pub mod cmd;
pub mod exit;
pub mod logging;
pub mod output;
pub mod server;
pub mod wire;

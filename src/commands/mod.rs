//! One-shot CLI commands.
//!
//! Each command lives in its own submodule; `main.rs` dispatches to them
//! from the parsed [`CliAction`](crate::args::CliAction).

pub mod help;
pub mod simulate;
pub mod times;

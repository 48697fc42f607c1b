//! uupwatch library
//!
//! Watches a UUP release channel for new Windows builds and fetches the
//! conversion package when one appears. The `uupwatch` binary is a thin CLI
//! over the [`commands`] module.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;

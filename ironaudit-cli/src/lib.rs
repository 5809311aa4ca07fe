//! ironaudit CLI library
//!
//! Exposes the argument model, command handlers and output rendering so
//! that integration tests can drive commands without spawning a process.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

//! Command-line interface
//!
//! Argument parsing plus the snapshot-backed workspace every command
//! loads, mutates and saves.

pub mod commands;
pub mod workspace;

pub use commands::{Command, Opt};
pub use workspace::Workspace;

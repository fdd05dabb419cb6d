//! Command-line interface
//!
//! Bootstrap commands for running a single node or the local three-node
//! reference network.

pub mod commands;

pub use commands::{Command, Opt};

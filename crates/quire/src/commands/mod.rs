//! Subcommand implementations.

pub mod dev;
pub mod serve;

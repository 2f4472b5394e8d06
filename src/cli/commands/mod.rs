//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod check;
pub mod init;
pub mod run;

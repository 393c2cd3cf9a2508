//! CLI commands

pub mod check;
mod format;

//! ODIN command-line tooling

pub mod cli;
pub mod commands;

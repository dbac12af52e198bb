//! CLI module for dealbot

pub mod app;
pub mod commands;

pub use app::DealbotApp;
pub use commands::{Cli, Commands};

//! Bulletin CLI
//!
//! Terminal demo that chats with a scripted peer over a loopback channel and
//! lays the delivered messages out as bubbles on an in-memory surface.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use app::{ChatApp, Flow, StatusReport};
pub use cli::{Cli, Commands};
pub use commands::CommandDispatcher;
pub use config::AppConfig;
pub use error::{CliError, Result};

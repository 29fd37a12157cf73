//! Chat application module for interactive conversations with Medicare AI.
//!
//! This module provides a REPL chat interface built on top of the
//! dispatcher. It supports:
//!
//! - Resilient submission with timeout and retry status shown inline
//! - ANSI-styled output per message origin
//! - Slash commands for session control
//! - Transcript save, load and auto-save
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: conversation state, persistence and the concurrent-call guard
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use session::{ChatSession, SessionStats, SharedSession, wait_for_interrupt};

//! Parley is a terminal-first chat client for a local AI gateway.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the gateway wire payloads and the stateless HTTP client
//!   used for health, model, usage, and chat calls.
//! - [`core`] owns runtime state: settings persistence, the model catalog,
//!   the conversation transcript, and streaming ingestion.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input, polling timers, and display updates.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`), which
//! initializes the session and dispatches into [`ui::chat_loop`].

pub mod api;
pub mod core;
pub mod ui;
pub mod utils;

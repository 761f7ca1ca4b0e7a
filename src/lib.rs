//! Jerry is a terminal chat client for a backend that answers prompts with
//! text or generated images.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation log, the request gate, the controller
//!   state machine, the session token and its persistence, and configuration.
//! - [`api`] defines the endpoints, wire payloads and the HTTP client behind
//!   the [`api::Backend`] trait.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`utils`] holds the line editor, image description and logging setup.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions or runs a one-shot command.

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;

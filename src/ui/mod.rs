//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the interaction loop; it turns key presses into
//!   [`chat_loop::UiAction`]s, applies them to the
//!   [`crate::core::controller::Controller`] and runs requests in the
//!   background.
//! - [`renderer`] and [`login`]: frame composition for the chat and sign-in
//!   screens.
//! - [`state`]: presentation state that is not part of the conversation.
//!
//! This layer presents and captures interaction state, while
//! [`crate::core`] owns the conversation and request lifecycle.

pub mod chat_loop;
pub mod login;
pub mod renderer;
pub mod state;

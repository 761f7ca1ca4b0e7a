//! Full-screen chat session: terminal setup, the event loop and key handling.

mod event_loop;
mod keybindings;
mod lifecycle;

pub use event_loop::{run_chat, BackgroundEvent, ChatOptions, ChatSession, LoopControl};
pub use keybindings::{map_key, UiAction};

//! TUI-less `ask` and `image` commands

use std::error::Error;

use crate::api::Backend;
use crate::core::controller::{ChatError, Controller, GenerationKind, Outcome};
use crate::core::message::Content;
use crate::core::session::Session;
use crate::utils::image::ImageRef;

/// Send one prompt and return what should be printed.
pub async fn ask_once<B>(
    backend: &B,
    session: Session,
    kind: GenerationKind,
    prompt: &str,
) -> Result<String, ChatError>
where
    B: Backend + ?Sized,
{
    let mut controller = Controller::new(session);
    controller.set_input(prompt);
    match controller.submit(backend, kind).await {
        Outcome::Answered { index } => Ok(match controller.messages()[index].content.clone() {
            Content::Text(text) => text,
            Content::Image(reference) => ImageRef::parse(&reference)
                .map(|image| image.describe())
                .unwrap_or(reference),
        }),
        Outcome::Rejected(err) | Outcome::Failed(err) => Err(err),
        Outcome::Ignored => Err(ChatError::Transport("request was superseded".to_string())),
    }
}

pub async fn run_ask<B>(
    backend: &B,
    session: Session,
    kind: GenerationKind,
    prompt: Vec<String>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend + ?Sized,
{
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        let command = match kind {
            GenerationKind::Text => "ask",
            GenerationKind::Image => "image",
        };
        eprintln!("Usage: jerry {command} <prompt>");
        std::process::exit(1);
    }

    match ask_once(backend, session, kind, &prompt).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    }
}

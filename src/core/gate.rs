//! Preconditions checked before a prompt may leave the client.

use super::controller::RequestState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyInput,
    Busy,
}

/// Reject prompts that are empty once surrounding whitespace is removed.
pub fn validate(prompt: &str) -> Result<(), Rejection> {
    if prompt.trim().is_empty() {
        Err(Rejection::EmptyInput)
    } else {
        Ok(())
    }
}

/// Full admission check: a non-empty prompt and no request outstanding.
pub fn admit(prompt: &str, request: &RequestState) -> Result<(), Rejection> {
    validate(prompt)?;
    if request.is_in_flight() {
        return Err(Rejection::Busy);
    }
    Ok(())
}

//! Chronological transcript of the current session.
//!
//! Entries are only ever appended at the tail; the single exception is an
//! in-place rewrite of a user entry's text.

use std::error::Error;
use std::fmt;

use super::message::{Content, Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    OutOfBounds { index: usize, len: usize },
    NotEditable { index: usize },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::OutOfBounds { index, len } => {
                write!(f, "message {index} does not exist (log has {len} entries)")
            }
            EditError::NotEditable { index } => {
                write!(f, "message {index} cannot be edited")
            }
        }
    }
}

impl Error for EditError {}

#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail and return the new entry's index.
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn edit(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditError> {
        let len = self.messages.len();
        let message = self
            .messages
            .get_mut(index)
            .ok_or(EditError::OutOfBounds { index, len })?;
        if !message.is_editable() {
            return Err(EditError::NotEditable { index });
        }
        message.content = Content::Text(text.into());
        Ok(())
    }

    pub fn read(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Index of the most recent user entry whose text can be edited.
    pub fn last_editable_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_editable)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

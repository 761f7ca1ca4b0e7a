//! Conversation/request controller.
//!
//! The controller is the only writer of the transcript, the request slot,
//! the error banner and the input line. A submission is split in two so the
//! network call can run elsewhere while the UI keeps drawing:
//! [`Controller::begin_submit`] validates, records the user entry and hands
//! out a [`PendingRequest`]; [`Controller::complete`] folds the result back
//! in. [`Controller::submit`] chains both for callers that can simply await.

use std::error::Error;
use std::fmt;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::{Backend, Endpoint, HttpError, Payload};
use crate::utils::line_editor::LineEditorState;

use super::conversation::{ConversationLog, EditError};
use super::gate::{self, Rejection};
use super::message::Message;
use super::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    Text,
    Image,
}

impl GenerationKind {
    pub fn endpoint(self) -> Endpoint {
        match self {
            GenerationKind::Text => Endpoint::AskAi,
            GenerationKind::Image => Endpoint::GenerateImage,
        }
    }

    /// Field of a successful response that carries the generated content.
    pub fn response_field(self) -> &'static str {
        match self {
            GenerationKind::Text => "answer",
            GenerationKind::Image => "image",
        }
    }

    fn reply(self, value: &str) -> Message {
        match self {
            GenerationKind::Text => Message::assistant_text(value),
            GenerationKind::Image => Message::assistant_image(value),
        }
    }
}

/// Actions offered by the UI that have no backend yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    UploadImage,
    TakeImage,
    Voice,
}

impl Feature {
    pub fn label(self) -> &'static str {
        match self {
            Feature::UploadImage => "Upload Image",
            Feature::TakeImage => "Take Image",
            Feature::Voice => "Voice",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
    Failed(String),
}

impl RequestState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RequestState::InFlight)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    EmptyInput,
    Busy,
    Http { status: u16, message: String },
    Transport(String),
    UnexpectedPayload { field: &'static str },
    UnimplementedFeature(Feature),
    Edit(EditError),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::EmptyInput => write!(f, "Prompt cannot be empty."),
            ChatError::Busy => write!(f, "A request is already in progress."),
            ChatError::Http { message, .. } => write!(f, "{message}"),
            ChatError::Transport(message) => write!(f, "{message}"),
            ChatError::UnexpectedPayload { field } => {
                write!(f, "Server response did not include `{field}`.")
            }
            ChatError::UnimplementedFeature(feature) => {
                write!(f, "{} feature not implemented yet.", feature.label())
            }
            ChatError::Edit(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ChatError {}

impl From<Rejection> for ChatError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::EmptyInput => ChatError::EmptyInput,
            Rejection::Busy => ChatError::Busy,
        }
    }
}

impl From<HttpError> for ChatError {
    fn from(err: HttpError) -> Self {
        match err.status_code() {
            Some(status) => ChatError::Http {
                status,
                message: err.message().to_string(),
            },
            None => ChatError::Transport(err.message().to_string()),
        }
    }
}

/// Ticket for the one request the controller currently allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    id: u64,
    kind: GenerationKind,
    prompt: String,
    token: Option<String>,
}

impl PendingRequest {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> GenerationKind {
        self.kind
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn body(&self) -> Value {
        json!({ "prompt": self.prompt })
    }

    pub async fn send<B>(&self, backend: &B) -> Result<Payload, HttpError>
    where
        B: Backend + ?Sized,
    {
        backend
            .send(self.kind.endpoint(), self.body(), self.token())
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The assistant reply landed at `index`.
    Answered { index: usize },
    /// The gate refused the prompt; nothing was recorded or sent.
    Rejected(ChatError),
    /// The request went out and failed; the user entry stays.
    Failed(ChatError),
    /// A completion arrived for a request that is no longer outstanding.
    Ignored,
}

#[derive(Debug, Default)]
pub struct Controller {
    log: ConversationLog,
    request: RequestState,
    phase: Phase,
    error: Option<ChatError>,
    input: LineEditorState,
    session: Session,
    next_request_id: u64,
    in_flight_id: Option<u64>,
}

impl Controller {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    fn transition(&mut self, next: Phase) {
        if self.phase != next {
            debug!(from = ?self.phase, to = ?next, "controller phase");
            self.phase = next;
        }
    }

    /// Validate the current input and, if admitted, record it and issue a ticket.
    pub fn begin_submit(&mut self, kind: GenerationKind) -> Result<PendingRequest, ChatError> {
        self.transition(Phase::Validating);
        let prompt = self.input.text.clone();
        if let Err(rejection) = gate::admit(&prompt, &self.request) {
            let err = ChatError::from(rejection);
            debug!(error = %err, "submission rejected");
            self.error = Some(err.clone());
            let next = if self.request.is_in_flight() {
                Phase::Submitting
            } else {
                Phase::Idle
            };
            self.transition(next);
            return Err(err);
        }

        self.transition(Phase::Submitting);
        self.error = None;
        self.log.append(Message::user(prompt.clone()));
        self.input = LineEditorState::default();
        self.request = RequestState::InFlight;
        self.next_request_id += 1;
        let id = self.next_request_id;
        self.in_flight_id = Some(id);
        debug!(
            request_id = id,
            endpoint = kind.endpoint().name(),
            "request submitted"
        );

        Ok(PendingRequest {
            id,
            kind,
            prompt,
            token: self.session.token().map(str::to_owned),
        })
    }

    /// Fold the result of `ticket`'s network call into the conversation.
    pub fn complete(
        &mut self,
        ticket: PendingRequest,
        result: Result<Payload, HttpError>,
    ) -> Outcome {
        if self.in_flight_id != Some(ticket.id) {
            warn!(request_id = ticket.id, "ignoring completion for stale request");
            return Outcome::Ignored;
        }
        self.in_flight_id = None;

        let reply = result.map_err(ChatError::from).and_then(|payload| {
            let field = ticket.kind.response_field();
            payload
                .string_field(field)
                .map(|value| ticket.kind.reply(value))
                .ok_or(ChatError::UnexpectedPayload { field })
        });

        match reply {
            Ok(message) => {
                self.transition(Phase::Succeeded);
                let index = self.log.append(message);
                self.request = RequestState::Idle;
                self.error = None;
                self.transition(Phase::Idle);
                debug!(request_id = ticket.id, index, "reply appended");
                Outcome::Answered { index }
            }
            Err(err) => {
                self.transition(Phase::Failed);
                debug!(request_id = ticket.id, error = %err, "request failed");
                self.request = RequestState::Failed(err.to_string());
                self.error = Some(err.clone());
                self.transition(Phase::Idle);
                Outcome::Failed(err)
            }
        }
    }

    /// Submit the current input and wait for the backend in place.
    pub async fn submit<B>(&mut self, backend: &B, kind: GenerationKind) -> Outcome
    where
        B: Backend + ?Sized,
    {
        let ticket = match self.begin_submit(kind) {
            Ok(ticket) => ticket,
            Err(err) => return Outcome::Rejected(err),
        };
        let result = ticket.send(backend).await;
        self.complete(ticket, result)
    }

    /// Surface the notice for an action that has no implementation.
    pub fn trigger(&mut self, feature: Feature) -> ChatError {
        let err = ChatError::UnimplementedFeature(feature);
        debug!(feature = feature.label(), "unimplemented feature requested");
        self.error = Some(err.clone());
        err
    }

    pub fn edit_message(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditError> {
        self.log.edit(index, text)
    }

    /// Rewrite entry `index` with the input line, which must not be blank.
    ///
    /// On failure the banner is set and both the entry and the input are kept.
    pub fn commit_edit(&mut self, index: usize) -> Result<(), ChatError> {
        let result = gate::validate(&self.input.text)
            .map_err(ChatError::from)
            .and_then(|()| {
                self.log
                    .edit(index, self.input.text.clone())
                    .map_err(ChatError::Edit)
            });
        match result {
            Ok(()) => {
                self.input = LineEditorState::default();
                self.error = None;
                debug!(index, "message edited");
                Ok(())
            }
            Err(err) => {
                debug!(index, error = %err, "edit refused");
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.log.read()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn input(&self) -> &LineEditorState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut LineEditorState {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = LineEditorState::with_text(text.into());
    }

    pub fn error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    /// Text of the single visible error banner, if any.
    pub fn banner(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub fn dismiss_banner(&mut self) {
        self.error = None;
    }

    pub fn request_state(&self) -> &RequestState {
        &self.request
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.request.is_in_flight()
    }

    /// Nothing to show yet: no transcript, no request, no banner.
    pub fn is_pristine(&self) -> bool {
        self.log.is_empty() && !self.is_loading() && self.error.is_none()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_session(&mut self, token: impl Into<String>) {
        self.session.set(token);
    }

    pub fn clear_session(&mut self) {
        self.session.clear();
    }
}

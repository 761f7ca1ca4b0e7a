//! Event polling, action dispatch and background request plumbing.
//!
//! Network calls run on spawned tasks and report back over an unbounded
//! channel; [`ChatSession`] is only ever mutated from the loop itself.

use std::{error::Error, sync::Arc, time::Duration};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::keybindings::{map_key, UiAction};
use super::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use crate::api::{Backend, HttpError, Payload};
use crate::core::auth::{
    login_with_google, login_with_password, password_login_failure_message, remember_token,
    AuthError,
};
use crate::core::controller::{ChatError, Controller, GenerationKind, PendingRequest};
use crate::core::keyring::TokenStore;
use crate::ui::renderer::draw;
use crate::ui::state::{Screen, ToolChoice, UiState};
use crate::utils::line_editor::{apply_line_edit_action, LineEditAction};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub enum BackgroundEvent {
    Reply(PendingRequest, Result<Payload, HttpError>),
    SignedIn {
        google: bool,
        result: Result<String, AuthError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

pub struct ChatSession {
    pub controller: Controller,
    pub ui: UiState,
    backend: Arc<dyn Backend>,
    store: TokenStore,
    tx: mpsc::UnboundedSender<BackgroundEvent>,
}

impl ChatSession {
    /// Start on the login form unless the controller already holds a token.
    pub fn new(
        controller: Controller,
        backend: Arc<dyn Backend>,
        store: TokenStore,
        tx: mpsc::UnboundedSender<BackgroundEvent>,
    ) -> Self {
        let screen = if controller.session().is_authenticated() {
            Screen::Chat
        } else {
            Screen::Login
        };
        Self {
            controller,
            ui: UiState::new(screen),
            backend,
            store,
            tx,
        }
    }

    pub fn handle_action(&mut self, action: UiAction) -> LoopControl {
        match action {
            UiAction::Quit => return LoopControl::Quit,
            UiAction::Edit(edit) => self.apply_edit(edit),
            UiAction::Submit(kind) => self.submit(kind),
            UiAction::ToggleTools => {
                self.ui.show_tools = !self.ui.show_tools;
                self.ui.tools_selected = 0;
            }
            UiAction::MoveToolSelection { down } => self.ui.move_tool_selection(down),
            UiAction::ChooseTool => {
                self.ui.show_tools = false;
                match self.ui.selected_tool().choice() {
                    ToolChoice::Generate(kind) => self.submit(kind),
                    ToolChoice::Stub(feature) => {
                        self.controller.trigger(feature);
                    }
                }
            }
            UiAction::BeginEdit => self.begin_edit(),
            UiAction::CommitEdit => self.commit_edit(),
            UiAction::CancelEdit => {
                self.ui.editing = None;
                self.controller.set_input(String::new());
            }
            UiAction::DismissBanner => {
                self.controller.dismiss_banner();
                self.ui.notice = None;
            }
            UiAction::Scroll { up, lines } => {
                self.ui.scroll_back = if up {
                    self.ui.scroll_back.saturating_add(lines)
                } else {
                    self.ui.scroll_back.saturating_sub(lines)
                };
            }
            UiAction::Logout => self.logout(),
            UiAction::NextField => self.ui.login.focus = self.ui.login.focus.next(),
            UiAction::PreviousField => self.ui.login.focus = self.ui.login.focus.previous(),
            UiAction::SignIn => self.sign_in(),
            UiAction::SkipLogin => {
                self.ui.login.error = None;
                self.ui.screen = Screen::Chat;
            }
        }
        LoopControl::Continue
    }

    pub fn handle_paste(&mut self, text: String) {
        self.apply_edit(LineEditAction::Paste(text));
    }

    fn apply_edit(&mut self, edit: LineEditAction) {
        let state = match self.ui.screen {
            Screen::Login => self.ui.login.focused_mut(),
            Screen::Chat => self.controller.input_mut(),
        };
        apply_line_edit_action(state, edit);
    }

    fn submit(&mut self, kind: GenerationKind) {
        if self.ui.editing.is_some() {
            return;
        }
        let Ok(ticket) = self.controller.begin_submit(kind) else {
            return;
        };
        self.ui.notice = None;
        self.ui.follow_tail();

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = ticket.send(backend.as_ref()).await;
            if tx.send(BackgroundEvent::Reply(ticket, result)).is_err() {
                debug!("chat loop closed before reply arrived");
            }
        });
    }

    fn begin_edit(&mut self) {
        let Some(index) = self.controller.log().last_editable_index() else {
            return;
        };
        let Some(text) = self
            .controller
            .log()
            .get(index)
            .and_then(|message| message.content.as_text())
            .map(str::to_owned)
        else {
            return;
        };
        self.ui.editing = Some(index);
        self.controller.set_input(text);
    }

    fn commit_edit(&mut self) {
        let Some(index) = self.ui.editing else {
            return;
        };
        match self.controller.commit_edit(index) {
            Ok(()) => self.ui.editing = None,
            Err(ChatError::EmptyInput) => {}
            Err(err) => {
                warn!(error = %err, "edit rejected");
                self.ui.editing = None;
                self.controller.set_input(String::new());
            }
        }
    }

    fn logout(&mut self) {
        self.controller.clear_session();
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "could not clear stored token");
        }
        self.ui.show_tools = false;
        self.ui.editing = None;
        self.ui.login = Default::default();
        self.ui.screen = Screen::Login;
        self.ui.notice = Some("Signed out.".to_string());
    }

    fn sign_in(&mut self) {
        let form = &mut self.ui.login;
        form.error = None;
        form.in_flight = true;

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let google = form.uses_google();
        if google {
            let token_id = form.google_token.text.clone();
            tokio::spawn(async move {
                let result = login_with_google(backend.as_ref(), &token_id).await;
                if tx.send(BackgroundEvent::SignedIn { google, result }).is_err() {
                    debug!("chat loop closed before sign-in finished");
                }
            });
        } else {
            let email = form.email.text.clone();
            let password = std::mem::take(&mut form.password).text;
            tokio::spawn(async move {
                let result = login_with_password(backend.as_ref(), &email, &password).await;
                if tx.send(BackgroundEvent::SignedIn { google, result }).is_err() {
                    debug!("chat loop closed before sign-in finished");
                }
            });
        }
    }

    pub fn handle_background(&mut self, event: BackgroundEvent) {
        match event {
            BackgroundEvent::Reply(ticket, result) => {
                let outcome = self.controller.complete(ticket, result);
                debug!(?outcome, "request finished");
                self.ui.follow_tail();
            }
            BackgroundEvent::SignedIn { google, result } => {
                self.ui.login.in_flight = false;
                let stored = result.and_then(|token| {
                    remember_token(&self.store, &token)?;
                    Ok(token)
                });
                match stored {
                    Ok(token) => {
                        self.controller.set_session(token);
                        self.ui.login = Default::default();
                        self.ui.screen = Screen::Chat;
                        self.ui.notice = Some("Signed in.".to_string());
                    }
                    Err(err) => {
                        warn!(error = %err, "sign-in failed");
                        self.ui.login.error = Some(if google {
                            err.to_string()
                        } else {
                            password_login_failure_message(&err)
                        });
                    }
                }
            }
        }
    }
}

fn draw_frame(terminal: &mut ChatTerminal, session: &ChatSession) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| draw(f, &session.controller, &session.ui))?;
    Ok(())
}

async fn drive(
    terminal: &mut ChatTerminal,
    session: &mut ChatSession,
    rx: &mut mpsc::UnboundedReceiver<BackgroundEvent>,
) -> Result<(), Box<dyn Error>> {
    loop {
        draw_frame(terminal, session)?;

        while let Ok(background) = rx.try_recv() {
            session.handle_background(background);
        }

        if !event::poll(POLL_INTERVAL)? {
            tokio::task::yield_now().await;
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(action) = map_key(&session.ui, &key) {
                    if session.handle_action(action) == LoopControl::Quit {
                        return Ok(());
                    }
                }
            }
            Event::Paste(text) => session.handle_paste(text),
            _ => {}
        }
    }
}

pub struct ChatOptions {
    pub backend: Arc<dyn Backend>,
    pub store: TokenStore,
    pub controller: Controller,
}

pub async fn run_chat(options: ChatOptions) -> Result<(), Box<dyn Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = ChatSession::new(options.controller, options.backend, options.store, tx);

    let mut terminal = setup_terminal()?;
    let result = drive(&mut terminal, &mut session, &mut rx).await;
    restore_terminal(&mut terminal)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::LOGIN_FAILED_MESSAGE;
    use crate::core::controller::Feature;
    use crate::core::message::Content;
    use crate::core::session::Session;
    use crate::ui::state::LoginField;
    use crate::utils::line_editor::LineEditorState;
    use crate::utils::test_utils::ScriptedBackend;
    use serde_json::json;

    fn session_with(
        backend: ScriptedBackend,
        session: Session,
    ) -> (ChatSession, mpsc::UnboundedReceiver<BackgroundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let chat = ChatSession::new(
            Controller::new(session),
            Arc::new(backend),
            TokenStore::new_with_keyring(false),
            tx,
        );
        (chat, rx)
    }

    fn type_text(chat: &mut ChatSession, text: &str) {
        chat.handle_paste(text.to_string());
    }

    async fn settle(chat: &mut ChatSession, rx: &mut mpsc::UnboundedReceiver<BackgroundEvent>) {
        let event = rx.recv().await.expect("background result");
        chat.handle_background(event);
    }

    #[tokio::test]
    async fn starts_on_login_without_token() {
        let (chat, _rx) = session_with(ScriptedBackend::new(), Session::anonymous());
        assert_eq!(chat.ui.screen, Screen::Login);
        let (chat, _rx) = session_with(ScriptedBackend::new(), Session::with_token("t"));
        assert_eq!(chat.ui.screen, Screen::Chat);
    }

    #[tokio::test]
    async fn reply_arrives_through_channel() {
        let backend = ScriptedBackend::new().respond_json(json!({"answer": "4"}));
        let (mut chat, mut rx) = session_with(backend, Session::with_token("t"));
        type_text(&mut chat, "2+2");
        chat.handle_action(UiAction::Submit(GenerationKind::Text));
        assert!(chat.controller.is_loading());
        assert!(chat.controller.input().text.is_empty());

        settle(&mut chat, &mut rx).await;
        assert!(!chat.controller.is_loading());
        assert_eq!(chat.controller.messages().len(), 2);
        assert_eq!(chat.controller.messages()[1].content.as_text(), Some("4"));
    }

    #[tokio::test]
    async fn password_login_failure_shows_generic_message() {
        let backend = ScriptedBackend::new().fail(401, "bad password");
        let (mut chat, mut rx) = session_with(backend, Session::anonymous());
        type_text(&mut chat, "me@example.com");
        chat.handle_action(UiAction::NextField);
        type_text(&mut chat, "wrong");
        chat.handle_action(UiAction::SignIn);
        assert!(chat.ui.login.in_flight);

        settle(&mut chat, &mut rx).await;
        assert!(!chat.ui.login.in_flight);
        assert_eq!(chat.ui.login.error.as_deref(), Some(LOGIN_FAILED_MESSAGE));
        assert_eq!(chat.ui.screen, Screen::Login);
    }

    #[tokio::test]
    async fn google_login_stores_token_and_opens_chat() {
        let backend = ScriptedBackend::new().respond_json(json!({"token": "jwt"}));
        let (mut chat, mut rx) = session_with(backend, Session::anonymous());
        chat.ui.login.focus = LoginField::GoogleToken;
        type_text(&mut chat, "google-access");
        chat.handle_action(UiAction::SignIn);

        settle(&mut chat, &mut rx).await;
        assert_eq!(chat.ui.screen, Screen::Chat);
        assert_eq!(chat.controller.session().token(), Some("jwt"));
        assert_eq!(chat.store.load().expect("load").as_deref(), Some("jwt"));
    }

    #[tokio::test]
    async fn logout_clears_session_and_store() {
        let (mut chat, _rx) = session_with(ScriptedBackend::new(), Session::with_token("t"));
        chat.store.store("t").expect("store");
        chat.handle_action(UiAction::Logout);
        assert_eq!(chat.ui.screen, Screen::Login);
        assert!(!chat.controller.session().is_authenticated());
        assert_eq!(chat.store.load().expect("load"), None);
    }

    #[tokio::test]
    async fn stub_tool_surfaces_banner() {
        let (mut chat, _rx) = session_with(ScriptedBackend::new(), Session::with_token("t"));
        chat.handle_action(UiAction::ToggleTools);
        chat.handle_action(UiAction::MoveToolSelection { down: true });
        chat.handle_action(UiAction::ChooseTool);
        assert!(!chat.ui.show_tools);
        assert_eq!(
            chat.controller.banner(),
            Some(format!("{} feature not implemented yet.", Feature::UploadImage.label()))
        );
    }

    #[tokio::test]
    async fn edit_round_trip_rewrites_last_prompt() {
        let backend = ScriptedBackend::new().respond_json(json!({"answer": "hi"}));
        let (mut chat, mut rx) = session_with(backend, Session::with_token("t"));
        type_text(&mut chat, "helo");
        chat.handle_action(UiAction::Submit(GenerationKind::Text));
        settle(&mut chat, &mut rx).await;

        chat.handle_action(UiAction::BeginEdit);
        assert_eq!(chat.ui.editing, Some(0));
        assert_eq!(chat.controller.input().text, "helo");
        chat.handle_action(UiAction::Edit(LineEditAction::MoveLeft));
        chat.handle_action(UiAction::Edit(LineEditAction::Insert('l')));
        chat.handle_action(UiAction::CommitEdit);

        assert_eq!(chat.ui.editing, None);
        assert_eq!(
            chat.controller.messages()[0].content,
            Content::Text("hello".to_string())
        );
        assert_eq!(chat.controller.messages()[1].content.as_text(), Some("hi"));
        assert_eq!(chat.controller.input(), &LineEditorState::default());
    }

    #[tokio::test]
    async fn blank_edit_is_refused_and_keeps_editing() {
        let backend = ScriptedBackend::new().respond_json(json!({"answer": "hi"}));
        let (mut chat, mut rx) = session_with(backend, Session::with_token("t"));
        type_text(&mut chat, "helo");
        chat.handle_action(UiAction::Submit(GenerationKind::Text));
        settle(&mut chat, &mut rx).await;

        chat.handle_action(UiAction::BeginEdit);
        chat.handle_action(UiAction::Edit(LineEditAction::ClearAll));
        type_text(&mut chat, "   ");
        chat.handle_action(UiAction::CommitEdit);

        assert_eq!(chat.ui.editing, Some(0));
        assert_eq!(chat.controller.banner().as_deref(), Some("Prompt cannot be empty."));
        assert_eq!(
            chat.controller.messages()[0].content,
            Content::Text("helo".to_string())
        );
        assert_eq!(chat.controller.input().text, "   ");

        chat.handle_action(UiAction::Edit(LineEditAction::ClearAll));
        type_text(&mut chat, "hello");
        chat.handle_action(UiAction::CommitEdit);
        assert_eq!(chat.ui.editing, None);
        assert_eq!(chat.controller.banner(), None);
        assert_eq!(
            chat.controller.messages()[0].content,
            Content::Text("hello".to_string())
        );
    }

    #[tokio::test]
    async fn sign_in_finishing_after_loop_exit_is_harmless() {
        let backend = Arc::new(ScriptedBackend::new().respond_json(json!({"token": "jwt"})));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut chat = ChatSession::new(
            Controller::new(Session::anonymous()),
            backend.clone(),
            TokenStore::new_with_keyring(false),
            tx,
        );
        drop(rx);
        chat.ui.login.focus = LoginField::GoogleToken;
        type_text(&mut chat, "google-access");
        chat.handle_action(UiAction::SignIn);

        while backend.calls().is_empty() {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        assert!(chat.ui.login.in_flight);
        assert_eq!(chat.ui.screen, Screen::Login);
        assert_eq!(chat.store.load().expect("load"), None);
    }

    #[tokio::test]
    async fn scrolling_back_then_new_reply_follows_tail() {
        let backend = ScriptedBackend::new().respond_json(json!({"answer": "ok"}));
        let (mut chat, mut rx) = session_with(backend, Session::with_token("t"));
        chat.handle_action(UiAction::Scroll { up: true, lines: 3 });
        assert_eq!(chat.ui.scroll_back, 3);
        type_text(&mut chat, "next");
        chat.handle_action(UiAction::Submit(GenerationKind::Text));
        settle(&mut chat, &mut rx).await;
        assert_eq!(chat.ui.scroll_back, 0);
    }
}

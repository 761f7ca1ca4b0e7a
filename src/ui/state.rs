//! Presentation state that is not part of the conversation itself.

use crate::core::controller::{Feature, GenerationKind};
use crate::utils::line_editor::LineEditorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolItem {
    GenerateImage,
    Upload,
    TakeImage,
    Voice,
}

pub const TOOL_ITEMS: [ToolItem; 4] = [
    ToolItem::GenerateImage,
    ToolItem::Upload,
    ToolItem::TakeImage,
    ToolItem::Voice,
];

impl ToolItem {
    pub fn label(self) -> &'static str {
        match self {
            ToolItem::GenerateImage => "Generate Image",
            ToolItem::Upload => "Upload Image",
            ToolItem::TakeImage => "Take Image",
            ToolItem::Voice => "Voice",
        }
    }

    /// What choosing this entry does.
    pub fn choice(self) -> ToolChoice {
        match self {
            ToolItem::GenerateImage => ToolChoice::Generate(GenerationKind::Image),
            ToolItem::Upload => ToolChoice::Stub(Feature::UploadImage),
            ToolItem::TakeImage => ToolChoice::Stub(Feature::TakeImage),
            ToolItem::Voice => ToolChoice::Stub(Feature::Voice),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Generate(GenerationKind),
    Stub(Feature),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
    GoogleToken,
}

impl LoginField {
    pub fn next(self) -> Self {
        match self {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::GoogleToken,
            LoginField::GoogleToken => LoginField::Email,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            LoginField::Email => LoginField::GoogleToken,
            LoginField::Password => LoginField::Email,
            LoginField::GoogleToken => LoginField::Password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: LineEditorState,
    pub password: LineEditorState,
    pub google_token: LineEditorState,
    pub focus: LoginField,
    pub error: Option<String>,
    pub in_flight: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: LineEditorState::default(),
            password: LineEditorState::default(),
            google_token: LineEditorState::default(),
            focus: LoginField::Email,
            error: None,
            in_flight: false,
        }
    }
}

impl LoginForm {
    pub fn focused_mut(&mut self) -> &mut LineEditorState {
        match self.focus {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
            LoginField::GoogleToken => &mut self.google_token,
        }
    }

    /// Enter on the Google field signs in with Google; anywhere else uses
    /// email and password.
    pub fn uses_google(&self) -> bool {
        self.focus == LoginField::GoogleToken
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub screen: Screen,
    pub login: LoginForm,
    pub show_tools: bool,
    pub tools_selected: usize,
    /// Index of the transcript entry being rewritten from the input line.
    pub editing: Option<usize>,
    /// Lines scrolled back from the newest output; zero follows the tail.
    pub scroll_back: u16,
    /// One-shot informational line (login/logout confirmations).
    pub notice: Option<String>,
}

impl UiState {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            login: LoginForm::default(),
            show_tools: false,
            tools_selected: 0,
            editing: None,
            scroll_back: 0,
            notice: None,
        }
    }

    pub fn selected_tool(&self) -> ToolItem {
        TOOL_ITEMS[self.tools_selected.min(TOOL_ITEMS.len() - 1)]
    }

    pub fn move_tool_selection(&mut self, down: bool) {
        let len = TOOL_ITEMS.len();
        self.tools_selected = if down {
            (self.tools_selected + 1) % len
        } else {
            (self.tools_selected + len - 1) % len
        };
    }

    pub fn follow_tail(&mut self) {
        self.scroll_back = 0;
    }
}

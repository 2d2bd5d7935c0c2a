//! Core types for Marknote

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Business codes the backend uses for success
pub fn is_success_code(code: i64) -> bool {
    code == 200 || code == 0
}

/// The kind of AI request, as sent in the chat payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    #[default]
    Chat,
    Enhance,
    Summarize,
    Translate,
}

/// Request payload for the chat endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message
    pub message: String,

    /// Extra context, typically the note being edited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Conversation to continue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Request kind
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChatKind>,
}

impl ChatRequest {
    /// Create a chat request with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            conversation_id: None,
            kind: None,
        }
    }

    /// Attach context text
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Continue an existing conversation
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Set the request kind
    pub fn with_kind(mut self, kind: ChatKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// One exchange with the assistant, as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: String,

    #[serde(default)]
    pub conversation_id: Option<String>,

    pub message: String,

    pub response: String,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,

    #[serde(default)]
    pub user_id: Option<i64>,
}

/// A note
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,

    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub folder_id: Option<i64>,

    #[serde(default)]
    pub tags: Option<String>,

    #[serde(default)]
    pub is_starred: bool,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub word_count: Option<i64>,

    #[serde(default)]
    pub view_count: Option<i64>,

    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,

    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Fields for a new note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreateRequest {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// Partial update of a note; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_starred: Option<bool>,
}

/// One page of notes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesPage {
    pub records: Vec<Note>,
    pub total: u64,
    pub size: u64,
    pub current: u64,
    pub pages: u64,
}

/// Login form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Tokens and profile returned by login, register and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtResponse {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub expires_in: Option<i64>,

    #[serde(default)]
    pub user_id: Option<i64>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub nickname: Option<String>,

    #[serde(default)]
    pub avatar: Option<String>,
}

/// The signed-in user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl JwtResponse {
    /// Profile carried alongside the tokens, when the backend sent one
    pub fn user(&self) -> Option<User> {
        Some(User {
            id: self.user_id?,
            username: self.username.clone()?,
            email: self.email.clone().unwrap_or_default(),
            nickname: self.nickname.clone().unwrap_or_default(),
            avatar: self.avatar.clone(),
        })
    }
}

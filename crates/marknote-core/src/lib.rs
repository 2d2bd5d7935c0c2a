//! Marknote Core
//!
//! Core types and protocol utilities shared across Marknote components.
//!
//! This crate provides:
//! - Wire types for the notes backend (notes, auth, AI chat)
//! - Error types, including the structured transport fault classification
//! - The line buffer that turns a chunked body into complete lines
//! - The frame parser for the `event:`/`data:` streaming protocol

pub mod error;
pub mod frame;
pub mod stream;
pub mod types;

pub use error::{Error, Result, TransportFault};
pub use frame::{Frame, FrameParser, ParsedLine};
pub use stream::LineBuffer;
pub use types::{
    ChatKind, ChatRequest, ChatResponse, JwtResponse, LoginRequest, Note,
    NoteCreateRequest, NoteUpdateRequest, NotesPage, RegisterRequest, User,
};


//! Streaming chat client core for a remote agent service.
//!
//! A view hands user input to [`ChatSession`] (or drives [`api::ChatClient`] directly with its
//! own [`conversation::UpdateSink`]) and renders the resulting [`Conversation`].

pub mod api;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod report;
pub mod session;
pub mod stream;
pub mod text;
pub mod trace;

pub use api::ChatClient;
pub use chat::ChatSession;
pub use config::ClientConfig;
pub use conversation::{Conversation, ConversationUpdate, UpdateKind, UpdateSink};
pub use error::{ChatError, Result};
pub use models::{Message, Role, Session, TraceEvent, TraceKind};
pub use stream::{TurnOutcome, TurnState};

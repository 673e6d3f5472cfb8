//! Core chat components
//!
//! The responder decides what the bot says; the rest of this module keeps
//! conversations, their messages and lead state consistent across turns.

mod chat;
mod contact;
mod responder;
mod sessions;
mod store;

pub use chat::{ChatEngine, ChatError, ChatRequest};
pub use responder::Responder;
pub use store::{ConversationFilter, ConversationStore, Page, StoreError};

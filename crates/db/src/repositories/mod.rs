//! Repository layer.
//!
//! Thin, cloneable wrappers around the shared [`sea_orm::DatabaseConnection`]
//! exposing the find/save/update operations the services need.

mod chat_message;
mod community;
mod user;

pub use chat_message::{ConversationFilter, MessageRepository};
pub use community::CommunityRepository;
pub use user::UserRepository;

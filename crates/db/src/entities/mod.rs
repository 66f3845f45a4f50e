//! Database entities.

#![allow(missing_docs)]

pub mod chat_message;
pub mod community;
pub mod community_member;
pub mod user;

pub use chat_message::Entity as ChatMessage;
pub use community::Entity as Community;
pub use community_member::Entity as CommunityMember;
pub use user::Entity as User;

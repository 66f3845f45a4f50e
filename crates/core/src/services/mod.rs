//! Business logic services.

#![allow(missing_docs)]

pub mod chat;
pub mod grouping;
pub mod user;

pub use chat::{
    ChatService, ConversationPage, CreateMessageInput, FeedPage, FeedRequest, MemberSummary,
    Pagination,
};
pub use grouping::{DayGroup, MessageView, ReplySummary, UserSummary, day_label, group_by_day};
pub use user::UserService;

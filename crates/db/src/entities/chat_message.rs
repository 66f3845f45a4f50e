//! Chat message entity for community and direct messages.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who can see a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// Visible to every member of the community.
    #[sea_orm(string_value = "community")]
    Community,
    /// Visible only to the sender/recipient pair.
    #[sea_orm(string_value = "direct")]
    Direct,
}

impl ChatType {
    /// Parse a query-parameter value (`community` | `direct`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "community" => Some(Self::Community),
            "direct" => Some(Self::Direct),
            _ => None,
        }
    }
}

/// How the content and attachment fields are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "video")]
    Video,
    #[sea_orm(string_value = "audio")]
    Audio,
    #[sea_orm(string_value = "document")]
    Document,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Text
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning community scope; direct messages are scoped too.
    #[sea_orm(indexed)]
    pub community_id: String,

    /// Sender user ID
    #[sea_orm(indexed)]
    pub sender_id: String,

    pub chat_type: ChatType,

    /// Recipient user ID; non-null iff `chat_type` is direct.
    #[sea_orm(nullable, indexed)]
    pub recipient_id: Option<String>,

    /// Message text content
    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub message_type: MessageType,

    /// Attachment metadata (upload mechanics live elsewhere).
    #[sea_orm(nullable)]
    pub file_url: Option<String>,

    #[sea_orm(nullable)]
    pub file_name: Option<String>,

    #[sea_orm(nullable)]
    pub file_type: Option<String>,

    /// One-level reply reference; reply chains are not resolved.
    #[sea_orm(nullable)]
    pub reply_to_id: Option<String>,

    /// Reaction key -> list of user ids (JSON object).
    #[sea_orm(column_type = "JsonBinary")]
    pub reactions: Json,

    /// Set when content is modified after sending.
    #[sea_orm(default_value = false)]
    pub edited: bool,

    /// Hidden from every viewer, including the sender.
    #[sea_orm(default_value = false)]
    pub deleted_for_everyone: bool,

    /// User ids that soft-deleted this message for themselves (JSON array).
    #[sea_orm(column_type = "JsonBinary")]
    pub deleted_by_users: Json,

    /// User ids that have read this message (JSON array, append-only).
    #[sea_orm(column_type = "JsonBinary")]
    pub read_by: Json,

    pub created_at: DateTimeWithTimeZone,
}

/// Check whether a JSON array of user ids contains `user_id`.
#[must_use]
pub fn id_set_contains(set: &Json, user_id: &str) -> bool {
    set.as_array()
        .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(user_id)))
}

impl Model {
    /// Has `user_id` read this message?
    #[must_use]
    pub fn is_read_by(&self, user_id: &str) -> bool {
        id_set_contains(&self.read_by, user_id)
    }

    /// Visibility rule: hidden when deleted for everyone, self-deleted by
    /// the viewer, or a direct message the viewer is not a party to.
    #[must_use]
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        if self.deleted_for_everyone || id_set_contains(&self.deleted_by_users, user_id) {
            return false;
        }
        match self.chat_type {
            ChatType::Community => true,
            ChatType::Direct => {
                self.sender_id == user_id || self.recipient_id.as_deref() == Some(user_id)
            }
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::community::Entity",
        from = "Column::CommunityId",
        to = "super::community::Column::Id"
    )]
    Community,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id"
    )]
    Sender,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecipientId",
        to = "super::user::Column::Id"
    )]
    Recipient,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ReplyToId",
        to = "Column::Id"
    )]
    ReplyTo,
}

impl Related<super::community::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Community.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

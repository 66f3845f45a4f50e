//! Community entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Community - a membership-scoped group; every chat message belongs to
/// exactly one community.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "community")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who created the community.
    #[sea_orm(indexed)]
    pub owner_id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Members count (denormalized)
    #[sea_orm(default_value = 0)]
    pub members_count: i32,

    /// Archived communities reject new activity.
    #[sea_orm(default_value = false)]
    pub is_archived: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::community_member::Entity")]
    Members,

    #[sea_orm(has_many = "super::chat_message::Entity")]
    Messages,
}

impl Related<super::community_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

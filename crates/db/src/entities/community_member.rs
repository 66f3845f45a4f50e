//! Community member entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Community member - tracks which users belong to which communities.
///
/// Chat access requires a *verified* membership; unverified rows exist for
/// users whose enrollment has not been confirmed yet.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "community_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The community joined.
    #[sea_orm(indexed)]
    pub community_id: String,

    /// The user who is a member.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Has this membership been verified?
    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    pub joined_at: DateTimeWithTimeZone,
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
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::community::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Community.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

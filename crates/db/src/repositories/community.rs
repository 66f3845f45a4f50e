//! Community repository.

use std::sync::Arc;

use campus_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::{Community, CommunityMember, community, community_member};

/// Repository for community and membership lookups.
///
/// Membership rows are read-only inputs for the chat subsystem; enrollment
/// itself is managed elsewhere.
#[derive(Clone)]
pub struct CommunityRepository {
    db: Arc<DatabaseConnection>,
}

impl CommunityRepository {
    /// Create a new community repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find community by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<community::Model>> {
        Community::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get community by ID, returning an error if not found or archived.
    pub async fn get_by_id(&self, id: &str) -> AppResult<community::Model> {
        let community = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CommunityNotFound(id.to_string()))?;

        if community.is_archived {
            return Err(AppError::CommunityNotFound(id.to_string()));
        }

        Ok(community)
    }

    /// Check if a user is a verified member of a community.
    pub async fn is_verified_member(&self, user_id: &str, community_id: &str) -> AppResult<bool> {
        let count = CommunityMember::find()
            .filter(community_member::Column::UserId.eq(user_id))
            .filter(community_member::Column::CommunityId.eq(community_id))
            .filter(community_member::Column::IsVerified.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// List the user ids of all verified members, oldest membership first.
    pub async fn list_verified_member_ids(&self, community_id: &str) -> AppResult<Vec<String>> {
        let members = CommunityMember::find()
            .filter(community_member::Column::CommunityId.eq(community_id))
            .filter(community_member::Column::IsVerified.eq(true))
            .order_by(community_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(members.into_iter().map(|m| m.user_id).collect())
    }
}

//! Chat message repository.

use crate::entities::chat_message::{
    self, ActiveModel, ChatType, Column, Entity as ChatMessage,
};
use campus_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;

/// Declarative filter for conversation queries.
///
/// Services describe *what* slice of the message store they want; the
/// repository turns that description into SQL. Keeps the query engine
/// decoupled from the ORM's builder API.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    /// Owning community scope (always required).
    pub community_id: String,
    /// Restrict to one chat type.
    pub chat_type: Option<ChatType>,
    /// Restrict to the symmetric direct conversation between two users.
    pub between: Option<(String, String)>,
    /// Cursor-style restriction: only messages strictly older than this.
    pub before: Option<chrono::DateTime<chrono::Utc>>,
}

impl ConversationFilter {
    /// Build the SQL condition for this filter.
    ///
    /// Messages deleted for everyone are excluded here; per-viewer
    /// self-deletes are filtered after the fetch by the caller.
    #[must_use]
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all()
            .add(Column::CommunityId.eq(self.community_id.clone()))
            .add(Column::DeletedForEveryone.eq(false));

        if let Some(chat_type) = self.chat_type {
            cond = cond.add(Column::ChatType.eq(chat_type));
        }

        if let Some((a, b)) = &self.between {
            cond = cond.add(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(Column::SenderId.eq(a.clone()))
                            .add(Column::RecipientId.eq(b.clone())),
                    )
                    .add(
                        Condition::all()
                            .add(Column::SenderId.eq(b.clone()))
                            .add(Column::RecipientId.eq(a.clone())),
                    ),
            );
        }

        if let Some(before) = self.before {
            cond = cond.add(Column::CreatedAt.lt(before));
        }

        cond
    }
}

/// Repository for chat message operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new message.
    pub async fn create(&self, model: ActiveModel) -> AppResult<chat_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<chat_message::Model>> {
        ChatMessage::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find several messages at once (used for shallow reply-to loading).
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<chat_message::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        ChatMessage::find()
            .filter(Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a page of messages matching the filter, newest first.
    ///
    /// Messages sharing a `created_at` millisecond are tie-broken on id so
    /// the order is stable within and across responses.
    pub async fn list(
        &self,
        filter: &ConversationFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<chat_message::Model>> {
        ChatMessage::find()
            .filter(filter.condition())
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all messages matching the filter.
    ///
    /// Counted before the per-viewer self-delete filter; `total` may
    /// slightly overstate what the viewer actually sees.
    pub async fn count(&self, filter: &ConversationFilter) -> AppResult<u64> {
        ChatMessage::find()
            .filter(filter.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the most recent direct message between two users.
    pub async fn find_latest_between(
        &self,
        community_id: &str,
        user_id: &str,
        partner_id: &str,
    ) -> AppResult<Option<chat_message::Model>> {
        let filter = ConversationFilter {
            community_id: community_id.to_string(),
            chat_type: Some(ChatType::Direct),
            between: Some((user_id.to_string(), partner_id.to_string())),
            before: None,
        };

        ChatMessage::find()
            .filter(filter.condition())
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count direct messages sent by `sender_id` to `recipient_id` that the
    /// recipient has not read yet.
    pub async fn count_unread_from(
        &self,
        community_id: &str,
        recipient_id: &str,
        sender_id: &str,
    ) -> AppResult<u64> {
        ChatMessage::find()
            .filter(Column::CommunityId.eq(community_id))
            .filter(Column::ChatType.eq(ChatType::Direct))
            .filter(Column::SenderId.eq(sender_id))
            .filter(Column::RecipientId.eq(recipient_id))
            .filter(Column::DeletedForEveryone.eq(false))
            .filter(Expr::cust_with_values(
                "NOT (read_by @> jsonb_build_array(?))",
                [recipient_id.to_string()],
            ))
            .filter(Expr::cust_with_values(
                "NOT (deleted_by_users @> jsonb_build_array(?))",
                [recipient_id.to_string()],
            ))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all unread direct messages addressed to a user in a community.
    pub async fn count_unread_total(
        &self,
        community_id: &str,
        recipient_id: &str,
    ) -> AppResult<u64> {
        ChatMessage::find()
            .filter(Column::CommunityId.eq(community_id))
            .filter(Column::ChatType.eq(ChatType::Direct))
            .filter(Column::RecipientId.eq(recipient_id))
            .filter(Column::DeletedForEveryone.eq(false))
            .filter(Expr::cust_with_values(
                "NOT (read_by @> jsonb_build_array(?))",
                [recipient_id.to_string()],
            ))
            .filter(Expr::cust_with_values(
                "NOT (deleted_by_users @> jsonb_build_array(?))",
                [recipient_id.to_string()],
            ))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append a user id to the `read_by` set of every listed message that
    /// does not contain it yet.
    ///
    /// A single conditional UPDATE: the append and the containment guard
    /// evaluate under the same row lock, so concurrent marks from parallel
    /// requests converge without duplicates. Safe to retry with overlapping
    /// id sets. Returns the number of rows actually updated.
    pub async fn mark_read(&self, message_ids: &[String], user_id: &str) -> AppResult<u64> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        let result = ChatMessage::update_many()
            .col_expr(
                Column::ReadBy,
                Expr::cust_with_values(
                    "read_by || jsonb_build_array(?)",
                    [user_id.to_string()],
                ),
            )
            .filter(Column::Id.is_in(message_ids.iter().cloned()))
            .filter(Expr::cust_with_values(
                "NOT (read_by @> jsonb_build_array(?))",
                [user_id.to_string()],
            ))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Append a user id to `deleted_by_users` (soft delete for one viewer).
    ///
    /// Same idempotent conditional-append shape as [`Self::mark_read`].
    pub async fn mark_deleted_for(&self, message_id: &str, user_id: &str) -> AppResult<u64> {
        let result = ChatMessage::update_many()
            .col_expr(
                Column::DeletedByUsers,
                Expr::cust_with_values(
                    "deleted_by_users || jsonb_build_array(?)",
                    [user_id.to_string()],
                ),
            )
            .filter(Column::Id.eq(message_id))
            .filter(Expr::cust_with_values(
                "NOT (deleted_by_users @> jsonb_build_array(?))",
                [user_id.to_string()],
            ))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Update a message (edit flag, content, reactions, delete markers).
    pub async fn update(&self, model: ActiveModel) -> AppResult<chat_message::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};
    use serde_json::json;

    fn feed_filter() -> ConversationFilter {
        ConversationFilter {
            community_id: "c1".to_string(),
            chat_type: Some(ChatType::Community),
            between: None,
            before: None,
        }
    }

    fn build_sql(filter: &ConversationFilter) -> String {
        ChatMessage::find()
            .filter(filter.condition())
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_filter_always_scopes_community_and_excludes_deleted() {
        let sql = build_sql(&feed_filter());
        assert!(sql.contains(r#""community_id" = 'c1'"#));
        assert!(sql.contains(r#""deleted_for_everyone" = FALSE"#));
        assert!(sql.contains(r#""chat_type""#));
        assert!(sql.contains("'community'"));
    }

    #[test]
    fn test_filter_between_is_symmetric() {
        let filter = ConversationFilter {
            community_id: "c1".to_string(),
            chat_type: Some(ChatType::Direct),
            between: Some(("alice".to_string(), "bob".to_string())),
            before: None,
        };
        let sql = build_sql(&filter);

        // Both directions of the pair must appear.
        assert!(sql.contains(r#""sender_id" = 'alice' AND "recipient_id" = 'bob'"#));
        assert!(sql.contains(r#""sender_id" = 'bob' AND "recipient_id" = 'alice'"#));
    }

    #[test]
    fn test_filter_before_restricts_created_at() {
        let before = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        let filter = ConversationFilter {
            before: Some(before),
            ..feed_filter()
        };
        let sql = build_sql(&filter);
        assert!(sql.contains(r#""created_at" <"#));
    }

    #[tokio::test]
    async fn test_mark_read_returns_rows_affected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = MessageRepository::new(db);
        let ids = vec!["m1".to_string(), "m2".to_string()];

        // First call marks both; a repeat finds nothing left to update.
        assert_eq!(repo.mark_read(&ids, "bob").await.unwrap(), 2);
        assert_eq!(repo.mark_read(&ids, "bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_empty_set_skips_update() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = MessageRepository::new(db);
        assert_eq!(repo.mark_read(&[], "bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_latest_between() {
        let msg = chat_message::Model {
            id: "m9".to_string(),
            community_id: "c1".to_string(),
            sender_id: "bob".to_string(),
            chat_type: ChatType::Direct,
            recipient_id: Some("alice".to_string()),
            content: "latest".to_string(),
            message_type: chat_message::MessageType::Text,
            file_url: None,
            file_name: None,
            file_type: None,
            reply_to_id: None,
            reactions: json!({}),
            edited: false,
            deleted_for_everyone: false,
            deleted_by_users: json!([]),
            read_by: json!([]),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[msg]])
                .into_connection(),
        );

        let repo = MessageRepository::new(db);
        let result = repo
            .find_latest_between("c1", "alice", "bob")
            .await
            .unwrap();

        assert_eq!(result.unwrap().id, "m9");
    }
}

//! Chat service: community feeds, direct conversations, member summaries.

use std::collections::HashMap;

use campus_common::config::ChatConfig;
use campus_common::{AppError, AppResult, IdGenerator};
use campus_db::entities::chat_message::{self, ChatType, MessageType};
use campus_db::entities::user;
use campus_db::repositories::{
    CommunityRepository, ConversationFilter, MessageRepository, UserRepository,
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::services::grouping::{self, DayGroup, MessageView, UserSummary};

/// Parameters of a community feed request.
#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    /// 1-based page number.
    pub page: u64,
    /// Requested page size; resolved against the configured default/max.
    pub limit: Option<u64>,
    /// Only messages strictly older than this timestamp.
    pub before: Option<DateTime<Utc>>,
    /// Optional chat type restriction.
    pub chat_type: Option<ChatType>,
    /// Conversation partner, required when `chat_type` is direct.
    pub with_user_id: Option<String>,
}

/// Pagination metadata returned alongside every message page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    /// `returned` is the number of rows fetched for this page, counted
    /// before the per-viewer self-delete filter so it stays consistent
    /// with `total`.
    #[must_use]
    pub fn new(page: u64, limit: u64, total: u64, returned: usize) -> Self {
        let skip = page.saturating_sub(1) * limit;
        Self {
            page,
            limit,
            total,
            total_pages: if limit == 0 { 0 } else { total.div_ceil(limit) },
            has_more: skip + (returned as u64) < total,
        }
    }
}

/// A page of the community feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub groups: Vec<DayGroup>,
    pub pagination: Pagination,
}

/// A page of a direct conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationPage {
    pub groups: Vec<DayGroup>,
    /// The other participant's public summary.
    pub partner: UserSummary,
    pub pagination: Pagination,
}

/// Per-member chat summary: last direct message and unread count.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub user: UserSummary,
    pub last_message: Option<MessageView>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u64,
}

impl MemberSummary {
    /// Defaults used when a member's lookups failed; the listing never
    /// aborts because of one member.
    #[must_use]
    pub fn fallback(member_id: &str) -> Self {
        Self {
            user: UserSummary::placeholder(member_id),
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        }
    }
}

/// Input for sending a new message.
#[derive(Debug, Clone)]
pub struct CreateMessageInput {
    pub chat_type: ChatType,
    pub recipient_id: Option<String>,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub reply_to_id: Option<String>,
}

/// Chat service.
#[derive(Clone)]
pub struct ChatService {
    message_repo: MessageRepository,
    community_repo: CommunityRepository,
    user_repo: UserRepository,
    limits: ChatConfig,
    id_gen: IdGenerator,
}

impl ChatService {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(
        message_repo: MessageRepository,
        community_repo: CommunityRepository,
        user_repo: UserRepository,
        limits: ChatConfig,
    ) -> Self {
        Self {
            message_repo,
            community_repo,
            user_repo,
            limits,
            id_gen: IdGenerator::new(),
        }
    }

    fn resolve_page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.limits.default_page_size)
            .clamp(1, self.limits.max_page_size)
    }

    async fn require_member(&self, community_id: &str, user_id: &str) -> AppResult<()> {
        if self
            .community_repo
            .is_verified_member(user_id, community_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User {user_id} is not a verified member of this community"
            )))
        }
    }

    /// Get a page of the community feed, grouped by day.
    ///
    /// With `chat_type = direct` the feed narrows to the requester's
    /// conversation with `with_user_id`; the result is then the same
    /// message set `direct_conversation` returns.
    pub async fn community_feed(
        &self,
        community_id: &str,
        requester_id: &str,
        req: FeedRequest,
    ) -> AppResult<FeedPage> {
        // Malformed requests never reach the database.
        if matches!(req.chat_type, Some(ChatType::Direct)) && req.with_user_id.is_none() {
            return Err(AppError::Validation(
                "with_user_id is required when chat_type is direct".to_string(),
            ));
        }

        self.community_repo.get_by_id(community_id).await?;
        self.require_member(community_id, requester_id).await?;

        let between = match (req.chat_type, &req.with_user_id) {
            (Some(ChatType::Direct), Some(with_user_id)) => {
                Some((requester_id.to_string(), with_user_id.clone()))
            }
            _ => None,
        };
        let filter = ConversationFilter {
            community_id: community_id.to_string(),
            chat_type: req.chat_type,
            between,
            before: req.before,
        };

        let page = req.page.max(1);
        let limit = self.resolve_page_size(req.limit);
        let offset = (page - 1) * limit;

        let messages = self.message_repo.list(&filter, limit, offset).await?;
        // Counted before the self-delete filter below; `total` may slightly
        // overstate what this viewer sees. Known approximation, kept as-is.
        let total = self.message_repo.count(&filter).await?;

        let fetched = messages.len();
        let visible: Vec<chat_message::Model> = messages
            .into_iter()
            .filter(|m| m.is_visible_to(requester_id))
            .collect();

        let views = self.load_views(visible).await?;
        let groups = grouping::group_by_day(views, Utc::now());

        Ok(FeedPage {
            groups,
            pagination: Pagination::new(page, limit, total, fetched),
        })
    }

    /// Get a page of the direct conversation with another member and mark
    /// the fetched messages addressed to the requester as read.
    pub async fn direct_conversation(
        &self,
        community_id: &str,
        requester_id: &str,
        other_user_id: &str,
        page: u64,
        limit: Option<u64>,
        before: Option<DateTime<Utc>>,
    ) -> AppResult<ConversationPage> {
        self.community_repo.get_by_id(community_id).await?;
        self.require_member(community_id, requester_id).await?;
        let partner = self.user_repo.get_by_id(other_user_id).await?;
        self.require_member(community_id, other_user_id).await?;

        let filter = ConversationFilter {
            community_id: community_id.to_string(),
            chat_type: Some(ChatType::Direct),
            between: Some((requester_id.to_string(), other_user_id.to_string())),
            before,
        };

        let page = page.max(1);
        let limit = self.resolve_page_size(limit);
        let offset = (page - 1) * limit;

        let messages = self.message_repo.list(&filter, limit, offset).await?;
        let total = self.message_repo.count(&filter).await?;

        // Read-state: everything on this page addressed to the requester
        // and not yet read. The update settles before the response goes
        // out; a failure leaves read-state stale but keeps the page.
        let unread_ids: Vec<String> = messages
            .iter()
            .filter(|m| {
                m.recipient_id.as_deref() == Some(requester_id) && !m.is_read_by(requester_id)
            })
            .map(|m| m.id.clone())
            .collect();
        if let Err(e) = self.message_repo.mark_read(&unread_ids, requester_id).await {
            warn!(
                error = %e,
                community = %community_id,
                partner = %other_user_id,
                "Failed to mark conversation read"
            );
        }

        let fetched = messages.len();
        let visible: Vec<chat_message::Model> = messages
            .into_iter()
            .filter(|m| m.is_visible_to(requester_id))
            .collect();

        let views = self.load_views(visible).await?;
        let groups = grouping::group_by_day(views, Utc::now());

        Ok(ConversationPage {
            groups,
            partner: UserSummary::from_user(&partner),
            pagination: Pagination::new(page, limit, total, fetched),
        })
    }

    /// Summarize every other verified member: last direct message exchanged
    /// with the requester and how many of their messages remain unread.
    ///
    /// One member's failure never aborts the listing; that member comes
    /// back with defaults and the error is logged.
    pub async fn member_summaries(
        &self,
        community_id: &str,
        requester_id: &str,
    ) -> AppResult<Vec<MemberSummary>> {
        self.community_repo.get_by_id(community_id).await?;
        self.require_member(community_id, requester_id).await?;
        let requester = self.user_repo.get_by_id(requester_id).await?;

        let member_ids = self
            .community_repo
            .list_verified_member_ids(community_id)
            .await?;

        let mut summaries = Vec::new();
        for member_id in member_ids.into_iter().filter(|id| id != requester_id) {
            match self.member_summary(community_id, &requester, &member_id).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!(
                        error = %e,
                        member = %member_id,
                        community = %community_id,
                        "Failed to summarize member, returning defaults"
                    );
                    summaries.push(MemberSummary::fallback(&member_id));
                }
            }
        }

        order_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn member_summary(
        &self,
        community_id: &str,
        requester: &user::Model,
        member_id: &str,
    ) -> AppResult<MemberSummary> {
        let member = self.user_repo.get_by_id(member_id).await?;

        let latest = self
            .message_repo
            .find_latest_between(community_id, &requester.id, member_id)
            .await?;
        let unread_count = self
            .message_repo
            .count_unread_from(community_id, &requester.id, member_id)
            .await?;

        let last_message_at = latest.as_ref().map(|m| m.created_at.with_timezone(&Utc));
        let users: HashMap<String, user::Model> = [
            (requester.id.clone(), requester.clone()),
            (member.id.clone(), member.clone()),
        ]
        .into();
        let last_message = latest.map(|m| grouping::build_view(m, &users, &HashMap::new()));

        Ok(MemberSummary {
            user: UserSummary::from_user(&member),
            last_message,
            last_message_at,
            unread_count,
        })
    }

    /// Count unread direct messages addressed to the requester.
    pub async fn unread_total(&self, community_id: &str, requester_id: &str) -> AppResult<u64> {
        self.community_repo.get_by_id(community_id).await?;
        self.require_member(community_id, requester_id).await?;

        self.message_repo
            .count_unread_total(community_id, requester_id)
            .await
    }

    /// Send a message into a community's chat.
    pub async fn send_message(
        &self,
        community_id: &str,
        sender_id: &str,
        input: CreateMessageInput,
    ) -> AppResult<chat_message::Model> {
        if input.content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Message content cannot be empty".to_string(),
            ));
        }

        self.community_repo.get_by_id(community_id).await?;
        self.require_member(community_id, sender_id).await?;

        match input.chat_type {
            ChatType::Direct => {
                let recipient_id = input.recipient_id.as_deref().ok_or_else(|| {
                    AppError::Validation(
                        "recipient_id is required for direct messages".to_string(),
                    )
                })?;
                if recipient_id == sender_id {
                    return Err(AppError::BadRequest(
                        "Cannot send message to yourself".to_string(),
                    ));
                }
                self.user_repo.get_by_id(recipient_id).await?;
                self.require_member(community_id, recipient_id).await?;
            }
            ChatType::Community => {
                if input.recipient_id.is_some() {
                    return Err(AppError::Validation(
                        "recipient_id is only valid for direct messages".to_string(),
                    ));
                }
            }
        }

        if let Some(reply_to_id) = &input.reply_to_id {
            let parent = self
                .message_repo
                .find_by_id(reply_to_id)
                .await?
                .ok_or_else(|| AppError::MessageNotFound(reply_to_id.clone()))?;
            // The reply target must be a message the sender can see in the
            // same community; anything else reads as not-found.
            if parent.community_id != community_id || !parent.is_visible_to(sender_id) {
                return Err(AppError::MessageNotFound(reply_to_id.clone()));
            }
        }

        let model = chat_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            community_id: Set(community_id.to_string()),
            sender_id: Set(sender_id.to_string()),
            chat_type: Set(input.chat_type),
            recipient_id: Set(input.recipient_id),
            content: Set(input.content),
            message_type: Set(input.message_type),
            file_url: Set(input.file_url),
            file_name: Set(input.file_name),
            file_type: Set(input.file_type),
            reply_to_id: Set(input.reply_to_id),
            reactions: Set(json!({})),
            edited: Set(false),
            deleted_for_everyone: Set(false),
            deleted_by_users: Set(json!([])),
            read_by: Set(json!([])),
            created_at: Set(Utc::now().into()),
        };

        self.message_repo.create(model).await
    }

    /// Replace a message's content. Sender only; sets the edited flag.
    pub async fn edit_message(
        &self,
        requester_id: &str,
        message_id: &str,
        content: String,
    ) -> AppResult<chat_message::Model> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Message content cannot be empty".to_string(),
            ));
        }

        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::MessageNotFound(message_id.to_string()))?;

        if message.deleted_for_everyone {
            return Err(AppError::MessageNotFound(message_id.to_string()));
        }
        if message.sender_id != requester_id {
            return Err(AppError::Forbidden(
                "Cannot edit another user's message".to_string(),
            ));
        }

        let mut active: chat_message::ActiveModel = message.into();
        active.content = Set(content);
        active.edited = Set(true);

        self.message_repo.update(active).await
    }

    /// Soft-delete a message: for the requester alone, or (sender only)
    /// for everyone.
    pub async fn delete_message(
        &self,
        requester_id: &str,
        message_id: &str,
        for_everyone: bool,
    ) -> AppResult<()> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::MessageNotFound(message_id.to_string()))?;

        // Hidden messages read as not-found rather than forbidden.
        if !message.is_visible_to(requester_id) {
            return Err(AppError::MessageNotFound(message_id.to_string()));
        }
        self.require_member(&message.community_id, requester_id).await?;

        if for_everyone {
            if message.sender_id != requester_id {
                return Err(AppError::Forbidden(
                    "Cannot delete another user's message for everyone".to_string(),
                ));
            }
            let mut active: chat_message::ActiveModel = message.into();
            active.deleted_for_everyone = Set(true);
            self.message_repo.update(active).await?;
        } else {
            self.message_repo
                .mark_deleted_for(message_id, requester_id)
                .await?;
        }

        Ok(())
    }

    /// Toggle the requester's entry under a reaction key.
    pub async fn toggle_reaction(
        &self,
        requester_id: &str,
        message_id: &str,
        reaction: &str,
    ) -> AppResult<chat_message::Model> {
        if reaction.trim().is_empty() {
            return Err(AppError::BadRequest("Reaction cannot be empty".to_string()));
        }

        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::MessageNotFound(message_id.to_string()))?;

        if !message.is_visible_to(requester_id) {
            return Err(AppError::MessageNotFound(message_id.to_string()));
        }
        self.require_member(&message.community_id, requester_id).await?;

        let mut map = message
            .reactions
            .as_object()
            .cloned()
            .unwrap_or_default();

        let mut ids: Vec<String> = map
            .get(reaction)
            .and_then(serde_json::Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(pos) = ids.iter().position(|id| id == requester_id) {
            ids.remove(pos);
        } else {
            ids.push(requester_id.to_string());
        }

        if ids.is_empty() {
            map.remove(reaction);
        } else {
            map.insert(reaction.to_string(), json!(ids));
        }

        let mut active: chat_message::ActiveModel = message.into();
        active.reactions = Set(serde_json::Value::Object(map));

        self.message_repo.update(active).await
    }

    /// Load presentation records for a page of messages: one shallow batch
    /// fetch for reply targets, one for every referenced user.
    async fn load_views(
        &self,
        messages: Vec<chat_message::Model>,
    ) -> AppResult<Vec<MessageView>> {
        let mut reply_ids: Vec<String> = messages
            .iter()
            .filter_map(|m| m.reply_to_id.clone())
            .collect();
        reply_ids.sort();
        reply_ids.dedup();

        let replies: HashMap<String, chat_message::Model> = self
            .message_repo
            .find_by_ids(&reply_ids)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        let mut user_ids: Vec<String> = messages
            .iter()
            .flat_map(|m| {
                std::iter::once(m.sender_id.clone()).chain(m.recipient_id.clone())
            })
            .chain(replies.values().map(|m| m.sender_id.clone()))
            .collect();
        user_ids.sort();
        user_ids.dedup();

        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(messages
            .into_iter()
            .map(|m| grouping::build_view(m, &users, &replies))
            .collect())
    }
}

/// Sort summaries by last message time, newest first; members with no
/// messages keep their relative order at the end.
pub(crate) fn order_summaries(summaries: &mut [MemberSummary]) {
    summaries.sort_by(|a, b| match (&a.last_message_at, &b.last_message_at) {
        (Some(a_at), Some(b_at)) => b_at.cmp(a_at),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

//! Chat endpoints: community feeds, direct conversations, member summaries.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use campus_common::{AppError, AppResult};
use campus_core::{
    ConversationPage, CreateMessageInput, DayGroup, FeedPage, FeedRequest, MemberSummary,
    MessageView, Pagination, ReplySummary, UserSummary,
};
use campus_db::entities::chat_message::{self, ChatType, MessageType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create the community-scoped chat router.
pub fn community_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_feed).post(send_message))
        .route("/with/{user_id}", get(get_conversation))
        .route("/members", get(list_member_summaries))
        .route("/unread/count", get(get_unread_count))
}

/// Create the message-scoped chat router.
pub fn message_router() -> Router<AppState> {
    Router::new()
        .route("/{message_id}", axum::routing::patch(edit_message).delete(delete_message))
        .route("/{message_id}/reactions", post(toggle_reaction))
}

const fn default_page() -> u64 {
    1
}

/// Feed query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub limit: Option<u64>,
    pub before_timestamp: Option<DateTime<Utc>>,
    pub chat_type: Option<String>,
    pub with_user_id: Option<String>,
}

/// Conversation query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConversationQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    pub limit: Option<u64>,
    pub before_timestamp: Option<DateTime<Utc>>,
}

fn parse_chat_type(raw: Option<&str>) -> AppResult<Option<ChatType>> {
    raw.map(|value| {
        ChatType::parse(value)
            .ok_or_else(|| AppError::Validation(format!("Unknown chat_type: {value}")))
    })
    .transpose()
}

/// User summary response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryResponse {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<UserSummary> for UserSummaryResponse {
    fn from(summary: UserSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            avatar_url: summary.avatar_url,
        }
    }
}

/// Reply-to summary response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub id: String,
    pub content: String,
    pub sender: UserSummaryResponse,
}

impl From<ReplySummary> for ReplyResponse {
    fn from(reply: ReplySummary) -> Self {
        Self {
            id: reply.id,
            content: reply.content,
            sender: reply.sender.into(),
        }
    }
}

/// Message response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub sender: UserSummaryResponse,
    pub reply_to: Option<ReplyResponse>,
    pub reactions: serde_json::Value,
    pub edited: bool,
    pub chat_type: ChatType,
    pub recipient: Option<UserSummaryResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<MessageView> for MessageResponse {
    fn from(view: MessageView) -> Self {
        Self {
            id: view.id,
            content: view.content,
            message_type: view.message_type,
            file_url: view.file_url,
            file_name: view.file_name,
            file_type: view.file_type,
            sender: view.sender.into(),
            reply_to: view.reply_to.map(ReplyResponse::from),
            reactions: view.reactions,
            edited: view.edited,
            chat_type: view.chat_type,
            recipient: view.recipient.map(UserSummaryResponse::from),
            created_at: view.created_at,
        }
    }
}

/// One day bucket of messages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroupResponse {
    pub date: String,
    pub messages: Vec<MessageResponse>,
}

impl From<DayGroup> for DayGroupResponse {
    fn from(group: DayGroup) -> Self {
        Self {
            date: group.date,
            messages: group.messages.into_iter().map(MessageResponse::from).collect(),
        }
    }
}

/// Pagination metadata response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl From<Pagination> for PaginationResponse {
    fn from(p: Pagination) -> Self {
        Self {
            page: p.page,
            limit: p.limit,
            total: p.total,
            total_pages: p.total_pages,
            has_more: p.has_more,
        }
    }
}

/// Community feed response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub groups: Vec<DayGroupResponse>,
    pub pagination: PaginationResponse,
}

impl From<FeedPage> for FeedResponse {
    fn from(page: FeedPage) -> Self {
        Self {
            groups: page.groups.into_iter().map(DayGroupResponse::from).collect(),
            pagination: page.pagination.into(),
        }
    }
}

/// Direct conversation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub groups: Vec<DayGroupResponse>,
    pub partner: UserSummaryResponse,
    pub pagination: PaginationResponse,
}

impl From<ConversationPage> for ConversationResponse {
    fn from(page: ConversationPage) -> Self {
        Self {
            groups: page.groups.into_iter().map(DayGroupResponse::from).collect(),
            partner: page.partner.into(),
            pagination: page.pagination.into(),
        }
    }
}

/// Per-member summary response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummaryResponse {
    pub user: UserSummaryResponse,
    pub last_message: Option<MessageResponse>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u64,
}

impl From<MemberSummary> for MemberSummaryResponse {
    fn from(summary: MemberSummary) -> Self {
        Self {
            user: summary.user.into(),
            last_message: summary.last_message.map(MessageResponse::from),
            last_message_at: summary.last_message_at,
            unread_count: summary.unread_count,
        }
    }
}

/// Member summaries list response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummariesResponse {
    pub members: Vec<MemberSummaryResponse>,
}

/// Unread count response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Get the community feed, grouped by day.
async fn get_feed(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<FeedResponse>> {
    let chat_type = parse_chat_type(query.chat_type.as_deref())?;

    let req = FeedRequest {
        page: query.page,
        limit: query.limit,
        before: query.before_timestamp,
        chat_type,
        with_user_id: query.with_user_id,
    };

    let page = state
        .chat_service
        .community_feed(&community_id, &user.id, req)
        .await?;

    Ok(ApiResponse::ok(FeedResponse::from(page)))
}

/// Get the direct conversation with another member.
async fn get_conversation(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((community_id, partner_id)): Path<(String, String)>,
    Query(query): Query<ConversationQuery>,
) -> AppResult<ApiResponse<ConversationResponse>> {
    let page = state
        .chat_service
        .direct_conversation(
            &community_id,
            &user.id,
            &partner_id,
            query.page,
            query.limit,
            query.before_timestamp,
        )
        .await?;

    Ok(ApiResponse::ok(ConversationResponse::from(page)))
}

/// List per-member conversation summaries.
async fn list_member_summaries(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(community_id): Path<String>,
) -> AppResult<ApiResponse<MemberSummariesResponse>> {
    let summaries = state
        .chat_service
        .member_summaries(&community_id, &user.id)
        .await?;

    Ok(ApiResponse::ok(MemberSummariesResponse {
        members: summaries.into_iter().map(MemberSummaryResponse::from).collect(),
    }))
}

/// Get the unread direct message count.
async fn get_unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(community_id): Path<String>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state
        .chat_service
        .unread_total(&community_id, &user.id)
        .await?;

    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

/// Send message request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_type: Option<ChatType>,
    pub recipient_id: Option<String>,
    #[validate(length(min = 1, max = 8000))]
    pub content: String,
    pub message_type: Option<MessageType>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub reply_to_id: Option<String>,
}

/// Sent message response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCreatedResponse {
    pub id: String,
    pub chat_type: ChatType,
    pub created_at: DateTime<Utc>,
}

impl From<chat_message::Model> for MessageCreatedResponse {
    fn from(msg: chat_message::Model) -> Self {
        Self {
            id: msg.id,
            chat_type: msg.chat_type,
            created_at: msg.created_at.into(),
        }
    }
}

/// Send a message into the community's chat.
async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<ApiResponse<MessageCreatedResponse>> {
    req.validate()?;

    info!(
        sender = %user.id,
        community = %community_id,
        "Sending message"
    );

    let input = CreateMessageInput {
        chat_type: req.chat_type.unwrap_or(ChatType::Community),
        recipient_id: req.recipient_id,
        content: req.content,
        message_type: req.message_type.unwrap_or_default(),
        file_url: req.file_url,
        file_name: req.file_name,
        file_type: req.file_type,
        reply_to_id: req.reply_to_id,
    };

    let message = state
        .chat_service
        .send_message(&community_id, &user.id, input)
        .await?;

    Ok(ApiResponse::ok(MessageCreatedResponse::from(message)))
}

/// Edit message request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 8000))]
    pub content: String,
}

/// Edited message response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEditedResponse {
    pub id: String,
    pub content: String,
    pub edited: bool,
}

/// Edit a message's content (sender only).
async fn edit_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(req): Json<EditMessageRequest>,
) -> AppResult<ApiResponse<MessageEditedResponse>> {
    req.validate()?;

    info!(user = %user.id, message = %message_id, "Editing message");

    let message = state
        .chat_service
        .edit_message(&user.id, &message_id, req.content)
        .await?;

    Ok(ApiResponse::ok(MessageEditedResponse {
        id: message.id,
        content: message.content,
        edited: message.edited,
    }))
}

/// Delete query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeleteQuery {
    #[serde(default)]
    pub for_everyone: bool,
}

/// Soft-delete a message, for the requester or for everyone.
async fn delete_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<ApiResponse<()>> {
    info!(
        user = %user.id,
        message = %message_id,
        for_everyone = query.for_everyone,
        "Deleting message"
    );

    state
        .chat_service
        .delete_message(&user.id, &message_id, query.for_everyone)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// Reaction request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    #[validate(length(min = 1, max = 64))]
    pub reaction: String,
}

/// Reaction response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    pub id: String,
    pub reactions: serde_json::Value,
}

/// Toggle a reaction on a message.
async fn toggle_reaction(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(req): Json<ReactionRequest>,
) -> AppResult<ApiResponse<ReactionResponse>> {
    req.validate()?;

    let message = state
        .chat_service
        .toggle_reaction(&user.id, &message_id, &req.reaction)
        .await?;

    Ok(ApiResponse::ok(ReactionResponse {
        id: message.id,
        reactions: message.reactions,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_serialization() {
        let response = MessageResponse {
            id: "m1".to_string(),
            content: "Hello!".to_string(),
            message_type: MessageType::Text,
            file_url: None,
            file_name: None,
            file_type: None,
            sender: UserSummaryResponse {
                id: "alice".to_string(),
                name: "Alice".to_string(),
                avatar_url: None,
            },
            reply_to: None,
            reactions: serde_json::json!({}),
            edited: false,
            chat_type: ChatType::Direct,
            recipient: Some(UserSummaryResponse {
                id: "bob".to_string(),
                name: "bob".to_string(),
                avatar_url: None,
            }),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"content\":\"Hello!\""));
        assert!(json.contains("\"chatType\":\"direct\""));
        assert!(json.contains("\"messageType\":\"text\""));
        assert!(json.contains("\"edited\":false"));
    }

    #[test]
    fn test_parse_chat_type() {
        assert_eq!(parse_chat_type(None).unwrap(), None);
        assert_eq!(
            parse_chat_type(Some("direct")).unwrap(),
            Some(ChatType::Direct)
        );
        assert!(matches!(
            parse_chat_type(Some("broadcast")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_feed_query_defaults() {
        let query: FeedQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert!(query.limit.is_none());
        assert!(query.chat_type.is_none());
    }
}

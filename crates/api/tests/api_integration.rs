//! API integration tests.
//!
//! These tests drive the full router (auth middleware included) against a
//! mock database connection shared by every repository.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
};
use campus_api::{middleware::AppState, router as api_router};
use campus_common::config::ChatConfig;
use campus_core::{ChatService, UserService};
use campus_db::entities::chat_message::{ChatType, MessageType};
use campus_db::entities::{chat_message, community, user};
use campus_db::repositories::{CommunityRepository, MessageRepository, UserRepository};
use chrono::{TimeZone, Utc};
use maplit::btreemap;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

fn test_user(id: &str, token: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: id.to_string(),
        name: None,
        avatar_url: None,
        token: Some(token.to_string()),
        is_suspended: false,
        created_at: Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap().into(),
        updated_at: None,
    }
}

fn test_community(id: &str) -> community::Model {
    community::Model {
        id: id.to_string(),
        owner_id: "alice".to_string(),
        name: "History Department".to_string(),
        description: None,
        members_count: 2,
        is_archived: false,
        created_at: Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap().into(),
        updated_at: None,
    }
}

fn test_message(id: &str, sender: &str) -> chat_message::Model {
    chat_message::Model {
        id: id.to_string(),
        community_id: "c1".to_string(),
        sender_id: sender.to_string(),
        chat_type: ChatType::Community,
        recipient_id: None,
        content: format!("message {id}"),
        message_type: MessageType::Text,
        file_url: None,
        file_name: None,
        file_type: None,
        reply_to_id: None,
        reactions: json!({}),
        edited: false,
        deleted_for_everyone: false,
        deleted_by_users: json!([]),
        read_by: json!([]),
        created_at: Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap().into(),
    }
}

fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
    btreemap! { "num_items" => Value::BigInt(Some(n)) }
}

/// Build the app the way the server binary does, over one mock connection.
fn create_test_app(db: DatabaseConnection) -> Router {
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let community_repo = CommunityRepository::new(Arc::clone(&db));
    let message_repo = MessageRepository::new(Arc::clone(&db));

    let state = AppState {
        chat_service: ChatService::new(
            message_repo,
            community_repo,
            user_repo.clone(),
            ChatConfig::default(),
        ),
        user_service: UserService::new(user_repo),
    };

    api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            campus_api::middleware::auth_middleware,
        ))
        .with_state(state)
}

#[tokio::test]
async fn test_feed_without_token_is_unauthorized() {
    let app = create_test_app(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/communities/c1/chat")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_feed_returns_grouped_messages() {
    // Shared mock connection: queries resolve in request order across
    // every repository (auth, community, membership, list, count, users).
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("alice", "alice_token")]])
        .append_query_results([[test_community("c1")]])
        .append_query_results([[count_row(1)]])
        .append_query_results([[test_message("m1", "alice")]])
        .append_query_results([[count_row(1)]])
        .append_query_results([[test_user("alice", "alice_token")]])
        .into_connection();
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/communities/c1/chat")
                .method("GET")
                .header("Authorization", "Bearer alice_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let groups = body["data"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["messages"][0]["id"], "m1");
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn test_direct_feed_without_partner_is_bad_request() {
    // Only the auth lookup may hit the database.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("alice", "alice_token")]])
        .into_connection();
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/communities/c1/chat?chat_type=direct")
                .method("GET")
                .header("Authorization", "Bearer alice_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_feed_for_non_member_is_forbidden() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("mallory", "mallory_token")]])
        .append_query_results([[test_community("c1")]])
        .append_query_results([[count_row(0)]])
        .into_connection();
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/communities/c1/chat")
                .method("GET")
                .header("Authorization", "Bearer mallory_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_app(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_message_with_invalid_json_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("alice", "alice_token")]])
        .into_connection();
    let app = create_test_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/communities/c1/chat")
                .method("POST")
                .header("Authorization", "Bearer alice_token")
                .header("Content-Type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

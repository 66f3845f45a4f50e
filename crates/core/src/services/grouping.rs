//! Date-grouping presenter for chat message lists.
//!
//! Turns a newest-first flat list of messages into UI-ready day buckets
//! ("Today", "Yesterday", "January 5, 2025"). Pure and deterministic: "now"
//! is always an explicit parameter.

use std::collections::HashMap;

use campus_db::entities::chat_message::{self, ChatType, MessageType};
use campus_db::entities::user;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Public summary of a user as shown in chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: String,
    /// Display name falling back to the username.
    pub name: String,
    pub avatar_url: Option<String>,
}

impl UserSummary {
    /// Build a summary from a user model.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name().to_string(),
            avatar_url: user.avatar_url.clone(),
        }
    }

    /// Fallback summary when the user row could not be loaded.
    #[must_use]
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            avatar_url: None,
        }
    }
}

/// Shallow summary of the message a reply points at. One level only; reply
/// chains are never resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplySummary {
    pub id: String,
    pub content: String,
    pub sender: UserSummary,
}

/// Presentation record for a single message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub sender: UserSummary,
    pub reply_to: Option<ReplySummary>,
    pub reactions: serde_json::Value,
    pub edited: bool,
    pub chat_type: ChatType,
    /// Present for direct messages only.
    pub recipient: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

/// One day bucket of messages, oldest first within the bucket.
#[derive(Debug, Clone, Serialize)]
pub struct DayGroup {
    pub date: String,
    pub messages: Vec<MessageView>,
}

fn summary_for(id: &str, users: &HashMap<String, user::Model>) -> UserSummary {
    users
        .get(id)
        .map_or_else(|| UserSummary::placeholder(id), UserSummary::from_user)
}

/// Reshape a message model into its presentation record.
#[must_use]
pub fn build_view(
    msg: chat_message::Model,
    users: &HashMap<String, user::Model>,
    replies: &HashMap<String, chat_message::Model>,
) -> MessageView {
    let reply_to = msg.reply_to_id.as_ref().and_then(|reply_id| {
        replies.get(reply_id).map(|parent| ReplySummary {
            id: parent.id.clone(),
            content: parent.content.clone(),
            sender: summary_for(&parent.sender_id, users),
        })
    });

    MessageView {
        sender: summary_for(&msg.sender_id, users),
        recipient: msg.recipient_id.as_deref().map(|r| summary_for(r, users)),
        reply_to,
        id: msg.id,
        content: msg.content,
        message_type: msg.message_type,
        file_url: msg.file_url,
        file_name: msg.file_name,
        file_type: msg.file_type,
        reactions: msg.reactions,
        edited: msg.edited,
        chat_type: msg.chat_type,
        created_at: msg.created_at.with_timezone(&Utc),
    }
}

/// Label for a calendar day relative to `today` (UTC calendar dates).
#[must_use]
pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%B %-d, %Y").to_string()
    }
}

/// Bucket a newest-first message list by calendar day.
///
/// Buckets appear in the order their first message is encountered while
/// scanning newest-first; each bucket's messages are then reversed so they
/// read oldest-to-newest, the natural chat order.
#[must_use]
pub fn group_by_day(views: Vec<MessageView>, now: DateTime<Utc>) -> Vec<DayGroup> {
    let today = now.date_naive();
    let mut groups: Vec<DayGroup> = Vec::new();

    for view in views {
        let label = day_label(view.created_at.date_naive(), today);
        match groups.iter_mut().find(|g| g.date == label) {
            Some(group) => group.messages.push(view),
            None => groups.push(DayGroup {
                date: label,
                messages: vec![view],
            }),
        }
    }

    for group in &mut groups {
        group.messages.reverse();
    }

    groups
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn view_at(id: &str, created_at: DateTime<Utc>) -> MessageView {
        MessageView {
            id: id.to_string(),
            content: format!("message {id}"),
            message_type: MessageType::Text,
            file_url: None,
            file_name: None,
            file_type: None,
            sender: UserSummary::placeholder("alice"),
            reply_to: None,
            reactions: json!({}),
            edited: false,
            chat_type: ChatType::Community,
            recipient: None,
            created_at,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_day_label_today_yesterday_older() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(day_label(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), today), "Today");
        assert_eq!(
            day_label(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(), today),
            "Yesterday"
        );
        assert_eq!(
            day_label(NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(), today),
            "January 4, 2025"
        );
        assert_eq!(
            day_label(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(), today),
            "December 31, 2024"
        );
    }

    #[test]
    fn test_message_sent_yesterday_groups_under_yesterday() {
        // Sent 2025-01-05T10:00Z, viewed at 2025-01-06T09:00Z.
        let views = vec![view_at("m1", at(2025, 1, 5, 10, 0))];
        let groups = group_by_day(views, at(2025, 1, 6, 9, 0));

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].date, "Yesterday");
    }

    #[test]
    fn test_buckets_keep_newest_period_first() {
        let now = at(2025, 1, 6, 12, 0);
        // Newest-first input spanning three days.
        let views = vec![
            view_at("m4", at(2025, 1, 6, 10, 0)),
            view_at("m3", at(2025, 1, 5, 18, 0)),
            view_at("m2", at(2025, 1, 5, 9, 0)),
            view_at("m1", at(2025, 1, 3, 8, 0)),
        ];

        let groups = group_by_day(views, now);

        let labels: Vec<&str> = groups.iter().map(|g| g.date.as_str()).collect();
        assert_eq!(labels, ["Today", "Yesterday", "January 3, 2025"]);
    }

    #[test]
    fn test_messages_within_bucket_read_oldest_first() {
        let now = at(2025, 1, 6, 12, 0);
        let views = vec![
            view_at("m3", at(2025, 1, 5, 18, 0)),
            view_at("m2", at(2025, 1, 5, 12, 0)),
            view_at("m1", at(2025, 1, 5, 9, 0)),
        ];

        let groups = group_by_day(views, now);

        assert_eq!(groups.len(), 1);
        let ids: Vec<&str> = groups[0].messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
    }

    #[test]
    fn test_grouping_preserves_every_message() {
        let now = at(2025, 1, 6, 12, 0);
        let views = vec![
            view_at("m5", at(2025, 1, 6, 11, 0)),
            view_at("m4", at(2025, 1, 6, 8, 0)),
            view_at("m3", at(2025, 1, 5, 23, 59)),
            view_at("m2", at(2025, 1, 2, 1, 0)),
            view_at("m1", at(2025, 1, 1, 22, 0)),
        ];
        let input_ids: Vec<String> = views.iter().map(|v| v.id.clone()).collect();

        let groups = group_by_day(views, now);

        let mut flattened: Vec<String> = groups
            .iter()
            .flat_map(|g| g.messages.iter().map(|m| m.id.clone()))
            .collect();
        flattened.sort();
        let mut expected = input_ids;
        expected.sort();
        assert_eq!(flattened, expected);

        // Within each bucket, chronological ascending.
        for group in &groups {
            for pair in group.messages.windows(2) {
                assert!(pair[0].created_at <= pair[1].created_at);
            }
        }
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let groups = group_by_day(vec![], at(2025, 1, 6, 12, 0));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_build_view_resolves_sender_reply_and_recipient() {
        let alice = user::Model {
            id: "alice".to_string(),
            username: "alice".to_string(),
            name: Some("Alice Smith".to_string()),
            avatar_url: Some("https://cdn.example/a.png".to_string()),
            token: None,
            is_suspended: false,
            created_at: at(2024, 9, 1, 0, 0).into(),
            updated_at: None,
        };
        let bob = user::Model {
            id: "bob".to_string(),
            username: "bob".to_string(),
            name: None,
            avatar_url: None,
            token: None,
            is_suspended: false,
            created_at: at(2024, 9, 1, 0, 0).into(),
            updated_at: None,
        };

        let parent = chat_message::Model {
            id: "m1".to_string(),
            community_id: "c1".to_string(),
            sender_id: "bob".to_string(),
            chat_type: ChatType::Direct,
            recipient_id: Some("alice".to_string()),
            content: "original".to_string(),
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
            created_at: at(2025, 1, 5, 9, 0).into(),
        };
        let reply = chat_message::Model {
            id: "m2".to_string(),
            sender_id: "alice".to_string(),
            recipient_id: Some("bob".to_string()),
            content: "answer".to_string(),
            reply_to_id: Some("m1".to_string()),
            created_at: at(2025, 1, 5, 10, 0).into(),
            ..parent.clone()
        };

        let users: HashMap<_, _> = [("alice".to_string(), alice), ("bob".to_string(), bob)].into();
        let replies: HashMap<_, _> = [("m1".to_string(), parent)].into();

        let view = build_view(reply, &users, &replies);

        assert_eq!(view.sender.name, "Alice Smith");
        assert_eq!(view.recipient.as_ref().unwrap().name, "bob");
        let reply_to = view.reply_to.unwrap();
        assert_eq!(reply_to.id, "m1");
        assert_eq!(reply_to.content, "original");
        assert_eq!(reply_to.sender.name, "bob");
    }

    #[test]
    fn test_build_view_unknown_sender_gets_placeholder() {
        let msg = chat_message::Model {
            id: "m1".to_string(),
            community_id: "c1".to_string(),
            sender_id: "ghost".to_string(),
            chat_type: ChatType::Community,
            recipient_id: None,
            content: "hello".to_string(),
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
            created_at: at(2025, 1, 5, 9, 0).into(),
        };

        let view = build_view(msg, &HashMap::new(), &HashMap::new());
        assert_eq!(view.sender.id, "ghost");
        assert_eq!(view.sender.name, "ghost");
    }
}

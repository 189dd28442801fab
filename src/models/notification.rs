use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Announcement,
    Payment,
    Booking,
    Membership,
    Class,
}

/// A notification as seen by one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserNotification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "user_id", rename_all = "snake_case")]
pub enum Audience {
    All,
    Members,
    Trainers,
    User(Uuid),
}

#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    pub audience: Audience,
    #[validate(length(min = 1, max = 150, message = "must be between 1 and 150 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 4000, message = "must be between 1 and 4000 characters"))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BroadcastResult {
    pub notification_id: Uuid,
    pub recipients: u64,
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_wire_format() {
        let all: Audience = serde_json::from_str(r#"{"type":"all"}"#).unwrap();
        assert_eq!(all, Audience::All);

        let id = Uuid::new_v4();
        let single: Audience =
            serde_json::from_value(serde_json::json!({"type": "user", "user_id": id})).unwrap();
        assert_eq!(single, Audience::User(id));

        assert!(serde_json::from_str::<Audience>(r#"{"type":"everyone"}"#).is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::DbError;

/// Every kind of notification the platform emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PostCreated,
    CommentAdded,
    ProjectInvitation,
    InactivityAlert,
    InvitationAccepted,
    DeadlineReminder,
    TaskCreated,
    TaskUpdated,
    TaskStatusChanged,
    TaskAssigned,
    TaskDeleted,
    PostComment,
}

impl NotificationType {
    pub const ALL: [NotificationType; 12] = [
        NotificationType::PostCreated,
        NotificationType::CommentAdded,
        NotificationType::ProjectInvitation,
        NotificationType::InactivityAlert,
        NotificationType::InvitationAccepted,
        NotificationType::DeadlineReminder,
        NotificationType::TaskCreated,
        NotificationType::TaskUpdated,
        NotificationType::TaskStatusChanged,
        NotificationType::TaskAssigned,
        NotificationType::TaskDeleted,
        NotificationType::PostComment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::PostCreated => "post_created",
            NotificationType::CommentAdded => "comment_added",
            NotificationType::ProjectInvitation => "project_invitation",
            NotificationType::InactivityAlert => "inactivity_alert",
            NotificationType::InvitationAccepted => "invitation_accepted",
            NotificationType::DeadlineReminder => "deadline_reminder",
            NotificationType::TaskCreated => "task_created",
            NotificationType::TaskUpdated => "task_updated",
            NotificationType::TaskStatusChanged => "task_status_changed",
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskDeleted => "task_deleted",
            NotificationType::PostComment => "post_comment",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, String> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("Invalid notification type: {}", value))
    }
}

/// A persisted notification row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub related_id: Option<String>,
    pub is_read: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// A notification about to be written; `is_read` always starts false
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub notification_type: NotificationType,
    pub related_id: Option<String>,
}

/// Which notifications an inbox operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl ReadFilter {
    /// The `is_read` value to match, `None` meaning no constraint
    pub fn is_read(&self) -> Option<bool> {
        match self {
            ReadFilter::All => None,
            ReadFilter::Unread => Some(false),
            ReadFilter::Read => Some(true),
        }
    }
}

/// Author and project of a post, needed to route comment notifications
#[derive(Debug, Clone, PartialEq)]
pub struct PostContext {
    pub author_id: Option<Uuid>,
    pub project_id: Uuid,
}

/// A domain event reported by a client after it changed a task or comment.
/// The authenticated caller is the actor and is never notified.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    TaskCreated {
        #[schema(value_type = String, format = "uuid")]
        task_id: Uuid,
        #[schema(value_type = String, format = "uuid")]
        project_id: Uuid,
        title: String,
        priority: String,
        #[schema(value_type = Option<String>, format = "uuid")]
        assigned_to: Option<Uuid>,
    },
    TaskStatusChanged {
        #[schema(value_type = String, format = "uuid")]
        task_id: Uuid,
        #[schema(value_type = String, format = "uuid")]
        project_id: Uuid,
        title: String,
        old_status: String,
        new_status: String,
    },
    TaskAssigned {
        #[schema(value_type = String, format = "uuid")]
        task_id: Uuid,
        #[schema(value_type = String, format = "uuid")]
        project_id: Uuid,
        title: String,
        #[schema(value_type = String, format = "uuid")]
        assignee_id: Uuid,
    },
    TaskUpdated {
        #[schema(value_type = String, format = "uuid")]
        task_id: Uuid,
        #[schema(value_type = String, format = "uuid")]
        project_id: Uuid,
        title: String,
    },
    CommentAdded {
        #[schema(value_type = String, format = "uuid")]
        post_id: Uuid,
        #[schema(value_type = String, format = "uuid")]
        comment_id: Uuid,
        commenter_name: String,
    },
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InboxQuery {
    #[serde(default)]
    pub filter: ReadFilter,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    pub delivered: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread_count: usize,
}

/// Inbox listing returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AffectedResponse {
    pub affected: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbError),

    #[error("Notification not found")]
    NotFound,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("Post not found")]
    PostNotFound,

    #[error("Missing user information")]
    MissingUserInformation,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationErrorResponse {
    #[schema(example = "Notification not found")]
    pub error: String,

    #[schema(example = "NOT_FOUND")]
    pub code: String,
}

impl From<NotificationError> for NotificationErrorResponse {
    fn from(err: NotificationError) -> Self {
        let (error, code) = match err {
            NotificationError::DatabaseError(_) => ("Internal server error", "INTERNAL_ERROR"),
            NotificationError::NotFound => ("Notification not found", "NOT_FOUND"),
            NotificationError::ProjectNotFound => ("Project not found", "PROJECT_NOT_FOUND"),
            NotificationError::PostNotFound => ("Post not found", "POST_NOT_FOUND"),
            NotificationError::MissingUserInformation => {
                ("Missing user information", "MISSING_USER")
            }
        };

        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_round_trips_through_str() {
        for kind in NotificationType::ALL {
            assert_eq!(NotificationType::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(NotificationType::from_str("task_archived").is_err());
    }

    #[test]
    fn test_notification_type_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationType::TaskStatusChanged).unwrap();
        assert_eq!(json, "\"task_status_changed\"");
    }

    #[test]
    fn test_read_filter_maps_to_flag() {
        assert_eq!(ReadFilter::All.is_read(), None);
        assert_eq!(ReadFilter::Unread.is_read(), Some(false));
        assert_eq!(ReadFilter::Read.is_read(), Some(true));
    }

    #[test]
    fn test_notification_serializes_type_field() {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".to_string(),
            content: "c".to_string(),
            notification_type: NotificationType::CommentAdded,
            related_id: None,
            is_read: false,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "comment_added");
        assert_eq!(value["is_read"], false);
    }

    #[test]
    fn test_event_is_tagged_by_name() {
        let project_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let json = format!(
            r#"{{"event":"task_status_changed","task_id":"{}","project_id":"{}","title":"t","old_status":"in_progress","new_status":"completed"}}"#,
            task_id, project_id
        );

        let event: NotificationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(
            event,
            NotificationEvent::TaskStatusChanged {
                task_id,
                project_id,
                title: "t".to_string(),
                old_status: "in_progress".to_string(),
                new_status: "completed".to_string(),
            }
        );

        assert!(serde_json::from_str::<NotificationEvent>(r#"{"event":"task_archived"}"#).is_err());
    }
}

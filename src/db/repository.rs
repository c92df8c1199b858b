//! Relational collaborator seams. Services hold these as `Arc<dyn ...>` so the
//! Postgres implementation can be swapped for mocks in tests.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use super::DbError;
use crate::invitation::model::{
    Demotion, NewInvitation, ProjectInvitation, SupervisorGrant, UserSummary,
};
use crate::notification::model::{NewNotification, Notification, PostContext, ReadFilter};
use crate::task::model::Task;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert all rows in one statement; either every row is written or none is
    async fn insert_many(&self, rows: Vec<NewNotification>) -> Result<Vec<Notification>, DbError>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: ReadFilter,
    ) -> Result<Vec<Notification>, DbError>;

    async fn count_unread(&self, user_id: Uuid) -> Result<u64, DbError>;

    /// Returns false when no row matched
    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, DbError>;

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, DbError>;

    /// Returns false when no row matched
    async fn delete(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, DbError>;

    async fn delete_for_user(&self, user_id: Uuid, filter: ReadFilter) -> Result<u64, DbError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn project_name(&self, project_id: Uuid) -> Result<Option<String>, DbError>;

    async fn member_user_ids(&self, project_id: Uuid) -> Result<Vec<Uuid>, DbError>;

    async fn post_context(&self, post_id: Uuid) -> Result<Option<PostContext>, DbError>;

    async fn project_tasks(&self, project_id: Uuid) -> Result<Vec<Task>, DbError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Insert a supervisor membership, or promote an existing `member` row, in a
    /// single conditional write. Owner and supervisor rows are left untouched.
    async fn grant_supervisor(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<SupervisorGrant, DbError>;

    /// Set the role to `member` unless the row belongs to the project owner
    async fn demote_to_member(&self, membership_id: Uuid) -> Result<Demotion, DbError>;

    /// Insert, or refresh the open invitation for the same (project, email)
    async fn upsert_invitation(
        &self,
        invitation: NewInvitation,
    ) -> Result<ProjectInvitation, DbError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_users(&self, ids: Vec<Uuid>) -> Result<Vec<UserSummary>, DbError>;

    /// Case-insensitive substring match on email or full name
    async fn search(&self, query: String, limit: i64) -> Result<Vec<UserSummary>, DbError>;
}

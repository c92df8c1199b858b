use crate::db::repository::{NotificationRepository, ProjectRepository, UserRepository};
use crate::invitation::model::UserSummary;
use crate::notification::model::{
    NewNotification, Notification, NotificationError, NotificationEvent, NotificationType,
    ReadFilter,
};
use crate::task::model::{priority_label, status_label};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Turns domain events into notification rows and serves the per-user inbox.
///
/// Every write is attempted once. Failures are logged and returned to the
/// caller; nothing is retried and no idempotency key is kept, so reporting the
/// same event twice produces two rows per recipient.
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    projects: Arc<dyn ProjectRepository>,
    users: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        projects: Arc<dyn ProjectRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            notifications,
            projects,
            users,
        }
    }

    /// Write a single notification
    pub async fn notify(
        &self,
        recipient: Uuid,
        title: &str,
        content: &str,
        notification_type: NotificationType,
        related_id: Option<String>,
    ) -> Result<Notification, NotificationError> {
        let mut rows = self
            .notify_many(
                vec![recipient],
                title,
                content,
                notification_type,
                related_id,
            )
            .await?;

        rows.pop().ok_or(NotificationError::NotFound)
    }

    /// Write one row per distinct recipient in a single batch. A failure covers
    /// the whole batch.
    pub async fn notify_many(
        &self,
        recipients: Vec<Uuid>,
        title: &str,
        content: &str,
        notification_type: NotificationType,
        related_id: Option<String>,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut seen = HashSet::new();
        let rows: Vec<NewNotification> = recipients
            .into_iter()
            .filter(|id| seen.insert(*id))
            .map(|user_id| NewNotification {
                user_id,
                title: title.to_string(),
                content: content.to_string(),
                notification_type,
                related_id: related_id.clone(),
            })
            .collect();

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let count = rows.len();
        match self.notifications.insert_many(rows).await {
            Ok(written) => {
                info!(
                    "Wrote {} {} notification(s)",
                    count,
                    notification_type.as_str()
                );
                Ok(written)
            }
            Err(e) => {
                error!(
                    "Failed to write {} {} notification(s): {}",
                    count,
                    notification_type.as_str(),
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Notify every member of a project except `exclude`. An empty recipient
    /// set is a success with nothing written.
    pub async fn notify_project_members(
        &self,
        project_id: Uuid,
        title: &str,
        content: &str,
        notification_type: NotificationType,
        related_id: Option<String>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Notification>, NotificationError> {
        let excluded: Vec<Uuid> = exclude.into_iter().collect();
        self.notify_project_members_except(
            project_id,
            title,
            content,
            notification_type,
            related_id,
            &excluded,
        )
        .await
    }

    async fn notify_project_members_except(
        &self,
        project_id: Uuid,
        title: &str,
        content: &str,
        notification_type: NotificationType,
        related_id: Option<String>,
        excluded: &[Uuid],
    ) -> Result<Vec<Notification>, NotificationError> {
        let members = self
            .projects
            .member_user_ids(project_id)
            .await
            .map_err(|e| {
                error!("Failed to load members of project {}: {}", project_id, e);
                NotificationError::from(e)
            })?;

        let recipients: Vec<Uuid> = members
            .into_iter()
            .filter(|id| !excluded.contains(id))
            .collect();

        if recipients.is_empty() {
            info!("No recipients in project {} for notification", project_id);
            return Ok(Vec::new());
        }

        self.notify_many(recipients, title, content, notification_type, related_id)
            .await
    }

    pub async fn notify_new_task(
        &self,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        priority: &str,
        creator: Uuid,
        assigned_to: Option<Uuid>,
    ) -> Result<Vec<Notification>, NotificationError> {
        let project_name = self.project_name(project_id).await?;

        let mut content = format!(
            "تم إضافة مهمة جديدة في مشروع \"{}\". الأولوية: {}",
            project_name,
            priority_label(priority)
        );

        if let Some(assignee) = assigned_to {
            match self.users.find_users(vec![assignee]).await {
                Ok(found) => {
                    if let Some(user) = found.first() {
                        content.push_str(&format!(" وتم تعيينها إلى {}", user.display_name()));
                    }
                }
                // The assignee's name is decoration; the notification still goes out
                Err(e) => warn!("Could not resolve assignee {}: {}", assignee, e),
            }
        }

        self.notify_project_members(
            project_id,
            &format!("تم إنشاء مهمة جديدة \"{}\"", task_title),
            &content,
            NotificationType::TaskCreated,
            Some(task_id.to_string()),
            Some(creator),
        )
        .await
    }

    pub async fn notify_task_status_changed(
        &self,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        old_status: &str,
        new_status: &str,
        updated_by: Uuid,
    ) -> Result<Vec<Notification>, NotificationError> {
        self.notify_project_members(
            project_id,
            &format!("تم تغيير حالة المهمة \"{}\"", task_title),
            &format!(
                "تم تغيير حالة المهمة من \"{}\" إلى \"{}\"",
                status_label(old_status),
                status_label(new_status)
            ),
            NotificationType::TaskStatusChanged,
            Some(task_id.to_string()),
            Some(updated_by),
        )
        .await
    }

    /// Tell the assignee directly (unless they assigned themselves), then tell
    /// the rest of the project. Neither the assigner nor the assignee is part of
    /// the fan-out.
    pub async fn notify_task_assigned(
        &self,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        assignee_id: Uuid,
        assigner_id: Uuid,
    ) -> Result<Vec<Notification>, NotificationError> {
        let users = self
            .users
            .find_users(vec![assignee_id, assigner_id])
            .await
            .map_err(|e| {
                error!("Failed to load users for task assignment: {}", e);
                NotificationError::from(e)
            })?;

        let assignee = find_user(&users, assignee_id)?;
        let assigner = find_user(&users, assigner_id)?;

        let mut written = Vec::new();

        if assignee_id != assigner_id {
            let direct = self
                .notify(
                    assignee_id,
                    &format!("تم تعيينك لمهمة \"{}\"", task_title),
                    &format!(
                        "قام {} بتعيينك للعمل على المهمة في المشروع",
                        assigner.display_name()
                    ),
                    NotificationType::TaskAssigned,
                    Some(task_id.to_string()),
                )
                .await?;
            written.push(direct);
        }

        // The assigner never hears about their own action; the assignee already has a direct row
        let fan_out = self
            .notify_project_members_except(
                project_id,
                &format!("تم تعيين مهمة \"{}\"", task_title),
                &format!("تم تعيين {} للعمل على المهمة", assignee.display_name()),
                NotificationType::TaskAssigned,
                Some(task_id.to_string()),
                &[assigner_id, assignee_id],
            )
            .await?;

        written.extend(fan_out);
        Ok(written)
    }

    pub async fn notify_task_updated(
        &self,
        task_id: Uuid,
        project_id: Uuid,
        task_title: &str,
        updated_by: Uuid,
    ) -> Result<Vec<Notification>, NotificationError> {
        self.notify_project_members(
            project_id,
            &format!("تم تحديث المهمة \"{}\"", task_title),
            "تم إجراء تحديثات على المهمة في المشروع",
            NotificationType::TaskUpdated,
            Some(task_id.to_string()),
            Some(updated_by),
        )
        .await
    }

    /// Notify the post's author (unless they wrote the comment), then the project
    pub async fn notify_new_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        commenter_id: Uuid,
        commenter_name: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let post = self
            .projects
            .post_context(post_id)
            .await
            .map_err(|e| {
                error!("Failed to load post {}: {}", post_id, e);
                NotificationError::from(e)
            })?
            .ok_or(NotificationError::PostNotFound)?;

        let mut written = Vec::new();

        if let Some(author) = post.author_id.filter(|author| *author != commenter_id) {
            let direct = self
                .notify(
                    author,
                    "تعليق جديد على منشورك",
                    &format!("علق {} على منشورك في المشروع", commenter_name),
                    NotificationType::CommentAdded,
                    Some(comment_id.to_string()),
                )
                .await?;
            written.push(direct);
        }

        let fan_out = self
            .notify_project_members(
                post.project_id,
                "تعليق جديد على منشور",
                &format!(
                    "أضاف {} تعليقاً جديداً على منشور في المشروع",
                    commenter_name
                ),
                NotificationType::CommentAdded,
                Some(comment_id.to_string()),
                Some(commenter_id),
            )
            .await?;

        written.extend(fan_out);
        Ok(written)
    }

    /// Route a reported event to its helper with `actor` as the excluded user
    pub async fn dispatch(
        &self,
        event: NotificationEvent,
        actor: Uuid,
    ) -> Result<Vec<Notification>, NotificationError> {
        match event {
            NotificationEvent::TaskCreated {
                task_id,
                project_id,
                title,
                priority,
                assigned_to,
            } => {
                self.notify_new_task(task_id, project_id, &title, &priority, actor, assigned_to)
                    .await
            }
            NotificationEvent::TaskStatusChanged {
                task_id,
                project_id,
                title,
                old_status,
                new_status,
            } => {
                self.notify_task_status_changed(
                    task_id,
                    project_id,
                    &title,
                    &old_status,
                    &new_status,
                    actor,
                )
                .await
            }
            NotificationEvent::TaskAssigned {
                task_id,
                project_id,
                title,
                assignee_id,
            } => {
                self.notify_task_assigned(task_id, project_id, &title, assignee_id, actor)
                    .await
            }
            NotificationEvent::TaskUpdated {
                task_id,
                project_id,
                title,
            } => {
                self.notify_task_updated(task_id, project_id, &title, actor)
                    .await
            }
            NotificationEvent::CommentAdded {
                post_id,
                comment_id,
                commenter_name,
            } => {
                self.notify_new_comment(post_id, comment_id, actor, &commenter_name)
                    .await
            }
        }
    }

    pub async fn send_test_notification(
        &self,
        user_id: Uuid,
    ) -> Result<Notification, NotificationError> {
        self.notify(
            user_id,
            "اختبار نظام الإشعارات",
            "هذا إشعار تجريبي للتأكد من أن نظام الإشعارات يعمل بشكل صحيح",
            NotificationType::TaskCreated,
            Some("test-notification".to_string()),
        )
        .await
    }

    /// Newest first, plus the number of unread rows across the whole inbox
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: ReadFilter,
    ) -> Result<(Vec<Notification>, usize), NotificationError> {
        let notifications = self.notifications.list_for_user(user_id, filter).await?;

        let unread_count = match filter {
            ReadFilter::Unread => notifications.len(),
            _ => self.unread_count(user_id).await?,
        };

        Ok((notifications, unread_count))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<usize, NotificationError> {
        let unread = self.notifications.count_unread(user_id).await?;
        Ok(unread as usize)
    }

    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), NotificationError> {
        if self.notifications.mark_read(notification_id, user_id).await? {
            Ok(())
        } else {
            Err(NotificationError::NotFound)
        }
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, NotificationError> {
        let affected = self.notifications.mark_all_read(user_id).await?;
        info!("Marked {} notification(s) read for {}", affected, user_id);
        Ok(affected)
    }

    pub async fn delete(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), NotificationError> {
        if self.notifications.delete(notification_id, user_id).await? {
            Ok(())
        } else {
            Err(NotificationError::NotFound)
        }
    }

    pub async fn delete_matching(
        &self,
        user_id: Uuid,
        filter: ReadFilter,
    ) -> Result<u64, NotificationError> {
        let affected = self.notifications.delete_for_user(user_id, filter).await?;
        info!(
            "Deleted {} notification(s) for {} with filter {:?}",
            affected, user_id, filter
        );
        Ok(affected)
    }

    async fn project_name(&self, project_id: Uuid) -> Result<String, NotificationError> {
        match self.projects.project_name(project_id).await {
            Ok(Some(name)) => Ok(name),
            Ok(None) => Err(NotificationError::ProjectNotFound),
            Err(e) => {
                error!("Failed to load project {}: {}", project_id, e);
                Err(e.into())
            }
        }
    }
}

fn find_user(users: &[UserSummary], id: Uuid) -> Result<&UserSummary, NotificationError> {
    users
        .iter()
        .find(|user| user.id == id)
        .ok_or(NotificationError::MissingUserInformation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{
        MockNotificationRepository, MockProjectRepository, MockUserRepository,
    };
    use crate::db::DbError;
    use crate::notification::model::PostContext;
    use chrono::Utc;
    use mockall::predicate::*;

    fn echo_rows(rows: Vec<NewNotification>) -> Result<Vec<Notification>, DbError> {
        Ok(rows
            .into_iter()
            .map(|row| Notification {
                id: Uuid::new_v4(),
                user_id: row.user_id,
                title: row.title,
                content: row.content,
                notification_type: row.notification_type,
                related_id: row.related_id,
                is_read: false,
                created_at: Utc::now(),
            })
            .collect())
    }

    fn user(id: Uuid, name: &str) -> UserSummary {
        UserSummary {
            id,
            email: format!("{}@example.com", name),
            full_name: Some(name.to_string()),
            avatar_url: None,
        }
    }

    fn service(
        notifications: MockNotificationRepository,
        projects: MockProjectRepository,
        users: MockUserRepository,
    ) -> NotificationService {
        NotificationService::new(Arc::new(notifications), Arc::new(projects), Arc::new(users))
    }

    fn members_of(project_id: Uuid, members: Vec<Uuid>) -> MockProjectRepository {
        let mut projects = MockProjectRepository::new();
        projects
            .expect_member_user_ids()
            .with(eq(project_id))
            .returning(move |_| Ok(members.clone()));
        projects
    }

    #[tokio::test]
    async fn test_fan_out_skips_excluded_actor() {
        let project_id = Uuid::new_v4();
        for size in 0..5usize {
            let members: Vec<Uuid> = (0..size).map(|_| Uuid::new_v4()).collect();

            // Actor inside the member set, actor outside it
            let insider = members.first().copied();
            let outsider = Uuid::new_v4();

            for actor in [insider, Some(outsider)] {
                let expected = match actor {
                    Some(a) if members.contains(&a) => size - 1,
                    _ => size,
                };

                let mut notifications = MockNotificationRepository::new();
                let excluded = actor;
                notifications
                    .expect_insert_many()
                    .withf(move |rows| rows.iter().all(|row| Some(row.user_id) != excluded))
                    .times(if expected == 0 { 0 } else { 1 })
                    .returning(echo_rows);

                let svc = service(
                    notifications,
                    members_of(project_id, members.clone()),
                    MockUserRepository::new(),
                );

                let written = svc
                    .notify_project_members(
                        project_id,
                        "t",
                        "c",
                        NotificationType::TaskUpdated,
                        None,
                        actor,
                    )
                    .await
                    .unwrap();

                assert_eq!(written.len(), expected);
                assert!(written.iter().all(|n| Some(n.user_id) != actor));
            }
        }
    }

    #[tokio::test]
    async fn test_empty_project_writes_nothing() {
        let project_id = Uuid::new_v4();
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_insert_many().times(0);

        let svc = service(
            notifications,
            members_of(project_id, vec![]),
            MockUserRepository::new(),
        );

        let written = svc
            .notify_project_members(
                project_id,
                "t",
                "c",
                NotificationType::PostCreated,
                None,
                None,
            )
            .await
            .unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_batch_failure_is_reported_once() {
        let project_id = Uuid::new_v4();
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(1)
            .returning(|_| Err(DbError::InvalidRow("constraint violated".to_string())));

        let svc = service(
            notifications,
            members_of(project_id, vec![Uuid::new_v4(), Uuid::new_v4()]),
            MockUserRepository::new(),
        );

        let result = svc
            .notify_project_members(
                project_id,
                "t",
                "c",
                NotificationType::TaskDeleted,
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(NotificationError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_notifying_twice_writes_twice() {
        let recipient = Uuid::new_v4();
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(2)
            .returning(echo_rows);

        let svc = service(
            notifications,
            MockProjectRepository::new(),
            MockUserRepository::new(),
        );

        for _ in 0..2 {
            svc.notify(recipient, "t", "c", NotificationType::DeadlineReminder, None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_new_task_content_uses_labels_and_assignee() {
        let project_id = Uuid::new_v4();
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let mut projects = members_of(project_id, vec![creator, assignee]);
        projects
            .expect_project_name()
            .returning(|_| Ok(Some("نظام التتبع".to_string())));

        let mut users = MockUserRepository::new();
        users
            .expect_find_users()
            .returning(move |_| Ok(vec![user(assignee, "ليلى")]));

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(1)
            .withf(move |rows| {
                rows.len() == 1
                    && rows[0].user_id == assignee
                    && rows[0].title == "تم إنشاء مهمة جديدة \"كتابة التقرير\""
                    && rows[0].content
                        == "تم إضافة مهمة جديدة في مشروع \"نظام التتبع\". الأولوية: عالية وتم تعيينها إلى ليلى"
            })
            .returning(echo_rows);

        let svc = service(notifications, projects, users);
        let written = svc
            .notify_new_task(
                task_id,
                project_id,
                "كتابة التقرير",
                "high",
                creator,
                Some(assignee),
            )
            .await
            .unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].related_id, Some(task_id.to_string()));
    }

    #[tokio::test]
    async fn test_new_task_in_unknown_project() {
        let mut projects = MockProjectRepository::new();
        projects.expect_project_name().returning(|_| Ok(None));
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_insert_many().times(0);

        let svc = service(notifications, projects, MockUserRepository::new());
        let result = svc
            .notify_new_task(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "t",
                "low",
                Uuid::new_v4(),
                None,
            )
            .await;
        assert!(matches!(result, Err(NotificationError::ProjectNotFound)));
    }

    #[tokio::test]
    async fn test_status_change_translates_labels() {
        let project_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let member = Uuid::new_v4();

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .withf(|rows| rows[0].content == "تم تغيير حالة المهمة من \"لم تبدأ\" إلى \"blocked\"")
            .times(1)
            .returning(echo_rows);

        let svc = service(
            notifications,
            members_of(project_id, vec![actor, member]),
            MockUserRepository::new(),
        );

        let written = svc
            .notify_task_status_changed(
                Uuid::new_v4(),
                project_id,
                "t",
                "not_started",
                "blocked",
                actor,
            )
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].user_id, member);
    }

    #[tokio::test]
    async fn test_task_assigned_notifies_assignee_then_project() {
        let project_id = Uuid::new_v4();
        let assigner = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users
            .expect_find_users()
            .returning(move |_| Ok(vec![user(assigner, "أحمد"), user(assignee, "منى")]));

        let mut notifications = MockNotificationRepository::new();
        let mut seq = mockall::Sequence::new();
        notifications
            .expect_insert_many()
            .times(1)
            .in_sequence(&mut seq)
            .withf(move |rows| {
                rows.len() == 1
                    && rows[0].user_id == assignee
                    && rows[0].content == "قام أحمد بتعيينك للعمل على المهمة في المشروع"
            })
            .returning(echo_rows);
        notifications
            .expect_insert_many()
            .times(1)
            .in_sequence(&mut seq)
            .withf(move |rows| {
                rows.len() == 1
                    && rows[0].user_id == other
                    && rows[0].content == "تم تعيين منى للعمل على المهمة"
            })
            .returning(echo_rows);

        let svc = service(
            notifications,
            members_of(project_id, vec![assigner, assignee, other]),
            users,
        );

        let written = svc
            .notify_task_assigned(Uuid::new_v4(), project_id, "t", assignee, assigner)
            .await
            .unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|row| row.user_id != assigner));
    }

    #[tokio::test]
    async fn test_assigner_never_notified_of_own_assignment() {
        let project_id = Uuid::new_v4();
        let assigner = Uuid::new_v4();
        let assignee = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users
            .expect_find_users()
            .returning(move |_| Ok(vec![user(assigner, "أحمد"), user(assignee, "منى")]));

        // Only the direct row; the fan-out has nobody left to notify
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(1)
            .withf(move |rows| rows.len() == 1 && rows[0].user_id == assignee)
            .returning(echo_rows);

        let svc = service(
            notifications,
            members_of(project_id, vec![assigner, assignee]),
            users,
        );

        let written = svc
            .notify_task_assigned(Uuid::new_v4(), project_id, "t", assignee, assigner)
            .await
            .unwrap();
        let to_actor = written.iter().filter(|row| row.user_id == assigner).count();
        assert_eq!(to_actor, 0);
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn test_self_assignment_excludes_actor() {
        let project_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users
            .expect_find_users()
            .returning(move |_| Ok(vec![user(actor, "سامي")]));

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(1)
            .withf(move |rows| rows.len() == 1 && rows[0].user_id == other)
            .returning(echo_rows);

        let svc = service(
            notifications,
            members_of(project_id, vec![actor, other]),
            users,
        );

        let written = svc
            .notify_task_assigned(Uuid::new_v4(), project_id, "t", actor, actor)
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn test_task_assigned_with_unknown_user() {
        let mut users = MockUserRepository::new();
        users.expect_find_users().returning(|_| Ok(vec![]));
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_insert_many().times(0);

        let svc = service(notifications, MockProjectRepository::new(), users);
        let result = svc
            .notify_task_assigned(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "t",
                Uuid::new_v4(),
                Uuid::new_v4(),
            )
            .await;
        assert!(matches!(
            result,
            Err(NotificationError::MissingUserInformation)
        ));
    }

    #[tokio::test]
    async fn test_comment_by_author_skips_direct_notification() {
        let post_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let author = Uuid::new_v4();
        let member = Uuid::new_v4();

        let mut projects = members_of(project_id, vec![author, member]);
        projects.expect_post_context().with(eq(post_id)).returning(move |_| {
            Ok(Some(PostContext {
                author_id: Some(author),
                project_id,
            }))
        });

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(1)
            .withf(move |rows| rows.len() == 1 && rows[0].user_id == member)
            .returning(echo_rows);

        let svc = service(notifications, projects, MockUserRepository::new());
        let written = svc
            .notify_new_comment(post_id, Uuid::new_v4(), author, "كاتب")
            .await
            .unwrap();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn test_comment_notifies_author_directly() {
        let post_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let author = Uuid::new_v4();
        let commenter = Uuid::new_v4();

        let mut projects = members_of(project_id, vec![author, commenter]);
        projects.expect_post_context().returning(move |_| {
            Ok(Some(PostContext {
                author_id: Some(author),
                project_id,
            }))
        });

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(2)
            .withf(move |rows| rows.iter().all(|row| row.user_id == author))
            .returning(echo_rows);

        let svc = service(notifications, projects, MockUserRepository::new());
        let written = svc
            .notify_new_comment(post_id, Uuid::new_v4(), commenter, "نور")
            .await
            .unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].title, "تعليق جديد على منشورك");
        assert_eq!(written[1].title, "تعليق جديد على منشور");
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let mut projects = MockProjectRepository::new();
        projects.expect_post_context().returning(|_| Ok(None));

        let svc = service(
            MockNotificationRepository::new(),
            projects,
            MockUserRepository::new(),
        );
        let result = svc
            .notify_new_comment(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "x")
            .await;
        assert!(matches!(result, Err(NotificationError::PostNotFound)));
    }

    #[tokio::test]
    async fn test_dispatch_routes_task_updated() {
        let project_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let member = Uuid::new_v4();

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .withf(|rows| {
                rows[0].notification_type == NotificationType::TaskUpdated
                    && rows[0].content == "تم إجراء تحديثات على المهمة في المشروع"
            })
            .times(1)
            .returning(echo_rows);

        let svc = service(
            notifications,
            members_of(project_id, vec![actor, member]),
            MockUserRepository::new(),
        );

        let event = NotificationEvent::TaskUpdated {
            task_id: Uuid::new_v4(),
            project_id,
            title: "t".to_string(),
        };
        let written = svc.dispatch(event, actor).await.unwrap();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn test_send_test_notification() {
        let me = Uuid::new_v4();
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert_many()
            .times(1)
            .returning(echo_rows);

        let svc = service(
            notifications,
            MockProjectRepository::new(),
            MockUserRepository::new(),
        );
        let notification = svc.send_test_notification(me).await.unwrap();

        assert_eq!(notification.user_id, me);
        assert_eq!(notification.notification_type, NotificationType::TaskCreated);
        assert_eq!(notification.related_id.as_deref(), Some("test-notification"));
        assert!(!notification.is_read);
    }

    #[tokio::test]
    async fn test_mark_read_of_foreign_notification() {
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_mark_read().returning(|_, _| Ok(false));

        let svc = service(
            notifications,
            MockProjectRepository::new(),
            MockUserRepository::new(),
        );
        let result = svc.mark_read(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(NotificationError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_reports_unread_count() {
        let me = Uuid::new_v4();
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_list_for_user()
            .with(eq(me), eq(ReadFilter::Read))
            .returning(|_, _| Ok(vec![]));
        // The count comes from a single aggregate, never from loading unread rows
        notifications
            .expect_list_for_user()
            .with(eq(me), eq(ReadFilter::Unread))
            .times(0);
        notifications
            .expect_count_unread()
            .with(eq(me))
            .times(1)
            .returning(|_| Ok(1));

        let svc = service(
            notifications,
            MockProjectRepository::new(),
            MockUserRepository::new(),
        );
        let (listed, unread) = svc.list(me, ReadFilter::Read).await.unwrap();
        assert!(listed.is_empty());
        assert_eq!(unread, 1);
    }

    #[tokio::test]
    async fn test_unread_count_uses_aggregate() {
        let me = Uuid::new_v4();
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_list_for_user().times(0);
        notifications
            .expect_count_unread()
            .with(eq(me))
            .times(1)
            .returning(|_| Ok(42));

        let svc = service(
            notifications,
            MockProjectRepository::new(),
            MockUserRepository::new(),
        );
        assert_eq!(svc.unread_count(me).await.unwrap(), 42);
    }
}

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::repository::{
    MembershipRepository, NotificationRepository, ProjectRepository, UserRepository,
};
use super::DbError;
use crate::invitation::model::{
    Demotion, MemberRole, NewInvitation, ProjectInvitation, SupervisorGrant, UserSummary,
};
use crate::notification::model::{
    NewNotification, Notification, NotificationType, PostContext, ReadFilter,
};
use crate::task::model::{Task, TaskPriority, TaskStatus};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, content, type, related_id, is_read, created_at";

/// sqlx-backed implementation of every relational repository
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification, DbError> {
    let raw_type: String = row.try_get("type")?;
    let notification_type = NotificationType::from_str(&raw_type).map_err(DbError::InvalidRow)?;

    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        notification_type,
        related_id: row.try_get("related_id")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn role_from_row(row: &PgRow, column: &str) -> Result<Option<MemberRole>, DbError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|role| MemberRole::from_str(&role).map_err(DbError::InvalidRow))
        .transpose()
}

/// Interpret the role seen before a grant and whether the conditional write
/// touched a row. A skipped write always means someone already holds
/// supervisor rights, even when the snapshot still showed a plain member.
fn grant_outcome(previous: Option<MemberRole>, written: bool) -> SupervisorGrant {
    match (previous, written) {
        (None, true) => SupervisorGrant::Added,
        (Some(_), true) => SupervisorGrant::Promoted,
        (Some(MemberRole::Owner), false) => SupervisorGrant::AlreadyPrivileged(MemberRole::Owner),
        // Promoted or inserted by a concurrent request after our snapshot
        (Some(MemberRole::Member), false) | (None, false) => {
            SupervisorGrant::AlreadyPrivileged(MemberRole::Supervisor)
        }
        (Some(MemberRole::Supervisor), false) => {
            SupervisorGrant::AlreadyPrivileged(MemberRole::Supervisor)
        }
    }
}

fn demotion_outcome(previous: Option<MemberRole>, written: bool) -> Demotion {
    match (previous, written) {
        (None, _) => Demotion::NotFound,
        (Some(previous), true) => Demotion::Demoted { previous },
        (Some(MemberRole::Owner), false) => Demotion::OwnerProtected,
        // Row deleted between the snapshot and the update
        (Some(_), false) => Demotion::NotFound,
    }
}

fn user_from_row(row: &PgRow) -> Result<UserSummary, DbError> {
    Ok(UserSummary {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        avatar_url: row.try_get("avatar_url")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, DbError> {
    let raw_status: String = row.try_get("status")?;
    let raw_priority: String = row.try_get("priority")?;

    Ok(Task {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: TaskStatus::from_str(&raw_status)
            .ok_or_else(|| DbError::InvalidRow(format!("Invalid task status: {}", raw_status)))?,
        priority: TaskPriority::from_str(&raw_priority).ok_or_else(|| {
            DbError::InvalidRow(format!("Invalid task priority: {}", raw_priority))
        })?,
        assigned_to: row.try_get("assigned_to")?,
        created_by: row.try_get("created_by")?,
        due_date: row.try_get("due_date")?,
        completion_percentage: row.try_get("completion_percentage")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Escape LIKE metacharacters so user input only ever matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl NotificationRepository for PgRepository {
    async fn insert_many(&self, rows: Vec<NewNotification>) -> Result<Vec<Notification>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut user_ids = Vec::with_capacity(rows.len());
        let mut titles = Vec::with_capacity(rows.len());
        let mut contents = Vec::with_capacity(rows.len());
        let mut types = Vec::with_capacity(rows.len());
        let mut related_ids = Vec::with_capacity(rows.len());
        for row in rows {
            user_ids.push(row.user_id);
            titles.push(row.title);
            contents.push(row.content);
            types.push(row.notification_type.as_str().to_string());
            related_ids.push(row.related_id);
        }

        let query = format!(
            r#"
            INSERT INTO notifications (user_id, title, content, type, related_id, is_read)
            SELECT u, t, c, ty, r, FALSE
            FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::text[], $5::text[]) AS x(u, t, c, ty, r)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let inserted = sqlx::query(&query)
            .bind(&user_ids)
            .bind(&titles)
            .bind(&contents)
            .bind(&types)
            .bind(&related_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to insert notifications: {}", e);
                DbError::Query(e)
            })?;

        debug!("Inserted {} notification rows", inserted.len());
        inserted.iter().map(notification_from_row).collect()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: ReadFilter,
    ) -> Result<Vec<Notification>, DbError> {
        let query = format!(
            r#"
            SELECT {} FROM notifications
            WHERE user_id = $1 AND ($2::boolean IS NULL OR is_read = $2)
            ORDER BY created_at DESC
            "#,
            NOTIFICATION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(filter.is_read())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, DbError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: Uuid, filter: ReadFilter) -> Result<u64, DbError> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE user_id = $1 AND ($2::boolean IS NULL OR is_read = $2)",
        )
        .bind(user_id)
        .bind(filter.is_read())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProjectRepository for PgRepository {
    async fn project_name(&self, project_id: Uuid) -> Result<Option<String>, DbError> {
        let row = sqlx::query("SELECT name FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.try_get("name")).transpose()?)
    }

    async fn member_user_ids(&self, project_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        let rows = sqlx::query("SELECT user_id FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| row.try_get("user_id"))
            .collect::<Result<Vec<Uuid>, _>>()?)
    }

    async fn post_context(&self, post_id: Uuid) -> Result<Option<PostContext>, DbError> {
        let row = sqlx::query("SELECT user_id, project_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(PostContext {
                author_id: row.try_get("user_id")?,
                project_id: row.try_get("project_id")?,
            })),
            None => Ok(None),
        }
    }

    async fn project_tasks(&self, project_id: Uuid) -> Result<Vec<Task>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, title, description, status, priority, assigned_to,
                   created_by, due_date, completion_percentage, created_at
            FROM tasks
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }
}

#[async_trait]
impl MembershipRepository for PgRepository {
    async fn grant_supervisor(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<SupervisorGrant, DbError> {
        // Every CTE sees the same snapshot, so `existing` is the role before the write
        let row = sqlx::query(
            r#"
            WITH existing AS (
                SELECT role FROM project_members WHERE project_id = $1 AND user_id = $2
            ), written AS (
                INSERT INTO project_members (project_id, user_id, role)
                VALUES ($1, $2, 'supervisor')
                ON CONFLICT (project_id, user_id)
                DO UPDATE SET role = 'supervisor' WHERE project_members.role = 'member'
                RETURNING id
            )
            SELECT (SELECT role FROM existing) AS previous_role,
                   EXISTS (SELECT 1 FROM written) AS written
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let previous = role_from_row(&row, "previous_role")?;
        let written: bool = row.try_get("written")?;

        let grant = grant_outcome(previous, written);
        if !written && matches!(previous, None | Some(MemberRole::Member)) {
            warn!(
                "Membership for user {} in project {} changed concurrently",
                user_id, project_id
            );
        }
        Ok(grant)
    }

    async fn demote_to_member(&self, membership_id: Uuid) -> Result<Demotion, DbError> {
        let row = sqlx::query(
            r#"
            WITH target AS (
                SELECT role FROM project_members WHERE id = $1
            ), written AS (
                UPDATE project_members SET role = 'member'
                WHERE id = $1 AND role <> 'owner'
                RETURNING id
            )
            SELECT (SELECT role FROM target) AS previous_role,
                   EXISTS (SELECT 1 FROM written) AS written
            "#,
        )
        .bind(membership_id)
        .fetch_one(&self.pool)
        .await?;

        let previous = role_from_row(&row, "previous_role")?;
        let written: bool = row.try_get("written")?;

        Ok(demotion_outcome(previous, written))
    }

    async fn upsert_invitation(
        &self,
        invitation: NewInvitation,
    ) -> Result<ProjectInvitation, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO project_invitations
                (project_id, email, role, invite_code, invited_by, accepted, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7)
            ON CONFLICT (project_id, email) WHERE accepted = FALSE
            DO UPDATE SET role = EXCLUDED.role,
                          invite_code = EXCLUDED.invite_code,
                          invited_by = EXCLUDED.invited_by,
                          created_at = EXCLUDED.created_at,
                          expires_at = EXCLUDED.expires_at
            RETURNING id, project_id, email, role, invite_code, invited_by, accepted,
                      created_at, expires_at
            "#,
        )
        .bind(invitation.project_id)
        .bind(&invitation.email)
        .bind(invitation.role.as_str())
        .bind(&invitation.invite_code)
        .bind(invitation.invited_by)
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to upsert invitation for {}: {}", invitation.email, e);
            DbError::Query(e)
        })?;

        Ok(ProjectInvitation {
            id: row.try_get("id")?,
            project_id: row.try_get("project_id")?,
            email: row.try_get("email")?,
            role: role_from_row(&row, "role")?
                .ok_or_else(|| DbError::InvalidRow("Invitation without role".to_string()))?,
            invite_code: row.try_get("invite_code")?,
            invited_by: row.try_get("invited_by")?,
            accepted: row.try_get("accepted")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_users(&self, ids: Vec<Uuid>) -> Result<Vec<UserSummary>, DbError> {
        let rows = sqlx::query(
            "SELECT id, email, full_name, avatar_url FROM users WHERE id = ANY($1::uuid[])",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn search(&self, query: String, limit: i64) -> Result<Vec<UserSummary>, DbError> {
        let pattern = format!("%{}%", escape_like(&query));

        let rows = sqlx::query(
            r#"
            SELECT id, email, full_name, avatar_url FROM users
            WHERE email ILIKE $1 ESCAPE '\' OR full_name ILIKE $1 ESCAPE '\'
            ORDER BY email
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }
}

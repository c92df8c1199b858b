use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::DbError;

/// Fixed invitation lifetime
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Searches shorter than this return nothing
pub const MIN_SEARCH_LEN: usize = 2;

pub const SEARCH_LIMIT: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Supervisor,
    Member,
}

impl MemberRole {
    pub fn from_str(role: &str) -> Result<Self, String> {
        match role {
            "owner" => Ok(MemberRole::Owner),
            "supervisor" => Ok(MemberRole::Supervisor),
            "member" => Ok(MemberRole::Member),
            _ => Err(format!("Invalid member role: {}", role)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Supervisor => "supervisor",
            MemberRole::Member => "member",
        }
    }

    /// How the role is named in invitation emails
    pub fn label(&self) -> &'static str {
        match self {
            MemberRole::Owner => "مالك",
            MemberRole::Supervisor => "مشرف",
            MemberRole::Member => "عضو",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInvitation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub email: String,
    pub role: MemberRole,
    pub invite_code: String,
    pub invited_by: Uuid,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Invitation to write. If an unaccepted invitation already exists for the same
/// (project, email) pair, its code, role, inviter and expiry are overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvitation {
    pub project_id: Uuid,
    pub email: String,
    pub role: MemberRole,
    pub invite_code: String,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewInvitation {
    pub fn new(
        project_id: Uuid,
        email: &str,
        role: MemberRole,
        invite_code: String,
        invited_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            project_id,
            email: email.to_string(),
            role,
            invite_code,
            invited_by,
            created_at: now,
            expires_at: now + chrono::Duration::days(INVITATION_TTL_DAYS),
        }
    }
}

/// What a single conditional membership write did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorGrant {
    /// No membership existed; one was inserted with the supervisor role
    Added,
    /// A plain member was promoted
    Promoted,
    /// Membership already carries supervisor (or owner) rights; nothing written
    AlreadyPrivileged(MemberRole),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demotion {
    Demoted { previous: MemberRole },
    OwnerProtected,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserSummary {
    /// Full name, else email, else a generic label
    pub fn display_name(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if !self.email.is_empty() => self.email.clone(),
            _ => "مستخدم".to_string(),
        }
    }
}

/// A selectable search result: either an existing account or an address to invite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SupervisorCandidate {
    Account(UserSummary),
    Invitation { email: String },
}

impl SupervisorCandidate {
    pub fn is_invitation(&self) -> bool {
        matches!(self, SupervisorCandidate::Invitation { .. })
    }

    pub fn email(&self) -> &str {
        match self {
            SupervisorCandidate::Account(user) => &user.email,
            SupervisorCandidate::Invitation { email } => email,
        }
    }
}

/// Result of a workflow step. `success == false` with no error means a business
/// rule declined the request (e.g. the user is already a supervisor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkflowOutcome {
    pub success: bool,
    pub message: String,
}

impl WorkflowOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InviteSupervisorRequest {
    #[schema(value_type = String, format = "uuid")]
    pub project_id: Uuid,
    #[schema(value_type = Object)]
    pub selection: SupervisorCandidate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DemoteSupervisorRequest {
    #[schema(value_type = String, format = "uuid")]
    pub project_id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbError),

    #[error("Membership not found")]
    MembershipNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_role_round_trip() {
        for role in [MemberRole::Owner, MemberRole::Supervisor, MemberRole::Member] {
            assert_eq!(MemberRole::from_str(role.as_str()).unwrap(), role);
        }
        assert!(MemberRole::from_str("viewer").is_err());
    }

    #[test]
    fn test_new_invitation_expires_after_seven_days() {
        let now = Utc::now();
        let invitation = NewInvitation::new(
            Uuid::new_v4(),
            "ali@example.com",
            MemberRole::Supervisor,
            "code".to_string(),
            Uuid::new_v4(),
            now,
        );
        assert_eq!(invitation.expires_at - invitation.created_at, chrono::Duration::days(7));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut user = UserSummary {
            id: Uuid::new_v4(),
            email: "sara@example.com".to_string(),
            full_name: Some("سارة".to_string()),
            avatar_url: None,
        };
        assert_eq!(user.display_name(), "سارة");

        user.full_name = Some("  ".to_string());
        assert_eq!(user.display_name(), "sara@example.com");

        user.email.clear();
        assert_eq!(user.display_name(), "مستخدم");
    }

    #[test]
    fn test_candidate_serializes_with_kind_tag() {
        let invite = SupervisorCandidate::Invitation {
            email: "ali@example.com".to_string(),
        };
        let value = serde_json::to_value(&invite).unwrap();
        assert_eq!(value["kind"], "invitation");
        assert_eq!(value["email"], "ali@example.com");

        let parsed: SupervisorCandidate = serde_json::from_value(value).unwrap();
        assert!(parsed.is_invitation());
    }
}

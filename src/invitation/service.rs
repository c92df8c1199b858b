use crate::db::repository::{MembershipRepository, ProjectRepository, UserRepository};
use crate::email::templates::{invitation_email, notification_email};
use crate::email::EmailSender;
use crate::ids::generate_invite_code;
use crate::invitation::model::{
    Demotion, InvitationError, MemberRole, NewInvitation, SupervisorCandidate, SupervisorGrant,
    UserSummary, WorkflowOutcome, MIN_SEARCH_LEN, SEARCH_LIMIT,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid"));

const INVITE_FAILED: &str = "حدث خطأ أثناء معالجة طلب الإشراف";
const DEMOTE_FAILED: &str = "حدث خطأ أثناء إلغاء صلاحية المشرف";

pub fn looks_like_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Supervisor search, invitation and role changes.
///
/// Membership writes are single conditional statements. The follow-up email is
/// sent after the write commits; a failed send is logged and the write stands.
pub struct InvitationService {
    memberships: Arc<dyn MembershipRepository>,
    projects: Arc<dyn ProjectRepository>,
    users: Arc<dyn UserRepository>,
    email: Arc<dyn EmailSender>,
    app_url: String,
}

impl InvitationService {
    pub fn new(
        memberships: Arc<dyn MembershipRepository>,
        projects: Arc<dyn ProjectRepository>,
        users: Arc<dyn UserRepository>,
        email: Arc<dyn EmailSender>,
        app_url: String,
    ) -> Self {
        Self {
            memberships,
            projects,
            users,
            email,
            app_url,
        }
    }

    /// Add, promote or invite the selected candidate as a supervisor.
    /// Never fails; errors become a declined outcome with a display message.
    pub async fn handle_supervisor_invitation(
        &self,
        project_id: Uuid,
        selection: &SupervisorCandidate,
        actor: Uuid,
    ) -> WorkflowOutcome {
        let result = match selection {
            SupervisorCandidate::Invitation { email } => {
                self.invite_by_email(project_id, email, actor).await
            }
            SupervisorCandidate::Account(user) => self.grant(project_id, user).await,
        };

        result.unwrap_or_else(|e| {
            error!(
                "Supervisor request for {} in project {} failed: {}",
                selection.email(),
                project_id,
                e
            );
            WorkflowOutcome::declined(INVITE_FAILED)
        })
    }

    async fn invite_by_email(
        &self,
        project_id: Uuid,
        email: &str,
        actor: Uuid,
    ) -> Result<WorkflowOutcome, InvitationError> {
        let email = email.trim();
        if !looks_like_email(email) {
            return Err(InvitationError::ValidationError(format!(
                "Not an email address: {}",
                email
            )));
        }

        let invitation = NewInvitation::new(
            project_id,
            email,
            MemberRole::Supervisor,
            generate_invite_code(),
            actor,
            Utc::now(),
        );
        let stored = self.memberships.upsert_invitation(invitation).await?;
        info!(
            "Invitation {} for {} in project {} expires {}",
            stored.id, stored.email, project_id, stored.expires_at
        );

        let project_name = self.project_name(project_id).await;
        let (subject, html) = invitation_email(
            stored.role,
            &project_name,
            &stored.invite_code,
            project_id,
            &self.app_url,
        );
        self.send_email(&stored.email, &subject, &html).await;

        Ok(WorkflowOutcome::ok(format!(
            "تم إرسال دعوة للمستخدم {}",
            stored.email
        )))
    }

    async fn grant(
        &self,
        project_id: Uuid,
        user: &UserSummary,
    ) -> Result<WorkflowOutcome, InvitationError> {
        let grant = self
            .memberships
            .grant_supervisor(project_id, user.id)
            .await?;

        let (subject, body, message) = match grant {
            SupervisorGrant::Added => {
                let project_name = self.project_name(project_id).await;
                (
                    "تمت إضافتك كمشرف",
                    format!(
                        "تمت إضافتك كمشرف على المشروع \"{}\". يمكنك الآن عرض وإدارة هذا المشروع.",
                        project_name
                    ),
                    "تم إضافة المشرف بنجاح",
                )
            }
            SupervisorGrant::Promoted => {
                let project_name = self.project_name(project_id).await;
                (
                    "تمت ترقيتك إلى مشرف",
                    format!(
                        "تمت ترقيتك إلى مشرف على المشروع \"{}\". يمكنك الآن الوصول إلى جميع خصائص المشرفين.",
                        project_name
                    ),
                    "تم ترقية العضو إلى مشرف",
                )
            }
            SupervisorGrant::AlreadyPrivileged(role) => {
                info!(
                    "User {} already holds {} in project {}",
                    user.id,
                    role.as_str(),
                    project_id
                );
                return Ok(WorkflowOutcome::declined("هذا المستخدم بالفعل مشرف"));
            }
        };

        info!("{:?} supervisor {} in project {}", grant, user.id, project_id);

        let html = notification_email(subject, &body, &self.app_url);
        self.send_email(&user.email, subject, &html).await;

        Ok(WorkflowOutcome::ok(message))
    }

    /// Return a supervisor to the plain member role. Owners are never demoted.
    pub async fn demote_supervisor(
        &self,
        membership_id: Uuid,
        email: &str,
        project_id: Uuid,
    ) -> WorkflowOutcome {
        match self.demote(membership_id, email, project_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Demoting membership {} failed: {}", membership_id, e);
                WorkflowOutcome::declined(DEMOTE_FAILED)
            }
        }
    }

    async fn demote(
        &self,
        membership_id: Uuid,
        email: &str,
        project_id: Uuid,
    ) -> Result<WorkflowOutcome, InvitationError> {
        let previous = match self.memberships.demote_to_member(membership_id).await? {
            Demotion::Demoted { previous } => previous,
            Demotion::OwnerProtected => {
                warn!("Refused to demote owner membership {}", membership_id);
                return Ok(WorkflowOutcome::declined("لا يمكن إلغاء صلاحية مالك المشروع"));
            }
            Demotion::NotFound => return Err(InvitationError::MembershipNotFound),
        };

        info!(
            "Membership {} demoted from {} to member",
            membership_id,
            previous.as_str()
        );

        let project_name = self.project_name(project_id).await;
        let subject = "تم تغيير دورك في المشروع";
        let html = notification_email(
            subject,
            &format!(
                "تم تغيير دورك من مشرف إلى عضو عادي في المشروع \"{}\".",
                project_name
            ),
            &self.app_url,
        );
        self.send_email(email, subject, &html).await;

        Ok(WorkflowOutcome::ok("تم إلغاء صلاحية المشرف"))
    }

    /// Accounts matching `query`, plus an invitation entry when the query is an
    /// email address that no returned account has exactly.
    pub async fn search_potential_supervisors(&self, query: &str) -> Vec<SupervisorCandidate> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }

        let users = match self.users.search(query.to_string(), SEARCH_LIMIT).await {
            Ok(users) => users,
            Err(e) => {
                error!("User search for \"{}\" failed: {}", query, e);
                return Vec::new();
            }
        };

        let exact_match = users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(query));

        let mut candidates: Vec<SupervisorCandidate> = users
            .into_iter()
            .map(SupervisorCandidate::Account)
            .collect();

        if looks_like_email(query) && !exact_match {
            candidates.push(SupervisorCandidate::Invitation {
                email: query.to_string(),
            });
        }

        candidates
    }

    /// Project title, or a numbered placeholder when it cannot be read
    async fn project_name(&self, project_id: Uuid) -> String {
        match self.projects.project_name(project_id).await {
            Ok(Some(name)) => name,
            Ok(None) => format!("المشروع #{}", project_id),
            Err(e) => {
                warn!("Could not read name of project {}: {}", project_id, e);
                format!("المشروع #{}", project_id)
            }
        }
    }

    async fn send_email(&self, to: &str, subject: &str, html: &str) {
        if let Err(e) = self.email.send(to, subject, html).await {
            error!("Failed to send \"{}\" to {}: {}", subject, to, e);
        }
    }
}

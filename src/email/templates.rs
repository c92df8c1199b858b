//! Right-to-left HTML bodies for outbound mail. Every interpolated value is
//! HTML-escaped.

use html_escape::{encode_double_quoted_attribute, encode_text};
use uuid::Uuid;

use crate::invitation::model::{MemberRole, INVITATION_TTL_DAYS};

/// Subject and body inviting `role` into `project_name`
pub fn invitation_email(
    role: MemberRole,
    project_name: &str,
    invite_code: &str,
    project_id: Uuid,
    app_url: &str,
) -> (String, String) {
    let role_text = role.label();
    let subject = format!("دعوة للانضمام كـ {} إلى {}", role_text, project_name);

    let link = accept_link(app_url, invite_code, project_id);
    let html = format!(
        r#"<div dir="rtl" style="font-family: Arial, sans-serif;">
  <h2>دعوة للانضمام إلى مشروع</h2>
  <p>تمت دعوتك للانضمام كـ <strong>{role}</strong> إلى المشروع "{project}".</p>
  <p>لقبول الدعوة، يرجى النقر على الرابط أدناه:</p>
  <a href="{link}" style="display: inline-block; padding: 12px 20px; background-color: #4f46e5; color: white; text-decoration: none; border-radius: 5px;">قبول الدعوة</a>
  <p style="margin-top: 20px;">تنتهي صلاحية هذه الدعوة بعد {days} أيام.</p>
</div>"#,
        role = encode_text(role_text),
        project = encode_text(project_name),
        link = encode_double_quoted_attribute(&link),
        days = INVITATION_TTL_DAYS,
    );

    (subject, html)
}

/// A plain message with the subject repeated as the heading
pub fn notification_email(subject: &str, message: &str, app_url: &str) -> String {
    format!(
        r#"<div dir="rtl" style="font-family: Arial, sans-serif;">
  <h2>{subject}</h2>
  <p>{message}</p>
  <p style="margin-top: 20px;">يمكنك الوصول إلى المنصة من خلال <a href="{app_url}">هذا الرابط</a>.</p>
</div>"#,
        subject = encode_text(subject),
        message = encode_text(message),
        app_url = encode_double_quoted_attribute(app_url),
    )
}

fn accept_link(app_url: &str, invite_code: &str, project_id: Uuid) -> String {
    format!(
        "{}/accept-invitation?code={}&project={}",
        app_url.trim_end_matches('/'),
        invite_code,
        project_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_email_subject_and_link() {
        let project_id = Uuid::new_v4();
        let (subject, html) = invitation_email(
            MemberRole::Supervisor,
            "نظام التتبع",
            "lq2x-abc",
            project_id,
            "https://gradtrack.app/",
        );

        assert_eq!(subject, "دعوة للانضمام كـ مشرف إلى نظام التتبع");
        assert!(html.starts_with("<div dir=\"rtl\""));
        assert!(html.contains(&format!(
            "https://gradtrack.app/accept-invitation?code=lq2x-abc&amp;project={}",
            project_id
        )));
        assert!(html.contains("7 أيام"));
    }

    #[test]
    fn test_notification_email_escapes_content() {
        let html = notification_email("عنوان", "<script>x</script>", "https://gradtrack.app");
        assert!(html.contains("<h2>عنوان</h2>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}

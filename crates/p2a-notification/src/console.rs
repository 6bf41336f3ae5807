//! 콘솔 이메일 전송기 (개발용).
//!
//! 실제로 메일을 보내지 않고 제목과 링크를 로그로 출력합니다.

use async_trait::async_trait;
use tracing::info;

use crate::templates::EmailTemplates;
use crate::types::{EmailNotifier, NotificationResult};

/// 로그 출력 전용 전송기.
pub struct ConsoleNotifier {
    templates: EmailTemplates,
}

impl ConsoleNotifier {
    pub fn new(templates: EmailTemplates) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl EmailNotifier for ConsoleNotifier {
    async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> NotificationResult<()> {
        let email = self.templates.verification(name, token);
        info!(
            to = %to,
            subject = %email.subject,
            link = email.link.as_deref().unwrap_or_default(),
            "[console mail] verification"
        );
        Ok(())
    }

    async fn send_welcome_email(&self, to: &str, name: &str) -> NotificationResult<()> {
        let email = self.templates.welcome(name);
        info!(to = %to, subject = %email.subject, "[console mail] welcome");
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> NotificationResult<()> {
        let email = self.templates.password_reset(name, token);
        info!(
            to = %to,
            subject = %email.subject,
            link = email.link.as_deref().unwrap_or_default(),
            "[console mail] password reset"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_notifier_never_fails() {
        let notifier = ConsoleNotifier::new(EmailTemplates::new(
            "P2A",
            "http://localhost/verify",
            "http://localhost",
        ));
        assert!(notifier
            .send_verification_email("a@x.com", "Alice", "tok")
            .await
            .is_ok());
        assert!(notifier.send_welcome_email("a@x.com", "Alice").await.is_ok());
        assert!(notifier
            .send_password_reset_email("a@x.com", "Alice", "tok")
            .await
            .is_ok());
        assert_eq!(notifier.name(), "console");
    }
}

//! SMTP 이메일 전송기.
//!
//! lettre의 비동기 SMTP 전송을 사용합니다. 465 포트는 암묵적 TLS,
//! 그 외 포트는 STARTTLS로 연결합니다.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use p2a_core::config::MailConfig;
use secrecy::ExposeSecret;
use tracing::{debug, error, info};

use crate::templates::{EmailTemplates, RenderedEmail};
use crate::types::{EmailNotifier, NotificationError, NotificationResult};

/// SMTP 이메일 전송기.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    templates: EmailTemplates,
}

impl SmtpNotifier {
    /// 메일 설정으로 전송기를 생성합니다.
    ///
    /// 연결은 첫 발송 시점에 맺어집니다.
    pub fn new(config: &MailConfig, templates: EmailTemplates) -> NotificationResult<Self> {
        if config.host.is_empty() {
            return Err(NotificationError::InvalidConfig(
                "SMTP host is not configured".to_string(),
            ));
        }

        let builder = if config.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let mut builder = builder.port(config.port);
        if let Some(password) = &config.password {
            builder = builder.credentials(Credentials::new(
                config.user.clone(),
                password.expose_secret().to_string(),
            ));
        }

        let from = Mailbox::new(Some(config.from_name.clone()), config.from_email.parse()?);

        info!(
            host = %config.host,
            port = config.port,
            implicit_tls = config.implicit_tls(),
            "SMTP notifier initialized"
        );

        Ok(Self {
            transport: builder.build(),
            from,
            templates,
        })
    }

    /// 렌더링된 메일을 발송합니다.
    async fn deliver(&self, to: &str, name: &str, email: RenderedEmail) -> NotificationResult<()> {
        let recipient = Mailbox::new(Some(name.to_string()), to.parse()?);

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html)?;

        match self.transport.send(message).await {
            Ok(response) => {
                debug!(code = %response.code(), subject = %email.subject, "SMTP accepted message");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, subject = %email.subject, "SMTP delivery failed");
                Err(NotificationError::Smtp(e))
            }
        }
    }
}

#[async_trait]
impl EmailNotifier for SmtpNotifier {
    async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> NotificationResult<()> {
        self.deliver(to, name, self.templates.verification(name, token))
            .await?;
        info!("Verification email sent");
        Ok(())
    }

    async fn send_welcome_email(&self, to: &str, name: &str) -> NotificationResult<()> {
        self.deliver(to, name, self.templates.welcome(name)).await?;
        info!("Welcome email sent");
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> NotificationResult<()> {
        self.deliver(to, name, self.templates.password_reset(name, token))
            .await?;
        info!("Password reset email sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

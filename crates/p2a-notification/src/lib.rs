//! # P2A Notification
//!
//! 트랜잭션 이메일 발송 서비스.
//!
//! 지원 메일:
//! - 이메일 인증 (`?token=` 링크 포함)
//! - 가입 환영
//! - 비밀번호 재설정
//!
//! 전송 방식:
//! - [`SmtpNotifier`]: lettre 기반 SMTP 전송
//! - [`ConsoleNotifier`]: 발송 없이 링크를 로그로 출력 (개발용)

pub mod console;
pub mod smtp;
pub mod templates;
pub mod types;

pub use console::*;
pub use smtp::*;
pub use templates::*;
pub use types::*;

use std::sync::Arc;

use p2a_core::config::{AppInfoConfig, MailConfig, MailTransport};

/// 설정에 맞는 이메일 전송기를 생성합니다.
pub fn notifier_from_config(
    mail: &MailConfig,
    app: &AppInfoConfig,
) -> NotificationResult<Arc<dyn EmailNotifier>> {
    let templates = EmailTemplates::from_config(mail, app);
    let notifier: Arc<dyn EmailNotifier> = match mail.transport {
        MailTransport::Smtp => Arc::new(SmtpNotifier::new(mail, templates)?),
        MailTransport::Console => Arc::new(ConsoleNotifier::new(templates)),
    };
    tracing::info!(notifier = notifier.name(), "Email notifier configured");
    Ok(notifier)
}

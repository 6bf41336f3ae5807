//! 이메일 전송기 trait 및 에러 정의.

use async_trait::async_trait;

/// 알림 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("메일 전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("잘못된 이메일 주소: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    #[error("메시지 생성 실패: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP 에러: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// 이메일 전송기 trait.
///
/// 인증 서비스는 이 trait에만 의존하며, 구현체는 실행 시 주입됩니다.
#[async_trait]
pub trait EmailNotifier: Send + Sync {
    /// 이메일 인증 링크(`{verification_url}?token={token}`)를 발송합니다.
    async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> NotificationResult<()>;

    /// 가입 환영 메일을 발송합니다.
    async fn send_welcome_email(&self, to: &str, name: &str) -> NotificationResult<()>;

    /// 비밀번호 재설정 링크(`{app_url}/auth/reset-password?token={token}`)를 발송합니다.
    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> NotificationResult<()>;

    /// 전송기 이름.
    fn name(&self) -> &str;
}

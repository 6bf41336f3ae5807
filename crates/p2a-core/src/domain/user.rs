//! 사용자(계정) 엔티티.
//!
//! `User`는 이메일 하나당 하나만 존재하는 신원 앵커입니다.
//! 비밀번호 해시는 이 구조체 밖으로 직렬화되지 않으며,
//! 외부로 노출할 때는 항상 [`UserView`]를 사용합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 이메일을 정규화합니다 (앞뒤 공백 제거 + 소문자).
///
/// 모든 이메일 조회와 유일성 검사는 정규화된 값을 기준으로 합니다.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 사용자 계정.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// 정규화된 이메일 (소문자)
    pub email: String,
    /// PHC 형식 비밀번호 해시
    pub password_hash: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 새 사용자 생성 (활성, 이메일 미인증 상태).
    pub fn new(email: &str, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: password_hash.into(),
            is_active: true,
            is_email_verified: false,
            email_verified_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 이메일 인증 완료 처리.
    pub fn mark_email_verified(&mut self, at: DateTime<Utc>) {
        self.is_email_verified = true;
        self.email_verified_at = Some(at);
        self.updated_at = at;
    }

    /// 비밀번호 해시를 제외한 외부 노출용 뷰.
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            is_active: self.is_active,
            is_email_verified: self.is_email_verified,
            email_verified_at: self.email_verified_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .field("is_email_verified", &self.is_email_verified)
            .field("email_verified_at", &self.email_verified_at)
            .field("last_login_at", &self.last_login_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// 비밀번호 해시가 없는 사용자 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("  Alice@Example.COM ", "$argon2id$hash");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
        assert!(!user.is_email_verified);
        assert!(user.email_verified_at.is_none());
        assert!(user.last_login_at.is_none());
    }

    #[test]
    fn test_view_never_contains_hash() {
        let user = User::new("a@x.com", "$argon2id$secret-hash");
        let json = serde_json::to_string(&user.view()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
        assert!(json.contains(r#""isEmailVerified":false"#));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let user = User::new("a@x.com", "$argon2id$secret-hash");
        let debug = format!("{:?}", user);
        assert!(!debug.contains("secret-hash"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_mark_email_verified() {
        let mut user = User::new("a@x.com", "h");
        let now = Utc::now();
        user.mark_email_verified(now);
        assert!(user.is_email_verified);
        assert_eq!(user.email_verified_at, Some(now));
    }

    proptest! {
        #[test]
        fn normalize_email_is_idempotent(email in "[A-Za-z0-9._ ]{1,20}@[A-Za-z]{1,10}\\.[A-Za-z]{2,4}") {
            let once = normalize_email(&email);
            prop_assert_eq!(normalize_email(&once), once.clone());
            prop_assert_eq!(once.to_lowercase(), once);
        }
    }
}

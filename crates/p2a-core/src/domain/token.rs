//! 상태를 가지는 토큰 레코드.
//!
//! - [`RefreshToken`]: 장기 세션 자격증명. 폐기 가능.
//! - [`EmailVerificationToken`]: 1회용, 기한이 있는 이메일 소유 증명.
//!
//! 토큰 값은 UUID v4 (122비트 엔트로피) 로 생성됩니다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// 추측 불가능한 토큰 값을 생성합니다.
pub fn generate_token_value() -> String {
    Uuid::new_v4().to_string()
}

/// 이메일 인증 토큰 상태.
///
/// `Pending`에서만 전이가 일어나며, 나머지는 최종 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailVerificationStatus {
    /// 발급됨, 아직 사용되지 않음
    Pending,
    /// 인증 완료
    Verified,
    /// 기한 만료 또는 새 토큰으로 대체됨
    Expired,
    /// 이미 사용됨
    Used,
}

impl EmailVerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailVerificationStatus::Pending => "pending",
            EmailVerificationStatus::Verified => "verified",
            EmailVerificationStatus::Expired => "expired",
            EmailVerificationStatus::Used => "used",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EmailVerificationStatus::Pending),
            "verified" => Some(EmailVerificationStatus::Verified),
            "expired" => Some(EmailVerificationStatus::Expired),
            "used" => Some(EmailVerificationStatus::Used),
            _ => None,
        }
    }

    /// 최종 상태인지 확인합니다.
    pub fn is_final(&self) -> bool {
        !matches!(self, EmailVerificationStatus::Pending)
    }
}

impl std::fmt::Display for EmailVerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이메일 인증 토큰.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub status: EmailVerificationStatus,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 만료 시각 계산. 표현 범위를 넘으면 최대 시각으로 고정합니다.
fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl EmailVerificationToken {
    /// 새 pending 토큰 생성.
    pub fn issue(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token: generate_token_value(),
            status: EmailVerificationStatus::Pending,
            expires_at: expiry_from(now, ttl),
            verified_at: None,
            created_at: now,
        }
    }

    /// 주어진 시각 기준 만료 여부 (`now > expires_at`).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// 유효 = pending 상태이며 만료되지 않음.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == EmailVerificationStatus::Pending && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// 리프레시 토큰 발급 시 함께 저장하는 세션 메타데이터.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    /// 로그인 시 선택된 역할 (리프레시 시 재사용)
    pub role: Option<Role>,
}

/// 리프레시 토큰.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub role: Option<Role>,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// 새 리프레시 토큰 생성.
    pub fn issue(user_id: Uuid, ttl: Duration, metadata: SessionMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token: generate_token_value(),
            role: metadata.role,
            expires_at: expiry_from(now, ttl),
            is_revoked: false,
            revoked_at: None,
            user_agent: metadata.user_agent,
            ip_address: metadata.ip_address,
            created_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 유효 = 폐기되지 않았으며 만료되지 않음.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// 폐기 처리. 이미 폐기된 경우 최초 폐기 시각을 유지합니다.
    pub fn revoke(&mut self, at: DateTime<Utc>) {
        if !self.is_revoked {
            self.is_revoked = true;
            self.revoked_at = Some(at);
        }
    }
}

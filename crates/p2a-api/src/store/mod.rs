//! 자격증명/토큰 저장소 추상화.
//!
//! 인증 서비스는 [`AuthStore`] trait 객체에만 의존합니다.
//!
//! - [`PgAuthStore`](crate::repository::PgAuthStore): PostgreSQL (운영)
//! - [`MemoryAuthStore`]: 단일 뮤텍스로 직렬화되는 인메모리 구현 (개발/테스트)
//!
//! 복합 쓰기(사용자+프로필 생성, 기존 pending 토큰 만료+새 토큰 발급,
//! 토큰 인증+사용자 인증)는 각 구현에서 하나의 원자적 단위로 수행됩니다.

mod memory;

pub use memory::MemoryAuthStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use p2a_core::{
    AuthError, ConflictCode, EmailVerificationToken, Profile, ProfileFields, RefreshToken, Role,
    SessionMetadata, User,
};
use thiserror::Error;
use uuid::Uuid;

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 대상 레코드 없음 (또는 기대한 상태가 아님)
    #[error("레코드를 찾을 수 없음: {0}")]
    NotFound(&'static str),

    /// 유일성 제약 위반
    #[error("유일성 제약 위반: {0}")]
    Conflict(String),

    /// 저장된 값 해석 실패
    #[error("잘못된 저장 데이터: {0}")]
    Corrupt(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

/// PostgreSQL unique_violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row"),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(resource) => AuthError::NotFound(resource),
            StoreError::Conflict(_) => AuthError::Conflict(ConflictCode::EmailRoleExists),
            StoreError::Corrupt(_) | StoreError::Database(_) => AuthError::internal(err),
        }
    }
}

/// 저장소 작업 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

/// 사용자/프로필 저장소.
///
/// 이메일 인자는 구현 내부에서 정규화됩니다.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    /// 사용자를 생성합니다 (활성, 미인증). 이메일 중복 시 `Conflict`.
    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User>;

    /// 사용자와 첫 프로필을 하나의 트랜잭션으로 생성합니다.
    async fn create_user_with_profile(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<(User, Profile)>;

    /// 활성 사용자의 마지막 로그인 시각을 기록하고 갱신된 사용자를 반환합니다.
    ///
    /// 사용자가 없거나 비활성이면 `NotFound`를 반환하며 아무것도 바꾸지 않습니다.
    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<User>;

    /// 활성 상태를 설정하고 갱신된 사용자를 반환합니다.
    async fn set_user_active(&self, user_id: Uuid, active: bool) -> StoreResult<User>;

    /// 비밀번호 해시만 교체합니다.
    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()>;

    async fn find_profile(&self, user_id: Uuid, role: Role) -> StoreResult<Option<Profile>>;

    /// 생성 순서(오래된 것 먼저)로 프로필 목록을 반환합니다.
    async fn list_profiles(&self, user_id: Uuid) -> StoreResult<Vec<Profile>>;

    /// 프로필을 생성합니다. `(user_id, role)` 중복 시 `Conflict`.
    async fn create_profile(
        &self,
        user_id: Uuid,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<Profile>;

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()>;

    /// 최신 가입 순으로 사용자 목록을 반환합니다.
    async fn list_users(&self, offset: i64, limit: i64) -> StoreResult<Vec<User>>;

    async fn count_users(&self) -> StoreResult<i64>;
}

/// 리프레시/이메일 인증 토큰 저장소.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create_refresh_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
        metadata: SessionMetadata,
    ) -> StoreResult<RefreshToken>;

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>>;

    /// 토큰을 폐기합니다. 토큰이 존재했는지 여부를 반환합니다.
    async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool>;

    /// 사용자의 모든 유효 토큰을 폐기하고 폐기한 개수를 반환합니다.
    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64>;

    /// 기존 pending 토큰을 만료시키고 새 토큰을 발급합니다 (원자적).
    async fn create_email_verification_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> StoreResult<EmailVerificationToken>;

    async fn find_email_verification_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<EmailVerificationToken>>;

    /// 사용자의 pending 토큰을 모두 만료시킵니다.
    async fn expire_pending_tokens(&self, user_id: Uuid) -> StoreResult<u64>;

    /// pending 토큰을 verified로 전이하고 소유 사용자를 인증 처리합니다 (원자적).
    ///
    /// 토큰이 pending 상태가 아니면 `NotFound`를 반환하며 아무것도 바꾸지 않습니다.
    async fn mark_verified(&self, token: &str) -> StoreResult<User>;

    /// pending 토큰을 expired로 전이합니다.
    async fn mark_expired(&self, token: &str) -> StoreResult<()>;
}

/// 인증 서비스가 사용하는 전체 저장소.
pub trait AuthStore: CredentialStore + TokenStore {}

impl<T: CredentialStore + TokenStore + ?Sized> AuthStore for T {}

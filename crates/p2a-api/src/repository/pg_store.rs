//! PostgreSQL 기반 [`AuthStore`](crate::store::AuthStore) 구현.
//!
//! 개별 Repository를 조합하며, 복합 쓰기는 하나의 트랜잭션으로 묶습니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use p2a_core::{
    normalize_email, EmailVerificationToken, Profile, ProfileFields, RefreshToken, Role,
    SessionMetadata, User,
};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    EmailVerificationRepository, ProfileRepository, RefreshTokenRepository, UserRepository,
};
use crate::store::{CredentialStore, StoreError, StoreResult, TokenStore};

/// PostgreSQL 인증 저장소.
#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_profiles(records: Vec<super::ProfileRecord>) -> StoreResult<Vec<Profile>> {
    records.into_iter().map(Profile::try_from).collect()
}

#[async_trait]
impl CredentialStore for PgAuthStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let record = UserRepository::find_by_email(&self.pool, &normalize_email(email)).await?;
        Ok(record.map(User::from))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let record = UserRepository::find_by_id(&self.pool, user_id).await?;
        Ok(record.map(User::from))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        let user = User::new(email, password_hash);
        let record = UserRepository::insert(&self.pool, &user).await?;
        Ok(record.into())
    }

    async fn create_user_with_profile(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<(User, Profile)> {
        let user = User::new(email, password_hash);
        let profile = Profile::new(user.id, role, full_name, fields);

        let mut tx = self.pool.begin().await?;
        let user_record = UserRepository::insert(&mut *tx, &user).await?;
        let profile_record = ProfileRepository::insert(&mut *tx, &profile).await?;
        tx.commit().await?;

        Ok((user_record.into(), profile_record.try_into()?))
    }

    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<User> {
        UserRepository::touch_last_login(&self.pool, user_id, at)
            .await?
            .map(User::from)
            .ok_or(StoreError::NotFound("active user"))
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> StoreResult<User> {
        UserRepository::set_active(&self.pool, user_id, active)
            .await?
            .map(User::from)
            .ok_or(StoreError::NotFound("user"))
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        if UserRepository::update_password_hash(&self.pool, user_id, password_hash).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound("user"))
        }
    }

    async fn find_profile(&self, user_id: Uuid, role: Role) -> StoreResult<Option<Profile>> {
        ProfileRepository::find(&self.pool, user_id, role)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn list_profiles(&self, user_id: Uuid) -> StoreResult<Vec<Profile>> {
        into_profiles(ProfileRepository::list_by_user(&self.pool, user_id).await?)
    }

    async fn create_profile(
        &self,
        user_id: Uuid,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<Profile> {
        let profile = Profile::new(user_id, role, full_name, fields);
        ProfileRepository::insert(&self.pool, &profile)
            .await?
            .try_into()
    }

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()> {
        if ProfileRepository::update(&self.pool, profile).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound("profile"))
        }
    }

    async fn list_users(&self, offset: i64, limit: i64) -> StoreResult<Vec<User>> {
        let records = UserRepository::list(&self.pool, offset, limit).await?;
        Ok(records.into_iter().map(User::from).collect())
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(UserRepository::count(&self.pool).await?)
    }
}

#[async_trait]
impl TokenStore for PgAuthStore {
    async fn create_refresh_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
        metadata: SessionMetadata,
    ) -> StoreResult<RefreshToken> {
        let token = RefreshToken::issue(user_id, ttl, metadata);
        RefreshTokenRepository::insert(&self.pool, &token)
            .await?
            .try_into()
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        RefreshTokenRepository::find_by_token(&self.pool, token)
            .await?
            .map(RefreshToken::try_from)
            .transpose()
    }

    async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool> {
        Ok(RefreshTokenRepository::revoke(&self.pool, token).await?)
    }

    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(RefreshTokenRepository::revoke_all_for_user(&self.pool, user_id).await?)
    }

    async fn create_email_verification_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> StoreResult<EmailVerificationToken> {
        let token = EmailVerificationToken::issue(user_id, ttl);

        let mut tx = self.pool.begin().await?;
        let expired = EmailVerificationRepository::expire_pending_for_user(&mut *tx, user_id).await?;
        let record = EmailVerificationRepository::insert(&mut *tx, &token).await?;
        tx.commit().await?;

        debug!(user_id = %user_id, superseded = expired, "Email verification token issued");
        record.try_into()
    }

    async fn find_email_verification_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<EmailVerificationToken>> {
        EmailVerificationRepository::find_by_token(&self.pool, token)
            .await?
            .map(EmailVerificationToken::try_from)
            .transpose()
    }

    async fn expire_pending_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(EmailVerificationRepository::expire_pending_for_user(&self.pool, user_id).await?)
    }

    async fn mark_verified(&self, token: &str) -> StoreResult<User> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let record = EmailVerificationRepository::mark_verified(&mut *tx, token, now)
            .await?
            .ok_or(StoreError::NotFound("pending email verification token"))?;
        let user = UserRepository::mark_email_verified(&mut *tx, record.user_id, now)
            .await?
            .ok_or(StoreError::NotFound("user"))?;
        tx.commit().await?;

        Ok(user.into())
    }

    async fn mark_expired(&self, token: &str) -> StoreResult<()> {
        if EmailVerificationRepository::mark_expired(&self.pool, token).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound("email verification token"))
        }
    }
}

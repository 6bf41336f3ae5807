//! 인메모리 인증 저장소.
//!
//! 모든 작업은 하나의 뮤텍스 아래에서 실행되므로 복합 쓰기도 원자적이며,
//! PostgreSQL 스키마와 동일한 유일성 규칙(이메일, `(user_id, role)`, 토큰 값)을 적용합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use p2a_core::{
    normalize_email, EmailVerificationStatus, EmailVerificationToken, Profile, ProfileFields,
    RefreshToken, Role, SessionMetadata, User,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CredentialStore, StoreError, StoreResult, TokenStore};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    /// 정규화 이메일 → 사용자 ID
    emails: HashMap<String, Uuid>,
    /// 사용자 ID → 프로필 (생성 순)
    profiles: HashMap<Uuid, Vec<Profile>>,
    refresh_tokens: HashMap<String, RefreshToken>,
    email_tokens: HashMap<String, EmailVerificationToken>,
}

impl Inner {
    fn insert_user(&mut self, email: &str, password_hash: &str) -> StoreResult<User> {
        let user = User::new(email, password_hash);
        if self.emails.contains_key(&user.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }
        self.emails.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn insert_profile(
        &mut self,
        user_id: Uuid,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<Profile> {
        if !self.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }
        let profiles = self.profiles.entry(user_id).or_default();
        if profiles.iter().any(|p| p.role == role) {
            return Err(StoreError::Conflict("profiles_user_id_role_key".to_string()));
        }
        let profile = Profile::new(user_id, role, full_name, fields);
        profiles.push(profile.clone());
        Ok(profile)
    }

    fn expire_pending(&mut self, user_id: Uuid) -> u64 {
        let mut count = 0;
        for token in self.email_tokens.values_mut() {
            if token.user_id == user_id && token.status == EmailVerificationStatus::Pending {
                token.status = EmailVerificationStatus::Expired;
                count += 1;
            }
        }
        count
    }
}

/// 인메모리 [`AuthStore`](super::AuthStore) 구현.
#[derive(Default)]
pub struct MemoryAuthStore {
    inner: Mutex<Inner>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryAuthStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .emails
            .get(&normalize_email(email))
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.lock().await.users.get(&user_id).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        self.inner.lock().await.insert_user(email, password_hash)
    }

    async fn create_user_with_profile(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<(User, Profile)> {
        let mut inner = self.inner.lock().await;
        let user = inner.insert_user(email, password_hash)?;
        let profile = inner.insert_profile(user.id, role, full_name, fields)?;
        Ok((user, profile))
    }

    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<User> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .filter(|u| u.is_active)
            .ok_or(StoreError::NotFound("active user"))?;
        user.last_login_at = Some(at);
        Ok(user.clone())
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> StoreResult<User> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound("user"))?;
        user.is_active = active;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound("user"))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn find_profile(&self, user_id: Uuid, role: Role) -> StoreResult<Option<Profile>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .profiles
            .get(&user_id)
            .and_then(|profiles| profiles.iter().find(|p| p.role == role))
            .cloned())
    }

    async fn list_profiles(&self, user_id: Uuid) -> StoreResult<Vec<Profile>> {
        let inner = self.inner.lock().await;
        Ok(inner.profiles.get(&user_id).cloned().unwrap_or_default())
    }

    async fn create_profile(
        &self,
        user_id: Uuid,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<Profile> {
        self.inner
            .lock()
            .await
            .insert_profile(user_id, role, full_name, fields)
    }

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let existing = inner
            .profiles
            .get_mut(&profile.user_id)
            .and_then(|profiles| profiles.iter_mut().find(|p| p.id == profile.id))
            .ok_or(StoreError::NotFound("profile"))?;
        *existing = profile.clone();
        Ok(())
    }

    async fn list_users(&self, offset: i64, limit: i64) -> StoreResult<Vec<User>> {
        let inner = self.inner.lock().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.inner.lock().await.users.len() as i64)
    }
}

#[async_trait]
impl TokenStore for MemoryAuthStore {
    async fn create_refresh_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
        metadata: SessionMetadata,
    ) -> StoreResult<RefreshToken> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }
        let token = RefreshToken::issue(user_id, ttl, metadata);
        inner
            .refresh_tokens
            .insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(self.inner.lock().await.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.refresh_tokens.get_mut(token) {
            Some(record) => {
                record.revoke(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let mut count = 0;
        for record in inner.refresh_tokens.values_mut() {
            if record.user_id == user_id && !record.is_revoked {
                record.revoke(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn create_email_verification_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> StoreResult<EmailVerificationToken> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }
        inner.expire_pending(user_id);
        let token = EmailVerificationToken::issue(user_id, ttl);
        inner.email_tokens.insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn find_email_verification_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<EmailVerificationToken>> {
        Ok(self.inner.lock().await.email_tokens.get(token).cloned())
    }

    async fn expire_pending_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(self.inner.lock().await.expire_pending(user_id))
    }

    async fn mark_verified(&self, token: &str) -> StoreResult<User> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let record = inner
            .email_tokens
            .get_mut(token)
            .filter(|t| t.status == EmailVerificationStatus::Pending)
            .ok_or(StoreError::NotFound("pending email verification token"))?;
        let user_id = record.user_id;

        // 사용자를 먼저 확인해 부분 갱신을 방지
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }

        if let Some(record) = inner.email_tokens.get_mut(token) {
            record.status = EmailVerificationStatus::Verified;
            record.verified_at = Some(now);
        }
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound("user"))?;
        user.mark_email_verified(now);
        Ok(user.clone())
    }

    async fn mark_expired(&self, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .email_tokens
            .get_mut(token)
            .ok_or(StoreError::NotFound("email verification token"))?;
        if record.status == EmailVerificationStatus::Pending {
            record.status = EmailVerificationStatus::Expired;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_email_uniqueness_is_case_insensitive() {
        let store = MemoryAuthStore::new();
        store.create_user("Alice@X.com", "h").await.unwrap();
        let err = store.create_user("alice@x.com ", "h").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.find_user_by_email("ALICE@x.COM").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_profile_role_uniqueness() {
        let store = MemoryAuthStore::new();
        let (user, _) = store
            .create_user_with_profile("a@x.com", "h", Role::Student, "Alice", ProfileFields::default())
            .await
            .unwrap();
        let err = store
            .create_profile(user.id, Role::Student, "Alice 2", ProfileFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store
            .create_profile(user.id, Role::Company, "Alice Co", ProfileFields::default())
            .await
            .unwrap();
        let roles: Vec<Role> = store
            .list_profiles(user.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.role)
            .collect();
        assert_eq!(roles, vec![Role::Student, Role::Company]);
    }

    #[tokio::test]
    async fn test_new_verification_token_supersedes_pending() {
        let store = MemoryAuthStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();
        let first = store
            .create_email_verification_token(user.id, Duration::hours(24))
            .await
            .unwrap();
        let second = store
            .create_email_verification_token(user.id, Duration::hours(24))
            .await
            .unwrap();

        let first = store
            .find_email_verification_token(&first.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, EmailVerificationStatus::Expired);
        assert_eq!(second.status, EmailVerificationStatus::Pending);
    }

    #[tokio::test]
    async fn test_mark_verified_only_from_pending() {
        let store = MemoryAuthStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();
        let token = store
            .create_email_verification_token(user.id, Duration::hours(24))
            .await
            .unwrap();

        let verified = store.mark_verified(&token.token).await.unwrap();
        assert!(verified.is_email_verified);
        assert!(verified.email_verified_at.is_some());

        let again = store.mark_verified(&token.token).await;
        assert!(matches!(again, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_touch_last_login_keeps_concurrent_changes() {
        let store = MemoryAuthStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();
        let token = store
            .create_email_verification_token(user.id, Duration::hours(24))
            .await
            .unwrap();
        store.mark_verified(&token.token).await.unwrap();

        let touched = store.touch_last_login(user.id, Utc::now()).await.unwrap();
        assert!(touched.last_login_at.is_some());
        assert!(touched.is_email_verified);

        store.set_user_active(user.id, false).await.unwrap();
        let locked = store.touch_last_login(user.id, Utc::now()).await;
        assert!(matches!(locked, Err(StoreError::NotFound(_))));

        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(stored.is_email_verified);
    }

    #[tokio::test]
    async fn test_update_password_hash_only_touches_hash() {
        let store = MemoryAuthStore::new();
        let user = store.create_user("a@x.com", "old").await.unwrap();
        store.set_user_active(user.id, false).await.unwrap();

        store.update_password_hash(user.id, "new").await.unwrap();
        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new");
        assert!(!stored.is_active);

        let missing = store.update_password_hash(Uuid::new_v4(), "x").await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_revoke_all_refresh_tokens() {
        let store = MemoryAuthStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap();
        for _ in 0..3 {
            store
                .create_refresh_token(user.id, Duration::days(30), SessionMetadata::default())
                .await
                .unwrap();
        }
        assert_eq!(store.revoke_all_refresh_tokens(user.id).await.unwrap(), 3);
        assert_eq!(store.revoke_all_refresh_tokens(user.id).await.unwrap(), 0);
        assert!(!store.revoke_refresh_token("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_users_paginates() {
        let store = MemoryAuthStore::new();
        for i in 0..5 {
            store.create_user(&format!("u{}@x.com", i), "h").await.unwrap();
        }
        assert_eq!(store.count_users().await.unwrap(), 5);
        assert_eq!(store.list_users(0, 2).await.unwrap().len(), 2);
        assert_eq!(store.list_users(4, 2).await.unwrap().len(), 1);
        assert!(store.list_users(10, 2).await.unwrap().is_empty());
    }
}

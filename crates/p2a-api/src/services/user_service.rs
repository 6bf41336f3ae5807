//! 사용자 계정 서비스.
//!
//! 내 정보 조회/수정, 비밀번호 변경, 관리자용 사용자 목록 및 활성화 관리.

use std::sync::Arc;

use p2a_core::{
    AuthError, AuthResult, Profile, ProfileUpdate, Role, UnauthorizedCode, User, UserView,
    ValidationCode,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{validate_password_strength, PasswordHasher};
use crate::services::auth_service::password_matches;
use crate::store::{AuthStore, StoreError};

/// 페이지당 기본 항목 수.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
/// 페이지당 최대 항목 수.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// 사용자 + 프로필 목록.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithProfiles {
    #[serde(flatten)]
    pub user: UserView,
    pub profiles: Vec<Profile>,
}

/// 페이지 정보.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// 사용자 목록 페이지.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<UserWithProfiles>,
    pub pagination: Pagination,
}

/// 사용자 서비스.
pub struct UserService {
    store: Arc<dyn AuthStore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn AuthStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    async fn load_user(&self, user_id: Uuid) -> AuthResult<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("User"))
    }

    async fn with_profiles(&self, user: &User) -> AuthResult<UserWithProfiles> {
        Ok(UserWithProfiles {
            user: user.view(),
            profiles: self.store.list_profiles(user.id).await?,
        })
    }

    /// 내 정보 (모든 프로필 포함).
    pub async fn get_me(&self, user_id: Uuid) -> AuthResult<UserWithProfiles> {
        let user = self.load_user(user_id).await?;
        self.with_profiles(&user).await
    }

    /// 사용자 조회.
    pub async fn get_user(&self, user_id: Uuid) -> AuthResult<UserWithProfiles> {
        self.get_me(user_id).await
    }

    /// 현재 역할의 프로필 수정. 값이 주어진 필드만 변경됩니다.
    #[instrument(skip_all, fields(user_id = %user_id, role = %role))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        role: Role,
        changes: ProfileUpdate,
    ) -> AuthResult<Profile> {
        let mut profile = self
            .store
            .find_profile(user_id, role)
            .await?
            .ok_or(AuthError::NotFound("Profile"))?;

        profile.apply(changes);
        self.store.save_profile(&profile).await?;

        info!("Profile updated");
        Ok(profile)
    }

    /// 비밀번호 변경. 성공 시 모든 리프레시 토큰이 폐기됩니다.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let user = self.load_user(user_id).await?;

        if !password_matches(&self.hasher, current_password, &user.password_hash)? {
            warn!("Current password mismatch");
            return Err(AuthError::Unauthorized(UnauthorizedCode::InvalidPassword));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(ValidationCode::SamePassword));
        }

        if validate_password_strength(new_password).is_err() {
            return Err(AuthError::Validation(ValidationCode::WeakPassword));
        }

        let password_hash = self.hasher.hash(new_password).map_err(AuthError::internal)?;
        self.store.update_password_hash(user.id, &password_hash).await?;

        let revoked = self.store.revoke_all_refresh_tokens(user_id).await?;
        info!(revoked_sessions = revoked, "Password changed");
        Ok(())
    }

    /// 사용자 목록 (최신 가입 순). `page`는 1부터 시작합니다.
    pub async fn list_users(&self, page: i64, limit: i64) -> AuthResult<UserPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let total = self.store.count_users().await?;
        let users = self.store.list_users((page - 1) * limit, limit).await?;

        let mut items = Vec::with_capacity(users.len());
        for user in &users {
            items.push(self.with_profiles(user).await?);
        }

        Ok(UserPage {
            users: items,
            pagination: Pagination::new(total, page, limit),
        })
    }

    /// 계정 활성화/비활성화. 비활성화 시 모든 리프레시 토큰이 폐기됩니다.
    #[instrument(skip_all, fields(user_id = %user_id, active = active))]
    pub async fn set_active(&self, user_id: Uuid, active: bool) -> AuthResult<UserView> {
        let user = self
            .store
            .set_user_active(user_id, active)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => AuthError::NotFound("User"),
                e => e.into(),
            })?;

        if !active {
            let revoked = self.store.revoke_all_refresh_tokens(user_id).await?;
            info!(revoked_sessions = revoked, "User deactivated");
        } else {
            info!("User activated");
        }

        Ok(user.view())
    }
}

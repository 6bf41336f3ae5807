//! 인증 오케스트레이터.
//!
//! 가입, 로그인, 이메일 인증, 인증 메일 재발송, 토큰 갱신, 로그아웃,
//! 역할 전환을 담당합니다. 저장소와 메일 전송기는 trait 객체로 주입됩니다.
//!
//! # 상태 전이
//!
//! ```text
//! EmailVerificationToken: pending ──verify──▶ verified
//!                            │
//!                            ├──만료 확인 / 새 토큰 발급──▶ expired
//! RefreshToken: active ──logout / 비밀번호 변경 / 비활성화──▶ revoked
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use p2a_core::{
    normalize_email, AuthError, AuthResult, ConflictCode, EmailVerificationStatus, Profile,
    ProfileFields, ProfileSummary, Role, SessionMetadata, UnauthorizedCode, User, UserView,
    ValidationCode,
};
use p2a_notification::EmailNotifier;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    validate_password_strength, AccessToken, JwtError, JwtIssuer, PasswordError, PasswordHasher,
    TokenPair,
};
use crate::store::{AuthStore, StoreError};

// ================================================================================================
// Settings / Inputs / Results
// ================================================================================================

/// 토큰 수명 설정.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub refresh_ttl: Duration,
    pub email_verification_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_ttl: Duration::days(30),
            email_verification_ttl: Duration::hours(24),
        }
    }
}

/// 가입 요청.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    pub profile: ProfileFields,
}

/// 가입 결과.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResult {
    pub user: UserView,
    pub profile: Profile,
    /// 새 계정이 생성되었는지 (false면 기존 계정에 프로필 추가)
    pub is_new_user: bool,
}

/// 로그인 요청.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// 지정하지 않으면 첫 번째 프로필의 역할을 사용
    pub role: Option<Role>,
}

/// 로그인 응답의 최소 사용자 정보.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub is_email_verified: bool,
}

/// 로그인 결과.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: SessionUser,
    pub profile: ProfileSummary,
    pub available_roles: Vec<Role>,
}

/// 토큰 갱신 결과.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    #[serde(flatten)]
    pub token: AccessToken,
    pub role: Role,
}

/// 역할 전환 결과.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchRoleResult {
    pub role: Role,
    pub profile: Profile,
}

// ================================================================================================
// Error helpers
// ================================================================================================

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => AuthError::Unauthorized(UnauthorizedCode::TokenExpired),
            JwtError::TokenInvalid => AuthError::Unauthorized(UnauthorizedCode::TokenInvalid),
            JwtError::Encoding(e) => AuthError::internal(e),
        }
    }
}

/// 비밀번호 불일치는 `Ok(false)`, 해시 손상 등은 내부 에러.
pub(crate) fn password_matches(
    hasher: &PasswordHasher,
    password: &str,
    hash: &str,
) -> AuthResult<bool> {
    match hasher.verify(password, hash) {
        Ok(()) => Ok(true),
        Err(PasswordError::VerificationFailed) => Ok(false),
        Err(e) => Err(AuthError::internal(e)),
    }
}

// ================================================================================================
// Service
// ================================================================================================

/// 인증 서비스.
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    notifier: Arc<dyn EmailNotifier>,
    hasher: PasswordHasher,
    jwt: Arc<JwtIssuer>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        notifier: Arc<dyn EmailNotifier>,
        hasher: PasswordHasher,
        jwt: Arc<JwtIssuer>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            hasher,
            jwt,
            settings,
        }
    }

    pub fn jwt(&self) -> &Arc<JwtIssuer> {
        &self.jwt
    }

    // --------------------------------------------------------------------------------------------
    // register
    // --------------------------------------------------------------------------------------------

    /// 가입.
    ///
    /// 이메일이 처음이면 사용자와 프로필을 함께 만들고, 이미 있으면 비밀번호를
    /// 확인한 뒤 새 역할의 프로필만 추가합니다.
    ///
    /// 새 계정의 인증 메일 발송이 실패하면 계정은 미인증 상태로 남고
    /// `Validation(EMAIL_SEND_FAILED)`를 반환합니다 (재발송으로 복구).
    #[instrument(skip_all, fields(role = %input.role))]
    pub async fn register(&self, input: RegisterInput) -> AuthResult<RegisterResult> {
        let email = normalize_email(&input.email);

        if let Some(user) = self.store.find_user_by_email(&email).await? {
            return self.add_profile(user, input).await;
        }

        if let Err(reason) = validate_password_strength(&input.password) {
            debug!(reason, "Rejected weak password");
            return Err(AuthError::Validation(ValidationCode::WeakPassword));
        }
        let password_hash = self.hasher.hash(&input.password).map_err(AuthError::internal)?;

        let created = self
            .store
            .create_user_with_profile(
                &email,
                &password_hash,
                input.role,
                &input.full_name,
                input.profile.clone(),
            )
            .await;

        let (user, profile) = match created {
            Ok(pair) => pair,
            Err(StoreError::Conflict(constraint)) => {
                // 동시 가입 경합에서 진 경우: 이제 존재하는 계정 기준으로 재처리
                debug!(constraint = %constraint, "Concurrent registration detected");
                return match self.store.find_user_by_email(&email).await? {
                    Some(user) => self.add_profile(user, input).await,
                    None => Err(AuthError::Conflict(ConflictCode::EmailRoleExists)),
                };
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, role = %profile.role, "User registered");

        let token = self
            .store
            .create_email_verification_token(user.id, self.settings.email_verification_ttl)
            .await?;

        if let Err(e) = self
            .notifier
            .send_verification_email(&user.email, &profile.full_name, &token.token)
            .await
        {
            error!(user_id = %user.id, error = %e, "Failed to send verification email");
            return Err(AuthError::Validation(ValidationCode::EmailSendFailed));
        }

        Ok(RegisterResult {
            user: user.view(),
            profile,
            is_new_user: true,
        })
    }

    /// 기존 계정에 새 역할 프로필을 추가합니다.
    async fn add_profile(&self, user: User, input: RegisterInput) -> AuthResult<RegisterResult> {
        if self.store.find_profile(user.id, input.role).await?.is_some() {
            return Err(AuthError::Conflict(ConflictCode::EmailRoleExists));
        }

        if !password_matches(&self.hasher, &input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Password mismatch while adding profile");
            return Err(AuthError::Unauthorized(UnauthorizedCode::InvalidCredentials));
        }

        let profile = self
            .store
            .create_profile(user.id, input.role, &input.full_name, input.profile)
            .await?;

        info!(user_id = %user.id, role = %profile.role, "Profile added to existing user");

        if !user.is_email_verified {
            if let Err(e) = self.issue_and_send_verification(&user, &profile.full_name).await {
                warn!(user_id = %user.id, error = %e, "Verification email for new profile not sent");
            }
        }

        Ok(RegisterResult {
            user: user.view(),
            profile,
            is_new_user: false,
        })
    }

    async fn issue_and_send_verification(&self, user: &User, name: &str) -> AuthResult<()> {
        let token = self
            .store
            .create_email_verification_token(user.id, self.settings.email_verification_ttl)
            .await?;

        self.notifier
            .send_verification_email(&user.email, name, &token.token)
            .await
            .map_err(|e| {
                error!(user_id = %user.id, error = %e, "Failed to send verification email");
                AuthError::Validation(ValidationCode::EmailSendFailed)
            })
    }

    // --------------------------------------------------------------------------------------------
    // login
    // --------------------------------------------------------------------------------------------

    /// 로그인.
    ///
    /// 성공 시 액세스 토큰과 세션 역할이 기록된 리프레시 토큰을 발급합니다.
    #[instrument(skip_all, fields(role = ?input.role))]
    pub async fn login(
        &self,
        input: LoginInput,
        metadata: SessionMetadata,
    ) -> AuthResult<LoginResult> {
        let email = normalize_email(&input.email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            self.hasher.dummy_verify(&input.password);
            return Err(AuthError::Unauthorized(UnauthorizedCode::InvalidCredentials));
        };

        if !user.is_active {
            warn!(user_id = %user.id, "Login attempt on locked account");
            return Err(AuthError::Unauthorized(UnauthorizedCode::AccountLocked));
        }

        if !password_matches(&self.hasher, &input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Invalid password");
            return Err(AuthError::Unauthorized(UnauthorizedCode::InvalidCredentials));
        }

        let profiles = self.store.list_profiles(user.id).await?;
        let profile = match input.role {
            Some(role) => profiles.iter().find(|p| p.role == role),
            None => profiles.first(),
        }
        .ok_or(AuthError::Unauthorized(UnauthorizedCode::RoleNotAvailable))?;

        // 비밀번호 검증 중 비활성화되었으면 여기서 거부
        let user = match self.store.touch_last_login(user.id, Utc::now()).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                warn!(user_id = %user.id, "Account locked during login");
                return Err(AuthError::Unauthorized(UnauthorizedCode::AccountLocked));
            }
            Err(e) => return Err(e.into()),
        };

        let access_token =
            self.jwt
                .issue_access_token(user.id, &user.email, profile.role, user.is_email_verified)?;

        let refresh = self
            .store
            .create_refresh_token(
                user.id,
                self.settings.refresh_ttl,
                SessionMetadata {
                    role: Some(profile.role),
                    ..metadata
                },
            )
            .await?;

        info!(user_id = %user.id, role = %profile.role, "User logged in");

        Ok(LoginResult {
            tokens: AccessToken::bearer(access_token, self.jwt.access_ttl())
                .with_refresh(refresh.token),
            user: SessionUser {
                id: user.id,
                email: user.email.clone(),
                is_email_verified: user.is_email_verified,
            },
            profile: profile.summary(),
            available_roles: profiles.iter().map(|p| p.role).collect(),
        })
    }

    // --------------------------------------------------------------------------------------------
    // email verification
    // --------------------------------------------------------------------------------------------

    /// 이메일 인증.
    ///
    /// 같은 토큰으로 두 번째 호출하면 `Validation(TOKEN_USED)`.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> AuthResult<UserView> {
        let record = self
            .store
            .find_email_verification_token(token)
            .await?
            .ok_or(AuthError::NotFound("Verification token"))?;

        match record.status {
            EmailVerificationStatus::Verified | EmailVerificationStatus::Used => {
                return Err(AuthError::Validation(ValidationCode::TokenUsed));
            }
            EmailVerificationStatus::Expired => {
                return Err(AuthError::Validation(ValidationCode::TokenExpired));
            }
            EmailVerificationStatus::Pending => {}
        }

        if record.is_expired_at(Utc::now()) {
            match self.store.mark_expired(token).await {
                // 동시 요청이 먼저 전이시킨 경우
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
            info!(user_id = %record.user_id, "Verification token expired");
            return Err(AuthError::Validation(ValidationCode::TokenExpired));
        }

        let user = match self.store.mark_verified(token).await {
            Ok(user) => user,
            // 동시 요청이 먼저 전이시킨 경우
            Err(StoreError::NotFound(_)) => {
                return Err(AuthError::Validation(ValidationCode::TokenUsed));
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, "Email verified");

        let name = self.display_name(&user).await;
        if let Err(e) = self.notifier.send_welcome_email(&user.email, &name).await {
            warn!(user_id = %user.id, error = %e, "Failed to send welcome email");
        }

        Ok(user.view())
    }

    /// 인증 메일 재발송. 기존 pending 토큰은 만료됩니다.
    #[instrument(skip_all)]
    pub async fn resend_verification(&self, email: &str) -> AuthResult<()> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::NotFound("User"))?;

        if user.is_email_verified {
            return Err(AuthError::Validation(ValidationCode::AlreadyVerified));
        }

        let name = self.display_name(&user).await;
        self.issue_and_send_verification(&user, &name).await?;

        info!(user_id = %user.id, "Verification email re-sent");
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // session
    // --------------------------------------------------------------------------------------------

    /// 리프레시 토큰으로 새 액세스 토큰을 발급합니다.
    ///
    /// 클레임은 현재 사용자 레코드 기준으로 다시 계산됩니다.
    /// 리프레시 토큰 자체는 교체되지 않습니다.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshResult> {
        let record = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::Unauthorized(UnauthorizedCode::TokenInvalid))?;

        if !record.is_valid_at(Utc::now()) {
            return Err(AuthError::Unauthorized(UnauthorizedCode::TokenExpired));
        }

        let user = self
            .store
            .find_user_by_id(record.user_id)
            .await?
            .ok_or(AuthError::Unauthorized(UnauthorizedCode::TokenInvalid))?;

        if !user.is_active {
            return Err(AuthError::Unauthorized(UnauthorizedCode::AccountLocked));
        }

        let profiles = self.store.list_profiles(user.id).await?;
        let role = record
            .role
            .filter(|role| profiles.iter().any(|p| p.role == *role))
            .or_else(|| profiles.first().map(|p| p.role))
            .ok_or(AuthError::Unauthorized(UnauthorizedCode::RoleNotAvailable))?;

        let access_token =
            self.jwt
                .issue_access_token(user.id, &user.email, role, user.is_email_verified)?;

        debug!(user_id = %user.id, role = %role, "Access token refreshed");

        Ok(RefreshResult {
            token: AccessToken::bearer(access_token, self.jwt.access_ttl()),
            role,
        })
    }

    /// 로그아웃. 알 수 없는 토큰이어도 성공합니다.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        if self.store.revoke_refresh_token(refresh_token).await? {
            info!("Refresh token revoked");
        }
        Ok(())
    }

    /// 역할 전환 확인. 해당 역할의 프로필을 반환합니다.
    #[instrument(skip_all, fields(user_id = %user_id, role = %role))]
    pub async fn switch_role(&self, user_id: Uuid, role: Role) -> AuthResult<SwitchRoleResult> {
        let profile = self
            .store
            .find_profile(user_id, role)
            .await?
            .ok_or(AuthError::NotFound("Profile"))?;

        Ok(SwitchRoleResult { role, profile })
    }

    /// 지정한 역할로 새 액세스 토큰을 발급합니다.
    #[instrument(skip_all, fields(user_id = %user_id, role = %role))]
    pub async fn issue_access_token_for(&self, user_id: Uuid, role: Role) -> AuthResult<AccessToken> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("User"))?;

        if !user.is_active {
            return Err(AuthError::Unauthorized(UnauthorizedCode::AccountLocked));
        }

        if self.store.find_profile(user_id, role).await?.is_none() {
            return Err(AuthError::Unauthorized(UnauthorizedCode::RoleNotAvailable));
        }

        let access_token =
            self.jwt
                .issue_access_token(user.id, &user.email, role, user.is_email_verified)?;

        Ok(AccessToken::bearer(access_token, self.jwt.access_ttl()))
    }

    /// 메일 수신자 이름: 첫 프로필의 이름, 없으면 이메일.
    async fn display_name(&self, user: &User) -> String {
        match self.store.list_profiles(user.id).await {
            Ok(profiles) => profiles
                .into_iter()
                .next()
                .map(|p| p.full_name)
                .unwrap_or_else(|| user.email.clone()),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Failed to load profile name");
                user.email.clone()
            }
        }
    }
}

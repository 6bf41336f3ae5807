//! 인증 흐름 통합 테스트.
//!
//! 인메모리 저장소와 발송 기록용 메일 전송기로 가입부터 세션 관리까지의
//! 전체 흐름을 검증합니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use p2a_api::auth::{JwtIssuer, PasswordHasher};
use p2a_api::services::{
    AuthService, AuthSettings, LoginInput, RegisterInput, RegisterResult, UserService,
};
use p2a_api::store::{CredentialStore, MemoryAuthStore, StoreResult, TokenStore};
use p2a_core::{
    AuthError, ConflictCode, EmailVerificationStatus, EmailVerificationToken, Profile,
    ProfileFields, RefreshToken, Role, SessionMetadata, UnauthorizedCode, User, ValidationCode,
};
use p2a_notification::{EmailNotifier, NotificationError, NotificationResult};
use uuid::Uuid;

const PASSWORD: &str = "Passw0rd!";
const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

// ================================================================================================
// Fixtures
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum SentEmail {
    Verification { to: String, token: String },
    Welcome { to: String },
    PasswordReset { to: String },
}

/// 발송 내역을 기록하는 메일 전송기.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, email: SentEmail) -> NotificationResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("smtp unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }

    fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    fn last_verification_token(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|email| match email {
            SentEmail::Verification { to: addr, token } if addr == to => Some(token),
            _ => None,
        })
    }
}

#[async_trait]
impl EmailNotifier for RecordingNotifier {
    async fn send_verification_email(
        &self,
        to: &str,
        _name: &str,
        token: &str,
    ) -> NotificationResult<()> {
        self.record(SentEmail::Verification {
            to: to.to_string(),
            token: token.to_string(),
        })
    }

    async fn send_welcome_email(&self, to: &str, _name: &str) -> NotificationResult<()> {
        self.record(SentEmail::Welcome { to: to.to_string() })
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        _name: &str,
        _token: &str,
    ) -> NotificationResult<()> {
        self.record(SentEmail::PasswordReset { to: to.to_string() })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// 비밀번호 검증 직후(프로필 조회 시점)에 관리자 비활성화가 끼어드는 저장소.
struct DeactivatingStore {
    inner: Arc<MemoryAuthStore>,
    armed: AtomicBool,
}

#[async_trait]
impl CredentialStore for DeactivatingStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user_by_id(user_id).await
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        self.inner.create_user(email, password_hash).await
    }

    async fn create_user_with_profile(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<(User, Profile)> {
        self.inner
            .create_user_with_profile(email, password_hash, role, full_name, fields)
            .await
    }

    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<User> {
        self.inner.touch_last_login(user_id, at).await
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> StoreResult<User> {
        self.inner.set_user_active(user_id, active).await
    }

    async fn update_password_hash(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        self.inner.update_password_hash(user_id, password_hash).await
    }

    async fn find_profile(&self, user_id: Uuid, role: Role) -> StoreResult<Option<Profile>> {
        self.inner.find_profile(user_id, role).await
    }

    async fn list_profiles(&self, user_id: Uuid) -> StoreResult<Vec<Profile>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.inner.set_user_active(user_id, false).await?;
            self.inner.revoke_all_refresh_tokens(user_id).await?;
        }
        self.inner.list_profiles(user_id).await
    }

    async fn create_profile(
        &self,
        user_id: Uuid,
        role: Role,
        full_name: &str,
        fields: ProfileFields,
    ) -> StoreResult<Profile> {
        self.inner.create_profile(user_id, role, full_name, fields).await
    }

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()> {
        self.inner.save_profile(profile).await
    }

    async fn list_users(&self, offset: i64, limit: i64) -> StoreResult<Vec<User>> {
        self.inner.list_users(offset, limit).await
    }

    async fn count_users(&self) -> StoreResult<i64> {
        self.inner.count_users().await
    }
}

#[async_trait]
impl TokenStore for DeactivatingStore {
    async fn create_refresh_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
        metadata: SessionMetadata,
    ) -> StoreResult<RefreshToken> {
        self.inner.create_refresh_token(user_id, ttl, metadata).await
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        self.inner.find_refresh_token(token).await
    }

    async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool> {
        self.inner.revoke_refresh_token(token).await
    }

    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        self.inner.revoke_all_refresh_tokens(user_id).await
    }

    async fn create_email_verification_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> StoreResult<EmailVerificationToken> {
        self.inner.create_email_verification_token(user_id, ttl).await
    }

    async fn find_email_verification_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<EmailVerificationToken>> {
        self.inner.find_email_verification_token(token).await
    }

    async fn expire_pending_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        self.inner.expire_pending_tokens(user_id).await
    }

    async fn mark_verified(&self, token: &str) -> StoreResult<User> {
        self.inner.mark_verified(token).await
    }

    async fn mark_expired(&self, token: &str) -> StoreResult<()> {
        self.inner.mark_expired(token).await
    }
}

struct Harness {
    store: Arc<MemoryAuthStore>,
    notifier: Arc<RecordingNotifier>,
    jwt: Arc<JwtIssuer>,
    auth: Arc<AuthService>,
    users: UserService,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryAuthStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let hasher = PasswordHasher::new(1024, 1, 1).unwrap();
        let jwt = Arc::new(JwtIssuer::new(TEST_SECRET, Duration::minutes(15)));

        let auth = AuthService::new(
            store.clone(),
            notifier.clone(),
            hasher.clone(),
            jwt.clone(),
            AuthSettings::default(),
        );
        let users = UserService::new(store.clone(), hasher);

        Self {
            store,
            notifier,
            jwt,
            auth: Arc::new(auth),
            users,
        }
    }

    async fn register(&self, email: &str, password: &str, role: Role) -> Result<RegisterResult, AuthError> {
        self.auth.register(register_input(email, password, role)).await
    }

    async fn login(&self, email: &str, password: &str, role: Option<Role>) -> Result<p2a_api::services::LoginResult, AuthError> {
        self.auth
            .login(
                LoginInput {
                    email: email.to_string(),
                    password: password.to_string(),
                    role,
                },
                SessionMetadata {
                    user_agent: Some("integration-test".to_string()),
                    ip_address: Some("127.0.0.1".to_string()),
                    role: None,
                },
            )
            .await
    }
}

fn register_input(email: &str, password: &str, role: Role) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        password: password.to_string(),
        role,
        full_name: "Nguyen Van A".to_string(),
        profile: ProfileFields {
            country: Some("VN".to_string()),
            ..ProfileFields::default()
        },
    }
}

// ================================================================================================
// register
// ================================================================================================

#[tokio::test]
async fn test_register_new_user_sends_verification() {
    let h = Harness::new();

    let result = h.register("Alice@Example.com", PASSWORD, Role::Student).await.unwrap();
    assert!(result.is_new_user);
    assert_eq!(result.user.email, "alice@example.com");
    assert!(!result.user.is_email_verified);
    assert_eq!(result.profile.role, Role::Student);
    assert_eq!(result.profile.fields.country.as_deref(), Some("VN"));

    let token = h.notifier.last_verification_token("alice@example.com");
    assert!(token.is_some());
}

#[tokio::test]
async fn test_register_same_email_and_role_conflicts() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();

    let err = h.register("A@X.COM", PASSWORD, Role::Student).await.unwrap_err();
    assert!(matches!(err, AuthError::Conflict(ConflictCode::EmailRoleExists)));
}

#[tokio::test]
async fn test_register_second_role_with_matching_password() {
    let h = Harness::new();
    let first = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let second = h.register("a@x.com", PASSWORD, Role::Company).await.unwrap();

    assert!(!second.is_new_user);
    assert_eq!(second.user.id, first.user.id);
    assert_eq!(h.store.count_users().await.unwrap(), 1);

    let roles: Vec<Role> = h
        .store
        .list_profiles(first.user.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.role)
        .collect();
    assert_eq!(roles, vec![Role::Student, Role::Company]);
}

#[tokio::test]
async fn test_register_second_role_with_wrong_password_creates_nothing() {
    let h = Harness::new();
    let first = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();

    let err = h.register("a@x.com", "Different1", Role::Company).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::InvalidCredentials)
    ));

    assert_eq!(h.store.count_users().await.unwrap(), 1);
    assert!(h
        .store
        .find_profile(first.user.id, Role::Company)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let h = Harness::new();
    let err = h.register("a@x.com", "alllowercase", Role::Student).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::WeakPassword)));
    assert_eq!(h.store.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_registration_creates_one_account() {
    let h = Harness::new();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let auth = h.auth.clone();
            tokio::spawn(async move {
                auth.register(register_input("race@x.com", PASSWORD, Role::Student))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e,
        AuthError::Conflict(ConflictCode::EmailRoleExists)
    )));

    assert_eq!(h.store.count_users().await.unwrap(), 1);
    let user = h.store.find_user_by_email("race@x.com").await.unwrap().unwrap();
    assert_eq!(h.store.list_profiles(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_email_failure_keeps_account_and_resend_recovers() {
    let h = Harness::new();
    h.notifier.set_failing(true);

    let err = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::EmailSendFailed)));

    let user = h.store.find_user_by_email("a@x.com").await.unwrap().unwrap();
    assert!(!user.is_email_verified);

    h.notifier.set_failing(false);
    h.auth.resend_verification("a@x.com").await.unwrap();
    let token = h.notifier.last_verification_token("a@x.com").unwrap();

    let verified = h.auth.verify_email(&token).await.unwrap();
    assert!(verified.is_email_verified);
}

// ================================================================================================
// login
// ================================================================================================

#[tokio::test]
async fn test_login_response_never_exposes_password_hash() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();

    let result = h.login("a@x.com", PASSWORD, None).await.unwrap();
    let json = serde_json::to_string(&result).unwrap();
    assert!(!json.contains("passwordHash"));
    assert!(!json.contains("$argon2"));
    assert!(json.contains("refreshToken"));
}

#[tokio::test]
async fn test_login_failures() {
    let h = Harness::new();
    let registered = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();

    let err = h.login("nobody@x.com", PASSWORD, None).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::InvalidCredentials)
    ));

    let err = h.login("a@x.com", "WrongPass1", None).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::InvalidCredentials)
    ));

    let err = h.login("a@x.com", PASSWORD, Some(Role::Company)).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::RoleNotAvailable)
    ));

    h.users.set_active(registered.user.id, false).await.unwrap();
    let err = h.login("a@x.com", PASSWORD, None).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::AccountLocked)
    ));
}

#[tokio::test]
async fn test_deactivation_during_login_is_not_overwritten() {
    let memory = Arc::new(MemoryAuthStore::new());
    let store = Arc::new(DeactivatingStore {
        inner: memory.clone(),
        armed: AtomicBool::new(false),
    });
    let auth = AuthService::new(
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        PasswordHasher::new(1024, 1, 1).unwrap(),
        Arc::new(JwtIssuer::new(TEST_SECRET, Duration::minutes(15))),
        AuthSettings::default(),
    );
    let registered = auth
        .register(register_input("a@x.com", PASSWORD, Role::Student))
        .await
        .unwrap();

    store.armed.store(true, Ordering::SeqCst);
    let err = auth
        .login(
            LoginInput {
                email: "a@x.com".to_string(),
                password: PASSWORD.to_string(),
                role: None,
            },
            SessionMetadata::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::AccountLocked)
    ));

    let stored = memory.find_user_by_id(registered.user.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert!(stored.last_login_at.is_none());
}

#[tokio::test]
async fn test_login_records_session_metadata_and_last_login() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();

    let result = h.login("a@x.com", PASSWORD, None).await.unwrap();
    let stored = h
        .store
        .find_refresh_token(&result.tokens.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, Some(Role::Student));
    assert_eq!(stored.user_agent.as_deref(), Some("integration-test"));
    assert_eq!(stored.ip_address.as_deref(), Some("127.0.0.1"));

    let user = h.store.find_user_by_email("a@x.com").await.unwrap().unwrap();
    assert!(user.last_login_at.is_some());
}

/// 학생으로 가입 → 같은 비밀번호로 기업 역할 추가 → 학생 역할로 로그인.
#[tokio::test]
async fn test_multi_role_example_flow() {
    let h = Harness::new();
    let student = h.register("minh@uni.edu.vn", PASSWORD, Role::Student).await.unwrap();
    let company = h.register("minh@uni.edu.vn", PASSWORD, Role::Company).await.unwrap();
    assert_eq!(student.user.id, company.user.id);

    let result = h
        .login("minh@uni.edu.vn", PASSWORD, Some(Role::Student))
        .await
        .unwrap();
    assert_eq!(result.profile.role, Role::Student);
    assert_eq!(result.available_roles, vec![Role::Student, Role::Company]);

    let claims = h.jwt.verify_access_token(&result.tokens.access_token).unwrap();
    assert_eq!(claims.sub, student.user.id);
    assert_eq!(claims.role, Role::Student);
    assert!(!claims.is_email_verified);
}

// ================================================================================================
// email verification
// ================================================================================================

#[tokio::test]
async fn test_verify_email_twice_reports_token_used() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let token = h.notifier.last_verification_token("a@x.com").unwrap();

    let user = h.auth.verify_email(&token).await.unwrap();
    assert!(user.is_email_verified);
    assert!(user.email_verified_at.is_some());
    assert!(h
        .notifier
        .sent()
        .contains(&SentEmail::Welcome { to: "a@x.com".to_string() }));

    let err = h.auth.verify_email(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::TokenUsed)));
}

#[tokio::test]
async fn test_welcome_email_failure_does_not_fail_verification() {
    let h = Harness::new();
    let registered = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let token = h.notifier.last_verification_token("a@x.com").unwrap();

    h.notifier.set_failing(true);
    let user = h.auth.verify_email(&token).await.unwrap();
    assert!(user.is_email_verified);

    let stored = h.store.find_user_by_id(registered.user.id).await.unwrap().unwrap();
    assert!(stored.is_email_verified);
    let record = h
        .store
        .find_email_verification_token(&token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, EmailVerificationStatus::Verified);
}

#[tokio::test]
async fn test_expired_verification_token() {
    let h = Harness::new();
    let registered = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();

    let expired = h
        .store
        .create_email_verification_token(registered.user.id, Duration::seconds(-1))
        .await
        .unwrap();

    let err = h.auth.verify_email(&expired.token).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::TokenExpired)));

    let stored = h
        .store
        .find_email_verification_token(&expired.token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, EmailVerificationStatus::Expired);

    let user = h.store.find_user_by_id(registered.user.id).await.unwrap().unwrap();
    assert!(!user.is_email_verified);
}

#[tokio::test]
async fn test_resend_supersedes_previous_token() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let old_token = h.notifier.last_verification_token("a@x.com").unwrap();

    h.auth.resend_verification("A@x.com").await.unwrap();
    let new_token = h.notifier.last_verification_token("a@x.com").unwrap();
    assert_ne!(old_token, new_token);

    let err = h.auth.verify_email(&old_token).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::TokenExpired)));

    h.auth.verify_email(&new_token).await.unwrap();

    let err = h.auth.resend_verification("a@x.com").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::AlreadyVerified)));

    let err = h.auth.resend_verification("nobody@x.com").await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
}

#[tokio::test]
async fn test_unknown_verification_token() {
    let h = Harness::new();
    let err = h.auth.verify_email("does-not-exist").await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
}

// ================================================================================================
// refresh / logout
// ================================================================================================

#[tokio::test]
async fn test_refresh_reissues_session_role() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    h.register("a@x.com", PASSWORD, Role::Company).await.unwrap();

    let login = h.login("a@x.com", PASSWORD, Some(Role::Company)).await.unwrap();
    let refreshed = h.auth.refresh(&login.tokens.refresh_token).await.unwrap();
    assert_eq!(refreshed.role, Role::Company);

    let claims = h
        .jwt
        .verify_access_token(&refreshed.token.access_token)
        .unwrap();
    assert_eq!(claims.role, Role::Company);
}

#[tokio::test]
async fn test_refresh_picks_up_email_verification() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let login = h.login("a@x.com", PASSWORD, None).await.unwrap();

    let token = h.notifier.last_verification_token("a@x.com").unwrap();
    h.auth.verify_email(&token).await.unwrap();

    let refreshed = h.auth.refresh(&login.tokens.refresh_token).await.unwrap();
    let claims = h
        .jwt
        .verify_access_token(&refreshed.token.access_token)
        .unwrap();
    assert!(claims.is_email_verified);
}

#[tokio::test]
async fn test_refresh_rejects_unknown_revoked_and_expired_tokens() {
    let h = Harness::new();
    let registered = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();

    let err = h.auth.refresh("unknown-token").await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(UnauthorizedCode::TokenInvalid)));

    let login = h.login("a@x.com", PASSWORD, None).await.unwrap();
    h.auth.logout(&login.tokens.refresh_token).await.unwrap();
    let err = h.auth.refresh(&login.tokens.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(UnauthorizedCode::TokenExpired)));

    let expired = h
        .store
        .create_refresh_token(
            registered.user.id,
            Duration::seconds(-1),
            SessionMetadata::default(),
        )
        .await
        .unwrap();
    let err = h.auth.refresh(&expired.token).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(UnauthorizedCode::TokenExpired)));
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let h = Harness::new();
    h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let login = h.login("a@x.com", PASSWORD, None).await.unwrap();

    h.auth.logout(&login.tokens.refresh_token).await.unwrap();
    h.auth.logout(&login.tokens.refresh_token).await.unwrap();
    h.auth.logout("never-issued").await.unwrap();

    let stored = h
        .store
        .find_refresh_token(&login.tokens.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_revoked);
    assert!(stored.revoked_at.is_some());
}

// ================================================================================================
// switch role
// ================================================================================================

#[tokio::test]
async fn test_switch_role() {
    let h = Harness::new();
    let registered = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let user_id = registered.user.id;
    h.register("a@x.com", PASSWORD, Role::Researcher).await.unwrap();

    let switched = h.auth.switch_role(user_id, Role::Researcher).await.unwrap();
    assert_eq!(switched.role, Role::Researcher);
    assert_eq!(switched.profile.user_id, user_id);

    let token = h
        .auth
        .issue_access_token_for(user_id, Role::Researcher)
        .await
        .unwrap();
    let claims = h.jwt.verify_access_token(&token.access_token).unwrap();
    assert_eq!(claims.role, Role::Researcher);

    let err = h.auth.switch_role(user_id, Role::Company).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));

    let err = h
        .auth
        .issue_access_token_for(user_id, Role::Company)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::RoleNotAvailable)
    ));

    let err = h
        .auth
        .issue_access_token_for(Uuid::new_v4(), Role::Student)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
}

// ================================================================================================
// account management
// ================================================================================================

#[tokio::test]
async fn test_change_password_revokes_sessions() {
    let h = Harness::new();
    let registered = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let user_id = registered.user.id;
    let login = h.login("a@x.com", PASSWORD, None).await.unwrap();

    let err = h
        .users
        .change_password(user_id, "WrongPass1", "NewPassw0rd")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthorized(UnauthorizedCode::InvalidPassword)
    ));

    let err = h
        .users
        .change_password(user_id, PASSWORD, PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::SamePassword)));

    let err = h
        .users
        .change_password(user_id, PASSWORD, "weakpass")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(ValidationCode::WeakPassword)));

    h.users
        .change_password(user_id, PASSWORD, "NewPassw0rd")
        .await
        .unwrap();

    assert!(h.auth.refresh(&login.tokens.refresh_token).await.is_err());
    assert!(h.login("a@x.com", PASSWORD, None).await.is_err());
    assert!(h.login("a@x.com", "NewPassw0rd", None).await.is_ok());
}

#[tokio::test]
async fn test_deactivation_revokes_sessions() {
    let h = Harness::new();
    let registered = h.register("a@x.com", PASSWORD, Role::Student).await.unwrap();
    let login = h.login("a@x.com", PASSWORD, None).await.unwrap();

    let view = h.users.set_active(registered.user.id, false).await.unwrap();
    assert!(!view.is_active);

    let err = h.auth.refresh(&login.tokens.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(_)));

    let view = h.users.set_active(registered.user.id, true).await.unwrap();
    assert!(view.is_active);
    assert!(h.login("a@x.com", PASSWORD, None).await.is_ok());
}

#[tokio::test]
async fn test_list_users_newest_first() {
    let h = Harness::new();
    for i in 0..3 {
        h.register(&format!("user{i}@x.com"), PASSWORD, Role::Student)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let page = h.users.list_users(1, 2).await.unwrap();
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.users.len(), 2);
    assert_eq!(page.users[0].user.email, "user2@x.com");
    assert_eq!(page.users[0].profiles.len(), 1);

    let page = h.users.list_users(2, 2).await.unwrap();
    assert_eq!(page.users.len(), 1);
    assert_eq!(page.users[0].user.email, "user0@x.com");
}

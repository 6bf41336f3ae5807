//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 `Arc`로 래핑되어 Axum의 State extractor를 통해 핸들러에 주입됩니다.

use std::sync::Arc;

use p2a_notification::EmailNotifier;

use crate::auth::{JwtIssuer, JwtIssuerProvider, PasswordHasher};
use crate::services::{AuthService, AuthSettings, UserService};
use crate::store::AuthStore;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 인증 오케스트레이터 - 가입, 로그인, 이메일 인증, 토큰 갱신
    pub auth: Arc<AuthService>,

    /// 사용자 계정 서비스 - 내 정보, 비밀번호 변경, 관리자 기능
    pub users: Arc<UserService>,

    /// 액세스 토큰 발급/검증기 (인증 추출기에서 사용)
    pub jwt: Arc<JwtIssuer>,

    /// 데이터베이스 연결 풀 (미설정 시 인메모리 저장소로 동작)
    pub db_pool: Option<sqlx::PgPool>,

    /// `X-Forwarded-For` 헤더 신뢰 여부 (리버스 프록시 뒤에서만 활성화)
    pub trust_proxy_headers: bool,

    /// 메일 전송 방식 이름 ("smtp" | "console" 등)
    pub notifier_name: String,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 저장소, 메일 전송기, 해셔, 발급기로부터 서비스들을 조립합니다.
    pub fn new(
        store: Arc<dyn AuthStore>,
        notifier: Arc<dyn EmailNotifier>,
        hasher: PasswordHasher,
        jwt: JwtIssuer,
        settings: AuthSettings,
    ) -> Self {
        let jwt = Arc::new(jwt);
        let notifier_name = notifier.name().to_string();

        let auth = AuthService::new(
            store.clone(),
            notifier,
            hasher.clone(),
            jwt.clone(),
            settings,
        );
        let users = UserService::new(store, hasher);

        Self {
            auth: Arc::new(auth),
            users: Arc::new(users),
            jwt,
            db_pool: None,
            trust_proxy_headers: false,
            notifier_name,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 연결 설정 (헬스 체크용).
    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 프록시 헤더 신뢰 설정.
    pub fn with_trusted_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        if let Some(pool) = &self.db_pool {
            sqlx::query("SELECT 1").fetch_one(pool).await.is_ok()
        } else {
            false
        }
    }
}

impl JwtIssuerProvider for AppState {
    fn jwt_issuer(&self) -> &JwtIssuer {
        &self.jwt
    }
}

/// 테스트용 AppState 생성.
///
/// 인메모리 저장소, 콘솔 메일 전송기, 가벼운 argon2 파라미터를 사용합니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    create_test_state_with(Arc::new(p2a_notification::ConsoleNotifier::new(
        p2a_notification::EmailTemplates::new(
            "P2A ASEAN Platform",
            "http://localhost:3000/verify-email",
            "http://localhost:3000",
        ),
    )))
}

/// 메일 전송기를 지정하여 테스트용 AppState 생성.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state_with(notifier: Arc<dyn EmailNotifier>) -> AppState {
    use crate::store::MemoryAuthStore;

    let hasher = match PasswordHasher::new(1024, 1, 1) {
        Ok(hasher) => hasher,
        Err(e) => panic!("test hasher params must be valid: {e}"),
    };
    let jwt = JwtIssuer::new(
        "test-secret-key-for-jwt-testing-minimum-32-chars",
        chrono::Duration::minutes(15),
    );

    AppState::new(
        Arc::new(MemoryAuthStore::new()),
        notifier,
        hasher,
        jwt,
        AuthSettings::default(),
    )
}

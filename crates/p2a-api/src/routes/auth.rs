//! 인증 API 라우트
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/auth/register` - 가입 (새 계정 또는 기존 계정에 역할 추가)
//! - `POST /api/v1/auth/login` - 로그인
//! - `POST /api/v1/auth/verify-email` - 이메일 인증
//! - `GET /api/v1/auth/verify-email?token=` - 이메일 인증 (메일 링크)
//! - `POST /api/v1/auth/resend-verification` - 인증 메일 재발송
//! - `POST /api/v1/auth/refresh` - 액세스 토큰 갱신
//! - `POST /api/v1/auth/logout` - 로그아웃
//! - `POST /api/v1/auth/switch-role` - 역할 전환 (인증 필요)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{header::USER_AGENT, request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use p2a_core::{Profile, ProfileFields, Role, SessionMetadata, UserView};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use super::ValidJson;
use crate::auth::{AccessToken, JwtAuth};
use crate::error::{ApiResponse, ApiResult};
use crate::services::{LoginInput, LoginResult, RefreshResult, RegisterInput, RegisterResult};
use crate::state::AppState;

// ================================================================================================
// Request/Response Types
// ================================================================================================

/// 관리자 역할은 공개 가입으로 만들 수 없습니다.
fn validate_public_role(role: &Role) -> Result<(), ValidationError> {
    if role.is_admin() {
        return Err(ValidationError::new("role").with_message("관리자 역할은 가입할 수 없습니다".into()));
    }
    Ok(())
}

/// 가입 요청
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "이메일 형식이 올바르지 않습니다"))]
    pub email: String,
    #[validate(length(min = 8, max = 50, message = "비밀번호는 8-50자여야 합니다"))]
    pub password: String,
    #[validate(custom(function = "validate_public_role"))]
    pub role: Role,
    #[validate(length(min = 2, max = 255, message = "이름은 2-255자여야 합니다"))]
    pub full_name: String,
    /// 선택 프로필 정보
    #[serde(flatten)]
    pub profile: ProfileFields,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            role: req.role,
            full_name: req.full_name,
            profile: req.profile,
        }
    }
}

/// 로그인 요청
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "이메일 형식이 올바르지 않습니다"))]
    pub email: String,
    #[validate(length(min = 1, message = "비밀번호를 입력하세요"))]
    pub password: String,
    /// 로그인할 역할 (생략 시 첫 번째 프로필)
    #[serde(default)]
    pub role: Option<Role>,
}

/// 이메일 인증 요청 (본문/쿼리 공용)
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "토큰이 필요합니다"))]
    pub token: String,
}

/// 인증 메일 재발송 요청
#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "이메일 형식이 올바르지 않습니다"))]
    pub email: String,
}

/// 리프레시 토큰 요청 (갱신/로그아웃 공용)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "리프레시 토큰이 필요합니다"))]
    pub refresh_token: String,
}

/// 역할 전환 요청
#[derive(Debug, Deserialize, Validate)]
pub struct SwitchRoleRequest {
    pub role: Role,
}

/// 메시지 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 이메일 인증 응답
#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub user: UserView,
}

/// 역할 전환 응답: 새 역할의 액세스 토큰 + 프로필
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchRoleResponse {
    #[serde(flatten)]
    pub token: AccessToken,
    pub role: Role,
    pub profile: Profile,
}

/// 클라이언트 정보 추출기 (User-Agent, IP).
///
/// `X-Forwarded-For`의 첫 주소를 우선하고, 없으면 소켓 주소를 사용합니다.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub SessionMetadata);

/// 세션에 기록할 클라이언트 IP.
///
/// `X-Forwarded-For`는 프록시 신뢰가 설정된 경우에만 사용하고,
/// 그 외에는 소켓 주소를 사용합니다.
fn client_ip(parts: &Parts, trust_proxy_headers: bool) -> Option<String> {
    let forwarded = trust_proxy_headers
        .then(|| parts.headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    forwarded.or_else(|| {
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

impl FromRequestParts<Arc<AppState>> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Ok(ClientInfo(SessionMetadata {
            user_agent,
            ip_address: client_ip(parts, state.trust_proxy_headers),
            role: None,
        }))
    }
}

// ================================================================================================
// Handlers
// ================================================================================================

/// POST /api/v1/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let result: RegisterResult = state.auth.register(req.into()).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(result)))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    ClientInfo(metadata): ClientInfo,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResult>>> {
    let input = LoginInput {
        email: req.email,
        password: req.password,
        role: req.role,
    };
    let result = state.auth.login(input, metadata).await?;
    Ok(ApiResponse::ok(result))
}

async fn verify(state: &AppState, token: &str) -> ApiResult<Json<ApiResponse<VerifyEmailResponse>>> {
    let user = state.auth.verify_email(token).await?;
    Ok(ApiResponse::ok(VerifyEmailResponse {
        message: "Email verified successfully".to_string(),
        user,
    }))
}

/// POST /api/v1/auth/verify-email
async fn verify_email(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<VerifyEmailRequest>,
) -> ApiResult<Json<ApiResponse<VerifyEmailResponse>>> {
    verify(&state, &req.token).await
}

/// GET /api/v1/auth/verify-email?token=
async fn verify_email_link(
    State(state): State<Arc<AppState>>,
    Query(req): Query<VerifyEmailRequest>,
) -> ApiResult<Json<ApiResponse<VerifyEmailResponse>>> {
    req.validate()?;
    verify(&state, &req.token).await
}

/// POST /api/v1/auth/resend-verification
async fn resend_verification(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ResendVerificationRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.auth.resend_verification(&req.email).await?;
    Ok(ApiResponse::ok(MessageResponse::new(
        "Verification email sent",
    )))
}

/// POST /api/v1/auth/refresh
async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> ApiResult<Json<ApiResponse<RefreshResult>>> {
    let result = state.auth.refresh(&req.refresh_token).await?;
    Ok(ApiResponse::ok(result))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state.auth.logout(&req.refresh_token).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Logged out")))
}

/// POST /api/v1/auth/switch-role
async fn switch_role(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    ValidJson(req): ValidJson<SwitchRoleRequest>,
) -> ApiResult<Json<ApiResponse<SwitchRoleResponse>>> {
    debug!(user_id = %claims.sub, from = %claims.role, to = %req.role, "Switching role");

    let switched = state.auth.switch_role(claims.sub, req.role).await?;
    let token = state
        .auth
        .issue_access_token_for(claims.sub, switched.role)
        .await?;

    Ok(ApiResponse::ok(SwitchRoleResponse {
        token,
        role: switched.role,
        profile: switched.profile,
    }))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email", post(verify_email).get(verify_email_link))
        .route("/resend-verification", post(resend_verification))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/switch-role", post(switch_role))
}

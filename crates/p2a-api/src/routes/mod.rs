//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/auth` - 가입, 로그인, 이메일 인증, 토큰 갱신, 역할 전환
//! - `/api/v1/users` - 내 정보, 비밀번호 변경, 사용자 관리 (관리자)

pub mod auth;
pub mod health;
pub mod users;

pub use auth::{auth_router, MessageResponse, RegisterRequest, SwitchRoleResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use users::users_router;

use axum::{
    extract::{FromRequest, Request},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // 헬스 체크 엔드포인트
        .nest("/health", health_router())
        // API v1 엔드포인트
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/users", users_router())
}

/// JSON 본문을 역직렬화한 뒤 `validator` 규칙까지 검사하는 추출기.
///
/// 형식 오류와 검증 실패 모두 `VALIDATION_ERROR` (400)으로 응답합니다.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text(), None))?;

        value.validate()?;
        Ok(ValidJson(value))
    }
}

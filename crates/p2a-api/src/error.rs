//! 통합 API 응답/에러 타입.
//!
//! 모든 엔드포인트는 성공 시 `{ "success": true, "data": ... }`,
//! 실패 시 [`ApiErrorResponse`] 형식을 반환합니다.
//!
//! | 에러 | HTTP |
//! |------|------|
//! | `Conflict` | 409 |
//! | `Unauthorized` | 401 |
//! | 권한 부족 | 403 |
//! | `NotFound` | 404 |
//! | 요청 형식 오류 | 400 |
//! | `Validation` | 422 |
//! | `Internal` | 500 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use p2a_core::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 에러 응답 본문.
///
/// ```json
/// {
///   "code": "EMAIL_ROLE_EXISTS",
///   "message": "An account with this email already has a profile for this role",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "TOKEN_EXPIRED", "NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// 성공 응답 래퍼.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// 핸들러 에러.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 비즈니스 에러
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// 인증은 되었지만 권한 부족
    #[error("권한이 부족합니다")]
    Forbidden,

    /// 요청 본문/쿼리 형식 오류
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String, Option<Value>),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).ok();
        ApiError::InvalidRequest("Request validation failed".to_string(), details)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::Conflict(_) => StatusCode::CONFLICT,
                AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                AuthError::NotFound(_) => StatusCode::NOT_FOUND,
                AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::InvalidRequest(..) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn to_response(&self) -> ApiErrorResponse {
        match self {
            ApiError::Auth(err) => ApiErrorResponse::new(err.code(), err.public_message()),
            ApiError::Forbidden => ApiErrorResponse::new("FORBIDDEN", "Insufficient permission"),
            ApiError::InvalidRequest(message, details) => {
                let response = ApiErrorResponse::new("VALIDATION_ERROR", message.clone());
                match details {
                    Some(details) => response.with_details(details.clone()),
                    None => response,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Auth(AuthError::Internal(detail)) = &self {
            tracing::error!(error = %detail, "Internal error while handling request");
        }

        (self.status(), Json(self.to_response())).into_response()
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

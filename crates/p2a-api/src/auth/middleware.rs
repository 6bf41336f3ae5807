//! Axum용 JWT 인증 추출기.
//!
//! `Authorization: Bearer <token>` 헤더의 액세스 토큰을 검증하여
//! 핸들러에 [`AccessClaims`]를 전달합니다.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use p2a_core::{AuthError, UnauthorizedCode};

use super::jwt::{AccessClaims, JwtError, JwtIssuer};
use crate::error::ApiError;

/// 추출기가 토큰 검증에 사용할 발급기를 제공하는 상태.
pub trait JwtIssuerProvider {
    fn jwt_issuer(&self) -> &JwtIssuer;
}

impl JwtIssuerProvider for JwtIssuer {
    fn jwt_issuer(&self) -> &JwtIssuer {
        self
    }
}

impl<T: JwtIssuerProvider + ?Sized> JwtIssuerProvider for Arc<T> {
    fn jwt_issuer(&self) -> &JwtIssuer {
        (**self).jwt_issuer()
    }
}

/// JWT 인증 추출기.
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn protected_handler(JwtAuth(claims): JwtAuth) -> impl IntoResponse {
///     format!("Authenticated user: {} ({})", claims.email, claims.role)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JwtAuth(pub AccessClaims);

fn unauthorized(code: UnauthorizedCode) -> ApiError {
    ApiError::Auth(AuthError::Unauthorized(code))
}

/// `Bearer ` 접두사 뒤의 토큰을 꺼냅니다.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for JwtAuth
where
    S: JwtIssuerProvider + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(unauthorized(UnauthorizedCode::TokenInvalid))?;

        let claims = state
            .jwt_issuer()
            .verify_access_token(token)
            .map_err(|e| match e {
                JwtError::TokenExpired => unauthorized(UnauthorizedCode::TokenExpired),
                _ => unauthorized(UnauthorizedCode::TokenInvalid),
            })?;

        Ok(JwtAuth(claims))
    }
}

/// 관리자 역할(admin, super_admin) 세션을 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub AccessClaims);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: JwtIssuerProvider + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let JwtAuth(claims) = JwtAuth::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminAuth(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use p2a_core::Role;
    use uuid::Uuid;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn issuer() -> Arc<JwtIssuer> {
        Arc::new(JwtIssuer::new(TEST_SECRET, Duration::minutes(15)))
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_valid_bearer_token() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer
            .issue_access_token(user_id, "a@x.com", Role::Student, true)
            .unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        let JwtAuth(claims) = JwtAuth::from_request_parts(&mut parts, &issuer)
            .await
            .unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Student);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header() {
        let issuer = issuer();
        for header in [None, Some("Token abc"), Some("Bearer "), Some("Bearer garbage")] {
            let mut parts = parts_with(header);
            let err = JwtAuth::from_request_parts(&mut parts, &issuer)
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.to_response().code, "TOKEN_INVALID");
        }
    }

    #[tokio::test]
    async fn test_expired_token_code() {
        let expired = Arc::new(JwtIssuer::new(TEST_SECRET, Duration::seconds(-30)));
        let token = expired
            .issue_access_token(Uuid::new_v4(), "a@x.com", Role::Student, false)
            .unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        let err = JwtAuth::from_request_parts(&mut parts, &issuer())
            .await
            .unwrap_err();
        assert_eq!(err.to_response().code, "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_admin_extractor() {
        let issuer = issuer();

        let admin = issuer
            .issue_access_token(Uuid::new_v4(), "root@x.com", Role::SuperAdmin, true)
            .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", admin)));
        assert!(AdminAuth::from_request_parts(&mut parts, &issuer).await.is_ok());

        let student = issuer
            .issue_access_token(Uuid::new_v4(), "s@x.com", Role::Student, true)
            .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", student)));
        let err = AdminAuth::from_request_parts(&mut parts, &issuer)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}

//! P2A ASEAN 계정/인증 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API
//! - JWT 액세스 토큰 + 저장소 기반 리프레시 토큰 세션
//! - 한 이메일에 역할별 프로필을 여러 개 두는 다중 역할 계정
//! - 헬스 체크 엔드포인트
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 비밀번호 해싱, JWT 발급/검증, 인증 추출기
//! - [`services`]: 인증 오케스트레이터와 사용자 서비스
//! - [`store`]: 자격증명/토큰 저장소 trait과 인메모리 구현
//! - [`repository`]: PostgreSQL 저장소 구현

pub mod auth;
pub mod error;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use auth::{AccessClaims, AdminAuth, JwtAuth, JwtIssuer, PasswordHasher};
pub use error::{ApiError, ApiErrorResponse, ApiResponse, ApiResult};
pub use repository::PgAuthStore;
pub use routes::create_api_router;
pub use services::{AuthService, AuthSettings, UserService};
pub use state::AppState;
pub use store::{AuthStore, CredentialStore, MemoryAuthStore, StoreError, TokenStore};

#[cfg(any(test, feature = "test-utils"))]
pub use state::{create_test_state, create_test_state_with};

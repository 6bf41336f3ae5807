//! 인증 및 권한 부여.
//!
//! # 구성 요소
//!
//! - [`PasswordHasher`]: Argon2id 비밀번호 해싱
//! - [`JwtIssuer`]: HS256 액세스 토큰 발급/검증
//! - [`JwtAuth`], [`AdminAuth`]: Axum 핸들러용 Bearer 토큰 추출기
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! async fn protected_handler(JwtAuth(claims): JwtAuth) -> impl IntoResponse {
//!     format!("Hello, {}!", claims.email)
//! }
//! ```

mod jwt;
mod middleware;
mod password;

pub use jwt::{AccessClaims, AccessToken, JwtError, JwtIssuer, TokenPair};
pub use middleware::{AdminAuth, JwtAuth, JwtIssuerProvider};
pub use password::{validate_password_strength, PasswordError, PasswordHasher};

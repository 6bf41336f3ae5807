//! Repository pattern for database operations.
//!
//! 데이터베이스 접근 로직을 서비스 계층에서 분리하여 관리합니다.
//! 모든 Repository는 static methods 패턴을 사용하며, 트랜잭션 안에서도
//! 쓸 수 있도록 `PgExecutor`를 인자로 받습니다.

pub mod email_verifications;
pub mod pg_store;
pub mod profiles;
pub mod refresh_tokens;
pub mod users;

pub use email_verifications::{EmailVerificationRecord, EmailVerificationRepository};
pub use pg_store::PgAuthStore;
pub use profiles::{ProfileRecord, ProfileRepository};
pub use refresh_tokens::{RefreshTokenRecord, RefreshTokenRepository};
pub use users::{UserRecord, UserRepository};

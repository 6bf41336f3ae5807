//! 비즈니스 서비스 모듈.
//!
//! - [`AuthService`]: 가입/로그인/이메일 인증/세션 관리
//! - [`UserService`]: 계정 정보 및 관리자 기능

pub mod auth_service;
pub mod user_service;

pub use auth_service::{
    AuthService, AuthSettings, LoginInput, LoginResult, RefreshResult, RegisterInput,
    RegisterResult, SessionUser, SwitchRoleResult,
};
pub use user_service::{Pagination, UserPage, UserService, UserWithProfiles};

//! 인증 시스템의 비즈니스 에러 타입.
//!
//! 모든 인증/계정 작업은 [`AuthError`]로 실패를 보고합니다.
//! 각 변형은 전송 계층에서 HTTP 상태 코드로 매핑됩니다:
//!
//! | 변형 | HTTP |
//! |------|------|
//! | `Conflict` | 409 |
//! | `Unauthorized` | 401 |
//! | `NotFound` | 404 |
//! | `Validation` | 422 |
//! | `Internal` | 500 |

use thiserror::Error;

/// 충돌 에러 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictCode {
    /// 같은 이메일 + 역할 프로필이 이미 존재
    EmailRoleExists,
}

impl ConflictCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictCode::EmailRoleExists => "EMAIL_ROLE_EXISTS",
        }
    }
}

/// 인증 실패 에러 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedCode {
    /// 이메일 또는 비밀번호 불일치 (계정 존재 여부를 구분하지 않음)
    InvalidCredentials,
    /// 비활성화된 계정
    AccountLocked,
    /// 요청한 역할의 프로필이 없음
    RoleNotAvailable,
    /// 알 수 없는 토큰
    TokenInvalid,
    /// 만료되었거나 폐기된 토큰
    TokenExpired,
    /// 현재 비밀번호 불일치 (비밀번호 변경)
    InvalidPassword,
}

impl UnauthorizedCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnauthorizedCode::InvalidCredentials => "INVALID_CREDENTIALS",
            UnauthorizedCode::AccountLocked => "ACCOUNT_LOCKED",
            UnauthorizedCode::RoleNotAvailable => "ROLE_NOT_AVAILABLE",
            UnauthorizedCode::TokenInvalid => "TOKEN_INVALID",
            UnauthorizedCode::TokenExpired => "TOKEN_EXPIRED",
            UnauthorizedCode::InvalidPassword => "INVALID_PASSWORD",
        }
    }
}

/// 비즈니스 규칙 위반 에러 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    /// 이미 사용된 인증 토큰
    TokenUsed,
    /// 만료된 인증 토큰
    TokenExpired,
    /// 이미 인증된 이메일
    AlreadyVerified,
    /// 새 비밀번호가 기존과 동일
    SamePassword,
    /// 비밀번호 강도 미달
    WeakPassword,
    /// 필수 이메일 발송 실패
    EmailSendFailed,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::TokenUsed => "TOKEN_USED",
            ValidationCode::TokenExpired => "TOKEN_EXPIRED",
            ValidationCode::AlreadyVerified => "ALREADY_VERIFIED",
            ValidationCode::SamePassword => "SAME_PASSWORD",
            ValidationCode::WeakPassword => "WEAK_PASSWORD",
            ValidationCode::EmailSendFailed => "EMAIL_SEND_FAILED",
        }
    }
}

macro_rules! impl_code_display {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_code_display!(ConflictCode, UnauthorizedCode, ValidationCode);

/// 인증/계정 비즈니스 에러.
#[derive(Debug, Error)]
pub enum AuthError {
    /// 중복 데이터
    #[error("충돌: {0}")]
    Conflict(ConflictCode),

    /// 인증 실패
    #[error("인증 실패: {0}")]
    Unauthorized(UnauthorizedCode),

    /// 찾을 수 없음 (리소스 이름)
    #[error("찾을 수 없음: {0}")]
    NotFound(&'static str),

    /// 비즈니스 규칙 위반
    #[error("검증 실패: {0}")]
    Validation(ValidationCode),

    /// 내부 에러 (상세 내용은 로그에만 남기고 호출자에게 노출하지 않음)
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 인증 작업을 위한 Result 타입.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// 외부에 노출하는 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Conflict(code) => code.as_str(),
            AuthError::Unauthorized(code) => code.as_str(),
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Validation(code) => code.as_str(),
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 호출자에게 보여줄 메시지. 내부 에러는 일반 메시지로 대체합니다.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "An unexpected error occurred".to_string(),
            AuthError::NotFound(resource) => format!("{} not found", resource),
            AuthError::Conflict(ConflictCode::EmailRoleExists) => {
                "An account with this email already has a profile for this role".to_string()
            }
            AuthError::Unauthorized(code) => match code {
                UnauthorizedCode::InvalidCredentials => "Invalid email or password",
                UnauthorizedCode::AccountLocked => "Account is locked",
                UnauthorizedCode::RoleNotAvailable => "Role is not available for this account",
                UnauthorizedCode::TokenInvalid => "Token is invalid",
                UnauthorizedCode::TokenExpired => "Token has expired",
                UnauthorizedCode::InvalidPassword => "Current password is incorrect",
            }
            .to_string(),
            AuthError::Validation(code) => match code {
                ValidationCode::TokenUsed => "Verification token has already been used",
                ValidationCode::TokenExpired => "Verification token has expired",
                ValidationCode::AlreadyVerified => "Email is already verified",
                ValidationCode::SamePassword => "New password must differ from the current one",
                ValidationCode::WeakPassword => {
                    "Password must be 8-50 characters with upper, lower case letters and a digit"
                }
                ValidationCode::EmailSendFailed => "Failed to send email",
            }
            .to_string(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AuthError::Internal(err.to_string())
    }
}

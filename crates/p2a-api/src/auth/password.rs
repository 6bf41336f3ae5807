//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id 기반 비밀번호 해싱 및 검증. 비용 파라미터는 배포 설정
//! ([`PasswordConfig`])에서 주입됩니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use p2a_core::config::PasswordConfig;

/// 비밀번호 최소 길이 (문자 수).
pub const MIN_PASSWORD_LEN: usize = 8;
/// 비밀번호 최대 길이 (문자 수).
pub const MAX_PASSWORD_LEN: usize = 50;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("잘못된 해싱 파라미터: {0}")]
    InvalidParams(String),
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("비밀번호 검증 실패")]
    VerificationFailed,
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
}

/// Argon2id 비밀번호 해셔.
///
/// 알 수 없는 계정에 대한 로그인 시도도 같은 비용을 치르도록
/// 생성 시점에 더미 해시를 하나 만들어 둡니다.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl PasswordHasher {
    /// 주어진 비용 파라미터로 해셔를 생성합니다.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut hasher = Self {
            argon2,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(&p2a_core::domain::generate_token_value())?;
        Ok(hasher)
    }

    pub fn from_config(config: &PasswordConfig) -> Result<Self, PasswordError> {
        Self::new(config.memory_kib, config.iterations, config.parallelism)
    }

    /// 비밀번호를 해싱합니다. 솔트는 매번 새로 생성됩니다.
    ///
    /// # Returns
    ///
    /// PHC 형식의 해시 문자열 (예: `$argon2id$v=19$m=19456,t=2,p=1$...`)
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| PasswordError::HashingFailed)?;

        Ok(hash.to_string())
    }

    /// 저장된 해시와 비밀번호를 비교합니다.
    ///
    /// 해시에 기록된 파라미터로 검증하므로 비용 설정이 바뀐 뒤에도
    /// 기존 해시는 계속 검증됩니다.
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PasswordError::VerificationFailed)
    }

    /// 더미 해시에 대해 검증을 수행합니다. 결과는 항상 무시됩니다.
    pub fn dummy_verify(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

/// 비밀번호 강도 검증.
///
/// # 요구사항
///
/// - 8자 이상 50자 이하
/// - 영문 소문자, 대문자, 숫자 각각 1개 이상
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err("비밀번호는 최소 8자 이상이어야 합니다");
    }
    if len > MAX_PASSWORD_LEN {
        return Err("비밀번호는 최대 50자까지 허용됩니다");
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("비밀번호에 최소 1개의 소문자가 포함되어야 합니다");
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("비밀번호에 최소 1개의 대문자가 포함되어야 합니다");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("비밀번호에 최소 1개의 숫자가 포함되어야 합니다");
    }

    Ok(())
}

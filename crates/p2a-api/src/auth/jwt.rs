//! JWT 액세스 토큰 처리.
//!
//! HS256으로 서명된 짧은 수명의 액세스 토큰을 발급/검증합니다.
//! 리프레시 토큰은 JWT가 아닌 저장소에 보관되는 불투명 값입니다.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use p2a_core::config::{ConfigError, JwtConfig};
use p2a_core::Role;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Access Token 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - 사용자 ID
    pub sub: Uuid,
    /// 정규화된 이메일
    pub email: String,
    /// 세션 역할
    pub role: Role,
    /// 발급 시점의 이메일 인증 여부
    #[serde(rename = "isEmailVerified")]
    pub is_email_verified: bool,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

impl AccessClaims {
    /// 관리자 역할 클레임인지 확인.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// 로그인 시 발급되는 Access Token + Refresh Token 쌍.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    /// Access Token 만료까지 남은 시간 (초)
    pub expires_in: i64,
}

/// 단독 발급된 Access Token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AccessToken {
    pub fn bearer(access_token: String, ttl: Duration) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: ttl.num_seconds(),
        }
    }

    /// Refresh Token과 결합합니다.
    pub fn with_refresh(self, refresh_token: String) -> TokenPair {
        TokenPair {
            access_token: self.access_token,
            refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
        }
    }
}

/// JWT 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("잘못된 토큰")]
    TokenInvalid,
}

/// 액세스 토큰 발급기.
pub struct JwtIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
}

impl JwtIssuer {
    pub fn new(secret: &str, access_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.secret.expose_secret(), config.access_ttl()?))
    }

    /// 액세스 토큰 유효 기간.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// 액세스 토큰을 발급합니다.
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        is_email_verified: bool,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id,
            email: email.to_string(),
            role,
            is_email_verified,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(JwtError::from)
    }

    /// 액세스 토큰을 검증하고 클레임을 반환합니다.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn issuer() -> JwtIssuer {
        JwtIssuer::new(TEST_SECRET, Duration::minutes(15))
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer
            .issue_access_token(user_id, "a@x.com", Role::Student, false)
            .unwrap();

        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Student);
        assert!(!claims.is_email_verified);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_claim_names_on_the_wire() {
        let issuer = issuer();
        let token = issuer
            .issue_access_token(Uuid::new_v4(), "a@x.com", Role::SuperAdmin, true)
            .unwrap();
        let claims = issuer.verify_access_token(&token).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "super_admin");
        assert_eq!(json["isEmailVerified"], true);
        assert!(claims.is_admin());
    }

    #[test]
    fn test_expired_token() {
        let issuer = JwtIssuer::new(TEST_SECRET, Duration::seconds(-30));
        let token = issuer
            .issue_access_token(Uuid::new_v4(), "a@x.com", Role::Student, false)
            .unwrap();
        assert!(matches!(
            issuer.verify_access_token(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_pair_shape() {
        let pair = AccessToken::bearer("a".to_string(), Duration::minutes(15))
            .with_refresh("r".to_string());
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["refreshToken"], "r");
    }

    #[test]
    fn test_invalid_token() {
        assert!(matches!(
            issuer().verify_access_token("invalid.token.here"),
            Err(JwtError::TokenInvalid)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = issuer()
            .issue_access_token(Uuid::new_v4(), "a@x.com", Role::Student, false)
            .unwrap();
        let other = JwtIssuer::new(
            "wrong-secret-key-for-testing-minimum-32-chars",
            Duration::minutes(15),
        );
        assert!(matches!(
            other.verify_access_token(&token),
            Err(JwtError::TokenInvalid)
        ));
    }
}

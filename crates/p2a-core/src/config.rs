//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 설정은 두 가지 경로로 로드할 수 있습니다:
//!
//! - [`AppConfig::load`]: 기본값 → TOML 파일 → `P2A__` 접두사 환경 변수
//! - [`AppConfig::from_env`]: `.env` + 평면 환경 변수 (`JWT_SECRET`, `MAIL_HOST` 등)

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// JWT 서명 키 최소 길이 (바이트).
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// 이메일 인증 토큰 유효 기간 (고정 24시간).
pub const EMAIL_VERIFICATION_TTL_HOURS: i64 = 24;

/// 액세스/리프레시 토큰 TTL 상한 (일).
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

/// 운영 환경에서 허용하는 Argon2 최소 메모리 비용 (KiB).
pub const MIN_PASSWORD_MEMORY_KIB: u32 = 19 * 1024;

/// 운영 환경에서 허용하는 Argon2 최소 반복 횟수.
pub const MIN_PASSWORD_ITERATIONS: u32 = 2;

/// 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 설정 소스 로드 실패
    #[error("설정 로드 실패: {0}")]
    Load(#[from] ::config::ConfigError),

    /// 필수 값 누락
    #[error("필수 설정 누락: {0}")]
    Missing(&'static str),

    /// 잘못된 기간 문자열
    #[error("잘못된 기간 형식: {0}")]
    InvalidDuration(String),

    /// 기타 잘못된 값
    #[error("잘못된 설정 값: {0}")]
    Invalid(String),
}

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 애플리케이션 정보
    #[serde(default)]
    pub app: AppInfoConfig,
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 데이터베이스 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// JWT 설정
    pub jwt: JwtConfig,
    /// 비밀번호 해싱 설정
    #[serde(default)]
    pub password: PasswordConfig,
    /// 메일 설정
    #[serde(default)]
    pub mail: MailConfig,
}

/// 애플리케이션 정보.
#[derive(Debug, Clone, Deserialize)]
pub struct AppInfoConfig {
    /// 서비스 이름
    pub name: String,
    /// 공개 URL (비밀번호 재설정 링크 등에 사용)
    pub url: String,
}

impl Default for AppInfoConfig {
    fn default() -> Self {
        Self {
            name: "P2A Core System".to_string(),
            url: "http://localhost:3000".to_string(),
        }
    }
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 허용할 CORS origin 목록
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 리버스 프록시 뒤에서 `X-Forwarded-For`를 클라이언트 IP로 신뢰할지 여부
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: vec!["http://localhost:3001".to_string()],
            request_timeout_secs: default_request_timeout(),
            trust_proxy_headers: false,
        }
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 연결 URL. 비어 있으면 인메모리 저장소를 사용합니다.
    #[serde(default)]
    pub url: Option<SecretString>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 30,
            run_migrations: true,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// JWT 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HS256 서명 키
    pub secret: SecretString,
    /// 액세스 토큰 유효 기간 (예: "15m")
    #[serde(default = "default_access_expires_in")]
    pub expires_in: String,
    /// 리프레시 토큰 유효 기간 (예: "30d")
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_expires_in: String,
}

fn default_access_expires_in() -> String {
    "15m".to_string()
}

fn default_refresh_expires_in() -> String {
    "30d".to_string()
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            expires_in: default_access_expires_in(),
            refresh_expires_in: default_refresh_expires_in(),
        }
    }

    /// 액세스 토큰 TTL.
    pub fn access_ttl(&self) -> Result<Duration, ConfigError> {
        bounded_token_ttl(&self.expires_in)
    }

    /// 리프레시 토큰 TTL.
    pub fn refresh_ttl(&self) -> Result<Duration, ConfigError> {
        bounded_token_ttl(&self.refresh_expires_in)
    }
}

/// 토큰 TTL 파싱. [`MAX_TOKEN_TTL_DAYS`]를 넘으면 거부합니다.
fn bounded_token_ttl(s: &str) -> Result<Duration, ConfigError> {
    let ttl = parse_duration(s)?;
    if ttl > Duration::days(MAX_TOKEN_TTL_DAYS) {
        return Err(ConfigError::Invalid(format!(
            "token TTL {} exceeds {} days",
            s.trim(),
            MAX_TOKEN_TTL_DAYS
        )));
    }
    Ok(ttl)
}

/// 비밀번호 해싱(Argon2id) 비용 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    /// 메모리 비용 (KiB)
    pub memory_kib: u32,
    /// 반복 횟수
    pub iterations: u32,
    /// 병렬도
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: MIN_PASSWORD_MEMORY_KIB,
            iterations: MIN_PASSWORD_ITERATIONS,
            parallelism: 1,
        }
    }
}

/// 메일 전송 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// SMTP 서버로 발송
    Smtp,
    /// 발송하지 않고 로그로만 출력 (개발용)
    Console,
}

/// 메일(SMTP) 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub transport: MailTransport,
    #[serde(default)]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub from_email: String,
    pub from_name: String,
    /// 인증 링크 기본 URL (`?token=`이 뒤에 붙음)
    pub verification_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::Console,
            host: String::new(),
            port: 587,
            user: String::new(),
            password: None,
            from_email: "no-reply@localhost".to_string(),
            from_name: "P2A ASEAN Platform".to_string(),
            verification_url: "http://localhost:3000/auth/verify-email".to_string(),
        }
    }
}

impl MailConfig {
    /// 465 포트는 암묵적 TLS, 그 외는 STARTTLS.
    pub fn implicit_tls(&self) -> bool {
        self.port == 465
    }
}

/// 기간 문자열을 파싱합니다.
///
/// 지원 단위: `s`(초), `m`(분), `h`(시간), `d`(일). 단위가 없으면 초로 해석합니다.
///
/// # 예제
///
/// ```
/// use p2a_core::config::parse_duration;
///
/// assert_eq!(parse_duration("30d").unwrap(), chrono::Duration::days(30));
/// assert_eq!(parse_duration("15m").unwrap(), chrono::Duration::minutes(15));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    let (digits, unit_secs) = match s.char_indices().last() {
        Some((idx, 's')) => (&s[..idx], 1),
        Some((idx, 'm')) => (&s[..idx], 60),
        Some((idx, 'h')) => (&s[..idx], 60 * 60),
        Some((idx, 'd')) => (&s[..idx], 24 * 60 * 60),
        Some(_) => (s, 1),
        None => return Err(invalid()),
    };

    let value: i64 = digits.trim().parse().map_err(|_| invalid())?;
    if value <= 0 {
        return Err(invalid());
    }

    value
        .checked_mul(unit_secs)
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // 파일에서 로드
            .add_source(::config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                ::config::Environment::with_prefix("P2A")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("config/default.toml")
    }

    /// `.env` 파일과 평면 환경 변수에서 설정을 생성합니다.
    ///
    /// # 환경변수
    ///
    /// - `JWT_SECRET` (필수), `JWT_EXPIRES_IN`, `JWT_REFRESH_EXPIRES_IN`
    /// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`
    /// - `API_HOST`, `API_PORT`, `CORS_ORIGIN` (쉼표 구분), `TRUST_PROXY_HEADERS`
    /// - `MAIL_TRANSPORT`, `MAIL_HOST`, `MAIL_PORT`, `MAIL_USER`, `MAIL_PASSWORD`,
    ///   `MAIL_FROM`, `MAIL_FROM_NAME`, `EMAIL_VERIFICATION_URL`
    /// - `APP_NAME`, `APP_URL`
    /// - `PASSWORD_MEMORY_KIB`, `PASSWORD_ITERATIONS`, `PASSWORD_PARALLELISM`
    /// - `RUST_LOG`, `LOG_FORMAT`
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env 파일은 선택 사항
        let _ = dotenvy::dotenv();

        fn var(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        fn parsed<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
            var(key)
                .map(|v| {
                    v.parse()
                        .map_err(|_| ConfigError::Invalid(format!("{}={}", key, v)))
                })
                .transpose()
        }

        let secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let mut jwt = JwtConfig::new(secret);
        if let Some(expires_in) = var("JWT_EXPIRES_IN") {
            jwt.expires_in = expires_in;
        }
        if let Some(refresh) = var("JWT_REFRESH_EXPIRES_IN") {
            jwt.refresh_expires_in = refresh;
        }

        let app_defaults = AppInfoConfig::default();
        let app = AppInfoConfig {
            name: var("APP_NAME").unwrap_or(app_defaults.name),
            url: var("APP_URL").unwrap_or(app_defaults.url),
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            host: var("API_HOST").unwrap_or(server_defaults.host),
            port: parsed("API_PORT")?.unwrap_or(server_defaults.port),
            cors_origins: var("CORS_ORIGIN")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(server_defaults.cors_origins),
            request_timeout_secs: parsed("API_REQUEST_TIMEOUT_SECS")?
                .unwrap_or(server_defaults.request_timeout_secs),
            trust_proxy_headers: parsed("TRUST_PROXY_HEADERS")?
                .unwrap_or(server_defaults.trust_proxy_headers),
        };

        let db_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: var("DATABASE_URL").map(SecretString::from),
            max_connections: parsed("DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(db_defaults.max_connections),
            connection_timeout_secs: db_defaults.connection_timeout_secs,
            run_migrations: parsed("DATABASE_RUN_MIGRATIONS")?
                .unwrap_or(db_defaults.run_migrations),
        };

        let logging_defaults = LoggingConfig::default();
        let logging = LoggingConfig {
            level: var("RUST_LOG").unwrap_or(logging_defaults.level),
            format: var("LOG_FORMAT").unwrap_or(logging_defaults.format),
        };

        let password_defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parsed("PASSWORD_MEMORY_KIB")?.unwrap_or(password_defaults.memory_kib),
            iterations: parsed("PASSWORD_ITERATIONS")?.unwrap_or(password_defaults.iterations),
            parallelism: parsed("PASSWORD_PARALLELISM")?
                .unwrap_or(password_defaults.parallelism),
        };

        let mail_defaults = MailConfig::default();
        let transport = match var("MAIL_TRANSPORT").as_deref() {
            Some("smtp") => MailTransport::Smtp,
            Some("console") => MailTransport::Console,
            Some(other) => {
                return Err(ConfigError::Invalid(format!("MAIL_TRANSPORT={}", other)));
            }
            // 호스트가 설정되어 있으면 SMTP 사용
            None if var("MAIL_HOST").is_some() => MailTransport::Smtp,
            None => MailTransport::Console,
        };
        let mail = MailConfig {
            transport,
            host: var("MAIL_HOST").unwrap_or_default(),
            port: parsed("MAIL_PORT")?.unwrap_or(mail_defaults.port),
            user: var("MAIL_USER").unwrap_or_default(),
            password: var("MAIL_PASSWORD").map(SecretString::from),
            from_email: var("MAIL_FROM").unwrap_or(mail_defaults.from_email),
            from_name: var("MAIL_FROM_NAME").unwrap_or(mail_defaults.from_name),
            verification_url: var("EMAIL_VERIFICATION_URL")
                .unwrap_or(mail_defaults.verification_url),
        };

        let config = Self {
            app,
            server,
            database,
            logging,
            jwt,
            password,
            mail,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정 값의 일관성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "JWT secret must be at least {} bytes",
                MIN_JWT_SECRET_LEN
            )));
        }

        self.jwt.access_ttl()?;
        self.jwt.refresh_ttl()?;

        if self.password.memory_kib < MIN_PASSWORD_MEMORY_KIB
            || self.password.iterations < MIN_PASSWORD_ITERATIONS
        {
            return Err(ConfigError::Invalid(format!(
                "password hashing cost below minimum (memory >= {} KiB, iterations >= {})",
                MIN_PASSWORD_MEMORY_KIB, MIN_PASSWORD_ITERATIONS
            )));
        }

        if self.mail.transport == MailTransport::Smtp && self.mail.host.is_empty() {
            return Err(ConfigError::Missing("MAIL_HOST"));
        }

        Ok(())
    }

    /// 이메일 인증 토큰 TTL.
    pub fn email_verification_ttl(&self) -> Duration {
        Duration::hours(EMAIL_VERIFICATION_TTL_HOURS)
    }
}

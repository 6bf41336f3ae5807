//! 사용자 저장소.
//!
//! users 테이블에 대한 데이터베이스 연산을 담당합니다.

use chrono::{DateTime, Utc};
use p2a_core::User;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// 사용자 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            is_active: r.is_active,
            is_email_verified: r.is_email_verified,
            email_verified_at: r.email_verified_at,
            last_login_at: r.last_login_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// 사용자 Repository
pub struct UserRepository;

impl UserRepository {
    /// 정규화된 이메일로 조회
    pub async fn find_by_email<'e, E: PgExecutor<'e>>(
        executor: E,
        email: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// 사용자 삽입 (이메일 중복 시 unique_violation)
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        user: &User,
    ) -> Result<UserRecord, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (
                id, email, password_hash, is_active, is_email_verified,
                email_verified_at, last_login_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_email_verified)
        .bind(user.email_verified_at)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(executor)
        .await
    }

    /// 활성 사용자의 마지막 로그인 시각 기록. 비활성이거나 없으면 `None`.
    pub async fn touch_last_login<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET last_login_at = $2
            WHERE id = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(executor)
        .await
    }

    /// 활성 상태 설정
    pub async fn set_active<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        active: bool,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(executor)
        .await
    }

    /// 비밀번호 해시 교체. 갱신된 행이 있는지 반환합니다.
    pub async fn update_password_hash<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 이메일 인증 처리
    pub async fn mark_email_verified<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET is_email_verified = TRUE, email_verified_at = $2, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(executor)
        .await
    }

    /// 최신 가입 순 목록
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn count<'e, E: PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
    }
}

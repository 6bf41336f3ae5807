//! 리프레시 토큰 저장소.

use chrono::{DateTime, Utc};
use p2a_core::{RefreshToken, Role};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::store::StoreError;

/// 리프레시 토큰 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    #[sqlx(default)]
    pub role: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    #[sqlx(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub user_agent: Option<String>,
    #[sqlx(default)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RefreshTokenRecord> for RefreshToken {
    type Error = StoreError;

    fn try_from(r: RefreshTokenRecord) -> Result<Self, Self::Error> {
        let role = r
            .role
            .as_deref()
            .map(|s| Role::parse(s).ok_or_else(|| StoreError::Corrupt(format!("unknown role: {}", s))))
            .transpose()?;

        Ok(RefreshToken {
            id: r.id,
            user_id: r.user_id,
            token: r.token,
            role,
            expires_at: r.expires_at,
            is_revoked: r.is_revoked,
            revoked_at: r.revoked_at,
            user_agent: r.user_agent,
            ip_address: r.ip_address,
            created_at: r.created_at,
        })
    }
}

/// 리프레시 토큰 Repository
pub struct RefreshTokenRepository;

impl RefreshTokenRepository {
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &RefreshToken,
    ) -> Result<RefreshTokenRecord, sqlx::Error> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (
                id, user_id, token, role, expires_at, is_revoked, revoked_at,
                user_agent, ip_address, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.role.map(|r| r.as_str()))
        .bind(token.expires_at)
        .bind(token.is_revoked)
        .bind(token.revoked_at)
        .bind(&token.user_agent)
        .bind(&token.ip_address)
        .bind(token.created_at)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_token<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as::<_, RefreshTokenRecord>("SELECT * FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(executor)
            .await
    }

    /// 토큰 폐기. 이미 폐기된 토큰은 최초 폐기 시각을 유지합니다.
    ///
    /// 토큰이 존재하면 true를 반환합니다.
    pub async fn revoke<'e, E: PgExecutor<'e>>(executor: E, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = COALESCE(revoked_at, NOW())
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 사용자의 유효 토큰 전체 폐기
    pub async fn revoke_all_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = NOW()
            WHERE user_id = $1 AND is_revoked = FALSE
            "#,
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}

//! 이메일 인증 토큰 저장소.
//!
//! 상태 전이는 모두 `status = 'pending'` 조건부 UPDATE로 수행되어
//! 동시 요청에서도 한 번만 성공합니다.

use chrono::{DateTime, Utc};
use p2a_core::{EmailVerificationStatus, EmailVerificationToken};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::store::StoreError;

/// 이메일 인증 토큰 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct EmailVerificationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    #[sqlx(default)]
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EmailVerificationRecord> for EmailVerificationToken {
    type Error = StoreError;

    fn try_from(r: EmailVerificationRecord) -> Result<Self, Self::Error> {
        let status = EmailVerificationStatus::parse(&r.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown token status: {}", r.status)))?;

        Ok(EmailVerificationToken {
            id: r.id,
            user_id: r.user_id,
            token: r.token,
            status,
            expires_at: r.expires_at,
            verified_at: r.verified_at,
            created_at: r.created_at,
        })
    }
}

/// 이메일 인증 토큰 Repository
pub struct EmailVerificationRepository;

impl EmailVerificationRepository {
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &EmailVerificationToken,
    ) -> Result<EmailVerificationRecord, sqlx::Error> {
        sqlx::query_as::<_, EmailVerificationRecord>(
            r#"
            INSERT INTO email_verification_tokens (
                id, user_id, token, status, expires_at, verified_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.status.as_str())
        .bind(token.expires_at)
        .bind(token.verified_at)
        .bind(token.created_at)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_token<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
    ) -> Result<Option<EmailVerificationRecord>, sqlx::Error> {
        sqlx::query_as::<_, EmailVerificationRecord>(
            "SELECT * FROM email_verification_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(executor)
        .await
    }

    /// 사용자의 pending 토큰 전체를 expired로 전이
    pub async fn expire_pending_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE email_verification_tokens
            SET status = 'expired'
            WHERE user_id = $1 AND status = 'pending'
            "#,
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// pending → verified 전이. pending이 아니면 None.
    pub async fn mark_verified<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<EmailVerificationRecord>, sqlx::Error> {
        sqlx::query_as::<_, EmailVerificationRecord>(
            r#"
            UPDATE email_verification_tokens
            SET status = 'verified', verified_at = $2
            WHERE token = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(at)
        .fetch_optional(executor)
        .await
    }

    /// pending → expired 전이. 토큰이 존재하면 true.
    pub async fn mark_expired<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE email_verification_tokens
            SET status = CASE WHEN status = 'pending' THEN 'expired' ELSE status END
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

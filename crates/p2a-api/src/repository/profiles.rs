//! 프로필 저장소.
//!
//! 역할/성별은 문자열 컬럼으로 저장되며 조회 시 도메인 enum으로 변환됩니다.

use chrono::{DateTime, NaiveDate, Utc};
use p2a_core::{Gender, Profile, ProfileFields, Role};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::store::StoreError;

/// 프로필 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub full_name: String,
    #[sqlx(default)]
    pub avatar_url: Option<String>,
    #[sqlx(default)]
    pub phone_number: Option<String>,
    #[sqlx(default)]
    pub country: Option<String>,
    #[sqlx(default)]
    pub city: Option<String>,
    #[sqlx(default)]
    pub bio: Option<String>,
    #[sqlx(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[sqlx(default)]
    pub gender: Option<String>,
    #[sqlx(default)]
    pub linkedin_url: Option<String>,
    #[sqlx(default)]
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRecord> for Profile {
    type Error = StoreError;

    fn try_from(r: ProfileRecord) -> Result<Self, Self::Error> {
        let role = Role::parse(&r.role)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown role: {}", r.role)))?;
        let gender = r
            .gender
            .as_deref()
            .map(|g| {
                Gender::parse(g).ok_or_else(|| StoreError::Corrupt(format!("unknown gender: {}", g)))
            })
            .transpose()?;

        Ok(Profile {
            id: r.id,
            user_id: r.user_id,
            role,
            full_name: r.full_name,
            fields: ProfileFields {
                avatar_url: r.avatar_url,
                phone_number: r.phone_number,
                country: r.country,
                city: r.city,
                bio: r.bio,
                date_of_birth: r.date_of_birth,
                gender,
                linkedin_url: r.linkedin_url,
                website_url: r.website_url,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// 프로필 Repository
pub struct ProfileRepository;

impl ProfileRepository {
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<ProfileRecord>, sqlx::Error> {
        sqlx::query_as::<_, ProfileRecord>(
            "SELECT * FROM profiles WHERE user_id = $1 AND role = $2",
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(executor)
        .await
    }

    /// 사용자의 프로필 목록 (생성 순)
    pub async fn list_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<ProfileRecord>, sqlx::Error> {
        sqlx::query_as::<_, ProfileRecord>(
            "SELECT * FROM profiles WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// 프로필 삽입 (`(user_id, role)` 중복 시 unique_violation)
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        profile: &Profile,
    ) -> Result<ProfileRecord, sqlx::Error> {
        let f = &profile.fields;
        sqlx::query_as::<_, ProfileRecord>(
            r#"
            INSERT INTO profiles (
                id, user_id, role, full_name, avatar_url, phone_number, country, city,
                bio, date_of_birth, gender, linkedin_url, website_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(profile.role.as_str())
        .bind(&profile.full_name)
        .bind(&f.avatar_url)
        .bind(&f.phone_number)
        .bind(&f.country)
        .bind(&f.city)
        .bind(&f.bio)
        .bind(f.date_of_birth)
        .bind(f.gender.map(|g| g.as_str()))
        .bind(&f.linkedin_url)
        .bind(&f.website_url)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(executor)
        .await
    }

    /// 프로필 갱신 (역할/소유자는 변경 불가)
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        profile: &Profile,
    ) -> Result<bool, sqlx::Error> {
        let f = &profile.fields;
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET full_name = $2, avatar_url = $3, phone_number = $4, country = $5, city = $6,
                bio = $7, date_of_birth = $8, gender = $9, linkedin_url = $10,
                website_url = $11, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(&profile.full_name)
        .bind(&f.avatar_url)
        .bind(&f.phone_number)
        .bind(&f.country)
        .bind(&f.city)
        .bind(&f.bio)
        .bind(f.date_of_birth)
        .bind(f.gender.map(|g| g.as_str()))
        .bind(&f.linkedin_url)
        .bind(&f.website_url)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: &str, gender: Option<&str>) -> ProfileRecord {
        let now = Utc::now();
        ProfileRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: role.to_string(),
            full_name: "Alice".to_string(),
            avatar_url: None,
            phone_number: None,
            country: Some("VN".to_string()),
            city: None,
            bio: None,
            date_of_birth: None,
            gender: gender.map(str::to_string),
            linkedin_url: None,
            website_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_record_to_profile() {
        let profile = Profile::try_from(record("super_admin", Some("female"))).unwrap();
        assert_eq!(profile.role, Role::SuperAdmin);
        assert_eq!(profile.fields.gender, Some(Gender::Female));
        assert_eq!(profile.fields.country.as_deref(), Some("VN"));
    }

    #[test]
    fn test_unknown_role_is_corrupt() {
        assert!(matches!(
            Profile::try_from(record("moderator", None)),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(
            Profile::try_from(record("student", Some("robot"))),
            Err(StoreError::Corrupt(_))
        ));
    }
}

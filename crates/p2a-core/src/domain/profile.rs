//! 역할별 프로필 엔티티.
//!
//! `(user_id, role)` 쌍은 유일합니다.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// 성별.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// 프로필 개인 정보 (모두 선택).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
}

/// 역할별 프로필.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub full_name: String,
    #[serde(flatten)]
    pub fields: ProfileFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: Uuid, role: Role, full_name: impl Into<String>, fields: ProfileFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            full_name: full_name.into(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// 변경 요청을 적용합니다. 값이 주어진 필드만 변경됩니다.
    pub fn apply(&mut self, update: ProfileUpdate) {
        let ProfileUpdate { full_name, fields } = update;

        if let Some(full_name) = full_name {
            self.full_name = full_name;
        }

        let target = &mut self.fields;
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if fields.$field.is_some() { target.$field = fields.$field; })*
            };
        }
        merge!(
            avatar_url,
            phone_number,
            country,
            city,
            bio,
            date_of_birth,
            gender,
            linkedin_url,
            website_url
        );

        self.updated_at = Utc::now();
    }

    /// 로그인 응답 등에 쓰이는 최소 요약.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id,
            role: self.role,
            full_name: self.full_name.clone(),
            avatar_url: self.fields.avatar_url.clone(),
        }
    }
}

/// 프로필 변경 요청.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(flatten)]
    pub fields: ProfileFields,
}

/// 프로필 최소 요약.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: Uuid,
    pub role: Role,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

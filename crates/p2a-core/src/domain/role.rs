//! 사용자 역할 정의.
//!
//! 한 사용자(이메일)는 역할별로 최대 하나의 프로필을 가질 수 있으며,
//! 서로 다른 역할의 프로필은 여러 개 보유할 수 있습니다.

use serde::{Deserialize, Serialize};

/// 사용자 역할.
///
/// 프로필 단위로 부여되며, 액세스 토큰의 `role` 클레임으로 전달됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 최고 관리자
    SuperAdmin,
    /// 관리자
    Admin,
    /// 대학
    University,
    /// 기업
    Company,
    /// 학생
    Student,
    /// 졸업생
    Alumni,
    /// 연구자
    Researcher,
    /// 스타트업
    Startup,
}

impl Role {
    /// 모든 역할 목록.
    pub const ALL: [Role; 8] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::University,
        Role::Company,
        Role::Student,
        Role::Alumni,
        Role::Researcher,
        Role::Startup,
    ];

    /// DB 및 토큰 클레임에 저장되는 문자열 표현.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::University => "university",
            Role::Company => "company",
            Role::Student => "student",
            Role::Alumni => "alumni",
            Role::Researcher => "researcher",
            Role::Startup => "startup",
        }
    }

    /// 문자열에서 역할 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
    }

    /// 관리 권한을 가진 역할인지 확인.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown role: {}", s))
    }
}

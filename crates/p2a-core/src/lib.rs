//! # P2A Core
//!
//! P2A ASEAN 플랫폼 신원(identity) 백엔드의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 인증 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 사용자(`User`)와 역할별 프로필(`Profile`)
//! - 역할(`Role`) 정의
//! - 리프레시 토큰 / 이메일 인증 토큰 레코드
//! - 비즈니스 에러 분류 (`AuthError`)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;

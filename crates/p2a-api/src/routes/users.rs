//! 사용자 API 라우트
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/users/me` - 내 정보 (모든 프로필 포함)
//! - `PATCH /api/v1/users/me` - 현재 역할 프로필 수정
//! - `POST /api/v1/users/me/change-password` - 비밀번호 변경
//! - `GET /api/v1/users` - 사용자 목록 (관리자)
//! - `GET /api/v1/users/{id}` - 사용자 조회 (본인 또는 관리자)
//! - `POST /api/v1/users/{id}/activate` - 계정 활성화 (관리자)
//! - `POST /api/v1/users/{id}/deactivate` - 계정 비활성화 (관리자)

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use p2a_core::{Gender, Profile, ProfileFields, ProfileUpdate, UserView};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{MessageResponse, ValidJson};
use crate::auth::{AdminAuth, JwtAuth};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::services::user_service::DEFAULT_PAGE_LIMIT;
use crate::services::{UserPage, UserWithProfiles};
use crate::state::AppState;

// ================================================================================================
// Request Types
// ================================================================================================

/// 프로필 수정 요청. 주어진 필드만 변경됩니다.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255, message = "이름은 1-255자여야 합니다"))]
    pub full_name: Option<String>,
    #[validate(url(message = "아바타 URL 형식이 올바르지 않습니다"))]
    pub avatar_url: Option<String>,
    #[validate(length(max = 50, message = "전화번호는 50자 이하여야 합니다"))]
    pub phone_number: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    pub bio: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[validate(url(message = "LinkedIn URL 형식이 올바르지 않습니다"))]
    pub linkedin_url: Option<String>,
    #[validate(url(message = "웹사이트 URL 형식이 올바르지 않습니다"))]
    pub website_url: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            full_name: req.full_name,
            fields: ProfileFields {
                avatar_url: req.avatar_url,
                phone_number: req.phone_number,
                country: req.country,
                city: req.city,
                bio: req.bio,
                date_of_birth: req.date_of_birth,
                gender: req.gender,
                linkedin_url: req.linkedin_url,
                website_url: req.website_url,
            },
        }
    }
}

/// 비밀번호 변경 요청
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "현재 비밀번호를 입력하세요"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 50, message = "비밀번호는 8-50자여야 합니다"))]
    pub new_password: String,
}

/// 사용자 목록 쿼리
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

// ================================================================================================
// Handlers
// ================================================================================================

/// GET /api/v1/users/me
async fn get_me(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
) -> ApiResult<Json<ApiResponse<UserWithProfiles>>> {
    let me = state.users.get_me(claims.sub).await?;
    Ok(ApiResponse::ok(me))
}

/// PATCH /api/v1/users/me
///
/// 토큰의 세션 역할에 해당하는 프로필을 수정합니다.
async fn update_me(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<Profile>>> {
    let profile = state
        .users
        .update_profile(claims.sub, claims.role, req.into())
        .await?;
    Ok(ApiResponse::ok(profile))
}

/// POST /api/v1/users/me/change-password
async fn change_password(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    state
        .users
        .change_password(claims.sub, &req.current_password, &req.new_password)
        .await?;
    Ok(ApiResponse::ok(MessageResponse::new(
        "Password changed. Please log in again",
    )))
}

/// GET /api/v1/users (관리자)
async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminAuth(_claims): AdminAuth,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<ApiResponse<UserPage>>> {
    let page = state.users.list_users(query.page, query.limit).await?;
    Ok(ApiResponse::ok(page))
}

/// GET /api/v1/users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<UserWithProfiles>>> {
    if claims.sub != user_id && !claims.is_admin() {
        return Err(ApiError::Forbidden);
    }
    let user = state.users.get_user(user_id).await?;
    Ok(ApiResponse::ok(user))
}

/// POST /api/v1/users/{id}/activate (관리자)
async fn activate_user(
    State(state): State<Arc<AppState>>,
    AdminAuth(claims): AdminAuth,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let user = state.users.set_active(user_id, true).await?;
    info!(admin_id = %claims.sub, user_id = %user_id, "관리자가 계정을 활성화함");
    Ok(ApiResponse::ok(user))
}

/// POST /api/v1/users/{id}/deactivate (관리자)
async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    AdminAuth(claims): AdminAuth,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let user = state.users.set_active(user_id, false).await?;
    info!(admin_id = %claims.sub, user_id = %user_id, "관리자가 계정을 비활성화함");
    Ok(ApiResponse::ok(user))
}

/// 사용자 라우터 생성.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me).patch(update_me))
        .route("/me/change-password", post(change_password))
        .route("/{id}", get(get_user))
        .route("/{id}/activate", post(activate_user))
        .route("/{id}/deactivate", post(deactivate_user))
}

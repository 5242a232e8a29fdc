use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};

use crate::{
    authentication::{get_jwt_token, AuthUser, MaybeUser},
    data_formats::{
        LoginRequest, ProfileResponse, ProfileWrapper, RegisterRequest, UpdateUserRequest,
        UserResponse, UserWrapper,
    },
    db_helpers::{
        follow_user_in_db, get_profile_in_db, get_user_by_id, login_user_in_db,
        register_user_in_db, unfollow_user_in_db, update_user_in_db,
    },
    errors::RequestError,
    models::User,
    AppState, JsonResponse,
};

use super::JsonResult;

type UserJson = UserWrapper<UserResponse>;

fn with_token(state: &AppState, user: User) -> Result<UserJson, RequestError> {
    let token = get_jwt_token(user.id, state.config.jwt_secret()).map_err(|e| {
        tracing::error!(error = %e, "could not sign token");
        RequestError::ServerError
    })?;
    Ok(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    )))
}

// ----------------- User Handlers -----------------
pub async fn login_user(
    Extension(state): Extension<Arc<AppState>>,
    Json(UserWrapper { user: request }): Json<UserWrapper<LoginRequest>>,
) -> JsonResult<UserJson> {
    let user = login_user_in_db(&state.pool, request).await?;
    Ok(Json(with_token(&state, user)?))
}

pub async fn register_user(
    Extension(state): Extension<Arc<AppState>>,
    Json(UserWrapper { user: request }): Json<UserWrapper<RegisterRequest>>,
) -> Result<JsonResponse<UserJson>, RequestError> {
    let user = register_user_in_db(&state.pool, request).await?;
    Ok((StatusCode::CREATED, Json(with_token(&state, user)?)))
}

pub async fn get_current_user(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser { id, token, .. }: AuthUser,
) -> JsonResult<UserJson> {
    let mut conn = state.pool.acquire().await?;
    let user = get_user_by_id(&mut conn, id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn update_user(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser { id, token, .. }: AuthUser,
    Json(UserWrapper { user }): Json<UserWrapper<UpdateUserRequest>>,
) -> JsonResult<UserJson> {
    let user = update_user_in_db(&state.pool, id, user).await?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}
// ----------------- End User Handlers -----------------

// ----------------- Profile Handlers -----------------
pub async fn get_profile(
    Extension(state): Extension<Arc<AppState>>,
    maybe_user: MaybeUser,
    Path(username): Path<String>,
) -> JsonResult<ProfileWrapper> {
    let viewer = maybe_user.username();
    let (profile, following) = get_profile_in_db(&state.pool, viewer, &username).await?;
    Ok(Json(ProfileWrapper {
        profile: ProfileResponse::new(profile, following).for_viewer(viewer),
    }))
}

pub async fn follow_profile(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path(username): Path<String>,
) -> JsonResult<ProfileWrapper> {
    let profile = follow_user_in_db(&state.pool, &user.username, &username).await?;
    Ok(Json(ProfileWrapper {
        profile: ProfileResponse::new(profile, true),
    }))
}

pub async fn unfollow_profile(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthUser,
    Path(username): Path<String>,
) -> JsonResult<ProfileWrapper> {
    let profile = unfollow_user_in_db(&state.pool, &user.username, &username).await?;
    Ok(Json(ProfileWrapper {
        profile: ProfileResponse::new(profile, false),
    }))
}

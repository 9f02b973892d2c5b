use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::userdtos::{
        FilterUserDto, RegisterUserDto, Response, RoleUpdateDto, UpdateUserDto,
        UserListResponseDto, UserQueryDto, UserResponseDto,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::{User, UserRole},
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(disable_user),
        )
        .route("/users/:id/role", put(update_user_role))
        .route("/users/:id/enable", put(enable_user))
        .route("/users/by-role/:role", get(get_users_by_role))
        .route("/support-agents", get(get_support_agents))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Admin])
        }))
}

fn user_list(users: &[User]) -> UserListResponseDto {
    UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(users),
        results: users.len(),
    }
}

pub async fn get_users(
    Query(query_params): Query<UserQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page_request();
    let users = match query_params.search_term() {
        Some(term) => app_state.user_service.search_users(term, &page).await?,
        None => app_state.user_service.list_users(&page).await?,
    };

    Ok(Json(json!({
        "status": "success",
        "data": FilterUserDto::filter_page(users),
    })))
}

/// Admin-created accounts may carry any role; USER when none is given.
pub async fn create_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddeware>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let role = body.role.unwrap_or(UserRole::User);
    let user = app_state.user_service.register(&body, role).await?;

    tracing::info!("Admin {} created user {} as {}", admin.user.id, user.id, role);

    Ok((StatusCode::CREATED, Json(UserResponseDto::success(&user))))
}

pub async fn get_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state.user_service.get_user(user_id).await?;

    Ok(Json(UserResponseDto::success(&user)))
}

pub async fn update_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<UpdateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state.user_service.update_user(user_id, &body).await?;

    Ok(Json(UserResponseDto::success(&user)))
}

pub async fn update_user_role(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state.user_service.set_role(user_id, body.role).await?;

    Ok(Json(UserResponseDto::success(&user)))
}

/// Accounts are never removed; deleting one disables it.
pub async fn disable_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.user_service.set_enabled(user_id, false).await?;

    Ok(Json(Response {
        status: "success",
        message: "User disabled successfully".to_string(),
    }))
}

pub async fn enable_user(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.user_service.set_enabled(user_id, true).await?;

    Ok(Json(Response {
        status: "success",
        message: "User enabled successfully".to_string(),
    }))
}

pub async fn get_users_by_role(
    Path(role): Path<UserRole>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let users = app_state.user_service.users_by_role(role).await?;

    Ok(Json(user_list(&users)))
}

pub async fn get_support_agents(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let agents = app_state.user_service.active_support_agents().await?;

    Ok(Json(user_list(&agents)))
}

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{dtos::userdtos::UserResponseDto, error::HttpError, middleware::JWTAuthMiddeware};

pub fn users_handler() -> Router {
    Router::new().route("/me", get(get_me))
}

pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto::success(&user.user)))
}

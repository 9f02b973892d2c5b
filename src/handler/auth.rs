use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    dtos::userdtos::{
        FilterUserDto, LoginUserDto, RegisterUserDto, Response, UserLoginResponseDto,
        UserResponseDto,
    },
    error::HttpError,
    handler::users::get_me,
    middleware::auth,
    models::usermodel::UserRole,
    utils::token,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/logout", post(logout))
        .route("/me", get(get_me).layer(middleware::from_fn(auth)))
}

fn session_cookie_header(cookie: Cookie<'_>) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error("Failed to build session cookie"))?,
    );
    Ok(headers)
}

/// Public registration. The requested role is ignored; accounts start as USER.
pub async fn signup(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .user_service
        .register(&body, UserRole::User)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponseDto::success(&user))))
}

pub async fn signin(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .user_service
        .authenticate(&body.username, &body.password)
        .await?;

    let token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie_duration = time::Duration::minutes(app_state.env.jwt_maxage);
    let cookie = Cookie::build(("token", token.clone()))
        .path("/")
        .max_age(cookie_duration)
        .http_only(true)
        .build();

    let headers = session_cookie_header(cookie)?;

    tracing::info!("User {} signed in", user.id);

    let mut response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
        user: FilterUserDto::filter_user(&user),
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

/// Expires the `token` cookie. Bearer tokens stay valid until they expire.
pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let cookie = Cookie::build(("token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let headers = session_cookie_header(cookie)?;

    let mut response = Json(Response {
        status: "success",
        message: "Logged out successfully".to_string(),
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

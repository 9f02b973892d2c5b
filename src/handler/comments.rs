use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        ticketdtos::{AttachmentDto, AttachmentResponseDto, CommentDto, CommentResponseDto},
        userdtos::Response,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

/// Comment and attachment routes, merged under `/tickets`.
pub fn comments_handler() -> Router {
    Router::new()
        .route("/:id/comments", get(list_comments).post(add_comment))
        .route(
            "/:id/comments/:comment_id",
            put(update_comment).delete(delete_comment),
        )
        .route("/:id/attachments", get(list_attachments).post(add_attachment))
}

pub async fn add_comment(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let comment = app_state
        .comment_service
        .add_comment(ticket_id, &user.user, &body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponseDto {
            status: "success".to_string(),
            data: comment,
        }),
    ))
}

pub async fn list_comments(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let comments = app_state
        .comment_service
        .list_comments(ticket_id, &user.user)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "results": comments.len(),
        "data": comments,
    })))
}

pub async fn update_comment(
    Path((ticket_id, comment_id)): Path<(Uuid, Uuid)>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let comment = app_state
        .comment_service
        .update_comment(ticket_id, comment_id, &user.user, &body)
        .await?;

    Ok(Json(CommentResponseDto {
        status: "success".to_string(),
        data: comment,
    }))
}

pub async fn delete_comment(
    Path((ticket_id, comment_id)): Path<(Uuid, Uuid)>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .comment_service
        .delete_comment(ticket_id, comment_id, &user.user)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "Comment deleted successfully".to_string(),
    }))
}

pub async fn add_attachment(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<AttachmentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let attachment = app_state
        .comment_service
        .add_attachment(ticket_id, &user.user, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AttachmentResponseDto {
            status: "success".to_string(),
            data: attachment,
        }),
    ))
}

pub async fn list_attachments(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let attachments = app_state
        .comment_service
        .list_attachments(ticket_id, &user.user)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "results": attachments.len(),
        "data": attachments,
    })))
}

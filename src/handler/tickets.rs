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
    dtos::{
        ticketdtos::{
            AssignTicketDto, CreateTicketDto, RateTicketDto, TicketQueryDto, TicketResponseDto,
            TicketStatsDto, UpdateStatusDto, UpdateTicketDto,
        },
        userdtos::Response,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn tickets_handler() -> Router {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/my", get(my_tickets))
        .route("/stats", get(ticket_stats))
        .route(
            "/assigned",
            get(assigned_tickets).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::SupportAgent, UserRole::Admin])
            })),
        )
        .route(
            "/:id",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .route(
            "/:id/assign",
            put(assign_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::SupportAgent, UserRole::Admin])
            })),
        )
        .route(
            "/:id/status",
            put(update_status).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::SupportAgent, UserRole::Admin])
            })),
        )
        .route("/:id/rate", put(rate_ticket))
}

fn validate_query(query_params: &TicketQueryDto) -> Result<(), HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))
}

pub async fn create_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .create_ticket(&user.user, &body)
        .await?;

    Ok((StatusCode::CREATED, Json(TicketResponseDto::success(ticket))))
}

pub async fn list_tickets(
    Query(query_params): Query<TicketQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    validate_query(&query_params)?;

    let tickets = app_state
        .ticket_service
        .list_tickets(&user.user, query_params.filter(), &query_params.page_request())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": tickets,
    })))
}

pub async fn my_tickets(
    Query(query_params): Query<TicketQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    validate_query(&query_params)?;

    let tickets = app_state
        .ticket_service
        .my_tickets(&user.user, &query_params.page_request())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": tickets,
    })))
}

pub async fn assigned_tickets(
    Query(query_params): Query<TicketQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    validate_query(&query_params)?;

    let tickets = app_state
        .ticket_service
        .assigned_tickets(&user.user, &query_params.page_request())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": tickets,
    })))
}

pub async fn ticket_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let counts = app_state.ticket_service.ticket_stats(&user.user).await?;

    Ok(Json(json!({
        "status": "success",
        "data": TicketStatsDto::from_counts(counts),
    })))
}

pub async fn get_ticket(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .get_ticket(ticket_id, &user.user)
        .await?;

    Ok(Json(TicketResponseDto::success(ticket)))
}

pub async fn update_ticket(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .update_ticket(ticket_id, &user.user, &body)
        .await?;

    Ok(Json(TicketResponseDto::success(ticket)))
}

pub async fn assign_ticket(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<AssignTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .assign_ticket(ticket_id, &user.user, body.assignee_id)
        .await?;

    Ok(Json(TicketResponseDto::success(ticket)))
}

pub async fn update_status(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .update_status(ticket_id, &user.user, body.status)
        .await?;

    Ok(Json(TicketResponseDto::success(ticket)))
}

pub async fn rate_ticket(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<RateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .rate_ticket(ticket_id, &user.user, &body)
        .await?;

    Ok(Json(TicketResponseDto::success(ticket)))
}

/// Admin only; enforced by the ticket service.
pub async fn delete_ticket(
    Path(ticket_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .ticket_service
        .delete_ticket(ticket_id, &user.user)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "Ticket deleted successfully".to_string(),
    }))
}

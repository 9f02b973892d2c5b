mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::{DBClient, Store};
use dotenv::dotenv;
use mail::sendmail::{LogMailer, Mailer, SmtpMailer};
use routes::create_router;
use service::{
    comment_service::CommentService,
    notification_service::{start_notification_worker, NotificationService},
    ticket_service::TicketService,
    user_service::UserService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub user_service: UserService,
    pub ticket_service: TicketService,
    pub comment_service: CommentService,
}

impl AppState {
    pub fn new(env: Config, store: Arc<dyn Store>, notifications: NotificationService) -> Self {
        AppState {
            env,
            user_service: UserService::new(store.clone(), notifications.clone()),
            ticket_service: TicketService::new(store.clone(), notifications.clone()),
            comment_service: CommentService::new(store, notifications),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("🔥 Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(
            config
                .log_level
                .parse::<LevelFilter>()
                .unwrap_or(LevelFilter::DEBUG),
        )
        .init();

    let pool = match PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("🔥 Failed to run database migrations: {}", err);
        std::process::exit(1);
    }

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp, config.mail_from.clone()) {
            Ok(mailer) => Arc::new(mailer),
            Err(err) => {
                tracing::error!("🔥 Invalid SMTP configuration: {}", err);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("SMTP_HOST not set, notifications will only be logged");
            Arc::new(LogMailer)
        }
    };

    let (notifications, receiver) = NotificationService::new();
    tokio::spawn(start_notification_worker(receiver, mailer));

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let store: Arc<dyn Store> = Arc::new(DBClient::new(pool));
    let app_state = AppState::new(config.clone(), store, notifications);

    let app = create_router(Arc::new(app_state)).layer(cors);

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {}", err);
    }
}

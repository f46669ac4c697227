use axum::{
    handler::Handler,
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Router,
};
use chrono::{NaiveDate, Utc};
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::{
    auth,
    repository::{Repository, RepositoryError},
};

pub mod accounts;
pub mod attendance;
mod json;
pub mod students;

pub use json::Json;

pub const HEALTH_URI: &str = "/health";

/// Request-time settings handlers need, carried as an extension.
#[derive(Clone)]
pub struct ApiConfig {
    /// Lifetime of tokens issued at sign-in.
    pub session_ttl: chrono::Duration,
    /// When set, attendance writes are only accepted for dates at most this
    /// many days back from today (inclusive). `None` leaves the window a
    /// client-side concern, which is the original behavior.
    pub edit_window_days: Option<i64>,
}

#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("{0}")]
    #[diagnostic(code(attend::error::validation))]
    Validation(String),
    #[error("Authentication required")]
    #[diagnostic(code(attend::error::unauthorized))]
    Unauthorized,
    #[error("Invalid email or password")]
    #[diagnostic(code(attend::error::credentials))]
    InvalidCredentials,
    #[error("password hashing failed")]
    #[diagnostic(code(attend::error::password_hash))]
    PasswordHash(#[source] argon2::password_hash::Error),
    #[error("repository error")]
    #[diagnostic(code(attend::error::repository))]
    Repository(#[from] RepositoryError),
}

pub fn build(repository: Repository, config: ApiConfig) -> Router {
    let auth_repository = repository.clone();

    let protected = Router::new()
        .route(
            "/api/students",
            get(students::read_all).post(students::create),
        )
        .route("/api/students/:id", delete(students::delete))
        .route("/api/stats", get(students::stats))
        .route("/api/attendance", post(attendance::mark))
        .route("/api/attendance/report", get(attendance::report))
        .route("/api/signout", post(accounts::signout))
        .route_layer(middleware::from_fn(move |req, next| {
            auth::require_session(req, next, auth_repository.clone())
        }));

    Router::new()
        .route("/api/signup", post(accounts::signup))
        .route("/api/signin", post(accounts::signin))
        .route(HEALTH_URI, get(health_handler))
        .merge(protected)
        .layer(Extension(repository))
        .layer(Extension(config))
        .fallback(not_found_handler.into_service())
}

async fn health_handler() -> &'static str {
    "UP"
}

async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({ "error": format!("no route for {}", uri) })),
    )
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::Validation(format!("invalid date '{}', expected YYYY-MM-DD", value))
    })
}

pub(crate) fn date_or_today(value: Option<&str>) -> Result<NaiveDate, ApiError> {
    match value {
        Some(value) => parse_date(value),
        None => Ok(Utc::now().naive_utc().date()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            ApiError::PasswordHash(e) => {
                tracing::error!(error = %e, "password hashing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Repository(e) => match e {
                RepositoryError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
                RepositoryError::Conflict(message) => (StatusCode::BAD_REQUEST, message),
                RepositoryError::Database(e) => {
                    tracing::error!(error = %e, "database error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

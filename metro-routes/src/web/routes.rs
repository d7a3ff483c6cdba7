//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::RouteError;
use crate::fares::RouteSource;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<S: RouteSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stations", get(list_stations::<S>))
        .route("/route", get(get_route::<S>))
        .route("/warm", post(warm::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Every known station name, sorted.
async fn list_stations<S: RouteSource + 'static>(
    State(state): State<AppState<S>>,
) -> Json<StationsResponse> {
    Json(StationsResponse {
        stations: state.engine.list_station_names(),
    })
}

/// Route between two named stations, fetched on first request.
async fn get_route<S: RouteSource + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RouteResponse>, AppError> {
    let route = state.engine.get_route(&query.from, &query.to).await?;
    Ok(Json(RouteResponse::from_route(&route)))
}

/// Start a warm-up batch in the background.
///
/// Validates the origin up front so an unknown name is a 404 rather than
/// a silently empty batch.
async fn warm<S: RouteSource + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<WarmQuery>,
) -> Result<impl IntoResponse, AppError> {
    let from = match &query.from {
        Some(name) => Some(state.engine.station(name)?.name().to_string()),
        None => None,
    };

    let engine = state.engine.clone();
    let batch_from = from.clone();
    tokio::spawn(async move {
        let report = match &batch_from {
            Some(name) => match engine.warm_from(name).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(error = %e, "Warm-up failed");
                    return;
                }
            },
            None => engine.warm_all().await,
        };
        let summary = BatchSummary::from(&report);
        info!(
            from = batch_from.as_deref().unwrap_or("*"),
            requested = summary.requested,
            succeeded = summary.succeeded,
            failed = summary.failed,
            aborted = summary.aborted,
            "Warm-up finished"
        );
    });

    Ok((StatusCode::ACCEPTED, Json(WarmAccepted { from })))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    BadGateway { message: String },
}

impl From<RouteError> for AppError {
    fn from(e: RouteError) -> Self {
        let message = e.to_string();
        match e {
            RouteError::UnknownStation(_) => AppError::NotFound { message },
            RouteError::SameStation(_) => AppError::BadRequest { message },
            RouteError::Fetch(_) => AppError::BadGateway { message },
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest { message }
            | AppError::NotFound { message }
            | AppError::BadGateway { message } => message,
        };

        warn!(status = status.as_u16(), error = %message, "Request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

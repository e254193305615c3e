use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

use crate::config::Config;
use crate::draft::{ClassMeetingDraft, TermWindow};
use crate::export::{calendar_links, export_calendar, CalendarLink, ExportError};
use crate::extraction::RawClassEntry;
use crate::materialize::{materialize_all, OutcomeSummary};

pub const ICS_FILENAME: &str = "schedule.ics";

// API state that will be shared across handlers
pub struct ApiState {
    pub config: Config,
}

/// Body shared by every draft-consuming endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DraftsRequest {
    #[serde(default)]
    pub events: Vec<RawClassEntry>,
    pub timezone: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DraftsRequest {
    fn into_parts(self) -> (Vec<ClassMeetingDraft>, Option<String>, TermWindow) {
        let window = TermWindow::new(self.start_date, self.end_date);
        let drafts = self.events.into_iter().map(RawClassEntry::into_draft).collect();
        (drafts, self.timezone, window)
    }
}

/// Error body is `{"detail": ..}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Io(_) => Self { status: StatusCode::INTERNAL_SERVER_ERROR, detail: err.to_string() },
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: rejection.status(), detail: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn make_ics_handler(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DraftsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let Json(request) = payload.map_err(|e| {
        warn!("API[{}]: unreadable body: {}", request_id, e);
        ApiError::from(e)
    })?;
    let (drafts, timezone, window) = request.into_parts();
    let timezone = state.config.resolve_timezone(timezone.as_deref());
    info!("API[{}]: calendar export for {} drafts in {}", request_id, drafts.len(), timezone);

    let export = export_calendar(&drafts, &timezone, &window, &state.config.calendar.calendar_name)
        .map_err(|e| {
            warn!("API[{}]: export rejected: {}", request_id, e);
            ApiError::from(e)
        })?;
    for skipped in &export.skipped {
        debug!("API[{}]: skipped draft {} ('{}'): {}", request_id, skipped.index, skipped.title, skipped.reason);
    }

    let disposition = format!("attachment; filename=\"{}\"", ICS_FILENAME);
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, detail: e.to_string() })?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/calendar; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.content,
    )
        .into_response())
}

async fn links_handler(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DraftsRequest>, JsonRejection>,
) -> Result<Json<Vec<CalendarLink>>, ApiError> {
    let Json(request) = payload?;
    let (drafts, timezone, window) = request.into_parts();
    let timezone = checked_timezone(&state, timezone)?;
    info!("API: building links for {} drafts", drafts.len());
    Ok(Json(calendar_links(&drafts, &timezone, &window)))
}

async fn materialize_handler(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DraftsRequest>, JsonRejection>,
) -> Result<Json<Vec<OutcomeSummary>>, ApiError> {
    let Json(request) = payload?;
    let (drafts, timezone, window) = request.into_parts();
    let timezone = checked_timezone(&state, timezone)?;
    info!("API: materializing {} drafts", drafts.len());

    let report = materialize_all(&drafts, &timezone, &window);
    Ok(Json(report.summaries(&drafts)))
}

fn checked_timezone(state: &ApiState, requested: Option<String>) -> Result<String, ApiError> {
    let timezone = state.config.resolve_timezone(requested.as_deref());
    crate::export::resolve_timezone(&timezone)?;
    Ok(timezone)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() { AllowOrigin::from(Any) } else { AllowOrigin::list(origins) };
    CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any)
}

pub fn router(state: Arc<ApiState>) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/health", get(health_check))
        .route("/ics", post(make_ics_handler))
        .route("/make-ics", post(make_ics_handler))
        .route("/links", post(links_handler))
        .route("/materialize", post(materialize_handler))
        .layer(cors)
        .with_state(state)
}

// Create and start the API server
pub async fn start_api_server(config: Config, bind_override: Option<String>) -> Result<()> {
    let bind = bind_override.unwrap_or_else(|| config.server.bind_address.clone());
    let addr: SocketAddr = bind.parse().with_context(|| format!("Invalid bind address '{}'", bind))?;

    let app = router(Arc::new(ApiState { config }));

    info!("API server starting on http://{}", addr);
    let listener = TcpListener::bind(addr).await.map_err(|e| anyhow!("Failed to bind to address: {}", e))?;

    info!("API server successfully bound to {}. Waiting for connections...", addr);
    axum::serve(listener, app).await.map_err(|e| anyhow!("Failed to start API server: {}", e))?;

    Ok(())
}

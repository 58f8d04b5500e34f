//! HTTP surface: route search and health check.
//!
//! Search accepts `origin`, `destination` and `month` either as a urlencoded
//! form body (POST) or as query parameters (GET) and answers with the
//! resolved offers as JSON.

use crate::offer::DisplayOffer;
use crate::resolver::FlightOfferResolver;
use crate::supplier::SourceError;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<FlightOfferResolver>,
}

impl AppState {
    pub fn new(resolver: FlightOfferResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

/// Error body returned for every non-2xx answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum AppError {
    /// Missing or empty search field
    BadRequest(String),
    /// Body or query string could not be read as a search form
    InvalidForm { status: StatusCode, message: String },
    /// The pricing source failed for this search
    Upstream(SourceError),
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::Upstream(err)
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::InvalidForm {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::InvalidForm { status, message } => (status, "INVALID_FORM", message),
            AppError::Upstream(err @ SourceError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT", err.to_string())
            }
            AppError::Upstream(err) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string()),
        };

        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub month: String,
}

impl SearchForm {
    // Airports are trimmed and upper-cased; the month is forwarded verbatim
    fn normalize(self) -> Result<SearchForm, AppError> {
        let normalized = SearchForm {
            origin: self.origin.trim().to_uppercase(),
            destination: self.destination.trim().to_uppercase(),
            month: self.month,
        };

        for (field, value) in [
            ("origin", &normalized.origin),
            ("destination", &normalized.destination),
            ("month", &normalized.month),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!("{} must not be empty", field)));
            }
        }

        Ok(normalized)
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub origin: String,
    pub destination: String,
    pub month: String,
    pub count: usize,
    pub offers: Vec<DisplayOffer>,
}

/// Build the router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", get(search).post(search))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn search(
    State(state): State<AppState>,
    form: Result<Form<SearchForm>, FormRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Form(form) = form?;
    let form = form.normalize()?;

    let offers = state
        .resolver
        .resolve(&form.origin, &form.destination, &form.month)
        .await
        .inspect_err(|e| warn!(error = %e, "search failed"))?;

    Ok(Json(SearchResponse {
        origin: form.origin,
        destination: form.destination,
        month: form.month,
        count: offers.len(),
        offers,
    }))
}

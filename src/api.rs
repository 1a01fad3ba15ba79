use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::error::{ErrorBody, ScrapeError};
use crate::pipeline::{ScrapePipeline, ScrapeResponse};
use crate::readable::ReadableArticle;
use crate::reducer::{ContentRecord, ContentType, ReduceOptions};

#[derive(OpenApi)]
#[openapi(
    paths(scrape, healthcheck),
    components(
        schemas(
            ScrapeRequest,
            ScrapeResponse,
            ContentRecord,
            ReadableArticle,
            ContentType,
            ErrorBody,
            HealthResponse
        )
    ),
    tags(
        (name = "scraper", description = "Topic search and page extraction")
    )
)]
pub struct ApiDoc;

pub struct AppState {
    pub pipeline: Arc<ScrapePipeline>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    /// Topic to search for.
    #[serde(default)]
    pub tema: Option<String>,
    #[serde(default)]
    pub include_original_html: Option<bool>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/scraper-swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/scrape", post(scrape))
        .route("/healthcheck", get(healthcheck))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/scrape",
    tag = "scraper",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Per-URL results in search rank order", body = ScrapeResponse),
        (status = 400, description = "Missing or invalid topic", body = ErrorBody),
        (status = 500, description = "Search or browser failure", body = ErrorBody)
    )
)]
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, ScrapeError> {
    let Json(request) = payload.map_err(|e| ScrapeError::Validation(e.body_text()))?;

    // echoed back exactly as sent; the query trims and folds its own copy
    let tema = request
        .tema
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ScrapeError::Validation("tema is required".to_string()))?;

    let options = ReduceOptions {
        content_type: request.content_type.unwrap_or_default(),
        include_original_html: request.include_original_html.unwrap_or(false),
    };

    let span = tracing::info_span!(
        "scrape",
        request_id = %Uuid::new_v4(),
        tema = %tema.trim(),
        content_type = %options.content_type
    );
    let response = state.pipeline.run(&tema, options).instrument(span).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "scraper",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

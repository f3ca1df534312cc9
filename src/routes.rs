use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::article::{Article, StoredArticle};
use crate::fetcher::Fetcher;
use crate::store::ArticleStore;

pub struct AppState {
    pub store: Arc<ArticleStore>,
    pub fetcher: Arc<Fetcher>,
    pub default_limit: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/news", get(news))
        .route("/api/news/yesterday", get(news_yesterday))
        .route("/api/news/date/:date", get(news_by_date))
        .route("/api/news/source/:source", get(news_by_source))
        .route("/health", get(health))
        .with_state(state)
}

/// Cross-origin access for the configured frontend, any method or header.
/// An origin that is not a valid header value disables CORS.
pub fn cors_layer(frontend_origin: &str) -> CorsLayer {
    match frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!("Ignoring invalid frontend origin '{}': {}", frontend_origin, e);
            CorsLayer::new()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}

/// Fetches all feeds, stores what came back and returns it. Neither a
/// failing feed nor a failing save turns into an error response.
pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Items<Article>>, ApiError> {
    let limit = query.limit.unwrap_or(state.default_limit);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit must be a positive integer".to_string()));
    }

    let items = state.fetcher.fetch_all(limit).await;

    if !items.is_empty() {
        match state.store.save(&items).await {
            Ok(saved) => info!("Stored {} articles", saved),
            Err(e) => error!("Failed to store fetched articles: {}", e),
        }
    }

    Ok(Json(Items { items }))
}

pub async fn news_yesterday(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Items<StoredArticle>>, ApiError> {
    let items = state.store.query_yesterday().await?;
    Ok(Json(Items { items }))
}

pub async fn news_by_date(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<Items<StoredArticle>>, ApiError> {
    let date = parse_date(&date)?;
    let items = state.store.query_by_date(date).await?;
    Ok(Json(Items { items }))
}

pub async fn news_by_source(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Query(query): Query<SourceQuery>,
) -> Result<Json<Items<StoredArticle>>, ApiError> {
    if query.days == 0 {
        return Err(ApiError::BadRequest("days must be a positive integer".to_string()));
    }
    let items = state.store.query_by_source(&source, query.days).await?;
    Ok(Json(Items { items }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let articles = state.store.count().await?;
    Ok(Json(json!({ "status": "ok", "articles": articles })))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date '{}', expected YYYY-MM-DD", raw)))
}

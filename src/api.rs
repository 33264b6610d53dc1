use crate::catalog::ContentCatalog;
use crate::error::ReviewError;
use crate::models::{ContentType, LearnerKey, ProgressItem};
use crate::scheduler::ReviewScheduler;
use crate::srs::format_interval;
use crate::store::{merge_learner, ProgressStore};
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct ApiState<S> {
    pub scheduler: Arc<ReviewScheduler<S>>,
    pub catalog: Arc<dyn ContentCatalog>,
    pub batch_size: usize,
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            catalog: Arc::clone(&self.catalog),
            batch_size: self.batch_size,
        }
    }
}

pub fn app_router<S: ProgressStore + 'static>(state: ApiState<S>) -> Router {
    Router::new()
        .route("/api/review", post(submit_review::<S>))
        .route("/api/due", get(due_items::<S>))
        .route("/api/stats", get(stats::<S>))
        .route("/api/batch", get(next_batch::<S>))
        .route("/api/interval", get(interval_label))
        .route("/api/learner", post(new_learner))
        .route("/api/merge", post(merge::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Review(ReviewError),
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        ApiError::Review(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Review(err) => {
                log::error!("{}", err);
                let body = match err.unsaved() {
                    Some(unsaved) => json!({ "error": err.to_string(), "unsaved": unsaved }),
                    None => json!({ "error": err.to_string() }),
                };
                (StatusCode::SERVICE_UNAVAILABLE, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

fn parse_content_type(raw: Option<&str>) -> Result<Option<ContentType>, ApiError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| s.parse::<ContentType>().map_err(|e| ApiError::BadRequest(e.to_string())))
        .transpose()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    learner: LearnerKey,
    content_type: String,
    content_id: String,
    action: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewResponse {
    #[serde(flatten)]
    item: ProgressItem,
    next_interval_label: String,
}

async fn submit_review<S: ProgressStore + 'static>(
    State(state): State<ApiState<S>>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let content_type = payload
        .content_type
        .parse::<ContentType>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if payload.content_id.is_empty() {
        return Err(ApiError::BadRequest("contentId must not be empty".to_string()));
    }

    let item = state
        .scheduler
        .record_review_label(&payload.learner, content_type, &payload.content_id, &payload.action)
        .await?;

    Ok(Json(ReviewResponse {
        next_interval_label: format_interval(item.interval as f64),
        item,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LearnerQuery {
    learner: LearnerKey,
    content_type: Option<String>,
    limit: Option<usize>,
}

async fn due_items<S: ProgressStore + 'static>(
    State(state): State<ApiState<S>>,
    Query(query): Query<LearnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = parse_content_type(query.content_type.as_deref())?;
    let items = state.scheduler.due_items(&query.learner, content_type).await?;
    Ok(Json(items))
}

async fn stats<S: ProgressStore + 'static>(
    State(state): State<ApiState<S>>,
    Query(query): Query<LearnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = parse_content_type(query.content_type.as_deref())?;
    let stats = state.scheduler.stats(&query.learner, content_type).await?;
    Ok(Json(stats))
}

async fn next_batch<S: ProgressStore + 'static>(
    State(state): State<ApiState<S>>,
    Query(query): Query<LearnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = parse_content_type(query.content_type.as_deref())?
        .ok_or_else(|| ApiError::BadRequest("contentType is required".to_string()))?;
    let limit = query.limit.unwrap_or(state.batch_size).min(state.batch_size);

    let batch = state
        .scheduler
        .study_batch(&query.learner, content_type, state.catalog.as_ref(), limit)
        .await?;
    Ok(Json(batch))
}

#[derive(Deserialize)]
struct IntervalQuery {
    days: f64,
}

async fn interval_label(Query(query): Query<IntervalQuery>) -> impl IntoResponse {
    Json(json!({ "label": format_interval(query.days) }))
}

async fn new_learner() -> impl IntoResponse {
    Json(json!({ "learner": LearnerKey::new_anonymous() }))
}

#[derive(Deserialize)]
struct MergeRequest {
    from: LearnerKey,
    to: LearnerKey,
}

async fn merge<S: ProgressStore + 'static>(
    State(state): State<ApiState<S>>,
    Json(payload): Json<MergeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.from.is_anonymous() {
        return Err(ApiError::BadRequest("only guest progress can be merged".to_string()));
    }
    let moved = merge_learner(state.scheduler.store(), &payload.from, &payload.to)
        .await
        .map_err(ReviewError::from)?;
    Ok(Json(json!({ "moved": moved })))
}

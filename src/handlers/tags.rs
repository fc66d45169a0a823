use axum::{extract::State, response::Json};

use crate::error::ApiError;
use crate::store::AppState;
use crate::views::TagsEnvelope;

/// GET /api/tags - distinct tag names across all articles.
pub async fn list(State(state): State<AppState>) -> Result<Json<TagsEnvelope>, ApiError> {
    let tags = state.articles.distinct_tags().await?;
    Ok(Json(TagsEnvelope { tags }))
}

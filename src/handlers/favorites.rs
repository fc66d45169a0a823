// Favorite edge handlers. Both directions are idempotent and respond
// with the refreshed article view.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};

use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::relations;
use crate::store::AppState;
use crate::views::ArticleEnvelope;

/// POST /api/articles/:slug/favorite
pub async fn favorite(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleEnvelope>, ApiError> {
    let article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.favorites.favorite(ctx.user.id, article.id).await?;

    respond(&state, &ctx, article).await
}

/// DELETE /api/articles/:slug/favorite
pub async fn unfavorite(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleEnvelope>, ApiError> {
    let article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.favorites.unfavorite(ctx.user.id, article.id).await?;

    respond(&state, &ctx, article).await
}

async fn respond(
    state: &AppState,
    ctx: &AuthContext,
    article: crate::models::Article,
) -> Result<Json<ArticleEnvelope>, ApiError> {
    let author = super::author_of(state, &article).await?;
    let rel = relations::article_snapshot(
        state.follows.as_ref(),
        state.favorites.as_ref(),
        Some(ctx.user.id),
        &article,
    )
    .await?;
    Ok(Json(ArticleEnvelope::new(&article, &author, rel)))
}

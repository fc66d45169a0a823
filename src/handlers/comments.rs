// Comment handlers: add, list, delete.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{AuthContext, Viewer};
use crate::models::{Comment, User};
use crate::relations;
use crate::store::AppState;
use crate::validation::{self, FieldKind, FieldSpec, RequestShape, Shape};
use crate::views::{CommentEnvelope, CommentListEnvelope, CommentView};

#[derive(Debug, Deserialize)]
pub struct CreateCommentEnvelope {
    comment: CreateComment,
}

#[derive(Debug, Deserialize)]
struct CreateComment {
    body: String,
}

impl RequestShape for CreateCommentEnvelope {
    fn shape() -> Shape {
        Shape {
            envelope: "comment",
            fields: vec![FieldSpec::required("body", FieldKind::String)],
        }
    }
}

/// POST /api/articles/:slug/comments
pub async fn add(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(slug): Path<String>,
    body: String,
) -> Result<Json<CommentEnvelope>, ApiError> {
    let req: CreateCommentEnvelope = validation::parse(&body).map_err(ApiError::Validation)?;
    if req.comment.body.trim().is_empty() {
        return Err(ApiError::domain_rule("body", "can't be blank"));
    }

    let article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    let now = Utc::now();
    let comment = Comment {
        id: Uuid::new_v4(),
        article_id: article.id,
        author_id: ctx.user.id,
        body: req.comment.body,
        created_at: now,
        updated_at: now,
    };
    state.comments.insert(&comment).await?;

    // Viewer is the comment author, so following is their own self-follow
    // state - normally false
    let following = relations::profile_following(
        state.follows.as_ref(),
        Some(ctx.user.id),
        comment.author_id,
    )
    .await?;
    Ok(Json(CommentEnvelope::new(&comment, &ctx.user, following)))
}

/// GET /api/articles/:slug/comments - public, viewer-relative author
/// profiles resolved in one batched pass.
pub async fn list(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Path(slug): Path<String>,
) -> Result<Json<CommentListEnvelope>, ApiError> {
    let article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    let comments = state.comments.for_article(article.id).await?;

    let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    author_ids.sort();
    author_ids.dedup();
    let authors: HashMap<Uuid, User> = state
        .users
        .by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let following = match &viewer {
        Some(v) => state.follows.following_map(v.id, &author_ids).await?,
        None => HashMap::new(),
    };

    let mut views = Vec::with_capacity(comments.len());
    for comment in &comments {
        let author = authors.get(&comment.author_id).ok_or(ApiError::Internal)?;
        let follows_author = following.get(&comment.author_id).copied().unwrap_or(false);
        views.push(CommentView::new(comment, author, follows_author));
    }

    Ok(Json(CommentListEnvelope { comments: views }))
}

/// DELETE /api/articles/:slug/comments/:id - comment author only. A
/// comment id that exists but belongs to another article is a 404.
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((slug, id)): Path<(String, Uuid)>,
) -> Result<(), ApiError> {
    let article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    let comment = state.comments.by_id(id).await?.ok_or(ApiError::NotFound)?;
    if comment.article_id != article.id {
        return Err(ApiError::NotFound);
    }
    if comment.author_id != ctx.user.id {
        return Err(ApiError::Forbidden);
    }

    state.comments.delete(comment.id).await?;
    Ok(())
}

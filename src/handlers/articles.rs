// Article handlers: CRUD plus the two list endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;
use crate::listing::{self, ArticleFilter, Page};
use crate::middleware::{AuthContext, Viewer};
use crate::models::Article;
use crate::relations::{self, RelationSnapshot};
use crate::store::AppState;
use crate::validation::{self, FieldKind, FieldSpec, RequestShape, Shape};
use crate::views::{ArticleEnvelope, ArticleListEnvelope};

/// Unique, URL-safe slug from a title: slugified title plus a short
/// random suffix to disambiguate repeated titles.
fn new_slug(title: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", slug::slugify(title), &suffix[..8])
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// GET /api/articles - public, filtered, paginated.
pub async fn list(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ArticleListEnvelope>, ApiError> {
    let filter = ArticleFilter::from_query(&query);
    let page = Page::from_query(&query);
    let envelope = listing::list_articles(&state, filter, page, viewer.as_ref()).await?;
    Ok(Json(envelope))
}

/// GET /api/articles/feed - articles by followed authors.
pub async fn feed(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ArticleListEnvelope>, ApiError> {
    let page = Page::from_query(&query);
    let envelope = listing::feed(&state, &ctx.user, page).await?;
    Ok(Json(envelope))
}

/// GET /api/articles/:slug - public single read.
pub async fn get(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleEnvelope>, ApiError> {
    let article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    let author = super::author_of(&state, &article).await?;

    let rel = relations::article_snapshot(
        state.follows.as_ref(),
        state.favorites.as_ref(),
        viewer.as_ref().map(|v| v.id),
        &article,
    )
    .await?;

    Ok(Json(ArticleEnvelope::new(&article, &author, rel)))
}

#[derive(Debug, Deserialize)]
pub struct CreateArticleEnvelope {
    article: CreateArticle,
}

#[derive(Debug, Deserialize)]
struct CreateArticle {
    title: String,
    description: String,
    body: String,
    #[serde(default, rename = "tagList")]
    tag_list: Vec<String>,
}

impl RequestShape for CreateArticleEnvelope {
    fn shape() -> Shape {
        Shape {
            envelope: "article",
            fields: vec![
                FieldSpec::required("title", FieldKind::String),
                FieldSpec::required("description", FieldKind::String),
                FieldSpec::required("body", FieldKind::String),
                FieldSpec::optional("tagList", FieldKind::StringArray),
            ],
        }
    }
}

/// POST /api/articles
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    body: String,
) -> Result<Json<ArticleEnvelope>, ApiError> {
    let req: CreateArticleEnvelope = validation::parse(&body).map_err(ApiError::Validation)?;

    for (field, value) in [
        ("title", &req.article.title),
        ("description", &req.article.description),
        ("body", &req.article.body),
    ] {
        if blank(value) {
            return Err(ApiError::domain_rule(field, "can't be blank"));
        }
    }

    let now = Utc::now();
    let article = Article {
        id: Uuid::new_v4(),
        author_id: ctx.user.id,
        slug: new_slug(&req.article.title),
        title: req.article.title,
        description: req.article.description,
        body: req.article.body,
        tags: req.article.tag_list,
        created_at: now,
        updated_at: now,
    };
    state.articles.insert(&article).await?;

    Ok(Json(ArticleEnvelope::new(
        &article,
        &ctx.user,
        RelationSnapshot::default(),
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticleEnvelope {
    article: UpdateArticle,
}

#[derive(Debug, Deserialize)]
struct UpdateArticle {
    title: Option<String>,
    description: Option<String>,
    body: Option<String>,
    #[serde(rename = "tagList")]
    tag_list: Option<Vec<String>>,
}

impl RequestShape for UpdateArticleEnvelope {
    fn shape() -> Shape {
        Shape {
            envelope: "article",
            fields: vec![
                FieldSpec::optional("title", FieldKind::String),
                FieldSpec::optional("description", FieldKind::String),
                FieldSpec::optional("body", FieldKind::String),
                FieldSpec::optional("tagList", FieldKind::StringArray),
            ],
        }
    }
}

/// PUT /api/articles/:slug - partial update, author only. A title change
/// regenerates the slug.
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(slug): Path<String>,
    body: String,
) -> Result<Json<ArticleEnvelope>, ApiError> {
    let req: UpdateArticleEnvelope = validation::parse(&body).map_err(ApiError::Validation)?;

    let mut article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    if article.author_id != ctx.user.id {
        return Err(ApiError::Forbidden);
    }

    if let Some(title) = req.article.title {
        if blank(&title) {
            return Err(ApiError::domain_rule("title", "can't be blank"));
        }
        // Resubmitting the unchanged title must not invalidate the URL
        if title != article.title {
            article.slug = new_slug(&title);
            article.title = title;
        }
    }
    if let Some(description) = req.article.description {
        article.description = description;
    }
    if let Some(body) = req.article.body {
        article.body = body;
    }
    if let Some(tag_list) = req.article.tag_list {
        article.tags = tag_list;
    }
    article.updated_at = Utc::now();
    state.articles.update(&article).await?;

    let rel = relations::article_snapshot(
        state.follows.as_ref(),
        state.favorites.as_ref(),
        Some(ctx.user.id),
        &article,
    )
    .await?;
    Ok(Json(ArticleEnvelope::new(&article, &ctx.user, rel)))
}

/// DELETE /api/articles/:slug - author only; comments and favorite edges
/// cascade.
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(slug): Path<String>,
) -> Result<(), ApiError> {
    let article = state
        .articles
        .by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    if article.author_id != ctx.user.id {
        return Err(ApiError::Forbidden);
    }

    state.articles.delete(article.id).await?;
    Ok(())
}

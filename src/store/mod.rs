//! Repository seams for the five aggregates. Handlers and the listing
//! engine depend on these traits, never on a concrete backend, so tests
//! run against the in-memory implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Article, Comment, NewUser, User};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("uniqueness conflict on {field}")]
    Conflict { field: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. Duplicate email or username is a
    /// `StoreError::Conflict` naming the offending field.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;
    async fn by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// One-pass lookup of many users, for list projection.
    async fn by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    async fn by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn update(&self, user: &User) -> StoreResult<()>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert(&self, article: &Article) -> StoreResult<()>;
    async fn by_slug(&self, slug: &str) -> StoreResult<Option<Article>>;
    async fn update(&self, article: &Article) -> StoreResult<()>;
    /// Delete the article; comments and favorite edges go with it.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    // Candidate sets for the listing engine; ordering and pagination are
    // applied by the caller.
    async fn all(&self) -> StoreResult<Vec<Article>>;
    async fn by_author(&self, author_id: Uuid) -> StoreResult<Vec<Article>>;
    async fn by_authors(&self, author_ids: &[Uuid]) -> StoreResult<Vec<Article>>;
    async fn by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Article>>;
    async fn with_tag(&self, tag: &str) -> StoreResult<Vec<Article>>;

    async fn distinct_tags(&self) -> StoreResult<Vec<String>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, comment: &Comment) -> StoreResult<()>;
    async fn by_id(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn for_article(&self, article_id: Uuid) -> StoreResult<Vec<Comment>>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait FollowStore: Send + Sync {
    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool>;
    /// Insert the edge if absent. Calling twice is a no-op, never an error.
    async fn follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<()>;
    /// Delete the edge if present; idempotent no-op otherwise.
    async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<()>;
    /// One-pass membership map over many subjects, for list projection.
    async fn following_map(
        &self,
        follower_id: Uuid,
        followed_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, bool>>;
    /// Everyone the given user follows, for the feed.
    async fn followed_ids(&self, follower_id: Uuid) -> StoreResult<Vec<Uuid>>;
}

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn is_favorited(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<bool>;
    async fn favorite(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<()>;
    async fn unfavorite(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<()>;
    async fn count(&self, article_id: Uuid) -> StoreResult<i64>;
    async fn counts(&self, article_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;
    async fn favorited_set(
        &self,
        user_id: Uuid,
        article_ids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>>;
    /// Articles the user has favorited, for the `favorited` list filter.
    async fn article_ids_for(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;
}

/// Shared handler state: one trait object per aggregate.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub comments: Arc<dyn CommentStore>,
    pub follows: Arc<dyn FollowStore>,
    pub favorites: Arc<dyn FavoriteStore>,
}

impl AppState {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            users: store.clone(),
            articles: store.clone(),
            comments: store.clone(),
            follows: store.clone(),
            favorites: store,
        }
    }

    /// In-memory backend, used by tests and local experimentation.
    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            articles: store.clone(),
            comments: store.clone(),
            follows: store.clone(),
            favorites: store,
        }
    }
}

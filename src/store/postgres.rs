use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::{Article, Comment, NewUser, User};

use super::{
    ArticleStore, CommentStore, FavoriteStore, FollowStore, StoreError, StoreResult, UserStore,
};

/// Postgres-backed implementation of every aggregate store. Uniqueness
/// constraints are the correctness backstop for idempotent edge inserts.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate a unique violation into a Conflict naming the field the
/// constraint guards; everything else passes through.
fn map_unique(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("email") => "email",
                Some(c) if c.contains("username") => "username",
                Some(c) if c.contains("slug") => "slug",
                _ => "resource",
            };
            return StoreError::Conflict {
                field: field.to_string(),
            };
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, username, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique)
    }

    async fn by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET email = $2, username = $3, password_hash = $4, bio = $5, image = $6
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.image)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn insert(&self, article: &Article) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO articles (id, author_id, slug, title, description, body, tags, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(article.id)
        .bind(article.author_id)
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(&article.tags)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn by_slug(&self, slug: &str) -> StoreResult<Option<Article>> {
        Ok(
            sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update(&self, article: &Article) -> StoreResult<()> {
        sqlx::query(
            "UPDATE articles SET slug = $2, title = $3, description = $4, body = $5, tags = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(article.id)
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(&article.tags)
        .bind(article.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        // Comments and favorite edges cascade via foreign keys
        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all(&self) -> StoreResult<Vec<Article>> {
        Ok(
            sqlx::query_as::<_, Article>("SELECT * FROM articles ORDER BY updated_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn by_author(&self, author_id: Uuid) -> StoreResult<Vec<Article>> {
        Ok(sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE author_id = $1 ORDER BY updated_at DESC",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn by_authors(&self, author_ids: &[Uuid]) -> StoreResult<Vec<Article>> {
        Ok(sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE author_id = ANY($1) ORDER BY updated_at DESC",
        )
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Article>> {
        Ok(sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE id = ANY($1) ORDER BY updated_at DESC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn with_tag(&self, tag: &str) -> StoreResult<Vec<Article>> {
        Ok(sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE $1 = ANY(tags) ORDER BY updated_at DESC",
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn distinct_tags(&self) -> StoreResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT unnest(tags) AS tag FROM articles ORDER BY tag",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, article_id, author_id, body, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(comment.id)
        .bind(comment.article_id)
        .bind(comment.author_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn by_id(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(
            sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn for_article(&self, article_id: Uuid) -> StoreResult<Vec<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE article_id = $1 ORDER BY created_at",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FollowStore for PgStore {
    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<()> {
        // A concurrent duplicate insert resolves to a no-op
        sqlx::query(
            "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(followed_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn following_map(
        &self,
        follower_id: Uuid,
        followed_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, bool>> {
        let followed: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT followed_id FROM follows WHERE follower_id = $1 AND followed_id = ANY($2)",
        )
        .bind(follower_id)
        .bind(followed_ids)
        .fetch_all(&self.pool)
        .await?;

        let followed: HashSet<Uuid> = followed.into_iter().collect();
        Ok(followed_ids
            .iter()
            .map(|id| (*id, followed.contains(id)))
            .collect())
    }

    async fn followed_ids(&self, follower_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT followed_id FROM follows WHERE follower_id = $1",
        )
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl FavoriteStore for PgStore {
    async fn is_favorited(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND article_id = $2)",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn favorite(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO favorites (user_id, article_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(article_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unfavorite(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND article_id = $2")
            .bind(user_id)
            .bind(article_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self, article_id: Uuid) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM favorites WHERE article_id = $1",
        )
        .bind(article_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn counts(&self, article_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT article_id, COUNT(*) FROM favorites
             WHERE article_id = ANY($1) GROUP BY article_id",
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn favorited_set(
        &self,
        user_id: Uuid,
        article_ids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        let rows: Vec<Uuid> = sqlx::query_scalar(
            "SELECT article_id FROM favorites WHERE user_id = $1 AND article_id = ANY($2)",
        )
        .bind(user_id)
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn article_ids_for(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(
            sqlx::query_scalar::<_, Uuid>("SELECT article_id FROM favorites WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }
}

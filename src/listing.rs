//! Article listing and feed: candidate selection, ordering, pagination
//! and batched projection.

use std::collections::HashMap;
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::models::{Article, User};
use crate::relations::PageRelations;
use crate::store::AppState;
use crate::views::{ArticleListEnvelope, ArticleView};

pub const DEFAULT_OFFSET: i64 = 0;

/// List filters. Precedence is exclusive: tag, else author, else
/// favorited. Supplying more than one never intersects them.
#[derive(Debug, Default, Clone)]
pub struct ArticleFilter {
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
}

impl ArticleFilter {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            tag: query.get("tag").cloned(),
            author: query.get("author").cloned(),
            favorited: query.get("favorited").cloned(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Lenient pagination: missing or unparseable values fall back to the
    /// defaults instead of failing the request.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let default_limit = config::config().api.default_page_size;
        let parse = |key: &str, default: i64| {
            query
                .get(key)
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v >= 0)
                .unwrap_or(default)
        };
        Self {
            limit: parse("limit", default_limit),
            offset: parse("offset", DEFAULT_OFFSET),
        }
    }

    fn slice(self, mut articles: Vec<Article>) -> Vec<Article> {
        // Newest update first; stable sort keeps tie order consistent
        // within a response
        articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        articles
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Global article listing. Unknown filter values yield an empty page, not
/// an error. `articlesCount` is the size of the returned page.
pub async fn list_articles(
    state: &AppState,
    filter: ArticleFilter,
    page: Page,
    viewer: Option<&User>,
) -> Result<ArticleListEnvelope, ApiError> {
    let candidates = select_candidates(state, &filter).await?;
    project_page(state, candidates, page, viewer).await
}

/// Feed: articles by authors the viewer follows. A viewer following
/// nobody gets an empty page without touching the article store.
pub async fn feed(
    state: &AppState,
    viewer: &User,
    page: Page,
) -> Result<ArticleListEnvelope, ApiError> {
    let followed = state.follows.followed_ids(viewer.id).await?;
    if followed.is_empty() {
        return Ok(ArticleListEnvelope::new(vec![]));
    }
    let candidates = state.articles.by_authors(&followed).await?;
    project_page(state, candidates, page, Some(viewer)).await
}

async fn select_candidates(
    state: &AppState,
    filter: &ArticleFilter,
) -> Result<Vec<Article>, ApiError> {
    if let Some(tag) = &filter.tag {
        return Ok(state.articles.with_tag(tag).await?);
    }
    if let Some(author) = &filter.author {
        return match state.users.by_username(author).await? {
            Some(user) => Ok(state.articles.by_author(user.id).await?),
            None => Ok(vec![]),
        };
    }
    if let Some(favorited) = &filter.favorited {
        return match state.users.by_username(favorited).await? {
            Some(user) => {
                let ids = state.favorites.article_ids_for(user.id).await?;
                Ok(state.articles.by_ids(&ids).await?)
            }
            None => Ok(vec![]),
        };
    }
    Ok(state.articles.all().await?)
}

async fn project_page(
    state: &AppState,
    candidates: Vec<Article>,
    page: Page,
    viewer: Option<&User>,
) -> Result<ArticleListEnvelope, ApiError> {
    let articles = page.slice(candidates);

    let mut author_ids: Vec<Uuid> = articles.iter().map(|a| a.author_id).collect();
    author_ids.sort();
    author_ids.dedup();
    let authors: HashMap<Uuid, User> = state
        .users
        .by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let relations = PageRelations::load(
        state.follows.as_ref(),
        state.favorites.as_ref(),
        viewer.map(|u| u.id),
        &articles,
    )
    .await?;

    let mut views = Vec::with_capacity(articles.len());
    for article in &articles {
        let author = authors.get(&article.author_id).ok_or(ApiError::Internal)?;
        views.push(ArticleView::new(article, author, relations.snapshot(article)));
    }

    Ok(ArticleListEnvelope::new(views))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::AppState;
    use chrono::{Duration, Utc};

    async fn register(state: &AppState, username: &str) -> User {
        state
            .users
            .insert(NewUser {
                email: format!("{username}@example.com"),
                username: username.to_string(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap()
    }

    async fn publish(state: &AppState, author: &User, title: &str, tags: &[&str], age_mins: i64) {
        let when = Utc::now() - Duration::minutes(age_mins);
        let article = Article {
            id: Uuid::new_v4(),
            author_id: author.id,
            slug: slug::slugify(title),
            title: title.to_string(),
            description: "d".to_string(),
            body: "b".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: when,
            updated_at: when,
        };
        state.articles.insert(&article).await.unwrap();
    }

    fn page(limit: i64, offset: i64) -> Page {
        Page { limit, offset }
    }

    #[tokio::test]
    async fn tag_filter_wins_over_author() {
        let state = AppState::memory();
        let anna = register(&state, "anna").await;
        publish(&state, &anna, "tagged elsewhere", &["rust"], 1).await;
        publish(&state, &anna, "by anna no tag", &[], 2).await;

        let filter = ArticleFilter {
            tag: Some("rust".to_string()),
            author: Some("anna".to_string()),
            favorited: None,
        };
        let result = list_articles(&state, filter, page(20, 0), None).await.unwrap();

        // Only the tag filter applies: anna's untagged article is excluded
        assert_eq!(result.articles_count, 1);
        assert_eq!(result.articles[0].title, "tagged elsewhere");
    }

    #[tokio::test]
    async fn results_are_descending_by_updated_at() {
        let state = AppState::memory();
        let anna = register(&state, "anna").await;
        publish(&state, &anna, "oldest", &[], 30).await;
        publish(&state, &anna, "newest", &[], 1).await;
        publish(&state, &anna, "middle", &[], 10).await;

        let result = list_articles(&state, ArticleFilter::default(), page(20, 0), None)
            .await
            .unwrap();
        let titles: Vec<&str> = result.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn pagination_slices_after_sorting() {
        let state = AppState::memory();
        let anna = register(&state, "anna").await;
        for i in 0..5 {
            publish(&state, &anna, &format!("a{i}"), &[], i).await;
        }

        let result = list_articles(&state, ArticleFilter::default(), page(2, 1), None)
            .await
            .unwrap();
        assert_eq!(result.articles_count, 2);
        assert_eq!(result.articles[0].title, "a1");
        assert_eq!(result.articles[1].title, "a2");
    }

    #[tokio::test]
    async fn unknown_filter_values_yield_empty_results() {
        let state = AppState::memory();
        let anna = register(&state, "anna").await;
        publish(&state, &anna, "exists", &["real"], 1).await;

        for filter in [
            ArticleFilter {
                tag: Some("no-such-tag".to_string()),
                ..Default::default()
            },
            ArticleFilter {
                author: Some("nobody".to_string()),
                ..Default::default()
            },
            ArticleFilter {
                favorited: Some("nobody".to_string()),
                ..Default::default()
            },
        ] {
            let result = list_articles(&state, filter, page(20, 0), None).await.unwrap();
            assert_eq!(result.articles_count, 0);
        }
    }

    #[tokio::test]
    async fn feed_without_follows_is_empty() {
        let state = AppState::memory();
        let anna = register(&state, "anna").await;
        let loner = register(&state, "loner").await;
        publish(&state, &anna, "unseen", &[], 1).await;

        let result = feed(&state, &loner, page(20, 0)).await.unwrap();
        assert_eq!(result.articles_count, 0);
        assert!(result.articles.is_empty());
    }

    #[tokio::test]
    async fn feed_is_restricted_to_followed_authors() {
        let state = AppState::memory();
        let anna = register(&state, "anna").await;
        let bob = register(&state, "bob").await;
        let reader = register(&state, "reader").await;
        publish(&state, &anna, "from anna", &[], 1).await;
        publish(&state, &bob, "from bob", &[], 2).await;

        state.follows.follow(reader.id, anna.id).await.unwrap();

        let result = feed(&state, &reader, page(20, 0)).await.unwrap();
        assert_eq!(result.articles_count, 1);
        assert_eq!(result.articles[0].title, "from anna");
        assert!(result.articles[0].author.following);
    }

    #[test]
    fn page_defaults_apply_to_invalid_values() {
        let mut query = HashMap::new();
        query.insert("limit".to_string(), "abc".to_string());
        query.insert("offset".to_string(), "-5".to_string());
        let page = Page::from_query(&query);
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);

        let page = Page::from_query(&HashMap::new());
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);
    }
}

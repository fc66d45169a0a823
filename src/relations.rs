//! Viewer-relative relationship facts. Loaded once per response and
//! handed to the projections, which never query on their own.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::Article;
use crate::store::{FavoriteStore, FollowStore, StoreResult};

/// Relationship facts for a single article as seen by one viewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationSnapshot {
    pub following: bool,
    pub favorited: bool,
    pub favorites_count: i64,
}

/// Snapshot for one article. Without a viewer, both booleans stay false
/// and only the aggregate count is read.
pub async fn article_snapshot(
    follows: &dyn FollowStore,
    favorites: &dyn FavoriteStore,
    viewer: Option<Uuid>,
    article: &Article,
) -> StoreResult<RelationSnapshot> {
    let favorites_count = favorites.count(article.id).await?;
    let (following, favorited) = match viewer {
        Some(viewer_id) => (
            follows.is_following(viewer_id, article.author_id).await?,
            favorites.is_favorited(viewer_id, article.id).await?,
        ),
        None => (false, false),
    };
    Ok(RelationSnapshot {
        following,
        favorited,
        favorites_count,
    })
}

/// Is the viewer following this profile? False without a viewer.
pub async fn profile_following(
    follows: &dyn FollowStore,
    viewer: Option<Uuid>,
    subject_id: Uuid,
) -> StoreResult<bool> {
    match viewer {
        Some(viewer_id) => follows.is_following(viewer_id, subject_id).await,
        None => Ok(false),
    }
}

/// Batched relationship facts for a page of articles: one pass per edge
/// kind instead of one round-trip per row.
pub struct PageRelations {
    following: HashMap<Uuid, bool>,
    favorited: HashSet<Uuid>,
    counts: HashMap<Uuid, i64>,
}

impl PageRelations {
    pub async fn load(
        follows: &dyn FollowStore,
        favorites: &dyn FavoriteStore,
        viewer: Option<Uuid>,
        articles: &[Article],
    ) -> StoreResult<Self> {
        let article_ids: Vec<Uuid> = articles.iter().map(|a| a.id).collect();
        let mut author_ids: Vec<Uuid> = articles.iter().map(|a| a.author_id).collect();
        author_ids.sort();
        author_ids.dedup();

        let counts = favorites.counts(&article_ids).await?;
        let (following, favorited) = match viewer {
            Some(viewer_id) => (
                follows.following_map(viewer_id, &author_ids).await?,
                favorites.favorited_set(viewer_id, &article_ids).await?,
            ),
            None => (HashMap::new(), HashSet::new()),
        };

        Ok(Self {
            following,
            favorited,
            counts,
        })
    }

    pub fn snapshot(&self, article: &Article) -> RelationSnapshot {
        RelationSnapshot {
            following: self
                .following
                .get(&article.author_id)
                .copied()
                .unwrap_or(false),
            favorited: self.favorited.contains(&article.id),
            favorites_count: self.counts.get(&article.id).copied().unwrap_or(0),
        }
    }
}

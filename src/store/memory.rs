use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{Article, Comment, NewUser, User};

use super::{
    ArticleStore, CommentStore, FavoriteStore, FollowStore, StoreError, StoreResult, UserStore,
};

/// In-memory backend. One mutex over all tables keeps every operation,
/// including insert-if-absent on edges, a single atomic step.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    articles: HashMap<Uuid, Article>,
    comments: HashMap<Uuid, Comment>,
    follows: HashSet<(Uuid, Uuid)>,
    favorites: HashSet<(Uuid, Uuid)>,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panicked holder must not wedge the whole backend; the tables
        // themselves are left consistent by every operation
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict {
                field: "email".to_string(),
            });
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict {
                field: "username".to_string(),
            });
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            bio: None,
            image: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.tables();
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Conflict {
                field: "email".to_string(),
            });
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert(&self, article: &Article) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.articles.values().any(|a| a.slug == article.slug) {
            return Err(StoreError::Conflict {
                field: "slug".to_string(),
            });
        }
        tables.articles.insert(article.id, article.clone());
        Ok(())
    }

    async fn by_slug(&self, slug: &str) -> StoreResult<Option<Article>> {
        Ok(self
            .tables()
            .articles
            .values()
            .find(|a| a.slug == slug)
            .cloned())
    }

    async fn update(&self, article: &Article) -> StoreResult<()> {
        self.tables().articles.insert(article.id, article.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables();
        tables.articles.remove(&id);
        tables.comments.retain(|_, c| c.article_id != id);
        tables.favorites.retain(|(_, article_id)| *article_id != id);
        Ok(())
    }

    async fn all(&self) -> StoreResult<Vec<Article>> {
        Ok(self.tables().articles.values().cloned().collect())
    }

    async fn by_author(&self, author_id: Uuid) -> StoreResult<Vec<Article>> {
        Ok(self
            .tables()
            .articles
            .values()
            .filter(|a| a.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn by_authors(&self, author_ids: &[Uuid]) -> StoreResult<Vec<Article>> {
        Ok(self
            .tables()
            .articles
            .values()
            .filter(|a| author_ids.contains(&a.author_id))
            .cloned()
            .collect())
    }

    async fn by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Article>> {
        Ok(self
            .tables()
            .articles
            .values()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn with_tag(&self, tag: &str) -> StoreResult<Vec<Article>> {
        Ok(self
            .tables()
            .articles
            .values()
            .filter(|a| a.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn distinct_tags(&self) -> StoreResult<Vec<String>> {
        let mut tags: Vec<String> = self
            .tables()
            .articles
            .values()
            .flat_map(|a| a.tags.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        tags.sort();
        Ok(tags)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert(&self, comment: &Comment) -> StoreResult<()> {
        self.tables().comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn by_id(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.tables().comments.get(&id).cloned())
    }

    async fn for_article(&self, article_id: Uuid) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .tables()
            .comments
            .values()
            .filter(|c| c.article_id == article_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.tables().comments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl FollowStore for MemoryStore {
    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool> {
        Ok(self.tables().follows.contains(&(follower_id, followed_id)))
    }

    async fn follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<()> {
        self.tables().follows.insert((follower_id, followed_id));
        Ok(())
    }

    async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<()> {
        self.tables().follows.remove(&(follower_id, followed_id));
        Ok(())
    }

    async fn following_map(
        &self,
        follower_id: Uuid,
        followed_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, bool>> {
        let tables = self.tables();
        Ok(followed_ids
            .iter()
            .map(|id| (*id, tables.follows.contains(&(follower_id, *id))))
            .collect())
    }

    async fn followed_ids(&self, follower_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .tables()
            .follows
            .iter()
            .filter(|(follower, _)| *follower == follower_id)
            .map(|(_, followed)| *followed)
            .collect())
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn is_favorited(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<bool> {
        Ok(self.tables().favorites.contains(&(user_id, article_id)))
    }

    async fn favorite(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<()> {
        self.tables().favorites.insert((user_id, article_id));
        Ok(())
    }

    async fn unfavorite(&self, user_id: Uuid, article_id: Uuid) -> StoreResult<()> {
        self.tables().favorites.remove(&(user_id, article_id));
        Ok(())
    }

    async fn count(&self, article_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .tables()
            .favorites
            .iter()
            .filter(|(_, a)| *a == article_id)
            .count() as i64)
    }

    async fn counts(&self, article_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        let tables = self.tables();
        Ok(article_ids
            .iter()
            .map(|id| {
                let n = tables.favorites.iter().filter(|(_, a)| a == id).count() as i64;
                (*id, n)
            })
            .collect())
    }

    async fn favorited_set(
        &self,
        user_id: Uuid,
        article_ids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        let tables = self.tables();
        Ok(article_ids
            .iter()
            .filter(|id| tables.favorites.contains(&(user_id, **id)))
            .copied()
            .collect())
    }

    async fn article_ids_for(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .tables()
            .favorites
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, a)| *a)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn follow_twice_leaves_one_edge() {
        let store = MemoryStore::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        store.follow(a, b).await.unwrap();
        store.follow(a, b).await.unwrap();
        assert!(store.is_following(a, b).await.unwrap());
        assert_eq!(store.followed_ids(a).await.unwrap().len(), 1);

        store.unfollow(a, b).await.unwrap();
        assert!(!store.is_following(a, b).await.unwrap());
        // Second unfollow is a harmless no-op
        store.unfollow(a, b).await.unwrap();
    }

    #[tokio::test]
    async fn favorite_count_is_edge_cardinality() {
        let store = MemoryStore::default();
        let article = Uuid::new_v4();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

        store.favorite(u1, article).await.unwrap();
        store.favorite(u1, article).await.unwrap();
        store.favorite(u2, article).await.unwrap();
        assert_eq!(store.count(article).await.unwrap(), 2);

        store.unfavorite(u1, article).await.unwrap();
        store.unfavorite(u1, article).await.unwrap();
        assert_eq!(store.count(article).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn store_survives_a_panicked_lock_holder() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.follow(a, b).await.unwrap();

        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.tables();
            panic!("poison the mutex");
        })
        .join();

        assert!(store.is_following(a, b).await.unwrap());
        store.unfollow(a, b).await.unwrap();
        assert!(!store.is_following(a, b).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let store = MemoryStore::default();
        let new = |email: &str, username: &str| NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "x".to_string(),
        };

        UserStore::insert(&store, new("a@example.com", "a")).await.unwrap();
        let dup_email = UserStore::insert(&store, new("a@example.com", "b")).await;
        assert!(matches!(dup_email, Err(StoreError::Conflict { field }) if field == "email"));
        let dup_name = UserStore::insert(&store, new("b@example.com", "a")).await;
        assert!(matches!(dup_name, Err(StoreError::Conflict { field }) if field == "username"));
    }
}

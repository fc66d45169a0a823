//! Response projections: pure shaping of stored entities plus a
//! relationship snapshot. Nothing in here touches a store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Article, Comment, User};
use crate::relations::RelationSnapshot;

/// Current-user envelope, returned by register/login/current-user/update.
#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub email: String,
    pub token: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl UserEnvelope {
    pub fn new(user: &User, token: String) -> Self {
        Self {
            user: UserView {
                email: user.email.clone(),
                token,
                username: user.username.clone(),
                bio: user.bio.clone(),
                image: user.image.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileEnvelope {
    pub profile: ProfileView,
}

impl ProfileEnvelope {
    pub fn new(user: &User, following: bool) -> Self {
        Self {
            profile: ProfileView::new(user, following),
        }
    }
}

/// Another user as seen by the viewer. Absent bio/image flatten to empty
/// strings.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub bio: String,
    pub image: String,
    pub following: bool,
}

impl ProfileView {
    pub fn new(user: &User, following: bool) -> Self {
        Self {
            username: user.username.clone(),
            bio: user.bio.clone().unwrap_or_default(),
            image: user.image.clone().unwrap_or_default(),
            following,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleEnvelope {
    pub article: ArticleView,
}

impl ArticleEnvelope {
    pub fn new(article: &Article, author: &User, rel: RelationSnapshot) -> Self {
        Self {
            article: ArticleView::new(article, author, rel),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleView {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(rename = "tagList")]
    pub tag_list: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub favorited: bool,
    #[serde(rename = "favoritesCount")]
    pub favorites_count: i64,
    pub author: ProfileView,
}

impl ArticleView {
    pub fn new(article: &Article, author: &User, rel: RelationSnapshot) -> Self {
        // Distinct tag names, first occurrence wins
        let mut tag_list: Vec<String> = Vec::with_capacity(article.tags.len());
        for tag in &article.tags {
            if !tag_list.contains(tag) {
                tag_list.push(tag.clone());
            }
        }

        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            body: article.body.clone(),
            tag_list,
            created_at: article.created_at,
            updated_at: article.updated_at,
            favorited: rel.favorited,
            favorites_count: rel.favorites_count,
            author: ProfileView::new(author, rel.following),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleListEnvelope {
    pub articles: Vec<ArticleView>,
    #[serde(rename = "articlesCount")]
    pub articles_count: usize,
}

impl ArticleListEnvelope {
    /// `articlesCount` reflects the size of the returned page.
    pub fn new(articles: Vec<ArticleView>) -> Self {
        let articles_count = articles.len();
        Self {
            articles,
            articles_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentEnvelope {
    pub comment: CommentView,
}

impl CommentEnvelope {
    pub fn new(comment: &Comment, author: &User, following: bool) -> Self {
        Self {
            comment: CommentView::new(comment, author, following),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub body: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub author: ProfileView,
}

impl CommentView {
    pub fn new(comment: &Comment, author: &User, following: bool) -> Self {
        Self {
            id: comment.id,
            body: comment.body.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            author: ProfileView::new(author, following),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentListEnvelope {
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
pub struct TagsEnvelope {
    pub tags: Vec<String>,
}

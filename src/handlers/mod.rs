pub mod articles;
pub mod comments;
pub mod favorites;
pub mod profiles;
pub mod tags;
pub mod users;

use crate::error::ApiError;
use crate::models::{Article, User};
use crate::store::AppState;

/// Author row for an article. A dangling author id means the store broke
/// an invariant, so it surfaces as an internal error.
pub(crate) async fn author_of(state: &AppState, article: &Article) -> Result<User, ApiError> {
    state
        .users
        .by_id(article.author_id)
        .await?
        .ok_or(ApiError::Internal)
}

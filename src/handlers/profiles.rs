// Profile handlers: viewer-relative reads plus idempotent follow edges.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};

use crate::error::ApiError;
use crate::middleware::{AuthContext, Viewer};
use crate::relations;
use crate::store::AppState;
use crate::views::ProfileEnvelope;

/// GET /api/profiles/:username - public; `following` is false without a
/// viewer.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let user = state
        .users
        .by_username(&username)
        .await?
        .ok_or(ApiError::NotFound)?;

    let following = relations::profile_following(
        state.follows.as_ref(),
        viewer.as_ref().map(|v| v.id),
        user.id,
    )
    .await?;

    Ok(Json(ProfileEnvelope::new(&user, following)))
}

/// POST /api/profiles/:username/follow - insert-if-absent; the response
/// always reflects the post-state.
pub async fn follow(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let target = state
        .users
        .by_username(&username)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.follows.follow(ctx.user.id, target.id).await?;

    Ok(Json(ProfileEnvelope::new(&target, true)))
}

/// DELETE /api/profiles/:username/follow - delete-if-present.
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let target = state
        .users
        .by_username(&username)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.follows.unfollow(ctx.user.id, target.id).await?;

    Ok(Json(ProfileEnvelope::new(&target, false)))
}

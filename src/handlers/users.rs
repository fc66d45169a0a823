// User account handlers: register, login, current user, partial update.

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;

use crate::auth;
use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::models::NewUser;
use crate::store::AppState;
use crate::validation::{self, FieldKind, FieldSpec, RequestShape, Shape};
use crate::views::UserEnvelope;

#[derive(Debug, Deserialize)]
pub struct RegisterEnvelope {
    user: RegisterUser,
}

#[derive(Debug, Deserialize)]
struct RegisterUser {
    email: String,
    username: String,
    password: String,
}

impl RequestShape for RegisterEnvelope {
    fn shape() -> Shape {
        Shape {
            envelope: "user",
            fields: vec![
                FieldSpec::required("email", FieldKind::String),
                FieldSpec::required("username", FieldKind::String),
                FieldSpec::required("password", FieldKind::String),
            ],
        }
    }
}

/// POST /api/users - register. Email and username are stored
/// lowercase-trimmed; duplicates surface as 409.
pub async fn register(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<UserEnvelope>, ApiError> {
    let req: RegisterEnvelope = validation::parse(&body).map_err(ApiError::Validation)?;

    let password_hash = bcrypt::hash(&req.user.password, bcrypt::DEFAULT_COST).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::Internal
    })?;

    let user = state
        .users
        .insert(NewUser {
            email: req.user.email.trim().to_lowercase(),
            username: req.user.username.trim().to_lowercase(),
            password_hash,
        })
        .await?;

    let token = auth::issue(user.id).map_err(|e| {
        tracing::error!("token issuance failed: {}", e);
        ApiError::Internal
    })?;
    Ok(Json(UserEnvelope::new(&user, token)))
}

#[derive(Debug, Deserialize)]
pub struct LoginEnvelope {
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    email: String,
    password: String,
}

impl RequestShape for LoginEnvelope {
    fn shape() -> Shape {
        Shape {
            envelope: "user",
            fields: vec![
                FieldSpec::required("email", FieldKind::String),
                FieldSpec::required("password", FieldKind::String),
            ],
        }
    }
}

/// POST /api/users/login - 401 on unknown email or wrong password,
/// indistinguishably.
pub async fn login(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<UserEnvelope>, ApiError> {
    let req: LoginEnvelope = validation::parse(&body).map_err(ApiError::Validation)?;

    let user = state
        .users
        .by_email(req.user.email.trim().to_lowercase().as_str())
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let valid = bcrypt::verify(&req.user.password, &user.password_hash).unwrap_or(false);
    if !valid {
        return Err(ApiError::Unauthenticated);
    }

    let token = auth::issue(user.id).map_err(|e| {
        tracing::error!("token issuance failed: {}", e);
        ApiError::Internal
    })?;
    Ok(Json(UserEnvelope::new(&user, token)))
}

/// GET /api/user - echo the authenticated user with the token the request
/// arrived with.
pub async fn current_user(
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<UserEnvelope>, ApiError> {
    Ok(Json(UserEnvelope::new(&ctx.user, ctx.token)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserEnvelope {
    user: UpdateUser,
}

#[derive(Debug, Deserialize)]
struct UpdateUser {
    email: Option<String>,
    bio: Option<String>,
    image: Option<String>,
}

impl RequestShape for UpdateUserEnvelope {
    fn shape() -> Shape {
        Shape {
            envelope: "user",
            fields: vec![
                FieldSpec::optional("email", FieldKind::String),
                FieldSpec::optional("bio", FieldKind::String),
                FieldSpec::optional("image", FieldKind::String),
            ],
        }
    }
}

/// PUT /api/user - partial update of email/bio/image. Supplying no fields
/// at all is a domain rule violation.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    body: String,
) -> Result<Json<UserEnvelope>, ApiError> {
    let req: UpdateUserEnvelope = validation::parse(&body).map_err(ApiError::Validation)?;

    if req.user.email.is_none() && req.user.bio.is_none() && req.user.image.is_none() {
        return Err(ApiError::domain_rule(
            "user",
            "At least one field must be updated",
        ));
    }

    let mut user = ctx.user;
    if let Some(email) = req.user.email {
        user.email = email.trim().to_lowercase();
    }
    if let Some(bio) = req.user.bio {
        user.bio = Some(bio);
    }
    if let Some(image) = req.user.image {
        user.image = Some(image);
    }
    state.users.update(&user).await?;

    Ok(Json(UserEnvelope::new(&user, ctx.token)))
}

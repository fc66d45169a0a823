use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::error::ApiError;
use crate::models::User;
use crate::store::AppState;

/// Resolved identity for the current request. Built exactly once by the
/// gate and read from request extensions downstream; never re-verified.
#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
    pub token: String,
}

/// Optional viewer, present on every request that passed the gate. Public
/// handlers use it to project viewer-relative fields.
#[derive(Clone)]
pub struct Viewer(pub Option<User>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Protected,
}

#[derive(Debug)]
enum PathPattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == *p,
            PathPattern::Prefix(p) => path.starts_with(p),
        }
    }
}

struct RouteRule {
    method: &'static str,
    pattern: PathPattern,
    access: Access,
}

const fn rule(method: &'static str, pattern: PathPattern, access: Access) -> RouteRule {
    RouteRule {
        method,
        pattern,
        access,
    }
}

/// Route classification table. First match wins; anything unmatched is
/// protected. The feed entry must precede the public articles prefix.
const ROUTE_TABLE: &[RouteRule] = &[
    rule(
        "GET",
        PathPattern::Exact("/api/articles/feed"),
        Access::Protected,
    ),
    rule("POST", PathPattern::Exact("/api/users"), Access::Public),
    rule(
        "POST",
        PathPattern::Exact("/api/users/login"),
        Access::Public,
    ),
    rule("GET", PathPattern::Prefix("/api/profiles/"), Access::Public),
    rule("GET", PathPattern::Exact("/api/articles"), Access::Public),
    rule("GET", PathPattern::Prefix("/api/articles/"), Access::Public),
    rule("GET", PathPattern::Exact("/api/tags"), Access::Public),
    rule("GET", PathPattern::Exact("/"), Access::Public),
    rule("GET", PathPattern::Exact("/health"), Access::Public),
];

/// Pure classification of (method, path) against the fixed table.
pub fn is_public(method: &str, path: &str) -> bool {
    for rule in ROUTE_TABLE {
        if rule.method == method && rule.pattern.matches(path) {
            return rule.access == Access::Public;
        }
    }
    false
}

/// Per-request authentication gate.
///
/// Any Authorization header present is verified, even on public routes -
/// the raw header value is the token, no scheme prefix. An invalid token
/// or an unknown subject is always 401. A missing header is only allowed
/// on public routes.
pub async fn auth_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let context = match token {
        Some(token) => {
            let subject = auth::verify(&token).map_err(|_| ApiError::Unauthenticated)?;
            let user = state
                .users
                .by_id(subject)
                .await?
                .ok_or(ApiError::Unauthenticated)?;
            Some(AuthContext { user, token })
        }
        None => None,
    };

    if context.is_none() && !is_public(&method, &path) {
        return Err(ApiError::Unauthenticated);
    }

    request
        .extensions_mut()
        .insert(Viewer(context.as_ref().map(|c| c.user.clone())));
    if let Some(context) = context {
        request.extensions_mut().insert(context);
    }

    Ok(next.run(request).await)
}

// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::store::StoreError;

/// HTTP API error with appropriate status codes and client-safe bodies.
///
/// Two 422 body shapes exist: structural validation failures carry a flat
/// list of `"<path>: <kind>"` strings, domain rule violations (and 409
/// conflicts) carry a field-keyed message map.
#[derive(Debug)]
pub enum ApiError {
    // 422 Unprocessable Entity (request body does not match its schema)
    Validation(Vec<String>),

    // 422 Unprocessable Entity (well-formed but breaks a domain rule)
    DomainRule { field: String, message: String },

    // 409 Conflict (uniqueness violation, e.g. duplicate email)
    Conflict { field: String, message: String },

    // 401 Unauthorized
    Unauthenticated,

    // 403 Forbidden (authenticated but not the owning actor)
    Forbidden,

    // 404 Not Found
    NotFound,

    // 500 Internal Server Error - detail stays server-side
    Internal,
}

impl ApiError {
    pub fn domain_rule(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::DomainRule {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DomainRule { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for the error, or None for status-only responses.
    pub fn body(&self) -> Option<Value> {
        match self {
            ApiError::Validation(messages) => Some(json!({ "errors": messages })),
            ApiError::DomainRule { field, message } | ApiError::Conflict { field, message } => {
                Some(json!({ "errors": { field.as_str(): [message] } }))
            }
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => {
                ApiError::conflict(field, "has already been taken")
            }
            StoreError::Sqlx(e) => {
                // Log the real error but return a generic response
                tracing::error!("database error: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(messages) => write!(f, "validation failed: {}", messages.join(", ")),
            ApiError::DomainRule { field, message } => write!(f, "{}: {}", field, message),
            ApiError::Conflict { field, message } => write!(f, "{}: {}", field, message),
            ApiError::Unauthenticated => write!(f, "unauthenticated"),
            ApiError::Forbidden => write!(f, "forbidden"),
            ApiError::NotFound => write!(f, "not found"),
            ApiError::Internal => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        match self.body() {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_body_is_a_list() {
        let err = ApiError::Validation(vec!["user.email: PropertyRequired".to_string()]);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.body().unwrap(),
            json!({ "errors": ["user.email: PropertyRequired"] })
        );
    }

    #[test]
    fn domain_rule_body_is_a_field_map() {
        let err = ApiError::domain_rule("user", "At least one field must be updated");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.body().unwrap(),
            json!({ "errors": { "user": ["At least one field must be updated"] } })
        );
    }

    #[test]
    fn auth_errors_have_no_body() {
        assert!(ApiError::Unauthenticated.body().is_none());
        assert!(ApiError::Forbidden.body().is_none());
        assert!(ApiError::NotFound.body().is_none());
    }

    #[test]
    fn store_conflict_maps_to_409() {
        let err: ApiError = StoreError::Conflict { field: "email".to_string() }.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}

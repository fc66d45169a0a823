use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Token payload. Carries the subject id and standard timestamps, nothing
/// else - profile data is always re-read from the store.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: Uuid) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self {
            sub: subject,
            iat: now.timestamp(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("token generation failed: {0}")]
    Generation(String),
}

/// Issue a signed token for the given subject id.
pub fn issue(subject: Uuid) -> Result<String, TokenError> {
    let secret = &config::config().security.jwt_secret;
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), &Claims::new(subject), &encoding_key)
        .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Verify a token and return the subject id it was issued for. Bad
/// signature, malformed payload and expiry all collapse to `Invalid`.
pub fn verify(token: &str) -> Result<Uuid, TokenError> {
    let secret = &config::config().security.jwt_secret;
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|_| TokenError::Invalid)?;

    Ok(token_data.claims.sub)
}

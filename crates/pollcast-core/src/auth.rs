//! Session tokens.
//!
//! The OAuth sign-in itself happens elsewhere; it hands the BFF an HS256
//! token carrying the provider subject and the id token to forward upstream.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// OAuth provider account id.
    pub sub: String,
    /// Identity token forwarded to the remote API as a bearer token.
    pub id_token: String,
    pub exp: i64,
}

pub fn create_session_token(
    sub: &str,
    id_token: &str,
    secret: &str,
    expiry_seconds: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiry = i64::try_from(expiry_seconds).unwrap_or(i64::MAX / 2);
    let claims = Claims {
        sub: sub.to_string(),
        id_token: id_token.to_string(),
        exp: chrono::Utc::now().timestamp().saturating_add(expiry),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn validate_session_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

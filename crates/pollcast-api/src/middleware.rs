use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use axum_extra::extract::CookieJar;
use pollcast_core::AppState;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "pollcast_session";
const CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// An authenticated viewer.
pub struct Session {
    pub sub: String,
    pub id_token: String,
}

/// The viewer's session when one is present and valid.
pub struct MaybeSession(pub Option<Session>);

fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::to_string);
    if bearer.is_some() {
        return bearer;
    }
    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn validate_session(parts: &Parts, state: &AppState) -> Result<Session, ApiError> {
    let token = session_token(parts).ok_or(ApiError::Unauthorized)?;
    let claims = pollcast_core::auth::validate_session_token(&token, &state.config.session_secret)
        .map_err(|_| ApiError::Unauthorized)?;

    if !state.config.is_whitelisted(&claims.sub) {
        tracing::warn!("session rejected: account is not whitelisted");
        return Err(ApiError::Unauthorized);
    }

    Ok(Session {
        sub: claims.sub,
        id_token: claims.id_token,
    })
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        validate_session(parts, state)
    }
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(validate_session(parts, state).ok()))
    }
}

/// Client address as reported by the edge proxy. Empty when absent.
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .headers
            .get(CLIENT_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(ClientIp(ip))
    }
}

/// JSON body extractor whose rejections are reported as 400.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(ValidJson(value))
    }
}

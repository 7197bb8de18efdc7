use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::headers::{authorization::Bearer, Authorization, Cookie, HeaderMapExt};
use tracing::warn;

use super::{claims::Identity, session::SessionKeys};
use crate::error::AppError;

/// Session state for the current request. Never rejects: a missing or
/// invalid token is simply the signed-out case.
#[derive(Debug, Clone)]
pub struct Session(pub Option<Identity>);

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub fn user(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

/// Requires a signed-in user.
#[derive(Debug, Clone)]
pub struct SessionUser(pub Identity);

fn token_from_parts(parts: &Parts, cookie_name: &str) -> Option<String> {
    if let Some(Authorization(bearer)) = parts.headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }
    parts
        .headers
        .typed_get::<Cookie>()?
        .get(cookie_name)
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let Some(token) = token_from_parts(parts, &keys.cookie_name) else {
            return Ok(Session(None));
        };
        match keys.verify(&token) {
            Ok(claims) => Ok(Session(Some(claims.into()))),
            Err(e) => {
                warn!(error = %e, "invalid or expired session");
                Ok(Session(None))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Session(identity) = Session::from_request_parts(parts, state)
            .await
            .unwrap_or(Session(None));
        identity.map(SessionUser).ok_or(AppError::Unauthenticated)
    }
}

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::routes::auth::claims::Claims;
use crate::services::AuthContext;
use crate::utils::jwt::{decode_jwt, JwtKeyProvider};

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl AuthSession {
    pub fn context(&self) -> Result<AuthContext, StatusCode> {
        let identity_id = Uuid::parse_str(&self.0.id).map_err(|_| StatusCode::UNAUTHORIZED)?;
        Ok(AuthContext {
            identity_id,
            email: self.0.email.clone(),
            display_name: self.0.name.clone(),
        })
    }
}

fn session_from_parts<S: JwtKeyProvider>(parts: &Parts, state: &S) -> Option<AuthSession> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(AUTH_COOKIE)?;
    let data = decode_jwt(
        token.value(),
        state.jwt_keys(),
        state.jwt_issuer(),
        state.jwt_audience(),
    )
    .ok()?;
    Some(AuthSession(data.claims))
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync + JwtKeyProvider,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state).ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Anonymous callers (no cookie or an unusable one) extract as `None`.
impl<S> OptionalFromRequestParts<S> for AuthSession
where
    S: Send + Sync + JwtKeyProvider,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(session_from_parts(parts, state))
    }
}

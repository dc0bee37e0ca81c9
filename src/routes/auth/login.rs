use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};

use super::{claims::Claims, session::AUTH_COOKIE};
use crate::{
    errors::AppError,
    services::{identity::sign_in, with_timeout},
    state::AppState,
    utils::jwt::create_jwt,
};

#[derive(Deserialize, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

pub async fn handle_login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, AppError> {
    let identity = with_timeout(
        app_state.config.operation_timeout,
        sign_in(
            app_state.identity_repo.as_ref(),
            &payload.email,
            &payload.password,
        ),
    )
    .await?;

    let expires_in = if payload.remember {
        Duration::days(30)
    } else {
        Duration::days(7)
    };

    let claims = Claims {
        id: identity.id.to_string(),
        email: identity.email.clone(),
        name: identity.display_name.clone(),
        exp: (OffsetDateTime::now_utc() + expires_in).unix_timestamp() as usize,
        iss: String::new(),
        aud: String::new(),
    };

    let token = create_jwt(
        claims,
        &app_state.jwt_keys,
        &app_state.config.jwt_issuer,
        &app_state.config.jwt_audience,
    )
    .map_err(|e| {
        error!(error = %e, "JWT generation failed");
        AppError::Internal("Token generation failed".into())
    })?;

    let cookie = Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .secure(app_state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(expires_in)
        .build();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| AppError::Internal(format!("invalid cookie header: {e}")))?,
    );

    info!(identity_id = %identity.id, "signed in");
    Ok((
        StatusCode::OK,
        headers,
        Json(json!({
            "success": true,
            "user": identity,
        })),
    )
        .into_response())
}

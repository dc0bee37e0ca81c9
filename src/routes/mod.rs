use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post, put},
    Json, Router,
};

use crate::errors::AppError;
use crate::services::AuthContext;
use crate::state::AppState;

pub mod accept_invite;
pub mod activity;
pub mod audit;
pub mod auth;
pub mod billing;
pub mod invitations;
pub mod workspaces;

use auth::session::AuthSession;

pub(crate) fn auth_context(session: &AuthSession) -> Result<AuthContext, AppError> {
    session
        .context()
        .map_err(|_| AppError::Unauthorized("Invalid session".into()))
}

/// Malformed bodies become the same `{success:false, error, code}` shape as
/// every other validation failure.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// API routes without transport layers (CORS, tracing, rate limiting), which
/// `main` adds around this router.
pub fn api_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::handle_login))
        .route("/logout", post(auth::handle_logout));

    let workspace_routes = Router::new()
        .route("/{workspace_id}/billing", get(billing::get_billing))
        .route("/{workspace_id}/plan", put(workspaces::update_plan))
        .route("/{workspace_id}/members", get(workspaces::list_members))
        .route(
            "/{workspace_id}/members/{user_id}/role",
            put(workspaces::update_member_role),
        )
        .route(
            "/{workspace_id}/members/{user_id}/status",
            put(workspaces::update_member_status),
        )
        .route(
            "/{workspace_id}/invitations",
            get(invitations::list_invitations).post(invitations::create_invitation),
        )
        .route(
            "/{workspace_id}/invitations/{invite_id}/resend",
            post(invitations::resend_invitation),
        )
        .route(
            "/{workspace_id}/invitations/{invite_id}/cancel",
            post(invitations::cancel_invitation),
        )
        .route("/{workspace_id}/audit-logs", get(audit::list_audit_logs));

    Router::new()
        .route("/api/accept-invite", post(accept_invite::accept_invite))
        .route("/api/invitations/{token}", get(accept_invite::preview_invite))
        .route("/api/workspace/resolve", post(workspaces::resolve_workspace))
        .route("/api/activity", post(activity::record_activity))
        .nest("/api/auth", auth_routes)
        .nest("/api/workspaces", workspace_routes)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, Response},
    };
    use axum_extra::extract::cookie::Cookie;
    use serde_json::Value;
    use time::OffsetDateTime;

    use crate::routes::auth::{claims::Claims, session::AUTH_COOKIE};
    use crate::services::AuthContext;
    use crate::state::AppState;
    use crate::utils::jwt::create_jwt;

    pub fn session_cookie(state: &AppState, auth: &AuthContext) -> String {
        let claims = Claims {
            id: auth.identity_id.to_string(),
            email: auth.email.clone(),
            name: auth.display_name.clone(),
            exp: (OffsetDateTime::now_utc().unix_timestamp() + 3600) as usize,
            iss: String::new(),
            aud: String::new(),
        };
        let token = create_jwt(
            claims,
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .unwrap();
        Cookie::new(AUTH_COOKIE, token).to_string()
    }

    pub fn json_request(
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = body
            .map(|value| Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap_or_else(Body::empty);
        builder.body(body).unwrap()
    }

    pub async fn body_json(res: Response<Body>) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

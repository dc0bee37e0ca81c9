use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("workspace provisioning failed: {0}")]
    Provisioning(StoreError),
    #[error("This invitation is invalid or has expired")]
    InvalidOrExpiredInvitation,
    #[error("no plan limits configured for subscription plan '{0}'")]
    UnknownPlan(String),
    #[error("{0}")]
    Validation(String),
    #[error("invitation email could not be delivered: {0}")]
    DownstreamSendFailure(String),
    #[error("Invitation is no longer pending")]
    InvitationNotPending,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Unauthorized(String),
    #[error("The operation timed out; please retry")]
    Timeout,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidOrExpiredInvitation => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvitationNotPending => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Provisioning(_)
            | AppError::UnknownPlan(_)
            | AppError::DownstreamSendFailure(_)
            | AppError::Store(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Provisioning(_) => "provisioning_failed",
            AppError::InvalidOrExpiredInvitation => "invalid_or_expired_invitation",
            AppError::UnknownPlan(_) => "unknown_plan",
            AppError::Validation(_) => "validation_error",
            AppError::DownstreamSendFailure(_) => "email_send_failed",
            AppError::InvitationNotPending => "invitation_not_pending",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Timeout => "timeout",
            AppError::Store(_) => "store_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Timeout
                | AppError::Store(StoreError::Unavailable(_))
                | AppError::Provisioning(StoreError::Unavailable(_))
        )
    }

    /// Server-side failures keep their detail in the logs, not the body.
    fn public_message(&self) -> String {
        match self {
            AppError::Provisioning(_) => "Unable to set up your workspace. Please try again.".into(),
            AppError::UnknownPlan(_) => "Billing is not configured for this workspace's plan".into(),
            AppError::Store(_) | AppError::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        let body = json!({
            "success": false,
            "error": self.public_message(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

use std::{future::Future, time::Duration};

use uuid::Uuid;

use crate::errors::AppError;

pub mod access;
pub mod activity;
pub mod audit;
pub mod billing;
pub mod identity;
pub mod invitations;
pub mod members;
pub mod resolver;
pub mod smtp_mailer;

/// The authenticated caller as seen by the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub identity_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

/// Bounds a multi-step operation so a stalled dependency surfaces as a
/// retryable `Timeout` instead of hanging the request.
pub async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "operation timed out");
            Err(AppError::Timeout)
        }
    }
}

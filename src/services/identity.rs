use tracing::{error, warn};

use crate::db::identity_repository::IdentityRepository;
use crate::errors::AppError;
use crate::models::identity::Identity;
use crate::utils::{password::verify_password, validation::normalize_email};

/// Password sign-in. Unknown email and wrong password are indistinguishable
/// to the caller.
pub async fn sign_in(
    identities: &dyn IdentityRepository,
    email: &str,
    password: &str,
) -> Result<Identity, AppError> {
    let email = normalize_email(email);
    let Some(identity) = identities.find_identity_by_email(&email).await? else {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    match verify_password(password, &identity.password_hash) {
        Ok(true) => Ok(identity),
        Ok(false) => Err(AppError::Unauthorized("Invalid credentials".into())),
        Err(err) => {
            error!(identity_id = %identity.id, error = %err, "stored password hash is unreadable");
            Err(AppError::Internal("password verification failed".into()))
        }
    }
}

/// Removes an identity created earlier in a flow that then failed. Failure
/// to clean up is logged; the original error is what the caller sees.
pub async fn compensate_identity(identities: &dyn IdentityRepository, identity: &Identity) {
    if let Err(err) = identities.delete_identity(identity.id).await {
        warn!(
            identity_id = %identity.id,
            error = %err,
            "failed to remove identity after aborted provisioning"
        );
    }
}

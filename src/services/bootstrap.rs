//! Optional initial admin account, created at startup.
//!
//! Without an admin nobody can approve properties or change roles, so a fresh
//! deployment may name one through configuration. The account is signed in
//! (or signed up), promoted if its profile is not already `admin`, and signed
//! out again. Hosted projects usually reject self-promotion; in that case the
//! failure is reported and the operator promotes the account by hand.

use crate::baas::{AuthGrant, AuthProvider, BaasError, Backend, Caller, DataStore, SignUp};
use crate::config::AdminSeed;
use crate::model::Role;
use crate::services::auth::normalize_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    AlreadyAdmin,
    /// Signed up with the admin role already in place.
    Created,
    Promoted,
    /// Signed up, but the backend wants the email confirmed first.
    AwaitingVerification,
}

/// # Errors
///
/// Returns the backend error from sign-in, sign-up or promotion.
pub async fn ensure_initial_admin(backend: &dyn Backend, seed: &AdminSeed) -> Result<BootstrapOutcome, BaasError> {
    let email = normalize_email(&seed.email).unwrap_or_else(|| seed.email.trim().to_owned());

    let (grant, created) = match backend.sign_in(&email, &seed.password).await {
        Ok(grant) => (grant, false),
        Err(sign_in_err) => {
            tracing::debug!(error = %sign_in_err, "bootstrap admin sign-in failed, signing up");
            match backend.sign_up(&email, &seed.password, Role::Admin).await? {
                SignUp::Confirmed(grant) => (grant, true),
                SignUp::PendingVerification(identity) => {
                    tracing::warn!(email = %identity.email, "bootstrap admin must confirm their email before promotion");
                    return Ok(BootstrapOutcome::AwaitingVerification);
                }
            }
        }
    };

    let outcome = promote(backend, &grant).await.map(|outcome| match outcome {
        BootstrapOutcome::AlreadyAdmin if created => BootstrapOutcome::Created,
        other => other,
    });
    if let Err(e) = backend.sign_out(&grant.access_token).await {
        tracing::warn!(error = %e, "bootstrap admin sign-out failed");
    }
    outcome
}

async fn promote(backend: &dyn Backend, grant: &AuthGrant) -> Result<BootstrapOutcome, BaasError> {
    let caller = Caller::User(grant.access_token.clone());
    let current = backend
        .fetch_profile(&caller, grant.user.id)
        .await?
        .map(|p| p.role)
        .unwrap_or_default();
    if current == Role::Admin {
        return Ok(BootstrapOutcome::AlreadyAdmin);
    }
    backend.update_user_role(&caller, grant.user.id, Role::Admin).await?;
    tracing::info!(user_id = %grant.user.id, "bootstrap admin promoted");
    Ok(BootstrapOutcome::Promoted)
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;

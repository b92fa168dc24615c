//! Account flows: registration, sign-in, admin sign-in, sign-out and password
//! recovery.
//!
//! Local checks (email shape, password confirmation, role choice) run before
//! any backend call. Backend messages are passed through untouched.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::baas::{AccessToken, AuthIdentity, AuthProvider, Backend, BaasError, Caller, DataStore, SignUp};
use crate::model::Role;
use crate::notice::ErrorCode;
use crate::services::session::{Session, SessionStore, SessionUser};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters long.")]
    PasswordTooShort,
    #[error("Accounts can only be registered as guest or owner.")]
    RoleNotSelfAssignable,
    #[error("You do not have administrative privileges to access this panel.")]
    AccessDenied,
    #[error("You must be logged in to do that.")]
    NotSignedIn,
    #[error(transparent)]
    Baas(#[from] BaasError),
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail | Self::PasswordMismatch | Self::PasswordTooShort | Self::RoleNotSelfAssignable => {
                "E_VALIDATION"
            }
            Self::AccessDenied => "E_ACCESS_DENIED",
            Self::NotSignedIn => "E_NOT_SIGNED_IN",
            Self::Baas(e) => e.error_code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail | Self::PasswordMismatch | Self::PasswordTooShort | Self::RoleNotSelfAssignable => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::NotSignedIn => StatusCode::UNAUTHORIZED,
            Self::Baas(e) => e.status(),
        }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return None;
    }
    let parts = normalized.split('@').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return None;
    }
    Some(normalized)
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    Ok(())
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A session opened by a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Registered {
    SignedIn {
        #[serde(skip)]
        token: String,
        user: SessionUser,
    },
    /// The backend wants the address confirmed before the first sign-in.
    VerifyEmail { email: String },
}

// =============================================================================
// FLOWS
// =============================================================================

/// Look up the profile role for a freshly authenticated identity.
///
/// A missing profile row is treated as a guest.
async fn session_user(backend: &dyn Backend, token: &AccessToken, identity: AuthIdentity) -> Result<SessionUser, AuthError> {
    let caller = Caller::User(token.clone());
    let profile = backend.fetch_profile(&caller, identity.id).await?;
    let role = profile.map(|p| p.role).unwrap_or_default();
    Ok(SessionUser { id: identity.id, email: identity.email, role })
}

/// Create an account and, when no email confirmation is pending, sign it in.
///
/// # Errors
///
/// Invalid email, mismatched or short passwords, a role the visitor may
/// not pick, or a rejected sign-up.
pub async fn register(
    backend: &dyn Backend,
    sessions: &SessionStore,
    form: Registration,
    previous: Option<&str>,
) -> Result<Registered, AuthError> {
    let email = normalize_email(&form.email).ok_or(AuthError::InvalidEmail)?;
    check_new_password(&form.password, &form.confirm_password)?;
    if !form.role.self_assignable() {
        return Err(AuthError::RoleNotSelfAssignable);
    }

    match backend.sign_up(&email, &form.password, form.role).await? {
        SignUp::Confirmed(grant) => {
            let user = session_user(backend, &grant.access_token, grant.user).await?;
            let token = sessions
                .open(Session::signed_in(user.clone(), grant.access_token), previous)
                .await;
            Ok(Registered::SignedIn { token, user })
        }
        SignUp::PendingVerification(identity) => Ok(Registered::VerifyEmail { email: identity.email }),
    }
}

/// Sign in and open a fresh session, carrying over any `previous` wizard.
///
/// # Errors
///
/// `InvalidEmail`, or the backend's refusal of the credentials.
pub async fn login(
    backend: &dyn Backend,
    sessions: &SessionStore,
    credentials: &Credentials,
    previous: Option<&str>,
) -> Result<SignedIn, AuthError> {
    let email = normalize_email(&credentials.email).ok_or(AuthError::InvalidEmail)?;
    let grant = backend.sign_in(&email, &credentials.password).await?;
    let user = session_user(backend, &grant.access_token, grant.user).await?;
    let token = sessions
        .open(Session::signed_in(user.clone(), grant.access_token), previous)
        .await;
    Ok(SignedIn { token, user })
}

/// Sign in, then refuse anyone who is not an admin.
///
/// A refused sign-in is signed straight back out.
///
/// # Errors
///
/// `AccessDenied` for non-admins, plus everything [`login`] returns.
pub async fn admin_login(
    backend: &dyn Backend,
    sessions: &SessionStore,
    credentials: &Credentials,
    previous: Option<&str>,
) -> Result<SignedIn, AuthError> {
    let signed_in = login(backend, sessions, credentials, previous).await?;
    if signed_in.user.role == Role::Admin {
        return Ok(signed_in);
    }
    tracing::warn!(user_id = %signed_in.user.id, "admin login refused for non-admin");
    logout(backend, sessions, &signed_in.token).await;
    Err(AuthError::AccessDenied)
}

/// Drop the local session and revoke its backend token.
///
/// Revocation failures are logged and otherwise ignored.
pub async fn logout(backend: &dyn Backend, sessions: &SessionStore, token: &str) {
    let Some(session) = sessions.close(token).await else {
        return;
    };
    if let Some(access_token) = session.access_token()
        && let Err(e) = backend.sign_out(access_token).await
    {
        if e.is_unauthorized() {
            tracing::debug!("backend token already expired at sign-out");
        } else {
            tracing::warn!(error = %e, "backend sign-out failed");
        }
    }
}

/// Ask the backend to email a recovery link.
///
/// # Errors
///
/// `InvalidEmail`, or a backend failure sending the mail.
pub async fn request_password_reset(backend: &dyn Backend, email: &str, redirect_to: &str) -> Result<(), AuthError> {
    let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
    backend.request_password_reset(&email, redirect_to).await?;
    Ok(())
}

/// Exchange an emailed recovery token for a recovery session.
///
/// # Errors
///
/// Fails when the backend no longer recognises the recovery token.
pub async fn begin_recovery(
    backend: &dyn Backend,
    sessions: &SessionStore,
    recovery_token: &str,
    previous: Option<&str>,
) -> Result<SignedIn, AuthError> {
    let access_token = AccessToken::new(recovery_token.trim());
    let identity = backend.get_user(&access_token).await?;
    let user = session_user(backend, &access_token, identity).await?;
    let mut session = Session::signed_in(user.clone(), access_token);
    session.recovery = true;
    let token = sessions.open(session, previous).await;
    Ok(SignedIn { token, user })
}

/// Set a new password for the session's user, then end the session.
///
/// # Errors
///
/// Password checks, `NotSignedIn` without a live session, or the
/// backend rejecting the update.
pub async fn update_password(
    backend: &dyn Backend,
    sessions: &SessionStore,
    token: Option<&str>,
    password: &str,
    confirm: &str,
) -> Result<(), AuthError> {
    check_new_password(password, confirm)?;
    let token = token.ok_or(AuthError::NotSignedIn)?;
    let session = sessions.get(token).await.ok_or(AuthError::NotSignedIn)?;
    let access_token = session.access_token().ok_or(AuthError::NotSignedIn)?;
    backend.update_password(access_token, password).await?;
    logout(backend, sessions, token).await;
    Ok(())
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

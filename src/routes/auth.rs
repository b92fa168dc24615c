//! Auth routes: registration, sign-in, sign-out, password recovery and the
//! cookie session extractors every other route builds on.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::access::{self, Access, LOGIN_PATH, Screen};
use crate::baas::Caller;
use crate::model::Role;
use crate::notice::{ApiError, Notice, Reply, SessionRejected};
use crate::services::auth::{self as auth_svc, AuthError, Credentials, Registered, Registration};
use crate::services::session::{SESSION_MAX_AGE_DAYS, Session, SessionUser};
use crate::state::AppState;

pub const COOKIE_NAME: &str = "session_token";

pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(SESSION_MAX_AGE_DAYS))
        .build()
}

pub(crate) fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Whatever session the cookie points at, if any. Never rejects.
pub struct CurrentSession {
    pub token: Option<String>,
    pub session: Option<Session>,
}

impl CurrentSession {
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().and_then(|s| s.user.as_ref())
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    #[must_use]
    pub fn caller(&self) -> Caller {
        self.session.as_ref().map_or(Caller::Anonymous, Session::caller)
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = cookie_token(&CookieJar::from_headers(&parts.headers));
        let session = match &token {
            Some(token) => AppState::from_ref(state).sessions.get(token).await,
            None => None,
        };
        Ok(Self { token, session })
    }
}

fn cookie_token(jar: &CookieJar) -> Option<String> {
    jar.get(COOKIE_NAME)
        .map(Cookie::value)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Middleware: when a handler reports that the backend rejected the session's
/// token, drop the local session and clear the cookie.
pub(crate) async fn close_rejected_sessions(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = cookie_token(&CookieJar::from_headers(request.headers()));
    let mut response = next.run(request).await;
    if response.extensions().get::<SessionRejected>().is_none() {
        return response;
    }
    if let Some(token) = token
        && let Some(closed) = state.sessions.close(&token).await
    {
        tracing::info!(user_id = ?closed.user.map(|u| u.id), "closed session with rejected token");
    }
    if let Ok(cleared) = HeaderValue::from_str(&cleared_cookie(state.config.cookie_secure).to_string()) {
        response.headers_mut().append(header::SET_COOKIE, cleared);
    }
    response
}

/// A signed-in visitor allowed onto a gated screen.
#[derive(Debug, Clone)]
pub struct Member {
    pub user: SessionUser,
    pub caller: Caller,
    pub token: String,
}

/// Apply the screen table to the current session.
///
/// Anonymous visitors are sent to login with `path` remembered; signed-in
/// visitors with the wrong role are sent to their own dashboard.
pub(crate) fn gate(current: &CurrentSession, screen: Screen, path: &str) -> Result<Member, ApiError> {
    match access::authorize(screen, current.role(), path) {
        Access::Granted => {}
        Access::SignIn { from, .. } => return Err(ApiError::redirect(login_redirect(&from))),
        Access::Redirect { to } => return Err(ApiError::redirect(to)),
    }
    match (&current.token, current.user()) {
        (Some(token), Some(user)) => Ok(Member { user: user.clone(), caller: current.caller(), token: token.clone() }),
        _ => Err(ApiError::redirect(login_redirect(path))),
    }
}

/// `/login?from=...` with the remembered path query-encoded.
#[must_use]
pub(crate) fn login_redirect(from: &str) -> String {
    match reqwest::Url::parse_with_params("http://localhost/", &[("from", from)]) {
        Ok(url) => format!("{LOGIN_PATH}?{}", url.query().unwrap_or_default()),
        Err(_) => LOGIN_PATH.to_owned(),
    }
}

// =============================================================================
// BODIES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Path remembered when the visitor was sent to login.
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RecoveryForm {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct SignedInBody {
    pub user: SessionUser,
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct RedirectBody {
    pub redirect: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MeBody {
    pub user: Option<SessionUser>,
    pub dashboard: Option<&'static str>,
    pub recovery: bool,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

fn welcome_aboard() -> Notice {
    Notice::success("Welcome aboard!", "Your account has been created. Please check your email to verify.")
}

fn welcome_back() -> Notice {
    Notice::success("Welcome back!", "You have successfully logged in.")
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/register`
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn register(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<Registration>,
) -> Result<(CookieJar, Reply<Registered>), ApiError> {
    let outcome = auth_svc::register(&*state.backend, &state.sessions, form, current.token.as_deref())
        .await
        .map_err(|e| ApiError::from_error("Registration Failed", &e))?;
    let jar = match &outcome {
        Registered::SignedIn { token, .. } => {
            CookieJar::new().add(session_cookie(token.clone(), state.config.cookie_secure))
        }
        Registered::VerifyEmail { .. } => CookieJar::new(),
    };
    Ok((jar, Reply::with_notice(outcome, welcome_aboard())))
}

/// `POST /api/auth/login`
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn login(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<LoginForm>,
) -> Result<(CookieJar, Reply<SignedInBody>), ApiError> {
    let credentials = Credentials { email: form.email, password: form.password };
    let signed_in = auth_svc::login(&*state.backend, &state.sessions, &credentials, current.token.as_deref())
        .await
        .map_err(|e| ApiError::from_error("Login Failed", &e))?;
    let redirect = access::post_login_target(signed_in.user.role, form.from.as_deref());
    let jar = CookieJar::new().add(session_cookie(signed_in.token, state.config.cookie_secure));
    Ok((jar, Reply::with_notice(SignedInBody { user: signed_in.user, redirect }, welcome_back())))
}

/// `POST /api/auth/admin-login`
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn admin_login(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<LoginForm>,
) -> Result<(CookieJar, Reply<SignedInBody>), ApiError> {
    let credentials = Credentials { email: form.email, password: form.password };
    let signed_in = auth_svc::admin_login(&*state.backend, &state.sessions, &credentials, current.token.as_deref())
        .await
        .map_err(|e| match e {
            AuthError::AccessDenied => ApiError::from_error("Access Denied", &e),
            _ => ApiError::from_error("Login Failed", &e),
        })?;
    let redirect = Screen::AdminDashboard.path().to_owned();
    let jar = CookieJar::new().add(session_cookie(signed_in.token, state.config.cookie_secure));
    Ok((jar, Reply::with_notice(SignedInBody { user: signed_in.user, redirect }, welcome_back())))
}

/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>, current: CurrentSession) -> (CookieJar, Reply<RedirectBody>) {
    if let Some(token) = &current.token {
        auth_svc::logout(&*state.backend, &state.sessions, token).await;
    }
    let jar = CookieJar::new().add(cleared_cookie(state.config.cookie_secure));
    let notice = Notice::success("You've been logged out.", "See you next time!");
    (jar, Reply::with_notice(RedirectBody { redirect: Screen::Home.path() }, notice))
}

/// `GET /api/auth/me`
pub async fn me(current: CurrentSession) -> Reply<MeBody> {
    let user = current.user().cloned();
    Reply::new(MeBody {
        dashboard: user.as_ref().map(SessionUser::dashboard),
        recovery: current.session.as_ref().is_some_and(|s| s.recovery),
        user,
    })
}

/// `POST /api/auth/forgot-password`
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn forgot_password(State(state): State<AppState>, Json(form): Json<EmailForm>) -> Result<Reply<Empty>, ApiError> {
    auth_svc::request_password_reset(&*state.backend, &form.email, &state.config.password_reset_redirect())
        .await
        .map_err(|e| ApiError::from_error("Error", &e))?;
    let notice = Notice::success("Check your email", "A password reset link has been sent to your email address.");
    Ok(Reply::with_notice(Empty {}, notice))
}

/// `POST /api/auth/recovery`: exchange the emailed token for a session.
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn recovery(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<RecoveryForm>,
) -> Result<(CookieJar, Reply<SignedInBody>), ApiError> {
    let signed_in = auth_svc::begin_recovery(&*state.backend, &state.sessions, &form.access_token, current.token.as_deref())
        .await
        .map_err(|e| ApiError::from_error("Error", &e))?;
    let jar = CookieJar::new().add(session_cookie(signed_in.token, state.config.cookie_secure));
    let body = SignedInBody { user: signed_in.user, redirect: Screen::UpdatePassword.path().to_owned() };
    Ok((jar, Reply::new(body)))
}

/// `POST /api/auth/update-password`
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn update_password(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<NewPasswordForm>,
) -> Result<(CookieJar, Reply<RedirectBody>), ApiError> {
    auth_svc::update_password(
        &*state.backend,
        &state.sessions,
        current.token.as_deref(),
        &form.password,
        &form.confirm_password,
    )
    .await
    .map_err(|e| ApiError::from_error("Error", &e))?;
    let jar = CookieJar::new().add(cleared_cookie(state.config.cookie_secure));
    let notice = Notice::success("Success!", "Your password has been updated. Please log in.");
    Ok((jar, Reply::with_notice(RedirectBody { redirect: LOGIN_PATH }, notice)))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

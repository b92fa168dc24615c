//! User-facing notifications and the HTTP error envelope.
//!
//! DESIGN
//! ======
//! Every failure a visitor can hit ends up as a transient notification: a
//! title plus the underlying message. Service errors implement [`ErrorCode`]
//! so routes can pick a status and a stable code without matching on each
//! enum. Authorization failures are not notifications; they are redirects
//! carrying the target path. A backend that no longer accepts the session's
//! token sends the visitor to login and marks the response so the session
//! layer can close the local session.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::access::LOGIN_PATH;

/// Stable machine-readable code and HTTP status for an error.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;

    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// The backend rejected the session's own credentials.
    fn session_expired(&self) -> bool {
        false
    }
}

/// Response extension set when the session's token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRejected;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// A transient notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub variant: NoticeVariant,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Notice {
    #[must_use]
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { variant: NoticeVariant::Default, title: title.into(), description: Some(description.into()) }
    }

    #[must_use]
    pub fn title_only(title: impl Into<String>) -> Self {
        Self { variant: NoticeVariant::Default, title: title.into(), description: None }
    }

    #[must_use]
    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { variant: NoticeVariant::Destructive, title: title.into(), description: Some(description.into()) }
    }
}

/// Successful response body: payload plus an optional notification.
#[derive(Debug, Serialize)]
pub struct Reply<T: Serialize> {
    #[serde(flatten)]
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl<T: Serialize> Reply<T> {
    pub fn new(data: T) -> Self {
        Self { data, notice: None }
    }

    pub fn with_notice(data: T, notice: Notice) -> Self {
        Self { data, notice: Some(notice) }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Error response: a failure notification or a redirect.
#[derive(Debug)]
pub enum ApiError {
    Notice { status: StatusCode, code: &'static str, notice: Notice },
    Redirect { to: String, notice: Option<Notice> },
    SessionExpired,
}

#[derive(Serialize)]
struct NoticeBody<'a> {
    code: &'a str,
    notice: &'a Notice,
}

#[derive(Serialize)]
struct RedirectBody<'a> {
    redirect: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a Notice>,
}

impl ApiError {
    /// Wrap a service error under a notification title.
    pub fn from_error<E>(title: &str, err: &E) -> Self
    where
        E: ErrorCode + std::fmt::Display,
    {
        if err.session_expired() {
            tracing::warn!(error = %err, code = err.error_code(), "{title}: session token rejected");
            return Self::SessionExpired;
        }
        let status = err.status();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %err, code = err.error_code(), "{title}");
        } else {
            tracing::warn!(error = %err, code = err.error_code(), "{title}");
        }
        Self::Notice { status, code: err.error_code(), notice: Notice::failure(title, err.to_string()) }
    }

    /// Like [`ApiError::from_error`], but shows `description` instead of the
    /// error text. The error itself is still logged.
    pub fn from_error_described<E>(title: &str, description: &str, err: &E) -> Self
    where
        E: ErrorCode + std::fmt::Display,
    {
        match Self::from_error(title, err) {
            Self::Notice { status, code, .. } => Self::Notice { status, code, notice: Notice::failure(title, description) },
            other @ (Self::Redirect { .. } | Self::SessionExpired) => other,
        }
    }

    #[must_use]
    pub fn not_found(title: &str, description: impl Into<String>) -> Self {
        Self::Notice { status: StatusCode::NOT_FOUND, code: "E_NOT_FOUND", notice: Notice::failure(title, description) }
    }

    #[must_use]
    pub fn validation(title: &str, description: impl Into<String>) -> Self {
        Self::Notice {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "E_VALIDATION",
            notice: Notice::failure(title, description),
        }
    }

    #[must_use]
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::Redirect { to: to.into(), notice: None }
    }

    #[must_use]
    pub fn redirect_with_notice(to: impl Into<String>, notice: Notice) -> Self {
        Self::Redirect { to: to.into(), notice: Some(notice) }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Notice { status, .. } => *status,
            Self::Redirect { .. } | Self::SessionExpired => StatusCode::SEE_OTHER,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Notice { status, code, notice } => (status, Json(NoticeBody { code, notice: &notice })).into_response(),
            Self::Redirect { to, notice } => {
                let mut response =
                    (StatusCode::SEE_OTHER, Json(RedirectBody { redirect: &to, notice: notice.as_ref() })).into_response();
                if let Ok(location) = HeaderValue::from_str(&to) {
                    response.headers_mut().insert(header::LOCATION, location);
                }
                response
            }
            Self::SessionExpired => {
                let notice = Notice::failure("Session expired", "Please log in again.");
                let mut response = Self::redirect_with_notice(LOGIN_PATH, notice).into_response();
                response.extensions_mut().insert(SessionRejected);
                response
            }
        }
    }
}

#[cfg(test)]
#[path = "notice_test.rs"]
mod tests;

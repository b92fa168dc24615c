//! Navigation and per-screen access checks.

use axum::extract::{Path, Query};
use serde::{Deserialize, Serialize};

use crate::access::{NAV_ITEMS, NavItem, Screen};
use crate::notice::{ApiError, Reply};
use crate::routes::auth::{CurrentSession, gate};
use crate::services::session::SessionUser;

#[derive(Debug, Serialize)]
pub struct NavigationBody {
    pub items: &'static [NavItem],
    pub user: Option<SessionUser>,
    pub dashboard: Option<&'static str>,
}

/// `GET /api/navigation`
pub async fn navigation(current: CurrentSession) -> Reply<NavigationBody> {
    let user = current.user().cloned();
    Reply::new(NavigationBody { items: &NAV_ITEMS, dashboard: user.as_ref().map(SessionUser::dashboard), user })
}

#[derive(Debug, Default, Deserialize)]
pub struct ScreenQuery {
    /// Concrete path being visited, e.g. `/manage-property/{id}`.
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScreenBody {
    pub screen: Screen,
    pub path: String,
}

/// `GET /api/screens/{screen}`: access check only.
///
/// # Errors
///
/// `404` for an unknown slug, or a redirect when the session may not see
/// the screen.
pub async fn check(
    current: CurrentSession,
    Path(slug): Path<String>,
    Query(query): Query<ScreenQuery>,
) -> Result<Reply<ScreenBody>, ApiError> {
    let screen = Screen::from_slug(&slug).ok_or_else(|| ApiError::not_found("Page not found", slug.clone()))?;
    let path = query.path.unwrap_or_else(|| screen.path().to_owned());
    if screen.allowed_roles().is_some() {
        gate(&current, screen, &path)?;
    }
    Ok(Reply::new(ScreenBody { screen, path }))
}

#[cfg(test)]
#[path = "screens_test.rs"]
mod tests;

//! Screen table and role gating.
//!
//! Each screen declares the roles allowed to see it; public screens declare
//! none. `authorize` is the single decision point used by every gated route.

use serde::Serialize;

use crate::model::Role;

const MEMBERS: &[Role] = &[Role::Guest, Role::Owner, Role::Admin];
const HOSTS: &[Role] = &[Role::Owner, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

pub const LOGIN_PATH: &str = "/login";
pub const ROOMS_PATH: &str = "/rooms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Home,
    Rooms,
    Services,
    Booking,
    Contact,
    Login,
    AdminLogin,
    Register,
    ForgotPassword,
    UpdatePassword,
    Dashboard,
    OwnerDashboard,
    ManageProperty,
    AddService,
    AdminDashboard,
}

impl Screen {
    pub const ALL: [Screen; 15] = [
        Screen::Home,
        Screen::Rooms,
        Screen::Services,
        Screen::Booking,
        Screen::Contact,
        Screen::Login,
        Screen::AdminLogin,
        Screen::Register,
        Screen::ForgotPassword,
        Screen::UpdatePassword,
        Screen::Dashboard,
        Screen::OwnerDashboard,
        Screen::ManageProperty,
        Screen::AddService,
        Screen::AdminDashboard,
    ];

    /// Route path; `ManageProperty` takes a trailing property id.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Rooms => ROOMS_PATH,
            Self::Services => "/services",
            Self::Booking => "/booking",
            Self::Contact => "/contact",
            Self::Login => LOGIN_PATH,
            Self::AdminLogin => "/admin-login",
            Self::Register => "/register",
            Self::ForgotPassword => "/forgot-password",
            Self::UpdatePassword => "/update-password",
            Self::Dashboard => "/dashboard",
            Self::OwnerDashboard => "/owner-dashboard",
            Self::ManageProperty => "/manage-property",
            Self::AddService => "/add-service",
            Self::AdminDashboard => "/admin-dashboard",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|screen| screen.path().trim_start_matches('/') == slug || (slug == "home" && *screen == Self::Home))
    }

    /// Roles allowed to see this screen; `None` means public.
    #[must_use]
    pub fn allowed_roles(self) -> Option<&'static [Role]> {
        match self {
            Self::Home
            | Self::Rooms
            | Self::Services
            | Self::Booking
            | Self::Contact
            | Self::Login
            | Self::AdminLogin
            | Self::Register
            | Self::ForgotPassword
            | Self::UpdatePassword => None,
            Self::Dashboard => Some(MEMBERS),
            Self::OwnerDashboard | Self::ManageProperty | Self::AddService => Some(HOSTS),
            Self::AdminDashboard => Some(ADMINS),
        }
    }

    #[must_use]
    pub fn permits(self, role: Option<Role>) -> bool {
        match (self.allowed_roles(), role) {
            (None, _) => true,
            (Some(allowed), Some(role)) => allowed.contains(&role),
            (Some(_), None) => false,
        }
    }
}

/// Outcome of a screen access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum Access {
    Granted,
    /// Not signed in: go to login, then come back to `from`.
    SignIn { to: String, from: String },
    /// Signed in with the wrong role: go to the role's own dashboard.
    Redirect { to: String },
}

/// Decide whether a visitor with `role` may see `screen`.
#[must_use]
pub fn authorize(screen: Screen, role: Option<Role>, requested_path: &str) -> Access {
    if screen.permits(role) {
        return Access::Granted;
    }
    match role {
        None => Access::SignIn { to: LOGIN_PATH.to_owned(), from: requested_path.to_owned() },
        Some(role) => Access::Redirect { to: dashboard_path(role).to_owned() },
    }
}

/// Landing dashboard for a role.
#[must_use]
pub fn dashboard_path(role: Role) -> &'static str {
    match role {
        Role::Admin => Screen::AdminDashboard.path(),
        Role::Owner => Screen::OwnerDashboard.path(),
        Role::Guest => Screen::Dashboard.path(),
    }
}

/// A same-origin absolute path. Browsers read `/\host` as `//host`, so
/// backslashes are refused along with control characters.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

fn without_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Where to send a user right after signing in.
///
/// The remembered path wins unless it is the login page itself or a screen
/// the role cannot see.
#[must_use]
pub fn post_login_target(role: Role, from: Option<&str>) -> String {
    let remembered = from
        .map(str::trim)
        .filter(|path| is_local_path(path))
        .filter(|path| without_query(path) != LOGIN_PATH)
        .filter(|path| screen_for_path(path).is_none_or(|screen| screen.permits(Some(role))));
    remembered.map_or_else(|| dashboard_path(role).to_owned(), str::to_owned)
}

/// Resolve a concrete path (e.g. `/manage-property/{id}`) to its screen.
#[must_use]
pub fn screen_for_path(path: &str) -> Option<Screen> {
    let path = without_query(path);
    if path == "/" {
        return Some(Screen::Home);
    }
    Screen::ALL.into_iter().find(|screen| {
        let base = screen.path();
        base != "/" && (path == base || (*screen == Screen::ManageProperty && path.starts_with("/manage-property/")))
    })
}

// =============================================================================
// NAVIGATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub name: &'static str,
    pub path: &'static str,
}

pub const NAV_ITEMS: [NavItem; 4] = [
    NavItem { name: "Home", path: "/" },
    NavItem { name: "Stays", path: ROOMS_PATH },
    NavItem { name: "Services", path: "/services" },
    NavItem { name: "Contact", path: "/contact" },
];

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;

use uuid::Uuid;

use super::*;
use crate::baas::AccessToken;

fn signed_in(role: Role) -> CurrentSession {
    let user = SessionUser { id: Uuid::new_v4(), email: "member@example.com".into(), role };
    CurrentSession {
        token: Some("tok".into()),
        session: Some(Session::signed_in(user, AccessToken::new("jwt"))),
    }
}

fn anonymous() -> CurrentSession {
    CurrentSession { token: Some("tok".into()), session: Some(Session::default()) }
}

// =============================================================================
// cookies
// =============================================================================

#[test]
fn session_cookie_is_http_only_lax() {
    let cookie = session_cookie("abc".into(), true);
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "abc");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
}

#[test]
fn cleared_cookie_expires_immediately() {
    let cookie = cleared_cookie(false);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    assert_eq!(cookie.secure(), Some(false));
}

// =============================================================================
// login_redirect
// =============================================================================

#[test]
fn login_redirect_encodes_path() {
    assert_eq!(login_redirect("/owner-dashboard"), "/login?from=%2Fowner-dashboard");
    assert_eq!(login_redirect("/a?b=c&d"), "/login?from=%2Fa%3Fb%3Dc%26d");
}

// =============================================================================
// gate
// =============================================================================

#[test]
fn gate_sends_anonymous_to_login() {
    let err = gate(&anonymous(), Screen::Dashboard, "/dashboard").unwrap_err();
    let ApiError::Redirect { to, .. } = err else {
        panic!("expected redirect");
    };
    assert_eq!(to, "/login?from=%2Fdashboard");
}

#[test]
fn gate_sends_wrong_role_to_own_dashboard() {
    let err = gate(&signed_in(Role::Guest), Screen::AdminDashboard, "/admin-dashboard").unwrap_err();
    let ApiError::Redirect { to, .. } = err else {
        panic!("expected redirect");
    };
    assert_eq!(to, "/dashboard");
}

#[test]
fn gate_admits_allowed_role() {
    let member = gate(&signed_in(Role::Owner), Screen::OwnerDashboard, "/owner-dashboard").unwrap();
    assert_eq!(member.user.role, Role::Owner);
    assert_eq!(member.caller, Caller::User(AccessToken::new("jwt")));
    assert_eq!(member.token, "tok");
}

#[test]
fn gate_without_cookie_is_anonymous() {
    let current = CurrentSession { token: None, session: None };
    assert!(matches!(gate(&current, Screen::Dashboard, "/dashboard"), Err(ApiError::Redirect { .. })));
    assert_eq!(current.caller(), Caller::Anonymous);
}

use super::*;

const ANONYMOUS_AND_ROLES: [Option<Role>; 4] = [None, Some(Role::Guest), Some(Role::Owner), Some(Role::Admin)];

// =============================================================================
// permits / authorize
// =============================================================================

#[test]
fn public_screens_admit_everyone() {
    for screen in [Screen::Home, Screen::Rooms, Screen::Booking, Screen::Contact, Screen::Login] {
        for role in ANONYMOUS_AND_ROLES {
            assert!(screen.permits(role), "{screen:?} should admit {role:?}");
        }
    }
}

#[test]
fn gated_screens_follow_the_table() {
    let cases = [
        (Screen::Dashboard, [false, true, true, true]),
        (Screen::OwnerDashboard, [false, false, true, true]),
        (Screen::ManageProperty, [false, false, true, true]),
        (Screen::AddService, [false, false, true, true]),
        (Screen::AdminDashboard, [false, false, false, true]),
    ];
    for (screen, expected) in cases {
        for (role, want) in ANONYMOUS_AND_ROLES.into_iter().zip(expected) {
            assert_eq!(screen.permits(role), want, "{screen:?} / {role:?}");
        }
    }
}

#[test]
fn non_members_are_never_granted() {
    for screen in Screen::ALL {
        for role in ANONYMOUS_AND_ROLES {
            let granted = authorize(screen, role, screen.path()) == Access::Granted;
            assert_eq!(granted, screen.permits(role), "{screen:?} / {role:?}");
        }
    }
}

#[test]
fn anonymous_is_sent_to_login_with_return_path() {
    let access = authorize(Screen::OwnerDashboard, None, "/owner-dashboard");
    assert_eq!(access, Access::SignIn { to: "/login".into(), from: "/owner-dashboard".into() });
}

#[test]
fn wrong_role_is_sent_to_own_dashboard() {
    assert_eq!(
        authorize(Screen::AdminDashboard, Some(Role::Owner), "/admin-dashboard"),
        Access::Redirect { to: "/owner-dashboard".into() }
    );
    assert_eq!(
        authorize(Screen::OwnerDashboard, Some(Role::Guest), "/owner-dashboard"),
        Access::Redirect { to: "/dashboard".into() }
    );
}

#[test]
fn redirect_targets_are_always_reachable() {
    for screen in Screen::ALL {
        for role in Role::ALL {
            if let Access::Redirect { to } = authorize(screen, Some(role), screen.path()) {
                let target = screen_for_path(&to).unwrap();
                assert!(target.permits(Some(role)), "{role:?} redirected to unreachable {to}");
            }
        }
    }
}

// =============================================================================
// dashboards + post-login
// =============================================================================

#[test]
fn dashboard_path_per_role() {
    assert_eq!(dashboard_path(Role::Admin), "/admin-dashboard");
    assert_eq!(dashboard_path(Role::Owner), "/owner-dashboard");
    assert_eq!(dashboard_path(Role::Guest), "/dashboard");
}

#[test]
fn post_login_prefers_remembered_path() {
    assert_eq!(post_login_target(Role::Guest, Some("/booking")), "/booking");
}

#[test]
fn post_login_ignores_login_page() {
    assert_eq!(post_login_target(Role::Owner, Some("/login")), "/owner-dashboard");
}

#[test]
fn post_login_ignores_screens_the_role_cannot_see() {
    assert_eq!(post_login_target(Role::Guest, Some("/admin-dashboard")), "/dashboard");
}

#[test]
fn post_login_ignores_external_urls() {
    assert_eq!(post_login_target(Role::Guest, Some("https://evil.example")), "/dashboard");
    assert_eq!(post_login_target(Role::Guest, Some("//evil.example")), "/dashboard");
}

#[test]
fn post_login_ignores_backslash_hosts() {
    assert_eq!(post_login_target(Role::Guest, Some("/\\evil.example")), "/dashboard");
    assert_eq!(post_login_target(Role::Guest, Some("/booking\\..")), "/dashboard");
}

#[test]
fn post_login_ignores_control_characters() {
    assert_eq!(post_login_target(Role::Guest, Some("/booking\r\nLocation: x")), "/dashboard");
}

#[test]
fn post_login_ignores_login_page_with_query() {
    assert_eq!(post_login_target(Role::Guest, Some("/login?from=/dashboard")), "/dashboard");
    assert_eq!(post_login_target(Role::Owner, Some("/login#top")), "/owner-dashboard");
}

#[test]
fn post_login_defaults_to_dashboard() {
    assert_eq!(post_login_target(Role::Admin, None), "/admin-dashboard");
}

// =============================================================================
// path lookup
// =============================================================================

#[test]
fn screen_for_path_resolves_property_paths() {
    assert_eq!(
        screen_for_path("/manage-property/5b3c7c1e-0000-0000-0000-000000000000"),
        Some(Screen::ManageProperty)
    );
    assert_eq!(screen_for_path("/"), Some(Screen::Home));
    assert_eq!(screen_for_path("/dashboard?tab=past"), Some(Screen::Dashboard));
    assert_eq!(screen_for_path("/nowhere"), None);
}

#[test]
fn from_slug_matches_paths() {
    assert_eq!(Screen::from_slug("admin-dashboard"), Some(Screen::AdminDashboard));
    assert_eq!(Screen::from_slug("home"), Some(Screen::Home));
    assert_eq!(Screen::from_slug("update-password"), Some(Screen::UpdatePassword));
    assert_eq!(Screen::from_slug("bogus"), None);
}

#[test]
fn nav_items_in_order() {
    let names: Vec<_> = NAV_ITEMS.iter().map(|item| item.name).collect();
    assert_eq!(names, vec!["Home", "Stays", "Services", "Contact"]);
}

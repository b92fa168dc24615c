use super::*;

#[derive(Debug, thiserror::Error)]
#[error("room is gone")]
struct Gone;

impl ErrorCode for Gone {
    fn error_code(&self) -> &'static str {
        "E_GONE"
    }

    fn status(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }
}

#[test]
fn from_error_carries_message_verbatim() {
    let err = ApiError::from_error("Booking Failed", &Gone);
    let ApiError::Notice { status, code, notice } = err else {
        panic!("expected notice");
    };
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(code, "E_GONE");
    assert_eq!(notice.variant, NoticeVariant::Destructive);
    assert_eq!(notice.title, "Booking Failed");
    assert_eq!(notice.description.as_deref(), Some("room is gone"));
}

#[test]
fn validation_is_unprocessable() {
    let err = ApiError::validation("Error", "Passwords do not match.");
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn redirect_sets_location_header() {
    let response = ApiError::redirect("/login").into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
}

#[test]
fn notice_without_description_omits_field() {
    let json = serde_json::to_value(Notice::title_only("Room updated!")).unwrap();
    assert_eq!(json["title"], "Room updated!");
    assert_eq!(json["variant"], "default");
    assert!(json.get("description").is_none());
}

#[test]
fn reply_flattens_payload_next_to_notice() {
    #[derive(Serialize)]
    struct Payload {
        nights: u32,
    }
    let reply = Reply::with_notice(Payload { nights: 3 }, Notice::success("Saved", "ok"));
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["nights"], 3);
    assert_eq!(json["notice"]["title"], "Saved");
}

#[test]
fn described_error_hides_message_but_keeps_status() {
    let err = ApiError::from_error_described("Error", "Could not cancel booking. Please try again.", &Gone);
    let ApiError::Notice { status, notice, .. } = err else {
        panic!("expected notice");
    };
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(notice.description.as_deref(), Some("Could not cancel booking. Please try again."));
}

#[test]
fn not_found_notice() {
    assert_eq!(ApiError::not_found("Page not found", "nope").status(), StatusCode::NOT_FOUND);
}

#[test]
fn rejected_token_becomes_marked_login_redirect() {
    let err = ApiError::from_error("Error fetching bookings", &crate::baas::BaasError::api(401, "JWT expired"));
    assert!(matches!(err, ApiError::SessionExpired));
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    assert_eq!(response.extensions().get::<SessionRejected>(), Some(&SessionRejected));
}

#[test]
fn forbidden_row_stays_a_notice() {
    let err = ApiError::from_error("Error", &crate::baas::BaasError::api(403, "row-level security"));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert!(!matches!(err, ApiError::SessionExpired));
}

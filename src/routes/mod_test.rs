use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Response, StatusCode};
use serde_json::{Value, json};

use super::*;
use crate::baas::AuthProvider;
use crate::baas::memory::MemoryBackend;
use crate::model::Role;
use crate::state::test_helpers::test_app_state;

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    backend: Arc<MemoryBackend>,
    state: AppState,
}

impl TestServer {
    async fn start() -> Self {
        let (state, backend) = test_app_state();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let client = reqwest::Client::builder().redirect(Policy::none()).build().unwrap();
        Self { addr, client, backend, state }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    async fn post(&self, path: &str, cookie: Option<&str>, body: Value) -> Response {
        self.send(reqwest::Method::POST, path, cookie, body).await
    }

    async fn send(&self, method: reqwest::Method, path: &str, cookie: Option<&str>, body: Value) -> Response {
        let mut request = self.client.request(method, self.url(path)).json(&body);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// Sign up through the backend, then sign in over HTTP. Returns the cookie.
    async fn signed_in(&self, email: &str, role: Role, cookie: Option<&str>) -> String {
        self.backend.sign_up(email, "password1", role).await.unwrap();
        let response = self
            .post("/api/auth/login", cookie, json!({ "email": email, "password": "password1" }))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie_of(&response).expect("login sets the session cookie")
    }
}

/// `session_token=...` from a Set-Cookie header, ready for a Cookie header.
fn session_cookie_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session_token="))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

async fn body(response: Response) -> Value {
    response.json().await.unwrap()
}

// =============================================================================
// basics
// =============================================================================

#[tokio::test]
async fn healthz_is_ok() {
    let server = TestServer::start().await;
    assert_eq!(server.get("/healthz", None).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn navigation_is_public() {
    let server = TestServer::start().await;
    let response = server.get("/api/navigation", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body(response).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(4));
    assert!(body["user"].is_null());
}

// =============================================================================
// gating
// =============================================================================

#[tokio::test]
async fn anonymous_owner_dashboard_redirects_to_login() {
    let server = TestServer::start().await;
    let response = server.get("/api/owner/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/login?from=%2Fowner-dashboard");
    assert_eq!(body(response).await["redirect"], "/login?from=%2Fowner-dashboard");
}

#[tokio::test]
async fn guest_is_sent_from_admin_screen_to_own_dashboard() {
    let server = TestServer::start().await;
    let cookie = server.signed_in("guest@example.com", Role::Guest, None).await;
    let response = server.get("/api/admin/pending", Some(cookie.as_str())).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/dashboard");
}

#[tokio::test]
async fn admin_login_refuses_guest() {
    let server = TestServer::start().await;
    server.backend.sign_up("guest@example.com", "password1", Role::Guest).await.unwrap();
    let response = server
        .post("/api/auth/admin-login", None, json!({ "email": "guest@example.com", "password": "password1" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body(response).await;
    assert_eq!(body["code"], "E_ACCESS_DENIED");
    assert_eq!(body["notice"]["title"], "Access Denied");
}

#[tokio::test]
async fn login_honours_remembered_path() {
    let server = TestServer::start().await;
    server.backend.sign_up("host@example.com", "password1", Role::Owner).await.unwrap();
    let response = server
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "host@example.com", "password": "password1", "from": "/add-service" }),
        )
        .await;
    let body = body(response).await;
    assert_eq!(body["redirect"], "/add-service");
    assert_eq!(body["notice"]["title"], "Welcome back!");
}

#[tokio::test]
async fn logout_clears_cookie_and_session() {
    let server = TestServer::start().await;
    let cookie = server.signed_in("guest@example.com", Role::Guest, None).await;
    let response = server.post("/api/auth/logout", Some(cookie.as_str()), json!({})).await;
    assert_eq!(session_cookie_of(&response).as_deref(), Some("session_token="));

    let me = body(server.get("/api/auth/me", Some(cookie.as_str())).await).await;
    assert!(me["user"].is_null());
}

#[tokio::test]
async fn rejected_backend_token_signs_visitor_out() {
    let server = TestServer::start().await;
    let cookie = server.signed_in("guest@example.com", Role::Guest, None).await;
    let token = cookie.trim_start_matches("session_token=");
    let access = server
        .state
        .sessions
        .get(token)
        .await
        .and_then(|s| s.access_token().cloned())
        .unwrap();
    server.backend.revoke(&access);

    let response = server.get("/api/dashboard/bookings", Some(cookie.as_str())).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/login");
    assert_eq!(session_cookie_of(&response).as_deref(), Some("session_token="));
    assert_eq!(body(response).await["notice"]["title"], "Session expired");

    assert!(server.state.sessions.get(token).await.is_none());
    let me = body(server.get("/api/auth/me", Some(cookie.as_str())).await).await;
    assert!(me["user"].is_null());
}

#[tokio::test]
async fn other_backend_failures_keep_session() {
    let server = TestServer::start().await;
    let cookie = server.signed_in("guest@example.com", Role::Guest, None).await;
    let token = cookie.trim_start_matches("session_token=");
    let path = format!("/api/dashboard/bookings/{}", uuid::Uuid::new_v4());
    let response = server.send(reqwest::Method::DELETE, &path, Some(cookie.as_str()), json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(session_cookie_of(&response).is_none());
    assert!(server.state.sessions.get(token).await.is_some());
}

// =============================================================================
// owner + admin + booking
// =============================================================================

/// Owner lists a property with one room, admin approves it. Returns the room id.
async fn listed_room(server: &TestServer) -> String {
    let owner = server.signed_in("host@example.com", Role::Owner, None).await;
    let response = server
        .post("/api/owner/properties", Some(owner.as_str()), json!({ "name": "Lake View", "address": "Boulevard Rd" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let property = body(response).await;
    assert_eq!(property["property"]["status"], "pending");
    let property_id = property["property"]["id"].as_str().unwrap().to_owned();

    let room = server
        .post(
            &format!("/api/owner/properties/{property_id}/rooms"),
            Some(owner.as_str()),
            json!({ "name": "Deluxe", "price": 8500, "guests": 2 }),
        )
        .await;
    assert_eq!(room.status(), StatusCode::OK);
    let room_id = body(room).await["room"]["id"].as_str().unwrap().to_owned();

    let admin = server.signed_in("admin@example.com", Role::Admin, None).await;
    let decided = server
        .post(&format!("/api/admin/properties/{property_id}/status"), Some(admin.as_str()), json!({ "status": "approved" }))
        .await;
    assert_eq!(decided.status(), StatusCode::OK);
    assert_eq!(body(decided).await["notice"]["description"], "Item has been approved.");
    room_id
}

#[tokio::test]
async fn unapproved_rooms_are_not_listed() {
    let server = TestServer::start().await;
    let owner = server.signed_in("host@example.com", Role::Owner, None).await;
    server
        .post("/api/owner/properties", Some(owner.as_str()), json!({ "name": "Lake View", "address": "Boulevard Rd" }))
        .await;
    let rooms = body(server.get("/api/rooms", None).await).await;
    assert_eq!(rooms["rooms"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn booking_survives_sign_in_and_confirms() {
    let server = TestServer::start().await;
    let room_id = listed_room(&server).await;

    let started = server.post("/api/booking/start", None, json!({ "room_id": room_id })).await;
    assert_eq!(started.status(), StatusCode::OK);
    let anonymous = session_cookie_of(&started).expect("start opens a session");
    let view = body(started).await;
    assert_eq!(view["step"], "dates_and_room");

    let patch = |body: Value| server.send(reqwest::Method::PATCH, "/api/booking", Some(anonymous.as_str()), body);
    patch(json!({ "check_in": "2030-06-10", "check_out": "2030-06-13" })).await;
    server.post("/api/booking/next", Some(anonymous.as_str()), json!({})).await;
    patch(json!({
        "first_name": "Asha",
        "last_name": "Rao",
        "email": "asha@example.com",
        "phone": "9999999999",
    }))
    .await;
    server.post("/api/booking/next", Some(anonymous.as_str()), json!({})).await;
    let view = body(patch(json!({ "payment_method": "upi" })).await).await;
    assert_eq!(view["step"], "payment");
    assert_eq!(view["quote"]["total"].as_f64(), Some(30090.0));

    let refused = server.post("/api/booking/submit", Some(anonymous.as_str()), json!({})).await;
    assert_eq!(refused.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(refused).await["notice"]["title"], "Authentication Error");

    let guest = server.signed_in("asha@example.com", Role::Guest, Some(anonymous.as_str())).await;
    let carried = body(server.get("/api/booking", Some(guest.as_str())).await).await;
    assert_eq!(carried["step"], "payment");

    let submitted = server.post("/api/booking/submit", Some(guest.as_str()), json!({})).await;
    assert_eq!(submitted.status(), StatusCode::OK);
    let confirmed = body(submitted).await;
    assert_eq!(confirmed["step"], "confirmation");
    assert_eq!(confirmed["notice"]["title"], "Booking Confirmed!");
    assert_eq!(confirmed["booking"]["status"], "confirmed");

    let dashboard = body(server.get("/api/dashboard/bookings", Some(guest.as_str())).await).await;
    assert_eq!(dashboard["upcoming"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn failed_start_sets_no_cookie_and_opens_no_session() {
    let server = TestServer::start().await;
    for _ in 0..3 {
        let response = server
            .post("/api/booking/start", None, json!({ "room_id": uuid::Uuid::new_v4() }))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(session_cookie_of(&response).is_none());
    }
    assert_eq!(server.state.sessions.len().await, 0);
}

#[tokio::test]
async fn booking_without_wizard_goes_back_to_rooms() {
    let server = TestServer::start().await;
    let response = server.get("/api/booking", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/rooms");
}

#[tokio::test]
async fn owner_uploads_property_image() {
    let server = TestServer::start().await;
    let owner = server.signed_in("host@example.com", Role::Owner, None).await;
    let created = body(
        server
            .post("/api/owner/properties", Some(owner.as_str()), json!({ "name": "Lake View", "address": "Boulevard Rd" }))
            .await,
    )
    .await;
    let property_id = created["property"]["id"].as_str().unwrap().to_owned();

    let response = server
        .client
        .post(server.url(&format!("/api/owner/properties/{property_id}/images?file_name=front.jpg")))
        .header(COOKIE, &owner)
        .header(CONTENT_TYPE, "image/jpeg")
        .body(vec![0xFF, 0xD8, 0xFF])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body(response).await;
    assert_eq!(body["notice"]["title"], "Image uploaded successfully!");
    let images = body["property"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0].as_str().unwrap().ends_with(".jpg"));
}

#[tokio::test]
async fn owner_upload_refuses_non_image() {
    let server = TestServer::start().await;
    let owner = server.signed_in("host@example.com", Role::Owner, None).await;
    let created = body(
        server
            .post("/api/owner/properties", Some(owner.as_str()), json!({ "name": "Lake View", "address": "Boulevard Rd" }))
            .await,
    )
    .await;
    let property_id = created["property"]["id"].as_str().unwrap().to_owned();

    let response = server
        .client
        .post(server.url(&format!("/api/owner/properties/{property_id}/images?file_name=page.html")))
        .header(COOKIE, &owner)
        .header(CONTENT_TYPE, "text/html")
        .body("<script>alert(1)</script>")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(response).await["code"], "E_VALIDATION");
}

// =============================================================================
// contact
// =============================================================================

#[tokio::test]
async fn contact_message_is_logged() {
    let server = TestServer::start().await;
    let response = server
        .post(
            "/api/contact",
            None,
            json!({
                "name": "Asha",
                "email": "asha@example.com",
                "subject": "Hello",
                "message": "Is parking available?",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body(response).await;
    assert!(body["id"].as_i64().is_some());
    assert!(body["notice"]["title"].is_string());

    let messages = server.state.contact.messages().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "Hello");
}

#[tokio::test]
async fn contact_requires_message() {
    let server = TestServer::start().await;
    let response = server.post("/api/contact", None, json!({ "name": "Asha", "email": "asha@example.com" })).await;
    assert!(response.status().is_client_error());
    assert_eq!(body(response).await["notice"]["title"], "Message Not Sent");
}

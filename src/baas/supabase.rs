//! Supabase-compatible HTTP client.
//!
//! Thin wrapper over the auth (`/auth/v1`), data (`/rest/v1`) and storage
//! (`/storage/v1`) endpoints. Query strings and response parsing live in pure
//! functions so they can be tested without a server.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{
    AccessToken, AuthGrant, AuthIdentity, AuthProvider, BaasError, Caller, DataStore, ObjectStore, SignUp,
    extract_error_message,
};
use crate::config::BaasTimeouts;
use crate::model::{
    Booking, ModerationStatus, ModerationTable, NewBooking, NewProperty, NewService, Profile, Property,
    PropertyWithOwner, Role, RoomInput, RoomListing, RoomType, Service, ServiceListing,
};
use crate::schema::{NewServiceDefinition, ServiceDefinition};

const ROOM_WITH_PROPERTY: &str = "*,properties!inner(name,address,images,status)";
const SERVICE_WITH_DEFINITION: &str = "*,definition:service_definitions(name)";
const SERVICE_WITH_OWNER: &str = "*,profiles(email),definition:service_definitions(name)";
const PROPERTY_WITH_OWNER: &str = "*,profiles(email)";
const PROFILE_COLUMNS: &str = "id,email,role";

type Query = Vec<(&'static str, String)>;

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseBackend {
    http: reqwest::Client,
    url: String,
    anon_key: String,
}

impl SupabaseBackend {
    /// # Errors
    ///
    /// Returns [`BaasError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(url: String, anon_key: String, timeouts: BaasTimeouts) -> Result<Self, BaasError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| BaasError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, url: url.trim_end_matches('/').to_owned(), anon_key })
    }

    fn bearer<'a>(&'a self, caller: &'a Caller) -> &'a str {
        caller.token().map_or(self.anon_key.as_str(), AccessToken::as_str)
    }

    fn auth(&self, method: Method, path: &str, token: Option<&AccessToken>) -> RequestBuilder {
        let bearer = token.map_or(self.anon_key.as_str(), AccessToken::as_str);
        self.http
            .request(method, format!("{}/auth/v1/{path}", self.url))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn rest(&self, method: Method, table: &str, caller: &Caller) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{table}", self.url))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(caller))
    }

    async fn send(request: RequestBuilder) -> Result<String, BaasError> {
        let response = request.send().await.map_err(|e| BaasError::Request(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| BaasError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(BaasError::api(status.as_u16(), extract_error_message(&text)));
        }
        Ok(text)
    }

    async fn select<T: DeserializeOwned>(&self, caller: &Caller, table: &str, query: &Query) -> Result<Vec<T>, BaasError> {
        let text = Self::send(self.rest(Method::GET, table, caller).query(query)).await?;
        parse_rows(&text)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        caller: &Caller,
        table: &str,
        query: &Query,
    ) -> Result<Option<T>, BaasError> {
        Ok(self.select(caller, table, query).await?.into_iter().next())
    }

    async fn insert_one<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        caller: &Caller,
        table: &'static str,
        body: &B,
    ) -> Result<T, BaasError> {
        let request = self
            .rest(Method::POST, table, caller)
            .header("Prefer", "return=representation")
            .json(&[body]);
        let text = Self::send(request).await?;
        parse_single(&text, table)
    }

    async fn patch_one<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        caller: &Caller,
        table: &'static str,
        id: Uuid,
        body: &B,
    ) -> Result<T, BaasError> {
        let request = self
            .rest(Method::PATCH, table, caller)
            .query(&by_id(id))
            .header("Prefer", "return=representation")
            .json(body);
        let text = Self::send(request).await?;
        parse_single(&text, table)
    }

    async fn delete_one(&self, caller: &Caller, table: &'static str, id: Uuid) -> Result<(), BaasError> {
        let request = self
            .rest(Method::DELETE, table, caller)
            .query(&by_id(id))
            .header("Prefer", "return=representation");
        let text = Self::send(request).await?;
        parse_single::<serde_json::Value>(&text, table).map(|_| ())
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata,
}

#[derive(Serialize)]
struct SignUpMetadata {
    role: Role,
}

#[async_trait::async_trait]
impl AuthProvider for SupabaseBackend {
    async fn sign_up(&self, email: &str, password: &str, role: Role) -> Result<SignUp, BaasError> {
        let body = SignUpBody { email, password, data: SignUpMetadata { role } };
        let text = Self::send(self.auth(Method::POST, "signup", None).json(&body)).await?;
        parse_sign_up(&text)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthGrant, BaasError> {
        let request = self
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });
        let text = Self::send(request).await?;
        serde_json::from_str(&text).map_err(|e| BaasError::Parse(e.to_string()))
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), BaasError> {
        Self::send(self.auth(Method::POST, "logout", Some(token))).await.map(|_| ())
    }

    async fn get_user(&self, token: &AccessToken) -> Result<AuthIdentity, BaasError> {
        let text = Self::send(self.auth(Method::GET, "user", Some(token))).await?;
        serde_json::from_str(&text).map_err(|e| BaasError::Parse(e.to_string()))
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BaasError> {
        let request = self
            .auth(Method::POST, "recover", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email }));
        Self::send(request).await.map(|_| ())
    }

    async fn update_password(&self, token: &AccessToken, password: &str) -> Result<(), BaasError> {
        let request = self
            .auth(Method::PUT, "user", Some(token))
            .json(&serde_json::json!({ "password": password }));
        Self::send(request).await.map(|_| ())
    }
}

// =============================================================================
// DATA
// =============================================================================

#[derive(Serialize)]
struct RoomRow<'a> {
    property_id: Uuid,
    #[serde(flatten)]
    room: &'a RoomInput,
}

#[derive(Serialize)]
struct RoleChange {
    target_user_id: Uuid,
    new_role: Role,
}

#[async_trait::async_trait]
impl DataStore for SupabaseBackend {
    async fn fetch_profile(&self, caller: &Caller, user_id: Uuid) -> Result<Option<Profile>, BaasError> {
        let mut query = columns(PROFILE_COLUMNS);
        query.push(("id", eq(user_id)));
        self.select_one(caller, "profiles", &query).await
    }

    async fn search_profiles(&self, caller: &Caller, email_fragment: &str) -> Result<Vec<Profile>, BaasError> {
        self.select(caller, "profiles", &profile_search_query(email_fragment)).await
    }

    async fn update_user_role(&self, caller: &Caller, user_id: Uuid, role: Role) -> Result<(), BaasError> {
        let request = self
            .rest(Method::POST, "rpc/update_user_role", caller)
            .json(&RoleChange { target_user_id: user_id, new_role: role });
        Self::send(request).await.map(|_| ())
    }

    async fn list_owner_properties(&self, caller: &Caller, owner_id: Uuid) -> Result<Vec<Property>, BaasError> {
        let mut query = columns("*");
        query.push(("owner_id", eq(owner_id)));
        self.select(caller, "properties", &query).await
    }

    async fn get_property(&self, caller: &Caller, property_id: Uuid) -> Result<Option<Property>, BaasError> {
        let mut query = columns("*");
        query.push(("id", eq(property_id)));
        self.select_one(caller, "properties", &query).await
    }

    async fn insert_property(&self, caller: &Caller, property: &NewProperty) -> Result<Property, BaasError> {
        self.insert_one(caller, "properties", property).await
    }

    async fn set_property_images(
        &self,
        caller: &Caller,
        property_id: Uuid,
        images: &[String],
    ) -> Result<Property, BaasError> {
        self.patch_one(caller, "properties", property_id, &serde_json::json!({ "images": images }))
            .await
    }

    async fn list_properties_with_status(
        &self,
        caller: &Caller,
        status: ModerationStatus,
    ) -> Result<Vec<PropertyWithOwner>, BaasError> {
        self.select(caller, "properties", &status_query(PROPERTY_WITH_OWNER, status))
            .await
    }

    async fn list_property_rooms(&self, caller: &Caller, property_id: Uuid) -> Result<Vec<RoomType>, BaasError> {
        let mut query = columns("*");
        query.push(("property_id", eq(property_id)));
        self.select(caller, "room_types", &query).await
    }

    async fn list_bookable_rooms(&self, caller: &Caller) -> Result<Vec<RoomListing>, BaasError> {
        self.select(caller, "room_types", &bookable_rooms_query(None)).await
    }

    async fn get_bookable_room(&self, caller: &Caller, room_id: Uuid) -> Result<Option<RoomListing>, BaasError> {
        self.select_one(caller, "room_types", &bookable_rooms_query(Some(room_id)))
            .await
    }

    async fn insert_room(&self, caller: &Caller, property_id: Uuid, room: &RoomInput) -> Result<RoomType, BaasError> {
        self.insert_one(caller, "room_types", &RoomRow { property_id, room })
            .await
    }

    async fn update_room(&self, caller: &Caller, room_id: Uuid, room: &RoomInput) -> Result<RoomType, BaasError> {
        self.patch_one(caller, "room_types", room_id, room).await
    }

    async fn delete_room(&self, caller: &Caller, room_id: Uuid) -> Result<(), BaasError> {
        self.delete_one(caller, "room_types", room_id).await
    }

    async fn list_service_definitions(&self, caller: &Caller) -> Result<Vec<ServiceDefinition>, BaasError> {
        let mut query = columns("*");
        query.push(("order", "name.asc".to_owned()));
        self.select(caller, "service_definitions", &query).await
    }

    async fn insert_service_definition(
        &self,
        caller: &Caller,
        definition: &NewServiceDefinition,
    ) -> Result<ServiceDefinition, BaasError> {
        self.insert_one(caller, "service_definitions", definition).await
    }

    async fn list_owner_services(&self, caller: &Caller, owner_id: Uuid) -> Result<Vec<ServiceListing>, BaasError> {
        let mut query = columns(SERVICE_WITH_DEFINITION);
        query.push(("owner_id", eq(owner_id)));
        self.select(caller, "services", &query).await
    }

    async fn list_services_with_status(
        &self,
        caller: &Caller,
        status: ModerationStatus,
    ) -> Result<Vec<ServiceListing>, BaasError> {
        self.select(caller, "services", &status_query(SERVICE_WITH_OWNER, status))
            .await
    }

    async fn insert_service(&self, caller: &Caller, service: &NewService) -> Result<Service, BaasError> {
        self.insert_one(caller, "services", service).await
    }

    async fn set_moderation_status(
        &self,
        caller: &Caller,
        table: ModerationTable,
        id: Uuid,
        status: ModerationStatus,
    ) -> Result<(), BaasError> {
        self.patch_one::<serde_json::Value, _>(caller, table.as_str(), id, &serde_json::json!({ "status": status }))
            .await
            .map(|_| ())
    }

    async fn insert_booking(&self, caller: &Caller, booking: &NewBooking) -> Result<Booking, BaasError> {
        self.insert_one(caller, "bookings", booking).await
    }

    async fn list_user_bookings(&self, caller: &Caller, user_id: Uuid) -> Result<Vec<Booking>, BaasError> {
        self.select(caller, "bookings", &user_bookings_query(user_id)).await
    }

    async fn delete_booking(&self, caller: &Caller, booking_id: Uuid) -> Result<(), BaasError> {
        self.delete_one(caller, "bookings", booking_id).await
    }
}

// =============================================================================
// STORAGE
// =============================================================================

#[async_trait::async_trait]
impl ObjectStore for SupabaseBackend {
    async fn upload(
        &self,
        caller: &Caller,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BaasError> {
        let request = self
            .http
            .post(format!("{}/storage/v1/object/{bucket}/{path}", self.url))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(caller))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        Self::send(request).await?;
        Ok(public_url(&self.url, bucket, path))
    }
}

// =============================================================================
// QUERIES + PARSING
// =============================================================================

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn columns(select: &str) -> Query {
    vec![("select", select.to_owned())]
}

fn by_id(id: Uuid) -> Query {
    vec![("id", eq(id))]
}

fn status_query(select: &str, status: ModerationStatus) -> Query {
    let mut query = columns(select);
    query.push(("status", eq(status.as_str())));
    query
}

fn profile_search_query(email_fragment: &str) -> Query {
    let mut query = columns(PROFILE_COLUMNS);
    query.push(("email", format!("ilike.%{}%", email_fragment.trim())));
    query
}

fn bookable_rooms_query(room_id: Option<Uuid>) -> Query {
    let mut query = columns(ROOM_WITH_PROPERTY);
    query.push(("properties.status", eq(ModerationStatus::Approved.as_str())));
    if let Some(id) = room_id {
        query.push(("id", eq(id)));
    }
    query
}

fn user_bookings_query(user_id: Uuid) -> Query {
    let mut query = columns("*");
    query.push(("user_id", eq(user_id)));
    query.push(("order", "check_in.desc".to_owned()));
    query
}

fn public_url(base: &str, bucket: &str, path: &str) -> String {
    format!("{base}/storage/v1/object/public/{bucket}/{path}")
}

fn parse_rows<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, BaasError> {
    serde_json::from_str(text).map_err(|e| BaasError::Parse(e.to_string()))
}

/// First row of a `return=representation` response; empty means no match.
fn parse_single<T: DeserializeOwned>(text: &str, what: &'static str) -> Result<T, BaasError> {
    parse_rows::<T>(text)?
        .into_iter()
        .next()
        .ok_or(BaasError::NotFound(what))
}

/// Sign-up answers with a session when confirmation is off, else a bare user.
fn parse_sign_up(text: &str) -> Result<SignUp, BaasError> {
    if let Ok(grant) = serde_json::from_str::<AuthGrant>(text) {
        return Ok(SignUp::Confirmed(grant));
    }
    serde_json::from_str::<AuthIdentity>(text)
        .map(SignUp::PendingVerification)
        .map_err(|e| BaasError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;

//! BaaS: the hosted auth, data and storage collaborator.
//!
//! DESIGN
//! ======
//! Everything the marketplace persists lives behind three traits. The
//! production implementation speaks the Supabase-compatible HTTP APIs
//! (`supabase`); `memory` keeps the same rules in-process for local runs and
//! tests. Callers pass a [`Caller`] on every call so the remote side can apply
//! its row-level checks with the signed-in user's token.
//!
//! SYSTEM CONTEXT
//! ==============
//! Failures are never retried here. The message the remote side returns is
//! carried verbatim in [`BaasError::Api`] so routes can show it to the user.

pub mod memory;
pub mod supabase;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    Booking, ModerationStatus, ModerationTable, NewBooking, NewProperty, NewService, Profile, Property,
    PropertyWithOwner, Role, RoomInput, RoomListing, RoomType, Service, ServiceListing,
};
use crate::schema::{NewServiceDefinition, ServiceDefinition};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BaasError {
    /// Transport failure before a response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// The remote side answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A single-row read or write matched nothing.
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl crate::notice::ErrorCode for BaasError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_BAAS_REQUEST",
            Self::Api { .. } => "E_BAAS",
            Self::Parse(_) => "E_BAAS_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::NotFound(_) => "E_NOT_FOUND",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Api { status: 401 | 403, .. } => StatusCode::UNAUTHORIZED,
            Self::Api { status: 409, .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn session_expired(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

impl BaasError {
    pub(crate) fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api { status, message: message.into() }
    }

    /// True when the remote side rejected the caller's credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

/// Pull the human-readable message out of an error body.
///
/// Auth, data and storage APIs each use a different key; fall back to the raw
/// body when none is present.
#[must_use]
pub fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_owned();
    };
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map_or_else(|| body.trim().to_owned(), str::to_owned)
}

// =============================================================================
// CALLER + AUTH TYPES
// =============================================================================

/// Bearer token issued by the auth provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Who is making a data call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(AccessToken),
}

impl Caller {
    #[must_use]
    pub fn token(&self) -> Option<&AccessToken> {
        match self {
            Self::Anonymous => None,
            Self::User(token) => Some(token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: Uuid,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub email: String,
}

/// A signed-in grant: token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    pub access_token: AccessToken,
    pub user: AuthIdentity,
}

/// Sign-up outcome. Projects that require email confirmation return no token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUp {
    Confirmed(AuthGrant),
    PendingVerification(AuthIdentity),
}

// =============================================================================
// TRAITS
// =============================================================================

#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a user; `role` travels as sign-up metadata for the profile row.
    async fn sign_up(&self, email: &str, password: &str, role: Role) -> Result<SignUp, BaasError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthGrant, BaasError>;

    async fn sign_out(&self, token: &AccessToken) -> Result<(), BaasError>;

    /// Resolve a token to its user. Used to accept emailed recovery tokens.
    async fn get_user(&self, token: &AccessToken) -> Result<AuthIdentity, BaasError>;

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BaasError>;

    async fn update_password(&self, token: &AccessToken, password: &str) -> Result<(), BaasError>;
}

#[async_trait::async_trait]
pub trait DataStore: Send + Sync {
    // profiles
    async fn fetch_profile(&self, caller: &Caller, user_id: Uuid) -> Result<Option<Profile>, BaasError>;
    async fn search_profiles(&self, caller: &Caller, email_fragment: &str) -> Result<Vec<Profile>, BaasError>;
    /// Privileged role change; the remote procedure checks the caller is an admin.
    async fn update_user_role(&self, caller: &Caller, user_id: Uuid, role: Role) -> Result<(), BaasError>;

    // properties
    async fn list_owner_properties(&self, caller: &Caller, owner_id: Uuid) -> Result<Vec<Property>, BaasError>;
    async fn get_property(&self, caller: &Caller, property_id: Uuid) -> Result<Option<Property>, BaasError>;
    async fn insert_property(&self, caller: &Caller, property: &NewProperty) -> Result<Property, BaasError>;
    async fn set_property_images(
        &self,
        caller: &Caller,
        property_id: Uuid,
        images: &[String],
    ) -> Result<Property, BaasError>;
    async fn list_properties_with_status(
        &self,
        caller: &Caller,
        status: ModerationStatus,
    ) -> Result<Vec<PropertyWithOwner>, BaasError>;

    // room types
    async fn list_property_rooms(&self, caller: &Caller, property_id: Uuid) -> Result<Vec<RoomType>, BaasError>;
    /// Room types whose parent property is approved.
    async fn list_bookable_rooms(&self, caller: &Caller) -> Result<Vec<RoomListing>, BaasError>;
    async fn get_bookable_room(&self, caller: &Caller, room_id: Uuid) -> Result<Option<RoomListing>, BaasError>;
    async fn insert_room(&self, caller: &Caller, property_id: Uuid, room: &RoomInput) -> Result<RoomType, BaasError>;
    async fn update_room(&self, caller: &Caller, room_id: Uuid, room: &RoomInput) -> Result<RoomType, BaasError>;
    async fn delete_room(&self, caller: &Caller, room_id: Uuid) -> Result<(), BaasError>;

    // services
    async fn list_service_definitions(&self, caller: &Caller) -> Result<Vec<ServiceDefinition>, BaasError>;
    async fn insert_service_definition(
        &self,
        caller: &Caller,
        definition: &NewServiceDefinition,
    ) -> Result<ServiceDefinition, BaasError>;
    async fn list_owner_services(&self, caller: &Caller, owner_id: Uuid) -> Result<Vec<ServiceListing>, BaasError>;
    async fn list_services_with_status(
        &self,
        caller: &Caller,
        status: ModerationStatus,
    ) -> Result<Vec<ServiceListing>, BaasError>;
    async fn insert_service(&self, caller: &Caller, service: &NewService) -> Result<Service, BaasError>;
    async fn set_moderation_status(
        &self,
        caller: &Caller,
        table: ModerationTable,
        id: Uuid,
        status: ModerationStatus,
    ) -> Result<(), BaasError>;

    // bookings
    async fn insert_booking(&self, caller: &Caller, booking: &NewBooking) -> Result<Booking, BaasError>;
    /// The user's bookings, latest check-in first.
    async fn list_user_bookings(&self, caller: &Caller, user_id: Uuid) -> Result<Vec<Booking>, BaasError>;
    async fn delete_booking(&self, caller: &Caller, booking_id: Uuid) -> Result<(), BaasError>;
}

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `bucket/path` and return its public URL.
    async fn upload(
        &self,
        caller: &Caller,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BaasError>;
}

/// The full collaborator surface handed to services.
pub trait Backend: AuthProvider + DataStore + ObjectStore {}

impl<T> Backend for T where T: AuthProvider + DataStore + ObjectStore {}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

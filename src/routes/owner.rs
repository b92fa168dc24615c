//! Owner dashboard, property management and service submission.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Screen;
use crate::model::{Amenity, Property, RoomType, Service};
use crate::notice::{ApiError, Notice, Reply};
use crate::routes::auth::{CurrentSession, Empty, Member, gate};
use crate::schema::ServiceDefinition;
use crate::services::listing::{self, ImageUpload, ListingError, OwnerDashboard, PropertyDetail, PropertyForm, RoomForm};
use crate::services::offering::{self, OfferingError, ServiceSubmission};
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn manage_gate(current: &CurrentSession, property_id: Uuid) -> Result<Member, ApiError> {
    let path = format!("{}/{property_id}", Screen::ManageProperty.path());
    gate(current, Screen::ManageProperty, &path)
}

/// Validation failures read "Missing fields"; everything else takes `title`.
fn listing_error(title: &str, err: &ListingError) -> ApiError {
    match err {
        ListingError::MissingPropertyFields | ListingError::MissingRoomFields => {
            ApiError::validation("Missing fields", err.to_string())
        }
        _ => ApiError::from_error(title, err),
    }
}

// =============================================================================
// DASHBOARD + PROPERTIES
// =============================================================================

/// `GET /api/owner/dashboard`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn dashboard(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<OwnerDashboard>, ApiError> {
    let member = gate(&current, Screen::OwnerDashboard, Screen::OwnerDashboard.path())?;
    let dashboard = listing::owner_dashboard(&*state.backend, &member.caller, &member.user)
        .await
        .map_err(|e| ApiError::from_error("Error fetching properties", &e))?;
    Ok(Reply::new(dashboard))
}

#[derive(Debug, Serialize)]
pub struct PropertyBody {
    pub property: Property,
}

/// `POST /api/owner/properties`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn add_property(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<PropertyForm>,
) -> Result<Reply<PropertyBody>, ApiError> {
    let member = gate(&current, Screen::OwnerDashboard, Screen::OwnerDashboard.path())?;
    let property = listing::add_property(&*state.backend, &member.caller, &member.user, form)
        .await
        .map_err(|e| listing_error("Error adding property", &e))?;
    let notice = Notice::success("Property Submitted!", format!("{} is pending review from an admin.", property.name));
    Ok(Reply::with_notice(PropertyBody { property }, notice))
}

/// `GET /api/owner/properties/{id}`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn property(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Reply<PropertyDetail>, ApiError> {
    let member = manage_gate(&current, id)?;
    let detail = listing::property_detail(&*state.backend, &member.caller, &member.user, id)
        .await
        .map_err(|e| ApiError::from_error("Error fetching property", &e))?;
    Ok(Reply::new(detail))
}

// =============================================================================
// ROOMS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RoomBody {
    pub room: RoomType,
}

/// `POST /api/owner/properties/{id}/rooms`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn add_room(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<Uuid>,
    Json(form): Json<RoomForm>,
) -> Result<Reply<RoomBody>, ApiError> {
    let member = manage_gate(&current, id)?;
    let room = listing::add_room(&*state.backend, &member.caller, &member.user, id, form)
        .await
        .map_err(|e| listing_error("Error adding room", &e))?;
    let notice = Notice::success("Room Type Added!", format!("{} has been added.", room.name));
    Ok(Reply::with_notice(RoomBody { room }, notice))
}

/// `PATCH /api/owner/properties/{id}/rooms/{room_id}`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn update_room(
    State(state): State<AppState>,
    current: CurrentSession,
    Path((id, room_id)): Path<(Uuid, Uuid)>,
    Json(form): Json<RoomForm>,
) -> Result<Reply<RoomBody>, ApiError> {
    let member = manage_gate(&current, id)?;
    let room = listing::update_room(&*state.backend, &member.caller, &member.user, id, room_id, form)
        .await
        .map_err(|e| listing_error("Error updating room", &e))?;
    Ok(Reply::with_notice(RoomBody { room }, Notice::title_only("Room updated!")))
}

/// `POST /api/owner/properties/{id}/rooms/{room_id}/amenities/{amenity}`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn toggle_amenity(
    State(state): State<AppState>,
    current: CurrentSession,
    Path((id, room_id, amenity)): Path<(Uuid, Uuid, Amenity)>,
) -> Result<Reply<RoomBody>, ApiError> {
    let member = manage_gate(&current, id)?;
    let room = listing::toggle_room_amenity(&*state.backend, &member.caller, &member.user, id, room_id, amenity)
        .await
        .map_err(|e| listing_error("Error updating room", &e))?;
    Ok(Reply::with_notice(RoomBody { room }, Notice::title_only("Room updated!")))
}

/// `DELETE /api/owner/properties/{id}/rooms/{room_id}`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn delete_room(
    State(state): State<AppState>,
    current: CurrentSession,
    Path((id, room_id)): Path<(Uuid, Uuid)>,
) -> Result<Reply<Empty>, ApiError> {
    let member = manage_gate(&current, id)?;
    listing::delete_room(&*state.backend, &member.caller, &member.user, id, room_id)
        .await
        .map_err(|e| listing_error("Error deleting room", &e))?;
    Ok(Reply::with_notice(Empty {}, Notice::title_only("Room Type Deleted")))
}

// =============================================================================
// IMAGES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub file_name: String,
}

/// `POST /api/owner/properties/{id}/images?file_name=...`, raw image body.
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn upload_image(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Reply<PropertyBody>, ApiError> {
    let member = manage_gate(&current, id)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_owned();
    let upload = ImageUpload { file_name: query.file_name, content_type, bytes: body.to_vec() };
    let property = listing::upload_image(
        &*state.backend,
        &member.caller,
        &member.user,
        &state.config.storage_bucket,
        id,
        upload,
    )
    .await
    .map_err(|e| ApiError::from_error("Upload failed", &e))?;
    Ok(Reply::with_notice(PropertyBody { property }, Notice::title_only("Image uploaded successfully!")))
}

// =============================================================================
// SERVICES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct DefinitionsBody {
    pub definitions: Vec<ServiceDefinition>,
}

/// `GET /api/owner/service-definitions`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn service_definitions(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Reply<DefinitionsBody>, ApiError> {
    let member = gate(&current, Screen::AddService, Screen::AddService.path())?;
    let definitions = offering::definitions(&*state.backend, &member.caller)
        .await
        .map_err(|e: OfferingError| ApiError::from_error_described("Error", "Could not load service types.", &e))?;
    Ok(Reply::new(DefinitionsBody { definitions }))
}

#[derive(Debug, Serialize)]
pub struct ServiceBody {
    pub service: Service,
}

/// `POST /api/owner/services`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn submit_service(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(submission): Json<ServiceSubmission>,
) -> Result<Reply<ServiceBody>, ApiError> {
    let member = gate(&current, Screen::AddService, Screen::AddService.path())?;
    let service = offering::submit_service(&*state.backend, &member.caller, &member.user, &submission)
        .await
        .map_err(|e| ApiError::from_error("Submission Failed", &e))?;
    let notice = Notice::success("Service Submitted!", "Your new service is pending review.");
    Ok(Reply::with_notice(ServiceBody { service }, notice))
}

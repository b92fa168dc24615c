//! Rooms catalog and everything an owner does to a property.
//!
//! ARCHITECTURE
//! ============
//! Ownership is checked here before any write so the visitor gets a clear
//! refusal. The data tier enforces the same rule again on its side.
//!
//! Image upload stores the file under a generated `{uuid}.{ext}` name, then
//! rewrites the property's image list with the new public URL appended. The
//! two calls are not atomic: a failed list update leaves an orphaned object.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::baas::{BaasError, Backend, Caller, DataStore, ObjectStore};
use crate::model::{
    Amenity, ModerationStatus, NewProperty, Property, Role, RoomInput, RoomListing, RoomType, ServiceListing,
};
use crate::notice::ErrorCode;
use crate::pricing::Money;
use crate::services::session::SessionUser;

const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("Please provide a name and address.")]
    MissingPropertyFields,
    #[error("Please provide name, price, and guest count.")]
    MissingRoomFields,
    #[error("Property not found.")]
    PropertyNotFound,
    #[error("Room type not found.")]
    RoomNotFound,
    #[error("You can only manage your own properties.")]
    NotYourProperty,
    #[error("You must select an image to upload.")]
    NoImage,
    #[error("Only image files can be uploaded (got {0}).")]
    NotAnImage(String),
    #[error(transparent)]
    Baas(#[from] BaasError),
}

impl ErrorCode for ListingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingPropertyFields | Self::MissingRoomFields | Self::NoImage | Self::NotAnImage(_) => "E_VALIDATION",
            Self::PropertyNotFound | Self::RoomNotFound => "E_NOT_FOUND",
            Self::NotYourProperty => "E_FORBIDDEN",
            Self::Baas(e) => e.error_code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MissingPropertyFields | Self::MissingRoomFields | Self::NoImage | Self::NotAnImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PropertyNotFound | Self::RoomNotFound => StatusCode::NOT_FOUND,
            Self::NotYourProperty => StatusCode::FORBIDDEN,
            Self::Baas(e) => e.status(),
        }
    }

    fn session_expired(&self) -> bool {
        matches!(self, Self::Baas(e) if e.session_expired())
    }
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

/// Room fields as typed by the owner. Missing numbers stay `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<f64>,
    pub guests: Option<u32>,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
}

impl RoomForm {
    /// # Errors
    ///
    /// [`ListingError::MissingRoomFields`] when the name is blank, or the
    /// price or guest count is missing or not positive.
    pub fn validate(self) -> Result<RoomInput, ListingError> {
        let name = self.name.trim();
        let price = self
            .price
            .and_then(Money::from_major_f64)
            .filter(|p| p.is_positive());
        let guests = self.guests.filter(|g| *g > 0);
        let (false, Some(price), Some(guests)) = (name.is_empty(), price, guests) else {
            return Err(ListingError::MissingRoomFields);
        };
        Ok(RoomInput {
            name: name.to_owned(),
            description: self.description.trim().to_owned(),
            price,
            guests,
            size: self.size.trim().to_owned(),
            amenities: normalize_amenities(self.amenities),
        })
    }
}

fn normalize_amenities(mut amenities: Vec<Amenity>) -> Vec<Amenity> {
    amenities.sort_unstable();
    amenities.dedup();
    amenities
}

/// Add the amenity when absent, remove it when present.
pub fn toggle_amenity(amenities: &mut Vec<Amenity>, amenity: Amenity) {
    if let Some(pos) = amenities.iter().position(|a| *a == amenity) {
        amenities.remove(pos);
    } else {
        amenities.push(amenity);
        amenities.sort_unstable();
    }
}

/// Storage name for an uploaded file: a fresh UUID plus the original
/// extension.
#[must_use]
pub fn object_name(file_name: &str) -> String {
    let ext = file_name
        .rsplit('.')
        .next()
        .map(|e| {
            e.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|e| !e.is_empty() && file_name.contains('.'))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_owned());
    format!("{}.{ext}", Uuid::new_v4())
}

// =============================================================================
// VIEWS
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OwnerDashboard {
    pub properties: Vec<Property>,
    pub services: Vec<ServiceListing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyDetail {
    pub property: Property,
    pub rooms: Vec<RoomType>,
    pub amenities: Vec<AmenityOption>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AmenityOption {
    pub id: Amenity,
    pub label: &'static str,
}

fn amenity_options() -> Vec<AmenityOption> {
    Amenity::ALL
        .into_iter()
        .map(|id| AmenityOption { id, label: id.label() })
        .collect()
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Room types whose parent property is approved.
///
/// # Errors
///
/// Backend failures only.
pub async fn rooms(backend: &dyn Backend, caller: &Caller) -> Result<Vec<RoomListing>, ListingError> {
    Ok(backend.list_bookable_rooms(caller).await?)
}

/// The owner's properties and services.
///
/// # Errors
///
/// Backend failures only.
pub async fn owner_dashboard(
    backend: &dyn Backend,
    caller: &Caller,
    owner: &SessionUser,
) -> Result<OwnerDashboard, ListingError> {
    let properties = backend.list_owner_properties(caller, owner.id).await?;
    let services = backend.list_owner_services(caller, owner.id).await?;
    Ok(OwnerDashboard { properties, services })
}

/// Create a property for `owner`. New properties wait for moderation.
///
/// # Errors
///
/// `MissingPropertyFields`, or the backend refusing the insert.
pub async fn add_property(
    backend: &dyn Backend,
    caller: &Caller,
    owner: &SessionUser,
    form: PropertyForm,
) -> Result<Property, ListingError> {
    let name = form.name.trim();
    let address = form.address.trim();
    if name.is_empty() || address.is_empty() {
        return Err(ListingError::MissingPropertyFields);
    }
    let property = backend
        .insert_property(
            caller,
            &NewProperty {
                owner_id: owner.id,
                name: name.to_owned(),
                address: address.to_owned(),
                description: form.description.trim().to_owned(),
                status: ModerationStatus::Pending,
            },
        )
        .await?;
    tracing::info!(property_id = %property.id, owner_id = %owner.id, "property submitted");
    Ok(property)
}

/// Fetch a property the user may manage.
async fn managed_property(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    property_id: Uuid,
) -> Result<Property, ListingError> {
    let property = backend
        .get_property(caller, property_id)
        .await?
        .ok_or(ListingError::PropertyNotFound)?;
    if property.owner_id != user.id && user.role != Role::Admin {
        return Err(ListingError::NotYourProperty);
    }
    Ok(property)
}

async fn managed_room(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    property_id: Uuid,
    room_id: Uuid,
) -> Result<RoomType, ListingError> {
    managed_property(backend, caller, user, property_id).await?;
    backend
        .list_property_rooms(caller, property_id)
        .await?
        .into_iter()
        .find(|r| r.id == room_id)
        .ok_or(ListingError::RoomNotFound)
}

/// A managed property with its rooms and the amenity options.
///
/// # Errors
///
/// `PropertyNotFound`, `NotYourProperty`, or a backend failure.
pub async fn property_detail(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    property_id: Uuid,
) -> Result<PropertyDetail, ListingError> {
    let property = managed_property(backend, caller, user, property_id).await?;
    let rooms = backend.list_property_rooms(caller, property_id).await?;
    Ok(PropertyDetail { property, rooms, amenities: amenity_options() })
}

/// Validate the form and add a room to a managed property.
///
/// # Errors
///
/// `MissingRoomFields`, the ownership checks, or a backend failure.
pub async fn add_room(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    property_id: Uuid,
    form: RoomForm,
) -> Result<RoomType, ListingError> {
    let input = form.validate()?;
    managed_property(backend, caller, user, property_id).await?;
    Ok(backend.insert_room(caller, property_id, &input).await?)
}

/// Replace a room's details.
///
/// # Errors
///
/// `MissingRoomFields`, `RoomNotFound`, the ownership checks, or a
/// backend failure.
pub async fn update_room(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    property_id: Uuid,
    room_id: Uuid,
    form: RoomForm,
) -> Result<RoomType, ListingError> {
    let input = form.validate()?;
    managed_room(backend, caller, user, property_id, room_id).await?;
    Ok(backend.update_room(caller, room_id, &input).await?)
}

/// Add `amenity` to the room if absent, else remove it.
///
/// # Errors
///
/// `RoomNotFound`, the ownership checks, or a backend failure.
pub async fn toggle_room_amenity(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    property_id: Uuid,
    room_id: Uuid,
    amenity: Amenity,
) -> Result<RoomType, ListingError> {
    let room = managed_room(backend, caller, user, property_id, room_id).await?;
    let mut amenities = room.amenities;
    toggle_amenity(&mut amenities, amenity);
    let input = RoomInput {
        name: room.name,
        description: room.description,
        price: room.price,
        guests: room.guests,
        size: room.size,
        amenities,
    };
    Ok(backend.update_room(caller, room_id, &input).await?)
}

/// Remove a room from a managed property.
///
/// # Errors
///
/// `RoomNotFound`, the ownership checks, or a backend failure.
pub async fn delete_room(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    property_id: Uuid,
    room_id: Uuid,
) -> Result<(), ListingError> {
    managed_room(backend, caller, user, property_id, room_id).await?;
    backend.delete_room(caller, room_id).await?;
    Ok(())
}

/// An image file sent by the owner.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// `image/<subtype>`, ignoring case and any parameters.
fn is_image(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence
        .split_once('/')
        .is_some_and(|(kind, subtype)| kind.eq_ignore_ascii_case("image") && !subtype.is_empty())
}

/// Store the image in `bucket` and append its URL to the property.
///
/// # Errors
///
/// `NoImage` for an empty body, `NotAnImage` for a non-`image/*`
/// content type, the ownership checks, or a storage failure.
pub async fn upload_image(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    bucket: &str,
    property_id: Uuid,
    upload: ImageUpload,
) -> Result<Property, ListingError> {
    if upload.bytes.is_empty() {
        return Err(ListingError::NoImage);
    }
    if !is_image(&upload.content_type) {
        return Err(ListingError::NotAnImage(upload.content_type));
    }
    let property = managed_property(backend, caller, user, property_id).await?;
    let path = object_name(&upload.file_name);
    let url = backend
        .upload(caller, bucket, &path, upload.bytes, &upload.content_type)
        .await?;
    tracing::info!(%property_id, %path, "property image stored");

    let mut images = property.images;
    images.push(url);
    Ok(backend.set_property_images(caller, property_id, &images).await?)
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;

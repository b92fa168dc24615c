//! Marketplace entities as stored by the hosted data store.
//!
//! Row types mirror the remote tables (`profiles`, `properties`,
//! `room_types`, `service_definitions`, `services`, `bookings`). Joined reads
//! carry the embedded parent rows under the same keys the data API uses
//! (`properties`, `profiles`, `definition`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::pricing::Money;
use crate::schema::FieldValue;

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// ROLES + STATUSES
// =============================================================================

/// Account role. Chosen at registration, changed only by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Owner,
    Admin,
}

impl Role {
    #[cfg(test)]
    pub const ALL: [Role; 3] = [Role::Guest, Role::Owner, Role::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Owner => "owner",
            Self::Admin => "admin",
        }
    }

    /// Roles a visitor may pick for themselves when registering.
    #[must_use]
    pub fn self_assignable(self) -> bool {
        matches!(self, Self::Guest | Self::Owner)
    }
}

/// Moderation lifecycle shared by properties and services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Tables whose rows go through moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationTable {
    Properties,
    Services,
}

impl ModerationTable {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Services => "services",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no moderated table named {0:?}")]
pub struct UnknownTable(pub String);

impl std::str::FromStr for ModerationTable {
    type Err = UnknownTable;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "properties" => Ok(Self::Properties),
            "services" => Ok(Self::Services),
            _ => Err(UnknownTable(raw.to_owned())),
        }
    }
}

// =============================================================================
// PROFILE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
}

/// Embedded `profiles ( email )` on joined reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerEmail {
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

// =============================================================================
// PROPERTY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ModerationStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProperty {
    pub owner_id: Uuid,
    pub name: String,
    pub address: String,
    pub description: String,
    pub status: ModerationStatus,
}

/// A property row with its owner's email embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyWithOwner {
    #[serde(flatten)]
    pub property: Property,
    #[serde(default)]
    pub profiles: Option<OwnerEmail>,
}

// =============================================================================
// ROOM TYPE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Amenity {
    Ac,
    Heater,
    Tv,
    Wifi,
    Geyser,
    Parking,
}

impl Amenity {
    pub const ALL: [Amenity; 6] =
        [Amenity::Ac, Amenity::Heater, Amenity::Tv, Amenity::Wifi, Amenity::Geyser, Amenity::Parking];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Heater => "Heater",
            Self::Tv => "TV",
            Self::Wifi => "Free Wifi",
            Self::Geyser => "Geyser",
            Self::Parking => "Free Parking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomType {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub price: Money,
    pub guests: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amenities: Vec<Amenity>,
}

/// Editable room fields, already validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomInput {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub guests: u32,
    pub size: String,
    pub amenities: Vec<Amenity>,
}

/// Parent property fields embedded in the bookable-rooms read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ModerationStatus,
}

/// A room type joined to its approved parent property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomListing {
    #[serde(flatten)]
    pub room: RoomType,
    pub properties: PropertySummary,
}

impl RoomListing {
    /// Name stored on bookings: `"{property} - {room}"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.properties.name, self.room.name)
    }
}

// =============================================================================
// SERVICES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub definition_id: Uuid,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ModerationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewService {
    pub owner_id: Uuid,
    pub definition_id: Uuid,
    pub data: std::collections::BTreeMap<String, FieldValue>,
    pub status: ModerationStatus,
}

/// Embedded `definition:service_definitions(name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionName {
    pub name: String,
}

/// A service row with its definition name and owner email embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceListing {
    #[serde(flatten)]
    pub service: Service,
    #[serde(default)]
    pub definition: Option<DefinitionName>,
    #[serde(default)]
    pub profiles: Option<OwnerEmail>,
}

// =============================================================================
// BOOKING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Upi,
    Netbanking,
    Wallet,
    PayLater,
}

impl PaymentMethod {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Card => "Credit/Debit Card",
            Self::Upi => "UPI Payment",
            Self::Netbanking => "Net Banking",
            Self::Wallet => "Digital Wallet",
            Self::PayLater => "Pay Later",
        }
    }

    /// Payment and booking status a new booking starts with.
    #[must_use]
    pub fn initial_statuses(self) -> (PaymentStatus, BookingStatus) {
        match self {
            Self::PayLater => (PaymentStatus::Pending, BookingStatus::PendingPayment),
            Self::Card | Self::Upi | Self::Netbanking | Self::Wallet => {
                (PaymentStatus::Paid, BookingStatus::Confirmed)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    PendingPayment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    /// Room name, denormalised; not a foreign key.
    pub room_type: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub special_requests: String,
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub room_type: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub special_requests: String,
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;

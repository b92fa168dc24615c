//! In-process backend for local development and tests.
//!
//! Mirrors the access rules the hosted project enforces at the data tier:
//! owners write only their own rows, admins moderate, and bookings are
//! visible to the guest who made them. Nothing is persisted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use super::{AccessToken, AuthGrant, AuthIdentity, AuthProvider, BaasError, Caller, DataStore, ObjectStore, SignUp};
use crate::model::{
    Booking, DefinitionName, ModerationStatus, ModerationTable, NewBooking, NewProperty, NewService, OwnerEmail,
    Profile, Property, PropertySummary, PropertyWithOwner, Role, RoomInput, RoomListing, RoomType, Service,
    ServiceListing,
};
use crate::schema::{NewServiceDefinition, ServiceDefinition};
use crate::services::session::generate_token;

const MIN_PASSWORD_LEN: usize = 6;
const RLS_VIOLATION: &str = "new row violates row-level security policy";

struct Account {
    email: String,
    password: String,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    tokens: HashMap<String, Uuid>,
    recovery_tokens: HashMap<String, AccessToken>,
    profiles: HashMap<Uuid, Profile>,
    properties: Vec<Property>,
    rooms: Vec<RoomType>,
    definitions: Vec<ServiceDefinition>,
    services: Vec<Service>,
    bookings: Vec<Booking>,
    objects: HashMap<String, (String, Vec<u8>)>,
}

impl MemoryState {
    fn issue_token(&mut self, user_id: Uuid) -> AccessToken {
        let token = generate_token();
        self.tokens.insert(token.clone(), user_id);
        AccessToken::new(token)
    }

    fn identity(&self, user_id: Uuid) -> AuthIdentity {
        let email = self
            .accounts
            .get(&user_id)
            .map(|a| a.email.clone())
            .unwrap_or_default();
        AuthIdentity { id: user_id, email }
    }

    fn user_for_token(&self, token: &AccessToken) -> Result<Uuid, BaasError> {
        self.tokens
            .get(token.as_str())
            .copied()
            .ok_or_else(|| BaasError::api(401, "invalid JWT: unable to parse or verify signature"))
    }

    /// Signed-in user id, or 401 for anonymous and unknown tokens.
    fn require_user(&self, caller: &Caller) -> Result<Uuid, BaasError> {
        match caller {
            Caller::Anonymous => Err(BaasError::api(401, "JWT required")),
            Caller::User(token) => self.user_for_token(token),
        }
    }

    fn role_of(&self, user_id: Uuid) -> Role {
        self.profiles.get(&user_id).map(|p| p.role).unwrap_or_default()
    }

    fn require_admin(&self, caller: &Caller) -> Result<Uuid, BaasError> {
        let user_id = self.require_user(caller)?;
        if self.role_of(user_id) == Role::Admin {
            Ok(user_id)
        } else {
            Err(BaasError::api(403, RLS_VIOLATION))
        }
    }

    fn owner_email(&self, owner_id: Uuid) -> Option<OwnerEmail> {
        self.profiles
            .get(&owner_id)
            .map(|p| OwnerEmail { email: p.email.clone() })
    }

    /// Caller must own the property or be an admin.
    fn require_property_access(&self, caller: &Caller, property_id: Uuid) -> Result<(), BaasError> {
        let user_id = self.require_user(caller)?;
        let property = self
            .properties
            .iter()
            .find(|p| p.id == property_id)
            .ok_or(BaasError::NotFound("properties"))?;
        if property.owner_id == user_id || self.role_of(user_id) == Role::Admin {
            Ok(())
        } else {
            Err(BaasError::api(403, RLS_VIOLATION))
        }
    }

    fn room_listing(&self, room: &RoomType) -> Option<RoomListing> {
        self.properties
            .iter()
            .find(|p| p.id == room.property_id && p.status == ModerationStatus::Approved)
            .map(|p| RoomListing {
                room: room.clone(),
                properties: PropertySummary {
                    name: p.name.clone(),
                    address: p.address.clone(),
                    images: p.images.clone(),
                    status: p.status,
                },
            })
    }

    fn service_listing(&self, service: &Service) -> ServiceListing {
        ServiceListing {
            service: service.clone(),
            definition: self
                .definitions
                .iter()
                .find(|d| d.id == service.definition_id)
                .map(|d| DefinitionName { name: d.name.clone() }),
            profiles: self.owner_email(service.owner_id),
        }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest recovery token issued for `email`.
    #[cfg(test)]
    pub(crate) fn recovery_token(&self, email: &str) -> Option<AccessToken> {
        self.lock().recovery_tokens.get(email).cloned()
    }

    /// Invalidate a token as if it had expired remotely.
    #[cfg(test)]
    pub(crate) fn revoke(&self, token: &AccessToken) {
        self.lock().tokens.remove(token.as_str());
    }

    #[cfg(test)]
    pub(crate) fn object(&self, bucket: &str, path: &str) -> Option<(String, Vec<u8>)> {
        self.lock().objects.get(&format!("{bucket}/{path}")).cloned()
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[async_trait::async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str, role: Role) -> Result<SignUp, BaasError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BaasError::api(422, "Password should be at least 6 characters."));
        }
        let mut state = self.lock();
        if state.accounts.values().any(|a| a.email == email) {
            return Err(BaasError::api(422, "User already registered"));
        }
        let id = Uuid::new_v4();
        state
            .accounts
            .insert(id, Account { email: email.to_owned(), password: password.to_owned() });
        state
            .profiles
            .insert(id, Profile { id, email: email.to_owned(), role });
        let access_token = state.issue_token(id);
        Ok(SignUp::Confirmed(AuthGrant { access_token, user: AuthIdentity { id, email: email.to_owned() } }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthGrant, BaasError> {
        let mut state = self.lock();
        let id = state
            .accounts
            .iter()
            .find(|(_, a)| a.email == email && a.password == password)
            .map(|(id, _)| *id)
            .ok_or_else(|| BaasError::api(400, "Invalid login credentials"))?;
        let access_token = state.issue_token(id);
        Ok(AuthGrant { access_token, user: state.identity(id) })
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), BaasError> {
        self.lock().tokens.remove(token.as_str());
        Ok(())
    }

    async fn get_user(&self, token: &AccessToken) -> Result<AuthIdentity, BaasError> {
        let state = self.lock();
        let id = state.user_for_token(token)?;
        Ok(state.identity(id))
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), BaasError> {
        let mut state = self.lock();
        let Some(id) = state
            .accounts
            .iter()
            .find(|(_, a)| a.email == email)
            .map(|(id, _)| *id)
        else {
            return Ok(());
        };
        let token = state.issue_token(id);
        tracing::info!(%email, link = %format!("{redirect_to}#type=recovery"), "recovery token issued");
        state.recovery_tokens.insert(email.to_owned(), token);
        Ok(())
    }

    async fn update_password(&self, token: &AccessToken, password: &str) -> Result<(), BaasError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BaasError::api(422, "Password should be at least 6 characters."));
        }
        let mut state = self.lock();
        let id = state.user_for_token(token)?;
        if let Some(account) = state.accounts.get_mut(&id) {
            account.password = password.to_owned();
        }
        Ok(())
    }
}

// =============================================================================
// DATA
// =============================================================================

#[async_trait::async_trait]
impl DataStore for MemoryBackend {
    async fn fetch_profile(&self, _caller: &Caller, user_id: Uuid) -> Result<Option<Profile>, BaasError> {
        Ok(self.lock().profiles.get(&user_id).cloned())
    }

    async fn search_profiles(&self, caller: &Caller, email_fragment: &str) -> Result<Vec<Profile>, BaasError> {
        let state = self.lock();
        state.require_admin(caller)?;
        let needle = email_fragment.trim().to_lowercase();
        let mut found: Vec<Profile> = state
            .profiles
            .values()
            .filter(|p| p.email.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(found)
    }

    async fn update_user_role(&self, caller: &Caller, user_id: Uuid, role: Role) -> Result<(), BaasError> {
        let mut state = self.lock();
        let caller_id = state.require_user(caller)?;
        let no_admin_yet = !state.profiles.values().any(|p| p.role == Role::Admin);
        if state.role_of(caller_id) != Role::Admin && !(no_admin_yet && caller_id == user_id) {
            return Err(BaasError::api(403, "Only admins can change user roles"));
        }
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or(BaasError::NotFound("profiles"))?;
        profile.role = role;
        Ok(())
    }

    async fn list_owner_properties(&self, _caller: &Caller, owner_id: Uuid) -> Result<Vec<Property>, BaasError> {
        Ok(self
            .lock()
            .properties
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_property(&self, _caller: &Caller, property_id: Uuid) -> Result<Option<Property>, BaasError> {
        Ok(self
            .lock()
            .properties
            .iter()
            .find(|p| p.id == property_id)
            .cloned())
    }

    async fn insert_property(&self, caller: &Caller, property: &NewProperty) -> Result<Property, BaasError> {
        let mut state = self.lock();
        if state.require_user(caller)? != property.owner_id {
            return Err(BaasError::api(403, RLS_VIOLATION));
        }
        let row = Property {
            id: Uuid::new_v4(),
            owner_id: property.owner_id,
            name: property.name.clone(),
            address: property.address.clone(),
            description: property.description.clone(),
            images: Vec::new(),
            status: property.status,
            created_at: Some(Utc::now()),
        };
        state.properties.push(row.clone());
        Ok(row)
    }

    async fn set_property_images(
        &self,
        caller: &Caller,
        property_id: Uuid,
        images: &[String],
    ) -> Result<Property, BaasError> {
        let mut state = self.lock();
        state.require_property_access(caller, property_id)?;
        let property = state
            .properties
            .iter_mut()
            .find(|p| p.id == property_id)
            .ok_or(BaasError::NotFound("properties"))?;
        property.images = images.to_vec();
        Ok(property.clone())
    }

    async fn list_properties_with_status(
        &self,
        caller: &Caller,
        status: ModerationStatus,
    ) -> Result<Vec<PropertyWithOwner>, BaasError> {
        let state = self.lock();
        state.require_user(caller)?;
        Ok(state
            .properties
            .iter()
            .filter(|p| p.status == status)
            .map(|p| PropertyWithOwner { property: p.clone(), profiles: state.owner_email(p.owner_id) })
            .collect())
    }

    async fn list_property_rooms(&self, _caller: &Caller, property_id: Uuid) -> Result<Vec<RoomType>, BaasError> {
        Ok(self
            .lock()
            .rooms
            .iter()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn list_bookable_rooms(&self, _caller: &Caller) -> Result<Vec<RoomListing>, BaasError> {
        let state = self.lock();
        Ok(state.rooms.iter().filter_map(|r| state.room_listing(r)).collect())
    }

    async fn get_bookable_room(&self, _caller: &Caller, room_id: Uuid) -> Result<Option<RoomListing>, BaasError> {
        let state = self.lock();
        Ok(state
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .and_then(|r| state.room_listing(r)))
    }

    async fn insert_room(&self, caller: &Caller, property_id: Uuid, room: &RoomInput) -> Result<RoomType, BaasError> {
        let mut state = self.lock();
        state.require_property_access(caller, property_id)?;
        let row = RoomType {
            id: Uuid::new_v4(),
            property_id,
            name: room.name.clone(),
            description: room.description.clone(),
            price: room.price,
            guests: room.guests,
            size: room.size.clone(),
            amenities: room.amenities.clone(),
        };
        state.rooms.push(row.clone());
        Ok(row)
    }

    async fn update_room(&self, caller: &Caller, room_id: Uuid, room: &RoomInput) -> Result<RoomType, BaasError> {
        let mut state = self.lock();
        let property_id = state
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .map(|r| r.property_id)
            .ok_or(BaasError::NotFound("room_types"))?;
        state.require_property_access(caller, property_id)?;
        let row = state
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or(BaasError::NotFound("room_types"))?;
        row.name.clone_from(&room.name);
        row.description.clone_from(&room.description);
        row.price = room.price;
        row.guests = room.guests;
        row.size.clone_from(&room.size);
        row.amenities.clone_from(&room.amenities);
        Ok(row.clone())
    }

    async fn delete_room(&self, caller: &Caller, room_id: Uuid) -> Result<(), BaasError> {
        let mut state = self.lock();
        let property_id = state
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .map(|r| r.property_id)
            .ok_or(BaasError::NotFound("room_types"))?;
        state.require_property_access(caller, property_id)?;
        state.rooms.retain(|r| r.id != room_id);
        Ok(())
    }

    async fn list_service_definitions(&self, _caller: &Caller) -> Result<Vec<ServiceDefinition>, BaasError> {
        let mut definitions = self.lock().definitions.clone();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }

    async fn insert_service_definition(
        &self,
        caller: &Caller,
        definition: &NewServiceDefinition,
    ) -> Result<ServiceDefinition, BaasError> {
        let mut state = self.lock();
        state.require_admin(caller)?;
        if state.definitions.iter().any(|d| d.slug == definition.slug) {
            return Err(BaasError::api(
                409,
                "duplicate key value violates unique constraint \"service_definitions_slug_key\"",
            ));
        }
        let row = ServiceDefinition {
            id: Uuid::new_v4(),
            name: definition.name.clone(),
            slug: definition.slug.clone(),
            description: definition.description.clone(),
            fields: definition.fields.clone(),
        };
        state.definitions.push(row.clone());
        Ok(row)
    }

    async fn list_owner_services(&self, _caller: &Caller, owner_id: Uuid) -> Result<Vec<ServiceListing>, BaasError> {
        let state = self.lock();
        Ok(state
            .services
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .map(|s| state.service_listing(s))
            .collect())
    }

    async fn list_services_with_status(
        &self,
        caller: &Caller,
        status: ModerationStatus,
    ) -> Result<Vec<ServiceListing>, BaasError> {
        let state = self.lock();
        state.require_user(caller)?;
        Ok(state
            .services
            .iter()
            .filter(|s| s.status == status)
            .map(|s| state.service_listing(s))
            .collect())
    }

    async fn insert_service(&self, caller: &Caller, service: &NewService) -> Result<Service, BaasError> {
        let mut state = self.lock();
        if state.require_user(caller)? != service.owner_id {
            return Err(BaasError::api(403, RLS_VIOLATION));
        }
        let data = match serde_json::to_value(&service.data) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => serde_json::Map::new(),
            Err(e) => return Err(BaasError::Parse(e.to_string())),
        };
        let row = Service {
            id: Uuid::new_v4(),
            owner_id: service.owner_id,
            definition_id: service.definition_id,
            data,
            status: service.status,
        };
        state.services.push(row.clone());
        Ok(row)
    }

    async fn set_moderation_status(
        &self,
        caller: &Caller,
        table: ModerationTable,
        id: Uuid,
        status: ModerationStatus,
    ) -> Result<(), BaasError> {
        let mut state = self.lock();
        state.require_admin(caller)?;
        let slot = match table {
            ModerationTable::Properties => state
                .properties
                .iter_mut()
                .find(|p| p.id == id)
                .map(|p| &mut p.status),
            ModerationTable::Services => state
                .services
                .iter_mut()
                .find(|s| s.id == id)
                .map(|s| &mut s.status),
        };
        *slot.ok_or(BaasError::NotFound(table.as_str()))? = status;
        Ok(())
    }

    async fn insert_booking(&self, caller: &Caller, booking: &NewBooking) -> Result<Booking, BaasError> {
        let mut state = self.lock();
        if state.require_user(caller)? != booking.user_id {
            return Err(BaasError::api(403, RLS_VIOLATION));
        }
        let row = Booking {
            id: Uuid::new_v4(),
            user_id: booking.user_id,
            check_in: booking.check_in,
            check_out: booking.check_out,
            guests: booking.guests,
            room_type: booking.room_type.clone(),
            first_name: booking.first_name.clone(),
            last_name: booking.last_name.clone(),
            email: booking.email.clone(),
            phone: booking.phone.clone(),
            special_requests: booking.special_requests.clone(),
            total_price: booking.total_price,
            payment_method: booking.payment_method,
            payment_status: booking.payment_status,
            status: booking.status,
            created_at: Some(Utc::now()),
        };
        state.bookings.push(row.clone());
        Ok(row)
    }

    async fn list_user_bookings(&self, caller: &Caller, user_id: Uuid) -> Result<Vec<Booking>, BaasError> {
        let state = self.lock();
        let caller_id = state.require_user(caller)?;
        if caller_id != user_id && state.role_of(caller_id) != Role::Admin {
            return Ok(Vec::new());
        }
        let mut bookings: Vec<Booking> = state
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.check_in.cmp(&a.check_in));
        Ok(bookings)
    }

    async fn delete_booking(&self, caller: &Caller, booking_id: Uuid) -> Result<(), BaasError> {
        let mut state = self.lock();
        let caller_id = state.require_user(caller)?;
        let is_admin = state.role_of(caller_id) == Role::Admin;
        let before = state.bookings.len();
        state
            .bookings
            .retain(|b| !(b.id == booking_id && (b.user_id == caller_id || is_admin)));
        if state.bookings.len() == before {
            return Err(BaasError::NotFound("bookings"));
        }
        Ok(())
    }
}

// =============================================================================
// STORAGE
// =============================================================================

#[async_trait::async_trait]
impl ObjectStore for MemoryBackend {
    async fn upload(
        &self,
        caller: &Caller,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BaasError> {
        let mut state = self.lock();
        state.require_user(caller)?;
        let key = format!("{bucket}/{path}");
        if state.objects.contains_key(&key) {
            return Err(BaasError::api(409, "The resource already exists"));
        }
        state.objects.insert(key.clone(), (content_type.to_owned(), bytes));
        Ok(format!("memory://{key}"))
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

use chrono::NaiveDate;

use super::*;
use crate::model::{BookingStatus, PaymentMethod, PaymentStatus};
use crate::pricing::Money;

async fn signed_in(backend: &MemoryBackend, email: &str, role: Role) -> (Uuid, Caller) {
    let SignUp::Confirmed(grant) = backend.sign_up(email, "password1", role).await.unwrap() else {
        panic!("memory sign-up is auto-confirmed");
    };
    (grant.user.id, Caller::User(grant.access_token))
}

fn room_input(name: &str) -> RoomInput {
    RoomInput {
        name: name.into(),
        description: String::new(),
        price: Money::from_major(8500),
        guests: 2,
        size: String::new(),
        amenities: Vec::new(),
    }
}

fn new_booking(user_id: Uuid, check_in: NaiveDate) -> NewBooking {
    NewBooking {
        user_id,
        check_in,
        check_out: check_in.succ_opt().unwrap(),
        guests: 2,
        room_type: "Lake View - Deluxe".into(),
        first_name: "Asha".into(),
        last_name: "Rao".into(),
        email: "asha@example.com".into(),
        phone: "9999999999".into(),
        special_requests: String::new(),
        total_price: Money::from_major(100),
        payment_method: PaymentMethod::Card,
        payment_status: PaymentStatus::Paid,
        status: BookingStatus::Confirmed,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =============================================================================
// AUTH
// =============================================================================

#[tokio::test]
async fn duplicate_sign_up_is_rejected() {
    let backend = MemoryBackend::new();
    signed_in(&backend, "a@example.com", Role::Guest).await;
    let err = backend.sign_up("a@example.com", "password1", Role::Guest).await.unwrap_err();
    assert_eq!(err.to_string(), "User already registered");
}

#[tokio::test]
async fn short_password_is_rejected() {
    let backend = MemoryBackend::new();
    let err = backend.sign_up("a@example.com", "123", Role::Guest).await.unwrap_err();
    assert!(err.to_string().contains("at least 6"));
}

#[tokio::test]
async fn sign_up_creates_profile_with_role() {
    let backend = MemoryBackend::new();
    let (id, caller) = signed_in(&backend, "host@example.com", Role::Owner).await;
    let profile = backend.fetch_profile(&caller, id).await.unwrap().unwrap();
    assert_eq!(profile.role, Role::Owner);
    assert_eq!(profile.email, "host@example.com");
}

#[tokio::test]
async fn bad_credentials_fail() {
    let backend = MemoryBackend::new();
    signed_in(&backend, "a@example.com", Role::Guest).await;
    let err = backend.sign_in("a@example.com", "wrong-password").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid login credentials");
}

#[tokio::test]
async fn sign_out_invalidates_token() {
    let backend = MemoryBackend::new();
    let (_, caller) = signed_in(&backend, "a@example.com", Role::Guest).await;
    let token = caller.token().unwrap().clone();
    backend.sign_out(&token).await.unwrap();
    assert!(backend.get_user(&token).await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn recovery_token_allows_password_update() {
    let backend = MemoryBackend::new();
    signed_in(&backend, "a@example.com", Role::Guest).await;
    backend
        .request_password_reset("a@example.com", "http://localhost:3000/update-password")
        .await
        .unwrap();
    let token = backend.recovery_token("a@example.com").unwrap();
    backend.update_password(&token, "new-password").await.unwrap();
    assert!(backend.sign_in("a@example.com", "new-password").await.is_ok());
}

#[tokio::test]
async fn reset_for_unknown_email_is_silent() {
    let backend = MemoryBackend::new();
    backend.request_password_reset("nobody@example.com", "x").await.unwrap();
    assert!(backend.recovery_token("nobody@example.com").is_none());
}

// =============================================================================
// ROLES
// =============================================================================

#[tokio::test]
async fn first_user_may_promote_self_when_no_admin_exists() {
    let backend = MemoryBackend::new();
    let (id, caller) = signed_in(&backend, "root@example.com", Role::Guest).await;
    backend.update_user_role(&caller, id, Role::Admin).await.unwrap();

    let (other, other_caller) = signed_in(&backend, "b@example.com", Role::Guest).await;
    let err = backend
        .update_user_role(&other_caller, other, Role::Admin)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    backend.update_user_role(&caller, other, Role::Owner).await.unwrap();
    assert_eq!(backend.fetch_profile(&caller, other).await.unwrap().unwrap().role, Role::Owner);
}

#[tokio::test]
async fn profile_search_requires_admin() {
    let backend = MemoryBackend::new();
    let (_, guest) = signed_in(&backend, "guest@example.com", Role::Guest).await;
    assert!(backend.search_profiles(&guest, "example").await.is_err());

    let (_, admin) = signed_in(&backend, "admin@example.com", Role::Admin).await;
    let found = backend.search_profiles(&admin, "GUEST").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "guest@example.com");
}

// =============================================================================
// PROPERTIES + ROOMS
// =============================================================================

async fn property_for(backend: &MemoryBackend, owner: Uuid, caller: &Caller) -> Property {
    backend
        .insert_property(
            caller,
            &NewProperty {
                owner_id: owner,
                name: "Lake View".into(),
                address: "Boulevard Rd".into(),
                description: String::new(),
                status: ModerationStatus::Pending,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn rooms_are_bookable_only_once_property_is_approved() {
    let backend = MemoryBackend::new();
    let (owner, owner_caller) = signed_in(&backend, "host@example.com", Role::Owner).await;
    let (_, admin) = signed_in(&backend, "admin@example.com", Role::Admin).await;
    let property = property_for(&backend, owner, &owner_caller).await;
    let room = backend
        .insert_room(&owner_caller, property.id, &room_input("Deluxe"))
        .await
        .unwrap();

    assert!(backend.list_bookable_rooms(&Caller::Anonymous).await.unwrap().is_empty());

    backend
        .set_moderation_status(&admin, ModerationTable::Properties, property.id, ModerationStatus::Approved)
        .await
        .unwrap();
    let listing = backend
        .get_bookable_room(&Caller::Anonymous, room.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(listing.display_name(), "Lake View - Deluxe");
}

#[tokio::test]
async fn other_owners_cannot_touch_rooms() {
    let backend = MemoryBackend::new();
    let (owner, owner_caller) = signed_in(&backend, "host@example.com", Role::Owner).await;
    let (_, intruder) = signed_in(&backend, "other@example.com", Role::Owner).await;
    let property = property_for(&backend, owner, &owner_caller).await;

    let err = backend
        .insert_room(&intruder, property.id, &room_input("Sneaky"))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn owner_cannot_insert_property_for_someone_else() {
    let backend = MemoryBackend::new();
    let (_, caller) = signed_in(&backend, "host@example.com", Role::Owner).await;
    let err = backend
        .insert_property(
            &caller,
            &NewProperty {
                owner_id: Uuid::new_v4(),
                name: "X".into(),
                address: "Y".into(),
                description: String::new(),
                status: ModerationStatus::Pending,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn moderation_requires_admin() {
    let backend = MemoryBackend::new();
    let (owner, owner_caller) = signed_in(&backend, "host@example.com", Role::Owner).await;
    let property = property_for(&backend, owner, &owner_caller).await;
    let err = backend
        .set_moderation_status(&owner_caller, ModerationTable::Properties, property.id, ModerationStatus::Approved)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

// =============================================================================
// BOOKINGS
// =============================================================================

#[tokio::test]
async fn bookings_list_newest_check_in_first() {
    let backend = MemoryBackend::new();
    let (user, caller) = signed_in(&backend, "guest@example.com", Role::Guest).await;
    for day in [5, 20, 12] {
        backend
            .insert_booking(&caller, &new_booking(user, date(2024, 6, day)))
            .await
            .unwrap();
    }
    let days: Vec<_> = backend
        .list_user_bookings(&caller, user)
        .await
        .unwrap()
        .iter()
        .map(|b| b.check_in)
        .collect();
    assert_eq!(days, vec![date(2024, 6, 20), date(2024, 6, 12), date(2024, 6, 5)]);
}

#[tokio::test]
async fn anonymous_booking_is_rejected() {
    let backend = MemoryBackend::new();
    let err = backend
        .insert_booking(&Caller::Anonymous, &new_booking(Uuid::new_v4(), date(2024, 6, 1)))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn delete_booking_only_touches_own_rows() {
    let backend = MemoryBackend::new();
    let (user, caller) = signed_in(&backend, "guest@example.com", Role::Guest).await;
    let (_, stranger) = signed_in(&backend, "stranger@example.com", Role::Guest).await;
    let booking = backend
        .insert_booking(&caller, &new_booking(user, date(2024, 6, 1)))
        .await
        .unwrap();

    assert!(matches!(
        backend.delete_booking(&stranger, booking.id).await,
        Err(BaasError::NotFound(_))
    ));
    backend.delete_booking(&caller, booking.id).await.unwrap();
    assert!(backend.list_user_bookings(&caller, user).await.unwrap().is_empty());
}

// =============================================================================
// STORAGE
// =============================================================================

#[tokio::test]
async fn upload_stores_object_and_returns_url() {
    let backend = MemoryBackend::new();
    let (_, caller) = signed_in(&backend, "host@example.com", Role::Owner).await;
    let url = backend
        .upload(&caller, "property-media", "a.jpg", vec![1, 2, 3], "image/jpeg")
        .await
        .unwrap();
    assert_eq!(url, "memory://property-media/a.jpg");
    assert_eq!(backend.object("property-media", "a.jpg"), Some(("image/jpeg".into(), vec![1, 2, 3])));
    assert!(
        backend
            .upload(&Caller::Anonymous, "property-media", "b.jpg", vec![], "image/png")
            .await
            .is_err()
    );
}

use super::*;
use crate::baas::memory::MemoryBackend;
use crate::baas::{AuthProvider, SignUp};
use crate::model::{BookingStatus, NewBooking, PaymentMethod, PaymentStatus, Role};
use crate::pricing::Money;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(user_id: Uuid, check_in: NaiveDate) -> NewBooking {
    NewBooking {
        user_id,
        check_in,
        check_out: check_in.succ_opt().unwrap(),
        guests: 2,
        room_type: "Lake View - Deluxe".into(),
        first_name: "Asha".into(),
        last_name: "Rao".into(),
        email: "guest@example.com".into(),
        phone: "9999999999".into(),
        special_requests: String::new(),
        total_price: Money::from_major(10_030),
        payment_method: PaymentMethod::Card,
        payment_status: PaymentStatus::Paid,
        status: BookingStatus::Confirmed,
    }
}

async fn guest(backend: &MemoryBackend, email: &str) -> (SessionUser, Caller) {
    let SignUp::Confirmed(grant) = backend.sign_up(email, "password1", Role::Guest).await.unwrap() else {
        panic!("expected confirmed sign-up");
    };
    (
        SessionUser { id: grant.user.id, email: grant.user.email, role: Role::Guest },
        Caller::User(grant.access_token),
    )
}

#[tokio::test]
async fn bookings_split_on_today_inclusive() {
    let backend = MemoryBackend::new();
    let (user, caller) = guest(&backend, "guest@example.com").await;
    for check_in in [date(2024, 5, 1), date(2024, 6, 10), date(2024, 7, 1)] {
        backend.insert_booking(&caller, &row(user.id, check_in)).await.unwrap();
    }

    let split = bookings(&backend, &caller, &user, date(2024, 6, 10)).await.unwrap();
    let upcoming: Vec<_> = split.upcoming.iter().map(|b| b.check_in).collect();
    let past: Vec<_> = split.past.iter().map(|b| b.check_in).collect();
    assert_eq!(upcoming, vec![date(2024, 7, 1), date(2024, 6, 10)]);
    assert_eq!(past, vec![date(2024, 5, 1)]);
}

#[tokio::test]
async fn bookings_are_private() {
    let backend = MemoryBackend::new();
    let (owner, owner_caller) = guest(&backend, "guest@example.com").await;
    let (other, other_caller) = guest(&backend, "other@example.com").await;
    backend
        .insert_booking(&owner_caller, &row(owner.id, date(2024, 6, 10)))
        .await
        .unwrap();

    let split = bookings(&backend, &other_caller, &other, date(2024, 1, 1)).await.unwrap();
    assert_eq!(split, GuestBookings::default());
}

#[tokio::test]
async fn cancel_deletes_own_booking_only() {
    let backend = MemoryBackend::new();
    let (user, caller) = guest(&backend, "guest@example.com").await;
    let (_, other_caller) = guest(&backend, "other@example.com").await;
    let booking = backend
        .insert_booking(&caller, &row(user.id, date(2024, 6, 10)))
        .await
        .unwrap();

    assert!(cancel(&backend, &other_caller, booking.id).await.is_err());
    cancel(&backend, &caller, booking.id).await.unwrap();
    let split = bookings(&backend, &caller, &user, date(2024, 1, 1)).await.unwrap();
    assert!(split.upcoming.is_empty());
}

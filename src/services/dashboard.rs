//! Guest dashboard: own bookings and cancellation.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::baas::{BaasError, Backend, Caller, DataStore};
use crate::model::Booking;
use crate::services::session::SessionUser;

/// Bookings split around `today`. Both halves keep newest check-in first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuestBookings {
    pub upcoming: Vec<Booking>,
    pub past: Vec<Booking>,
}

/// A booking whose check-in is today still counts as upcoming.
#[must_use]
pub fn split_bookings(bookings: Vec<Booking>, today: NaiveDate) -> GuestBookings {
    let (upcoming, past) = bookings.into_iter().partition(|b| b.check_in >= today);
    GuestBookings { upcoming, past }
}

/// The user's bookings split around `today`.
///
/// # Errors
///
/// Any backend failure listing the rows.
pub async fn bookings(
    backend: &dyn Backend,
    caller: &Caller,
    user: &SessionUser,
    today: NaiveDate,
) -> Result<GuestBookings, BaasError> {
    let rows = backend.list_user_bookings(caller, user.id).await?;
    Ok(split_bookings(rows, today))
}

/// Delete one of the caller's bookings.
///
/// # Errors
///
/// `NotFound` when nothing the caller may delete matched.
pub async fn cancel(backend: &dyn Backend, caller: &Caller, booking_id: Uuid) -> Result<(), BaasError> {
    backend.delete_booking(caller, booking_id).await?;
    tracing::info!(%booking_id, "booking cancelled");
    Ok(())
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;

//! Guest dashboard endpoints.

use axum::extract::{Path, State};
use chrono::Local;
use uuid::Uuid;

use crate::access::Screen;
use crate::notice::{ApiError, Notice, Reply};
use crate::routes::auth::{CurrentSession, Empty, gate};
use crate::services::dashboard::{self, GuestBookings};
use crate::state::AppState;

/// `GET /api/dashboard/bookings`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn bookings(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<GuestBookings>, ApiError> {
    let member = gate(&current, Screen::Dashboard, Screen::Dashboard.path())?;
    let today = Local::now().date_naive();
    let split = dashboard::bookings(&*state.backend, &member.caller, &member.user, today)
        .await
        .map_err(|e| ApiError::from_error("Error fetching bookings", &e))?;
    Ok(Reply::new(split))
}

/// `DELETE /api/dashboard/bookings/{id}`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn cancel(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Reply<Empty>, ApiError> {
    let member = gate(&current, Screen::Dashboard, Screen::Dashboard.path())?;
    dashboard::cancel(&*state.backend, &member.caller, id)
        .await
        .map_err(|e| ApiError::from_error_described("Error", "Could not cancel booking. Please try again.", &e))?;
    let notice = Notice::success("Booking Cancelled", "Your booking has been successfully cancelled.");
    Ok(Reply::with_notice(Empty {}, notice))
}

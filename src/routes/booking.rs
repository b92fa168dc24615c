//! Booking wizard endpoints.
//!
//! The wizard lives in the visitor's session, so anonymous visitors get a
//! session cookie on a successful `start`. Submitting still requires a
//! signed-in user.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::ROOMS_PATH;
use crate::notice::{ApiError, Notice, Reply};
use crate::routes::auth::{CurrentSession, session_cookie};
use crate::services::booking::{self, BookingError, DraftPatch, WizardView};
use crate::state::AppState;

/// Missing wizards and vanished rooms send the visitor back to the rooms list.
fn booking_error(title: &str, err: &BookingError) -> ApiError {
    match err {
        BookingError::NoWizard => ApiError::redirect(ROOMS_PATH),
        BookingError::RoomUnavailable => {
            ApiError::redirect_with_notice(ROOMS_PATH, Notice::failure(title, err.to_string()))
        }
        BookingError::NotSignedIn => ApiError::from_error("Authentication Error", err),
        _ => ApiError::from_error(title, err),
    }
}

fn token_of(current: &CurrentSession) -> Result<&str, ApiError> {
    current.token.as_deref().ok_or_else(|| ApiError::redirect(ROOMS_PATH))
}

#[derive(Debug, Deserialize)]
pub struct StartForm {
    pub room_id: Option<Uuid>,
}

/// `POST /api/booking/start`
///
/// # Errors
///
/// A redirect to the rooms list without a wizard, else the failing
/// step as a notice.
pub async fn start(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(form): Json<StartForm>,
) -> Result<(CookieJar, Reply<WizardView>), ApiError> {
    let room_id = form.room_id.ok_or_else(|| ApiError::redirect(ROOMS_PATH))?;
    let (token, view) = booking::start(&*state.backend, &state.sessions, current.token.as_deref(), room_id)
        .await
        .map_err(|e| booking_error("Room unavailable", &e))?;
    let jar = CookieJar::new().add(session_cookie(token, state.config.cookie_secure));
    Ok((jar, Reply::new(view)))
}

/// `GET /api/booking`
///
/// # Errors
///
/// A redirect to the rooms list without a wizard, else the failing
/// step as a notice.
pub async fn current(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<WizardView>, ApiError> {
    let view = booking::current(&state.sessions, token_of(&current)?)
        .await
        .map_err(|e| booking_error("Booking", &e))?;
    Ok(Reply::new(view))
}

/// `PATCH /api/booking`
///
/// # Errors
///
/// A redirect to the rooms list without a wizard, else the failing
/// step as a notice.
pub async fn update(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(patch): Json<DraftPatch>,
) -> Result<Reply<WizardView>, ApiError> {
    let view = booking::update(&*state.backend, &state.sessions, token_of(&current)?, patch)
        .await
        .map_err(|e| booking_error("Invalid booking details", &e))?;
    Ok(Reply::new(view))
}

/// `POST /api/booking/next`
///
/// # Errors
///
/// A redirect to the rooms list without a wizard, else the failing
/// step as a notice.
pub async fn next(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<WizardView>, ApiError> {
    let view = booking::next(&state.sessions, token_of(&current)?)
        .await
        .map_err(|e| booking_error("Missing details", &e))?;
    Ok(Reply::new(view))
}

/// `POST /api/booking/back`
///
/// # Errors
///
/// A redirect to the rooms list without a wizard, else the failing
/// step as a notice.
pub async fn back(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<WizardView>, ApiError> {
    let view = booking::back(&state.sessions, token_of(&current)?)
        .await
        .map_err(|e| booking_error("Booking", &e))?;
    Ok(Reply::new(view))
}

/// `POST /api/booking/submit`
///
/// # Errors
///
/// A redirect to the rooms list without a wizard, else the failing
/// step as a notice.
pub async fn submit(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<WizardView>, ApiError> {
    let (view, notice) = booking::submit(&*state.backend, &state.sessions, token_of(&current)?)
        .await
        .map_err(|e| booking_error("Booking Failed", &e))?;
    Ok(Reply::with_notice(view, notice))
}

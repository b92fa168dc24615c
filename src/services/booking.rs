//! Booking wizard: a four-step form held in the visitor's session.
//!
//! DESIGN
//! ======
//! `DatesAndRoom -> GuestDetails -> Payment -> Confirmation`. Each step has a
//! completeness gate that decides whether `next` may leave it. Payment is
//! only left through `submit`, which writes exactly one booking row and
//! either moves to Confirmation or leaves the wizard where it was.
//!
//! TRADE-OFFS
//! ==========
//! Submission copies the wizard out of the session before calling the
//! backend so no lock is held across the network call. Two concurrent
//! submits from the same session can therefore both succeed; nothing here
//! prevents double booking.

use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::baas::{Backend, BaasError, Caller, DataStore};
use crate::model::{Booking, NewBooking, PaymentMethod, RoomListing};
use crate::notice::{ErrorCode, Notice};
use crate::pricing::{self, Money, Quote};
use crate::services::session::SessionStore;

pub const MIN_GUESTS: u32 = 1;
pub const MAX_GUESTS: u32 = 6;
pub const DEFAULT_GUESTS: u32 = 2;

// =============================================================================
// STEPS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    DatesAndRoom,
    GuestDetails,
    Payment,
    Confirmation,
}

impl BookingStep {
    pub const ALL: [BookingStep; 4] =
        [BookingStep::DatesAndRoom, BookingStep::GuestDetails, BookingStep::Payment, BookingStep::Confirmation];

    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::DatesAndRoom => 1,
            Self::GuestDetails => 2,
            Self::Payment => 3,
            Self::Confirmation => 4,
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::DatesAndRoom => "Dates & Room",
            Self::GuestDetails => "Guest Details",
            Self::Payment => "Payment",
            Self::Confirmation => "Confirmation",
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("That room is no longer available.")]
    RoomUnavailable,
    #[error("No booking in progress.")]
    NoWizard,
    #[error("Please choose check-in and check-out dates and a room.")]
    DatesIncomplete,
    #[error("Please fill in first name, last name, email and phone.")]
    GuestDetailsIncomplete,
    #[error("Guests must be between 1 and 6, got {0}.")]
    GuestsOutOfRange(u32),
    #[error("Please choose a payment method.")]
    MissingPaymentMethod,
    #[error("Cannot {action} from the {step_title} step.", step_title = .step.title())]
    InvalidTransition { step: BookingStep, action: &'static str },
    #[error("This booking is already complete.")]
    Finished,
    #[error("You must be logged in to make a booking.")]
    NotSignedIn,
    #[error(transparent)]
    Baas(#[from] BaasError),
}

impl ErrorCode for BookingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RoomUnavailable => "E_ROOM_UNAVAILABLE",
            Self::NoWizard => "E_NO_BOOKING",
            Self::DatesIncomplete
            | Self::GuestDetailsIncomplete
            | Self::GuestsOutOfRange(_)
            | Self::MissingPaymentMethod => "E_VALIDATION",
            Self::InvalidTransition { .. } | Self::Finished => "E_INVALID_STEP",
            Self::NotSignedIn => "E_NOT_SIGNED_IN",
            Self::Baas(e) => e.error_code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::RoomUnavailable | Self::NoWizard => StatusCode::NOT_FOUND,
            Self::DatesIncomplete
            | Self::GuestDetailsIncomplete
            | Self::GuestsOutOfRange(_)
            | Self::MissingPaymentMethod => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidTransition { .. } | Self::Finished => StatusCode::CONFLICT,
            Self::NotSignedIn => StatusCode::UNAUTHORIZED,
            Self::Baas(e) => e.status(),
        }
    }

    fn session_expired(&self) -> bool {
        matches!(self, Self::Baas(e) if e.session_expired())
    }
}

// =============================================================================
// DRAFT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDraft {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: u32,
    pub room_id: Option<Uuid>,
    pub room_name: String,
    pub nightly_price: Money,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub special_requests: String,
    pub payment_method: Option<PaymentMethod>,
}

impl BookingDraft {
    fn for_room(room: &RoomListing, email: Option<&str>) -> Self {
        Self {
            check_in: None,
            check_out: None,
            guests: DEFAULT_GUESTS,
            room_id: Some(room.room.id),
            room_name: room.display_name(),
            nightly_price: room.room.price,
            first_name: String::new(),
            last_name: String::new(),
            email: email.unwrap_or_default().to_owned(),
            phone: String::new(),
            special_requests: String::new(),
            payment_method: None,
        }
    }

    fn dates_and_room_complete(&self) -> bool {
        self.check_in.is_some()
            && self.check_out.is_some()
            && self.room_id.is_some()
            && pricing::nights(self.check_in, self.check_out) > 0
    }

    fn guest_details_complete(&self) -> bool {
        [&self.first_name, &self.last_name, &self.email, &self.phone]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Absent stays `None`; an explicit `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of the draft. Absent fields are left as they are; dates
/// sent as `null` are cleared.
///
/// `room_id` is resolved by [`update`], which looks the room up first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub check_in: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub check_out: Option<Option<NaiveDate>>,
    pub guests: Option<u32>,
    pub room_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub special_requests: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

// =============================================================================
// WIZARD
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BookingWizard {
    step: BookingStep,
    draft: BookingDraft,
    booking: Option<Booking>,
}

impl BookingWizard {
    #[must_use]
    pub fn start(room: &RoomListing, email: Option<&str>) -> Self {
        Self { step: BookingStep::DatesAndRoom, draft: BookingDraft::for_room(room, email), booking: None }
    }

    #[must_use]
    pub fn step(&self) -> BookingStep {
        self.step
    }

    #[must_use]
    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    #[must_use]
    pub fn nights(&self) -> u32 {
        pricing::nights(self.draft.check_in, self.draft.check_out)
    }

    #[must_use]
    pub fn quote(&self) -> Quote {
        pricing::quote(self.nights(), self.draft.nightly_price)
    }

    /// Whether `next` would leave the current step.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        match self.step {
            BookingStep::DatesAndRoom => self.draft.dates_and_room_complete(),
            BookingStep::GuestDetails => self.draft.guest_details_complete(),
            BookingStep::Payment | BookingStep::Confirmation => false,
        }
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.step == BookingStep::Payment && self.draft.payment_method.is_some()
    }

    /// Apply a patch. `room_id` is ignored here; see [`BookingWizard::select_room`].
    ///
    /// # Errors
    ///
    /// Fails once confirmed, or when the guest count is out of range.
    pub fn apply(&mut self, patch: DraftPatch) -> Result<(), BookingError> {
        if self.step == BookingStep::Confirmation {
            return Err(BookingError::Finished);
        }
        if let Some(guests) = patch.guests
            && !(MIN_GUESTS..=MAX_GUESTS).contains(&guests)
        {
            return Err(BookingError::GuestsOutOfRange(guests));
        }

        let draft = &mut self.draft;
        if let Some(v) = patch.check_in {
            draft.check_in = v;
        }
        if let Some(v) = patch.check_out {
            draft.check_out = v;
        }
        if let Some(v) = patch.guests {
            draft.guests = v;
        }
        if let Some(v) = patch.first_name {
            draft.first_name = v;
        }
        if let Some(v) = patch.last_name {
            draft.last_name = v;
        }
        if let Some(v) = patch.email {
            draft.email = v;
        }
        if let Some(v) = patch.phone {
            draft.phone = v;
        }
        if let Some(v) = patch.special_requests {
            draft.special_requests = v;
        }
        if let Some(v) = patch.payment_method {
            draft.payment_method = Some(v);
        }
        Ok(())
    }

    /// Fill in the contact email after a mid-booking sign-in, unless the
    /// visitor already typed one.
    pub fn adopt_email(&mut self, email: &str) {
        if self.step != BookingStep::Confirmation && self.draft.email.trim().is_empty() {
            self.draft.email = email.to_owned();
        }
    }

    /// Switch the draft to another room.
    ///
    /// # Errors
    ///
    /// Fails once confirmed.
    pub fn select_room(&mut self, room: &RoomListing) -> Result<(), BookingError> {
        if self.step == BookingStep::Confirmation {
            return Err(BookingError::Finished);
        }
        self.draft.room_id = Some(room.room.id);
        self.draft.room_name = room.display_name();
        self.draft.nightly_price = room.room.price;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the gate that blocked the move, or an invalid transition from
    /// Payment and Confirmation.
    pub fn next(&mut self) -> Result<BookingStep, BookingError> {
        self.step = match self.step {
            BookingStep::DatesAndRoom if self.draft.dates_and_room_complete() => BookingStep::GuestDetails,
            BookingStep::DatesAndRoom => return Err(BookingError::DatesIncomplete),
            BookingStep::GuestDetails if self.draft.guest_details_complete() => BookingStep::Payment,
            BookingStep::GuestDetails => return Err(BookingError::GuestDetailsIncomplete),
            step @ BookingStep::Payment => return Err(BookingError::InvalidTransition { step, action: "continue" }),
            BookingStep::Confirmation => return Err(BookingError::Finished),
        };
        Ok(self.step)
    }

    /// Step back once. A no-op on the first step.
    ///
    /// # Errors
    ///
    /// Fails once confirmed.
    pub fn back(&mut self) -> Result<BookingStep, BookingError> {
        self.step = match self.step {
            BookingStep::DatesAndRoom | BookingStep::GuestDetails => BookingStep::DatesAndRoom,
            BookingStep::Payment => BookingStep::GuestDetails,
            BookingStep::Confirmation => return Err(BookingError::Finished),
        };
        Ok(self.step)
    }

    /// The row to insert for `user_id`.
    ///
    /// # Errors
    ///
    /// Fails unless on Payment with every earlier gate still satisfied and a
    /// payment method chosen.
    pub fn to_new_booking(&self, user_id: Uuid) -> Result<NewBooking, BookingError> {
        match self.step {
            BookingStep::Payment => {}
            BookingStep::Confirmation => return Err(BookingError::Finished),
            step => return Err(BookingError::InvalidTransition { step, action: "submit" }),
        }
        let draft = &self.draft;
        let (Some(check_in), Some(check_out)) = (draft.check_in, draft.check_out) else {
            return Err(BookingError::DatesIncomplete);
        };
        if !draft.dates_and_room_complete() {
            return Err(BookingError::DatesIncomplete);
        }
        if !draft.guest_details_complete() {
            return Err(BookingError::GuestDetailsIncomplete);
        }
        let method = draft.payment_method.ok_or(BookingError::MissingPaymentMethod)?;
        let (payment_status, status) = method.initial_statuses();

        Ok(NewBooking {
            user_id,
            check_in,
            check_out,
            guests: draft.guests,
            room_type: draft.room_name.clone(),
            first_name: draft.first_name.trim().to_owned(),
            last_name: draft.last_name.trim().to_owned(),
            email: draft.email.trim().to_owned(),
            phone: draft.phone.trim().to_owned(),
            special_requests: draft.special_requests.trim().to_owned(),
            total_price: self.quote().total,
            payment_method: method,
            payment_status,
            status,
        })
    }

    /// Record the stored booking and finish.
    pub fn confirm(&mut self, booking: Booking) {
        self.booking = Some(booking);
        self.step = BookingStep::Confirmation;
    }

    #[must_use]
    pub fn view(&self) -> WizardView {
        WizardView {
            step: self.step,
            step_number: self.step.number(),
            step_title: self.step.title(),
            draft: self.draft.clone(),
            nights: self.nights(),
            quote: self.quote(),
            payment_label: self.draft.payment_method.map(PaymentMethod::label),
            can_advance: self.can_advance(),
            can_go_back: matches!(self.step, BookingStep::GuestDetails | BookingStep::Payment),
            can_submit: self.can_submit(),
            booking: self.booking.clone(),
        }
    }
}

/// What the booking screen renders.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: BookingStep,
    pub step_number: u8,
    pub step_title: &'static str,
    pub draft: BookingDraft,
    pub nights: u32,
    pub quote: Quote,
    pub payment_label: Option<&'static str>,
    pub can_advance: bool,
    pub can_go_back: bool,
    pub can_submit: bool,
    pub booking: Option<Booking>,
}

/// Notification shown after a booking is stored.
#[must_use]
pub fn confirmation_notice(method: PaymentMethod) -> Notice {
    match method {
        PaymentMethod::PayLater => Notice::success(
            "Reservation Held!",
            "Your booking is reserved. Please complete payment before check-in.",
        ),
        PaymentMethod::Card | PaymentMethod::Upi | PaymentMethod::Netbanking | PaymentMethod::Wallet => {
            Notice::success("Booking Confirmed!", "Your payment was successful. Your Kashmir adventure awaits!")
        }
    }
}

// =============================================================================
// SESSION-BOUND OPERATIONS
// =============================================================================

async fn bookable_room(
    backend: &dyn Backend,
    sessions: &SessionStore,
    token: Option<&str>,
    room_id: Uuid,
) -> Result<RoomListing, BookingError> {
    let session = match token {
        Some(token) => sessions.get(token).await,
        None => None,
    };
    let caller = session.map_or(Caller::Anonymous, |s| s.caller());
    backend
        .get_bookable_room(&caller, room_id)
        .await?
        .ok_or(BookingError::RoomUnavailable)
}

/// Begin a booking for `room_id`, replacing any wizard already in progress.
///
/// The room is resolved before any session is opened, so a failed start
/// leaves the store untouched. Returns the session token holding the wizard.
///
/// # Errors
///
/// `RoomUnavailable` when the room is unknown or its property is not
/// approved; `Baas` when the lookup fails.
pub async fn start(
    backend: &dyn Backend,
    sessions: &SessionStore,
    token: Option<&str>,
    room_id: Uuid,
) -> Result<(String, WizardView), BookingError> {
    let room = bookable_room(backend, sessions, token, room_id).await?;
    let token = sessions.ensure(token).await;
    let view = sessions
        .with_session(&token, |session| {
            let email = session.user.as_ref().map(|u| u.email.as_str());
            let wizard = BookingWizard::start(&room, email);
            let view = wizard.view();
            session.wizard = Some(wizard);
            view
        })
        .await
        .ok_or(BookingError::NoWizard)?;
    Ok((token, view))
}

/// The wizard stored in the session.
///
/// # Errors
///
/// `NoWizard` when the session has none.
pub async fn current(sessions: &SessionStore, token: &str) -> Result<WizardView, BookingError> {
    sessions
        .get(token)
        .await
        .and_then(|s| s.wizard.map(|w| w.view()))
        .ok_or(BookingError::NoWizard)
}

async fn with_wizard<R>(
    sessions: &SessionStore,
    token: &str,
    f: impl FnOnce(&mut BookingWizard) -> Result<R, BookingError>,
) -> Result<R, BookingError> {
    sessions
        .with_session(token, |session| session.wizard.as_mut().map(f))
        .await
        .flatten()
        .ok_or(BookingError::NoWizard)?
}

/// Apply a draft patch, switching rooms first when it names one.
///
/// # Errors
///
/// `NoWizard`, `RoomUnavailable` for a room that cannot be booked, or
/// the wizard's own validation and step errors.
pub async fn update(
    backend: &dyn Backend,
    sessions: &SessionStore,
    token: &str,
    mut patch: DraftPatch,
) -> Result<WizardView, BookingError> {
    let room = match patch.room_id.take() {
        Some(room_id) => Some(bookable_room(backend, sessions, Some(token), room_id).await?),
        None => None,
    };
    with_wizard(sessions, token, |wizard| {
        if let Some(room) = &room {
            wizard.select_room(room)?;
        }
        wizard.apply(patch)?;
        Ok(wizard.view())
    })
    .await
}

/// Advance one step.
///
/// # Errors
///
/// `NoWizard`, or the gate that blocked the step.
pub async fn next(sessions: &SessionStore, token: &str) -> Result<WizardView, BookingError> {
    with_wizard(sessions, token, |wizard| {
        wizard.next()?;
        Ok(wizard.view())
    })
    .await
}

/// Return to the previous step.
///
/// # Errors
///
/// `NoWizard`, or an invalid transition.
pub async fn back(sessions: &SessionStore, token: &str) -> Result<WizardView, BookingError> {
    with_wizard(sessions, token, |wizard| {
        wizard.back()?;
        Ok(wizard.view())
    })
    .await
}

/// Write the booking and move to Confirmation.
///
/// On any failure the wizard stays on Payment with its draft intact.
///
/// # Errors
///
/// `NoWizard`, `NotSignedIn`, an incomplete draft, or the backend
/// refusing the insert.
pub async fn submit(
    backend: &dyn Backend,
    sessions: &SessionStore,
    token: &str,
) -> Result<(WizardView, Notice), BookingError> {
    let session = sessions.get(token).await.ok_or(BookingError::NoWizard)?;
    let wizard = session.wizard.as_ref().ok_or(BookingError::NoWizard)?;
    let user = session.user.as_ref().ok_or(BookingError::NotSignedIn)?;
    let row = wizard.to_new_booking(user.id)?;

    let booking = backend.insert_booking(&session.caller(), &row).await?;
    tracing::info!(booking_id = %booking.id, user_id = %user.id, method = ?row.payment_method, "booking stored");

    let mut finished = wizard.clone();
    finished.confirm(booking);
    let view = finished.view();
    sessions
        .with_session(token, |s| s.wizard = Some(finished))
        .await;
    Ok((view, confirmation_notice(row.payment_method)))
}

#[cfg(test)]
#[path = "booking_test.rs"]
mod tests;

//! Contact form endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::notice::{ApiError, Reply};
use crate::services::contact::{self, ContactForm};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SentBody {
    pub id: i64,
}

/// `POST /api/contact`
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn submit(State(state): State<AppState>, Json(form): Json<ContactForm>) -> Result<Reply<SentBody>, ApiError> {
    let message = state
        .contact
        .submit(form)
        .await
        .map_err(|e| ApiError::from_error("Message Not Sent", &e))?;
    Ok(Reply::with_notice(SentBody { id: message.id }, contact::sent_notice()))
}

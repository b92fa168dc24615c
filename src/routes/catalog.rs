//! Public catalog: rooms and the services page.

use axum::extract::State;
use serde::Serialize;

use crate::model::RoomListing;
use crate::notice::{ApiError, Notice, Reply};
use crate::routes::auth::CurrentSession;
use crate::services::listing;
use crate::services::offering::{self, ServiceTile, TILES};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RoomsBody {
    pub rooms: Vec<RoomListing>,
}

/// `GET /api/rooms`
///
/// # Errors
///
/// The failing service call as a notice.
pub async fn rooms(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<RoomsBody>, ApiError> {
    let rooms = listing::rooms(&*state.backend, &current.caller())
        .await
        .map_err(|e| ApiError::from_error("Error fetching rooms", &e))?;
    Ok(Reply::new(RoomsBody { rooms }))
}

#[derive(Debug, Serialize)]
pub struct TilesBody {
    pub tiles: &'static [ServiceTile],
    /// Shown when a coming-soon tile is picked.
    pub coming_soon: Notice,
}

/// `GET /api/services/tiles`
pub async fn tiles() -> Reply<TilesBody> {
    Reply::new(TilesBody { tiles: &TILES, coming_soon: offering::coming_soon_notice() })
}

//! Owner-submitted services and the public services page.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::access::ROOMS_PATH;
use crate::baas::{BaasError, Backend, Caller, DataStore};
use crate::model::{ModerationStatus, NewService, Service};
use crate::notice::{ErrorCode, Notice};
use crate::schema::{SchemaError, ServiceDefinition};
use crate::services::session::SessionUser;

#[derive(Debug, thiserror::Error)]
pub enum OfferingError {
    #[error("Please choose a service type.")]
    NoDefinitionChosen,
    #[error("Unknown service type: {0}")]
    UnknownDefinition(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Baas(#[from] BaasError),
}

impl ErrorCode for OfferingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoDefinitionChosen => "E_VALIDATION",
            Self::UnknownDefinition(_) => "E_NOT_FOUND",
            Self::Schema(e) => e.error_code(),
            Self::Baas(e) => e.error_code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NoDefinitionChosen => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownDefinition(_) => StatusCode::NOT_FOUND,
            Self::Schema(e) => e.status(),
            Self::Baas(e) => e.status(),
        }
    }

    fn session_expired(&self) -> bool {
        matches!(self, Self::Baas(e) if e.session_expired())
    }
}

// =============================================================================
// TILES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileStatus {
    Live,
    ComingSoon,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceTile {
    pub title: &'static str,
    pub description: &'static str,
    pub status: TileStatus,
    /// Where a live tile leads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'static str>,
}

pub const TILES: [ServiceTile; 3] = [
    ServiceTile {
        title: "Cab Services",
        description: "Reliable and comfortable cabs to explore every corner of Kashmir. Book for local sightseeing or airport transfers.",
        status: TileStatus::ComingSoon,
        path: None,
    },
    ServiceTile {
        title: "Trekking & Hiking",
        description: "Guided treks and hiking packages for all skill levels. Discover breathtaking trails and hidden valleys.",
        status: TileStatus::ComingSoon,
        path: None,
    },
    ServiceTile {
        title: "Verified Stays",
        description: "Browse our complete collection of hand-picked, admin-approved properties for a safe and memorable stay.",
        status: TileStatus::Live,
        path: Some(ROOMS_PATH),
    },
];

/// Shown when a visitor picks a tile that is not live yet.
#[must_use]
pub fn coming_soon_notice() -> Notice {
    Notice::success("Coming Soon!", "We're putting the final touches on this feature. Stay tuned!")
}

// =============================================================================
// SUBMISSION
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSubmission {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Service types an owner can offer.
///
/// # Errors
///
/// Backend failures only.
pub async fn definitions(backend: &dyn Backend, caller: &Caller) -> Result<Vec<ServiceDefinition>, OfferingError> {
    Ok(backend.list_service_definitions(caller).await?)
}

/// Validate `submission` against its definition and store it for moderation.
///
/// # Errors
///
/// `NoDefinitionChosen`, `UnknownDefinition`, field validation
/// errors, or the backend refusing the insert.
pub async fn submit_service(
    backend: &dyn Backend,
    caller: &Caller,
    owner: &SessionUser,
    submission: &ServiceSubmission,
) -> Result<Service, OfferingError> {
    let slug = submission.slug.trim();
    if slug.is_empty() {
        return Err(OfferingError::NoDefinitionChosen);
    }
    let definition = backend
        .list_service_definitions(caller)
        .await?
        .into_iter()
        .find(|d| d.slug == slug)
        .ok_or_else(|| OfferingError::UnknownDefinition(slug.to_owned()))?;
    let data = definition.validate_data(&submission.data)?;

    let service = backend
        .insert_service(
            caller,
            &NewService {
                owner_id: owner.id,
                definition_id: data.definition_id,
                data: data.values,
                status: ModerationStatus::Pending,
            },
        )
        .await?;
    tracing::info!(service_id = %service.id, owner_id = %owner.id, %slug, "service submitted");
    Ok(service)
}

#[cfg(test)]
#[path = "offering_test.rs"]
mod tests;

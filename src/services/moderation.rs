//! Admin panel: pending items, service definitions, user roles.
//!
//! The data tier refuses these writes for non-admins. Routes gate the screen
//! as well, so a refusal from here usually means a stale session.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::baas::{BaasError, Backend, Caller, DataStore};
use crate::model::{ModerationStatus, ModerationTable, Profile, PropertyWithOwner, Role, ServiceListing};
use crate::notice::ErrorCode;
use crate::schema::{NewServiceDefinition, SchemaError, ServiceDefinition};
use crate::services::session::SessionStore;

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("Items can only be approved or rejected.")]
    NotADecision,
    #[error("Please enter part of an email address.")]
    EmptySearch,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Baas(#[from] BaasError),
}

impl ErrorCode for ModerationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotADecision | Self::EmptySearch => "E_VALIDATION",
            Self::Schema(e) => e.error_code(),
            Self::Baas(e) => e.error_code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotADecision | Self::EmptySearch => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Schema(e) => e.status(),
            Self::Baas(e) => e.status(),
        }
    }

    fn session_expired(&self) -> bool {
        matches!(self, Self::Baas(e) if e.session_expired())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingQueue {
    pub properties: Vec<PropertyWithOwner>,
    pub services: Vec<ServiceListing>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Decision {
    pub status: ModerationStatus,
}

/// Properties and services waiting for a decision.
///
/// # Errors
///
/// Backend failures only.
pub async fn pending(backend: &dyn Backend, caller: &Caller) -> Result<PendingQueue, ModerationError> {
    let properties = backend
        .list_properties_with_status(caller, ModerationStatus::Pending)
        .await?;
    let services = backend
        .list_services_with_status(caller, ModerationStatus::Pending)
        .await?;
    Ok(PendingQueue { properties, services })
}

/// Approve or reject one property or service.
///
/// # Errors
///
/// `NotADecision` for `pending`, or the backend refusing the update.
pub async fn decide(
    backend: &dyn Backend,
    caller: &Caller,
    table: ModerationTable,
    id: Uuid,
    status: ModerationStatus,
) -> Result<(), ModerationError> {
    if status == ModerationStatus::Pending {
        return Err(ModerationError::NotADecision);
    }
    backend.set_moderation_status(caller, table, id, status).await?;
    tracing::info!(table = table.as_str(), %id, status = status.as_str(), "moderation decision");
    Ok(())
}

/// Every service definition.
///
/// # Errors
///
/// Backend failures only.
pub async fn definitions(backend: &dyn Backend, caller: &Caller) -> Result<Vec<ServiceDefinition>, ModerationError> {
    Ok(backend.list_service_definitions(caller).await?)
}

/// Normalize and store a new service definition.
///
/// # Errors
///
/// An invalid definition, or the backend refusing the insert.
pub async fn create_definition(
    backend: &dyn Backend,
    caller: &Caller,
    definition: NewServiceDefinition,
) -> Result<ServiceDefinition, ModerationError> {
    let definition = definition.normalized()?;
    Ok(backend.insert_service_definition(caller, &definition).await?)
}

/// Profiles whose email contains `query`, case-insensitively.
///
/// # Errors
///
/// `EmptySearch` for a blank query, or a backend failure.
pub async fn search_users(backend: &dyn Backend, caller: &Caller, query: &str) -> Result<Vec<Profile>, ModerationError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ModerationError::EmptySearch);
    }
    Ok(backend.search_profiles(caller, query).await?)
}

/// Change a user's role, then refresh their open sessions.
///
/// # Errors
///
/// The backend refusing the role update. Sessions are untouched then.
pub async fn change_role(
    backend: &dyn Backend,
    sessions: &SessionStore,
    caller: &Caller,
    user_id: Uuid,
    role: Role,
) -> Result<(), ModerationError> {
    backend.update_user_role(caller, user_id, role).await?;
    let refreshed = sessions.update_role(user_id, role).await;
    tracing::info!(%user_id, role = role.as_str(), refreshed, "user role changed");
    Ok(())
}

#[cfg(test)]
#[path = "moderation_test.rs"]
mod tests;

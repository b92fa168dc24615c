//! Admin dashboard endpoints. Every handler is gated to admins.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Screen;
use crate::model::{ModerationStatus, ModerationTable, Profile, Role, UnknownTable};
use crate::notice::{ApiError, Notice, Reply};
use crate::routes::auth::{CurrentSession, Empty, Member, gate};
use crate::schema::{NewServiceDefinition, ServiceDefinition};
use crate::services::moderation::{self, Decision, PendingQueue};
use crate::state::AppState;

fn admin(current: &CurrentSession) -> Result<Member, ApiError> {
    gate(current, Screen::AdminDashboard, Screen::AdminDashboard.path())
}

/// `GET /api/admin/pending`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn pending(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<PendingQueue>, ApiError> {
    let member = admin(&current)?;
    let queue = moderation::pending(&*state.backend, &member.caller)
        .await
        .map_err(|e| ApiError::from_error("Error fetching properties", &e))?;
    Ok(Reply::new(queue))
}

/// `POST /api/admin/{properties|services}/{id}/status`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn decide(
    State(state): State<AppState>,
    current: CurrentSession,
    Path((table, id)): Path<(String, Uuid)>,
    Json(decision): Json<Decision>,
) -> Result<Reply<Empty>, ApiError> {
    let member = admin(&current)?;
    let table: ModerationTable = table.parse().map_err(|e: UnknownTable| ApiError::not_found("Not found", e.0))?;
    let verb = match decision.status {
        ModerationStatus::Rejected => "reject",
        ModerationStatus::Approved | ModerationStatus::Pending => "approve",
    };
    moderation::decide(&*state.backend, &member.caller, table, id, decision.status)
        .await
        .map_err(|e| ApiError::from_error(&format!("Failed to {verb}"), &e))?;
    let notice = Notice::success("Success!", format!("Item has been {}.", decision.status.as_str()));
    Ok(Reply::with_notice(Empty {}, notice))
}

#[derive(Debug, Serialize)]
pub struct DefinitionsBody {
    pub definitions: Vec<ServiceDefinition>,
}

/// `GET /api/admin/service-definitions`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn definitions(State(state): State<AppState>, current: CurrentSession) -> Result<Reply<DefinitionsBody>, ApiError> {
    let member = admin(&current)?;
    let definitions = moderation::definitions(&*state.backend, &member.caller)
        .await
        .map_err(|e| ApiError::from_error("Error fetching service definitions", &e))?;
    Ok(Reply::new(DefinitionsBody { definitions }))
}

#[derive(Debug, Serialize)]
pub struct DefinitionBody {
    pub definition: ServiceDefinition,
}

/// `POST /api/admin/service-definitions`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn create_definition(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(definition): Json<NewServiceDefinition>,
) -> Result<Reply<DefinitionBody>, ApiError> {
    let member = admin(&current)?;
    let definition = moderation::create_definition(&*state.backend, &member.caller, definition)
        .await
        .map_err(|e| ApiError::from_error("Failed to add definition", &e))?;
    Ok(Reply::with_notice(DefinitionBody { definition }, Notice::success("Success!", "New service definition created.")))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct UsersBody {
    pub users: Vec<Profile>,
}

/// `GET /api/admin/users?q=`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn search_users(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<SearchQuery>,
) -> Result<Reply<UsersBody>, ApiError> {
    let member = admin(&current)?;
    let users = moderation::search_users(&*state.backend, &member.caller, &query.q)
        .await
        .map_err(|e| ApiError::from_error("Search failed", &e))?;
    Ok(Reply::new(UsersBody { users }))
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: Role,
}

/// `POST /api/admin/users/{id}/role`
///
/// # Errors
///
/// A redirect when the session may not see the screen, else the
/// failing service call as a notice.
pub async fn change_role(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<Uuid>,
    Json(form): Json<RoleForm>,
) -> Result<Reply<Empty>, ApiError> {
    let member = admin(&current)?;
    moderation::change_role(&*state.backend, &state.sessions, &member.caller, id, form.role)
        .await
        .map_err(|e| ApiError::from_error("Role update failed", &e))?;
    let notice = Notice::success("Role Updated!", "The user role has been successfully changed.");
    Ok(Reply::with_notice(Empty {}, notice))
}

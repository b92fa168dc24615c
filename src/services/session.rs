//! Session store and session-change notifications.
//!
//! ARCHITECTURE
//! ============
//! The browser holds an opaque random token in a cookie; the store maps it
//! to the signed-in user, the backend access token and the booking wizard.
//! Anonymous sessions exist so a visitor can fill in the wizard before
//! signing in.
//!
//! TRADE-OFFS
//! ==========
//! Sessions are process-local and vanish on restart. Signing in always mints
//! a fresh token so a token observed before login is useless afterwards.
//! A session lives at most as long as its cookie; expired entries are
//! invisible to lookups and removed by the periodic sweep.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::access::dashboard_path;
use crate::baas::{AccessToken, Caller};
use crate::model::Role;
use crate::services::booking::BookingWizard;

const EVENT_CAPACITY: usize = 64;

/// Cookie max-age and server-side lifetime of a session.
pub const SESSION_MAX_AGE_DAYS: i64 = 7;
pub const SESSION_TTL: Duration = Duration::from_secs(SESSION_MAX_AGE_DAYS.unsigned_abs() * 24 * 60 * 60);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// The signed-in user as the rest of the app sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl SessionUser {
    #[must_use]
    pub fn dashboard(&self) -> &'static str {
        dashboard_path(self.role)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<SessionUser>,
    access_token: Option<AccessToken>,
    /// Entered through an emailed recovery link.
    pub recovery: bool,
    pub wizard: Option<BookingWizard>,
}

impl Session {
    #[must_use]
    pub fn signed_in(user: SessionUser, access_token: AccessToken) -> Self {
        Self { user: Some(user), access_token: Some(access_token), recovery: false, wizard: None }
    }

    #[must_use]
    pub fn caller(&self) -> Caller {
        self.access_token.clone().map_or(Caller::Anonymous, Caller::User)
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }
}

/// Auth-state changes other parts of the app may react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: Uuid, role: Role },
    SignedOut { user_id: Uuid },
    PasswordRecovery { user_id: Uuid },
    RoleChanged { user_id: Uuid, role: Role },
}

struct Entry {
    session: Session,
    opened_at: Instant,
}

impl Entry {
    fn new(session: Session) -> Self {
        Self { session, opened_at: Instant::now() }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.opened_at.elapsed() >= ttl
    }
}

/// The live session under `token`. An expired entry is removed on sight.
fn live<'a>(sessions: &'a mut HashMap<String, Entry>, token: &str, ttl: Duration) -> Option<&'a mut Session> {
    if sessions.get(token)?.is_expired(ttl) {
        sessions.remove(token);
        return None;
    }
    sessions.get_mut(token).map(|entry| &mut entry.session)
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    events: broadcast::Sender<SessionEvent>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), events, ttl }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        live(&mut *self.sessions.write().await, token, self.ttl).cloned()
    }

    #[cfg(test)]
    pub async fn user(&self, token: &str) -> Option<SessionUser> {
        self.get(token).await.and_then(|s| s.user)
    }

    /// Return `token` if it names a live session, else open an anonymous one.
    pub async fn ensure(&self, token: Option<&str>) -> String {
        let mut sessions = self.sessions.write().await;
        if let Some(token) = token
            && live(&mut sessions, token, self.ttl).is_some()
        {
            return token.to_owned();
        }
        let token = generate_token();
        sessions.insert(token.clone(), Entry::new(Session::default()));
        token
    }

    /// Store a new session under a fresh token.
    ///
    /// A wizard in progress under `previous` carries over; the previous
    /// session is dropped.
    pub async fn open(&self, mut session: Session, previous: Option<&str>) -> String {
        let token = generate_token();
        let mut sessions = self.sessions.write().await;
        if let Some(old) = previous.and_then(|p| sessions.remove(p)).filter(|old| !old.is_expired(self.ttl))
            && session.wizard.is_none()
        {
            session.wizard = old.session.wizard;
        }
        if let (Some(wizard), Some(user)) = (session.wizard.as_mut(), session.user.as_ref()) {
            wizard.adopt_email(&user.email);
        }
        let event = session.user.as_ref().map(|user| {
            if session.recovery {
                SessionEvent::PasswordRecovery { user_id: user.id }
            } else {
                SessionEvent::SignedIn { user_id: user.id, role: user.role }
            }
        });
        sessions.insert(token.clone(), Entry::new(session));
        drop(sessions);
        if let Some(event) = event {
            self.emit(event);
        }
        token
    }

    /// Remove a session, returning it.
    pub async fn close(&self, token: &str) -> Option<Session> {
        let removed = self.sessions.write().await.remove(token).map(|entry| entry.session);
        if let Some(user) = removed.as_ref().and_then(|s| s.user.as_ref()) {
            self.emit(SessionEvent::SignedOut { user_id: user.id });
        }
        removed
    }

    /// Run `f` against the session's state; `None` when the token is unknown.
    pub async fn with_session<R>(&self, token: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        live(&mut *self.sessions.write().await, token, self.ttl).map(f)
    }

    /// Apply a role change to every live session of `user_id`.
    pub async fn update_role(&self, user_id: Uuid, role: Role) -> usize {
        let mut touched = 0;
        for entry in self.sessions.write().await.values_mut() {
            if let Some(user) = entry.session.user.as_mut().filter(|u| u.id == user_id) {
                user.role = role;
                touched += 1;
            }
        }
        self.emit(SessionEvent::RoleChanged { user_id, role });
        touched
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every expired session, returning how many went.
    pub async fn sweep(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.ttl));
        before - sessions.len()
    }
}

/// Sweep expired sessions every `every` until the runtime shuts down.
pub fn spawn_sweeper(store: &SessionStore, every: Duration) -> tokio::task::JoinHandle<()> {
    let store = store.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            let removed = store.sweep().await;
            if removed > 0 {
                let remaining = store.len().await;
                tracing::info!(removed, remaining, "expired sessions swept");
            }
        }
    })
}

/// Log every session event until the store is dropped.
pub fn spawn_event_logger(store: &SessionStore) -> tokio::task::JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::SignedIn { user_id, role }) => {
                    tracing::info!(%user_id, role = role.as_str(), "signed in");
                }
                Ok(SessionEvent::SignedOut { user_id }) => tracing::info!(%user_id, "signed out"),
                Ok(SessionEvent::PasswordRecovery { user_id }) => {
                    tracing::info!(%user_id, "password recovery session opened");
                }
                Ok(SessionEvent::RoleChanged { user_id, role }) => {
                    tracing::info!(%user_id, role = role.as_str(), "role changed");
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "session event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

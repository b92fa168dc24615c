//! Contact form message log.
//!
//! DESIGN
//! ======
//! Messages are appended to a single JSON array file. Each append reads the
//! whole file, pushes one entry and writes it back through a temp file and a
//! rename, all under one async mutex so concurrent submissions cannot lose
//! each other's entries. A missing file is an empty log.

use std::path::PathBuf;

use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::notice::{ErrorCode, Notice};
use crate::services::auth::normalize_email;

pub const RECEIVED: &str = "received";

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("Please fill in your {0}.")]
    MissingField(&'static str),
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("contact log io: {0}")]
    Io(#[from] std::io::Error),
    #[error("contact log is not a JSON array: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl ErrorCode for ContactError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) | Self::InvalidEmail => "E_VALIDATION",
            Self::Io(_) | Self::Corrupt(_) => "E_CONTACT_LOG",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidEmail => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Io(_) | Self::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    /// Unix milliseconds at submission.
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub subject: String,
    pub message: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
    pub status: String,
}

impl ContactForm {
    fn into_message(self) -> Result<ContactMessage, ContactError> {
        let required = |value: &str, field: &'static str| {
            let value = value.trim();
            if value.is_empty() { Err(ContactError::MissingField(field)) } else { Ok(value.to_owned()) }
        };
        let name = required(&self.name, "name")?;
        let email = required(&self.email, "email")?;
        let email = normalize_email(&email).ok_or(ContactError::InvalidEmail)?;
        let subject = required(&self.subject, "subject")?;
        let message = required(&self.message, "message")?;

        let now = Utc::now();
        Ok(ContactMessage {
            id: now.timestamp_millis(),
            name,
            email,
            phone: self.phone.trim().to_owned(),
            subject,
            message,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            status: RECEIVED.to_owned(),
        })
    }
}

#[must_use]
pub fn sent_notice() -> Notice {
    Notice::success(
        "Message Sent Successfully!",
        "Thank you for contacting us! We'll get back to you within 24 hours.",
    )
}

pub struct ContactLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ContactLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Every stored message, oldest first.
    ///
    /// # Errors
    ///
    /// Reading or parsing the log file.
    #[cfg(test)]
    pub async fn messages(&self) -> Result<Vec<ContactMessage>, ContactError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Validate the form and append it to the log.
    ///
    /// # Errors
    ///
    /// Missing or invalid fields, or a failure reading or writing the log.
    pub async fn submit(&self, form: ContactForm) -> Result<ContactMessage, ContactError> {
        let message = form.into_message()?;
        let _guard = self.lock.lock().await;
        let mut messages = self.read().await?;
        messages.push(message.clone());
        self.write(&messages).await?;
        tracing::info!(id = message.id, total = messages.len(), "contact message stored");
        Ok(message)
    }

    async fn read(&self) -> Result<Vec<ContactMessage>, ContactError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, messages: &[ContactMessage]) -> Result<(), ContactError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }
        let body = serde_json::to_vec_pretty(messages)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "contact_test.rs"]
mod tests;

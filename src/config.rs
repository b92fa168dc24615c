//! Application configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STORAGE_BUCKET: &str = "property-media";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_CONTACT_LOG_PATH: &str = "data/contact_messages.json";
pub const DEFAULT_BAAS_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BAAS_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaasTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Which backend the app talks to.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Hosted Supabase-compatible project.
    Supabase { url: String, anon_key: String },
    /// In-process store; nothing survives a restart.
    Memory,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("anon_key", &"<redacted>")
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Credentials for the admin account created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub backend: BackendConfig,
    pub storage_bucket: String,
    pub site_url: String,
    pub contact_log_path: PathBuf,
    pub timeouts: BaasTimeouts,
    pub bootstrap_admin: Option<AdminSeed>,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required in `supabase` mode:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `BAAS_MODE`: `supabase` (default) or `memory`
    /// - `STORAGE_BUCKET`: default `property-media`
    /// - `PUBLIC_SITE_URL`: default `http://localhost:3000`
    /// - `CONTACT_LOG_PATH`: default `data/contact_messages.json`
    /// - `BAAS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BAAS_CONNECT_TIMEOUT_SECS`: default 10
    /// - `BOOTSTRAP_ADMIN_EMAIL` + `BOOTSTRAP_ADMIN_PASSWORD`
    /// - `COOKIE_SECURE`: inferred from the site URL scheme when unset
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for missing required values or malformed numbers.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let backend = match get("BAAS_MODE").as_deref().unwrap_or("supabase") {
            "supabase" => BackendConfig::Supabase {
                url: get("SUPABASE_URL")
                    .ok_or(ConfigError::Missing("SUPABASE_URL"))?
                    .trim_end_matches('/')
                    .to_owned(),
                anon_key: get("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            },
            "memory" => BackendConfig::Memory,
            other => return Err(ConfigError::Parse(format!("unknown BAAS_MODE: {other}"))),
        };

        let site_url = get("PUBLIC_SITE_URL")
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let cookie_secure = match get("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Parse(format!("invalid COOKIE_SECURE: {raw}")))?,
            None => site_url.starts_with("https://"),
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Parse(
                    "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together".into(),
                ));
            }
        };

        Ok(Self {
            port,
            backend,
            storage_bucket: get("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_owned()),
            site_url,
            contact_log_path: get("CONTACT_LOG_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CONTACT_LOG_PATH), PathBuf::from),
            timeouts: BaasTimeouts {
                request_secs: parse_or(
                    get("BAAS_REQUEST_TIMEOUT_SECS"),
                    "BAAS_REQUEST_TIMEOUT_SECS",
                    DEFAULT_BAAS_REQUEST_TIMEOUT_SECS,
                )?,
                connect_secs: parse_or(
                    get("BAAS_CONNECT_TIMEOUT_SECS"),
                    "BAAS_CONNECT_TIMEOUT_SECS",
                    DEFAULT_BAAS_CONNECT_TIMEOUT_SECS,
                )?,
            },
            bootstrap_admin,
            cookie_secure,
        })
    }

    /// Where password-reset emails send the user back to.
    #[must_use]
    pub fn password_reset_redirect(&self) -> String {
        format!("{}/update-password", self.site_url)
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Parse(format!("invalid {key}: {value}"))),
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

mod access;
mod baas;
mod config;
mod model;
mod notice;
mod pricing;
mod routes;
mod schema;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::baas::Backend;
use crate::baas::memory::MemoryBackend;
use crate::baas::supabase::SupabaseBackend;
use crate::config::{AppConfig, BackendConfig};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Baas(#[from] baas::BaasError),
    #[error("server io: {0}")]
    Io(#[from] std::io::Error),
}

fn backend_for(config: &AppConfig) -> Result<Arc<dyn Backend>, baas::BaasError> {
    let backend: Arc<dyn Backend> = match &config.backend {
        BackendConfig::Supabase { url, anon_key } => {
            tracing::info!(%url, "using hosted backend");
            Arc::new(SupabaseBackend::new(url.clone(), anon_key.clone(), config.timeouts)?)
        }
        BackendConfig::Memory => {
            tracing::warn!("BAAS_MODE=memory; nothing will persist across restarts");
            Arc::new(MemoryBackend::new())
        }
    };
    Ok(backend)
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let backend = backend_for(&config)?;

    // Non-fatal: the site still serves if the seed account cannot be set up.
    if let Some(seed) = &config.bootstrap_admin {
        match services::bootstrap::ensure_initial_admin(&*backend, seed).await {
            Ok(outcome) => tracing::info!(?outcome, email = %seed.email, "admin bootstrap"),
            Err(e) => tracing::warn!(error = %e, email = %seed.email, "admin bootstrap failed"),
        }
    }

    let port = config.port;
    let state = state::AppState::new(config, backend);
    let _events = services::session::spawn_event_logger(&state.sessions);
    let _sweeper = services::session::spawn_sweeper(&state.sessions, services::session::SWEEP_INTERVAL);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "valleystays listening");
    axum::serve(listener, app).await?;
    Ok(())
}
